//! Batch driver
//!
//! Loads every configured source in parallel (rayon), runs the matching
//! builder, merges the results and writes the three JSON collections.
//! Index lists and category merges follow configuration order whatever the
//! scheduling, so when two tabular sources share a code the earlier source
//! wins and only its entry is projected.

use crate::config::{ConfigError, RunConfig, SourceConfig, SourceKind};
use crate::flatten::{build_index, build_tabular, project_categories, CategoryMap, FlatOutput, IndexEntry, IndexSource};
use crate::loader::{load_source, LoadError};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("aborting run: {0}")]
    Fatal(#[source] LoadError),

    #[error("writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Counts reported after a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub primary: usize,
    pub secondary: usize,
    pub categories: usize,
    pub dropped_categories: usize,
    /// Sources that were missing or unparsable and contributed nothing
    pub skipped_sources: Vec<String>,
}

/// What one source produced before merging
#[derive(Debug, Default)]
struct SourceOutput {
    entries: Vec<IndexEntry>,
    /// Local category map of a tabular source, not yet merged or projected
    categories: Option<CategoryMap>,
    dropped: usize,
}

/// Load config from `path`, flatten every source, write the outputs
pub fn run_batch_file(path: &Path) -> Result<RunSummary, BatchError> {
    let config = RunConfig::load(path)?;
    run_batch(&config)
}

pub fn run_batch(config: &RunConfig) -> Result<RunSummary, BatchError> {
    let (output, summary) = flatten_sources(config)?;
    write_outputs(config, &output)?;
    info!(
        primary = summary.primary,
        secondary = summary.secondary,
        categories = summary.categories,
        dropped = summary.dropped_categories,
        "batch complete"
    );
    Ok(summary)
}

/// Run every source without writing anything. A fatal source failure
/// discards all results.
pub fn flatten_sources(config: &RunConfig) -> Result<(FlatOutput, RunSummary), BatchError> {
    let results: Vec<Result<SourceOutput, LoadError>> = config
        .sources
        .par_iter()
        .map(|source| flatten_source(config, source))
        .collect();

    let mut output = FlatOutput::default();
    let mut summary = RunSummary::default();

    for (source, result) in config.sources.iter().zip(results) {
        match result {
            Ok(source_output) => {
                summary.dropped_categories += source_output.dropped;
                output.extend_index(source_output.entries);
                if let Some(local) = source_output.categories {
                    let added = output.categories.merge(local);
                    info!(source = %source.name, categories = added.len(), "categories merged");
                    if !added.is_empty() {
                        output.extend_index(project_categories(&added, &source.name));
                    }
                }
            }
            Err(err) if err.is_fatal() => return Err(BatchError::Fatal(err)),
            Err(err) => {
                warn!(source = %source.name, path = %err.path().display(), error = %err, "source skipped");
                summary.skipped_sources.push(source.name.clone());
            }
        }
    }

    summary.primary = output.primary.len();
    summary.secondary = output.secondary.len();
    summary.categories = output.categories.len();
    Ok((output, summary))
}

fn flatten_source(config: &RunConfig, source: &SourceConfig) -> Result<SourceOutput, LoadError> {
    let path = config.resolve(&source.path);
    let doc = load_source(&path)?;

    let output = match source.kind {
        SourceKind::Index => {
            let entries = build_index(&doc, IndexSource::plain(&source.name, source.family.into()));
            SourceOutput { entries, categories: None, dropped: 0 }
        }
        SourceKind::Table => {
            let entries = build_index(&doc, IndexSource::table(&source.name, source.family.into()));
            SourceOutput { entries, categories: None, dropped: 0 }
        }
        SourceKind::Tabular => {
            let tabular = build_tabular(&doc);
            SourceOutput { entries: Vec::new(), categories: Some(tabular.categories), dropped: tabular.dropped }
        }
    };

    info!(
        source = %source.name,
        root = doc.root_name().unwrap_or_default(),
        entries = output.entries.len(),
        path = %path.display(),
        "source flattened"
    );
    Ok(output)
}

pub fn write_outputs(config: &RunConfig, output: &FlatOutput) -> Result<(), BatchError> {
    write_json(&config.resolve(&config.outputs.primary), &output.primary)?;
    write_json(&config.resolve(&config.outputs.secondary), &output.secondary)?;
    write_json(&config.resolve(&config.outputs.categories), &output.categories)?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), BatchError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()
    };
    write().map_err(|source| BatchError::Write { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Family, OutputConfig};
    use serde_json::Value;
    use tempfile::TempDir;

    const INDEX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ICD10CM.index>
  <letter><title>A</title>
    <mainTerm><title>Appendicitis</title>
      <term level="1"><title>acute</title><code>K35.80</code></term>
      <term level="1"><title>chronic</title><code>K36</code></term>
    </mainTerm>
    <mainTerm><title>Abasia</title><see>Ataxia</see></mainTerm>
  </letter>
</ICD10CM.index>"#;

    const NEOPLASM: &str = r#"<ICD10CM.index>
  <indexHeading><head>Neoplasm</head><head col="2">Malignant Primary</head><head col="3">Benign</head></indexHeading>
  <letter><title>N</title>
    <mainTerm><title>breast</title><cell col="2">C50.911</cell><cell col="3">D24</cell></mainTerm>
  </letter>
</ICD10CM.index>"#;

    const TABULAR: &str = r#"<ICD10CM.tabular>
  <chapter><name>1</name><desc>Certain infectious diseases</desc>
    <section id="A00-A09"><desc>Intestinal infectious diseases</desc>
      <diag><name>A00</name><desc>Cholera</desc>
        <diag><name>A00.0</name><desc>Cholera due to Vibrio cholerae 01, biovar cholerae</desc></diag>
      </diag>
      <diag><name>A01</name></diag>
    </section>
  </chapter>
</ICD10CM.tabular>"#;

    const PCS: &str = r#"<ICD10PCS.index>
  <letter><title>A</title>
    <mainTerm><title>Abdominoplasty</title><use>Alteration, Abdominal Wall <codes>0W0F</codes></use></mainTerm>
  </letter>
</ICD10PCS.index>"#;

    const CORRUPT: &[u8] = &[b'<', b'a', b'>', 0xFF, 0xFE, 0xFD, b'<', b'/', b'a', b'>'];

    fn source(name: &str, path: &str, kind: SourceKind, family: Family) -> SourceConfig {
        SourceConfig { name: name.to_string(), path: PathBuf::from(path), kind, family }
    }

    fn setup(files: &[(&str, &[u8])]) -> (TempDir, RunConfig) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let config = RunConfig {
            base_dir: Some(dir.path().to_path_buf()),
            sources: vec![
                source("Index", "index.xml", SourceKind::Index, Family::Primary),
                source("Neoplasm", "neoplasm.xml", SourceKind::Table, Family::Primary),
                source("Tabular", "tabular.xml", SourceKind::Tabular, Family::Primary),
                source("PCS Index", "pcs.xml", SourceKind::Index, Family::Secondary),
            ],
            outputs: OutputConfig {
                primary: PathBuf::from("out/cm.json"),
                secondary: PathBuf::from("out/pcs.json"),
                categories: PathBuf::from("out/tabular.json"),
            },
        };
        (dir, config)
    }

    fn read_json(path: PathBuf) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_full_run_writes_outputs() {
        let (dir, config) = setup(&[
            ("index.xml", INDEX.as_bytes()),
            ("neoplasm.xml", NEOPLASM.as_bytes()),
            ("tabular.xml", TABULAR.as_bytes()),
            ("pcs.xml", PCS.as_bytes()),
        ]);
        let summary = run_batch(&config).unwrap();

        // 3 index + 2 neoplasm + 1 projected category
        assert_eq!(summary.primary, 6);
        assert_eq!(summary.secondary, 1);
        assert_eq!(summary.categories, 2);
        assert_eq!(summary.dropped_categories, 1);
        assert!(summary.skipped_sources.is_empty());

        let cm = read_json(dir.path().join("out/cm.json"));
        let cm = cm.as_array().unwrap();
        assert_eq!(cm[0]["description"], "Appendicitis, acute");
        assert!(cm[0].get("see").is_none());
        assert!(cm[0].get("specialColumns").is_none());
        assert_eq!(cm[2]["see"], "Ataxia");
        assert_eq!(cm[2]["code"], "");
        assert_eq!(cm[3]["specialColumns"]["MalignantPrimary"], "C50.911");
        assert_eq!(cm[5]["sourceName"], "Tabular");

        let pcs = read_json(dir.path().join("out/pcs.json"));
        assert_eq!(pcs[0]["use"], "Alteration, Abdominal Wall");
        assert_eq!(pcs[0]["referenceCodes"]["use"], "0W0F");
        assert_eq!(pcs[0]["indexKind"], "secondary");

        let tabular = read_json(dir.path().join("out/tabular.json"));
        assert_eq!(tabular["A00.0"]["level"], 4);
        assert!(tabular["A00"].get("notes").is_none());
        assert!(tabular.get("A01").is_none());
    }

    #[test]
    fn test_shared_category_code_keeps_first_tabular_source() {
        let addenda = r#"<ICD10CM.tabular>
  <chapter><name>1</name><desc>Certain infectious diseases</desc>
    <section id="A00-A09"><desc>Intestinal infectious diseases</desc>
      <diag><name>A00</name><desc>Other cholera</desc></diag>
      <diag><name>A02</name><desc>Other salmonella infections</desc></diag>
    </section>
  </chapter>
</ICD10CM.tabular>"#;
        let (_dir, mut config) = setup(&[("tabular.xml", TABULAR.as_bytes()), ("addenda.xml", addenda.as_bytes())]);
        config.sources = vec![
            source("Tabular", "tabular.xml", SourceKind::Tabular, Family::Primary),
            source("Addenda", "addenda.xml", SourceKind::Tabular, Family::Primary),
        ];
        let (output, summary) = flatten_sources(&config).unwrap();

        assert_eq!(summary.categories, 3);
        assert_eq!(output.categories.get("A00").unwrap().term, "Cholera");

        let projected: Vec<(&str, &str, &str)> = output
            .primary
            .iter()
            .map(|e| (e.code.as_str(), e.description.as_str(), e.source_name.as_str()))
            .collect();
        assert_eq!(
            projected,
            vec![("A00", "Cholera", "Tabular"), ("A02", "Other salmonella infections", "Addenda")]
        );
    }

    #[test]
    fn test_missing_and_unparsable_sources_are_skipped() {
        let (dir, config) = setup(&[("index.xml", INDEX.as_bytes()), ("neoplasm.xml", b"<ICD10CM.index><letter>".as_slice())]);
        let summary = run_batch(&config).unwrap();

        assert_eq!(summary.primary, 3);
        assert_eq!(summary.secondary, 0);
        assert_eq!(summary.categories, 0);
        assert_eq!(summary.skipped_sources, vec!["Neoplasm", "Tabular", "PCS Index"]);
        assert_eq!(read_json(dir.path().join("out/pcs.json")), Value::Array(Vec::new()));
    }

    #[test]
    fn test_corrupt_source_aborts_without_output() {
        let (dir, config) = setup(&[
            ("index.xml", INDEX.as_bytes()),
            ("tabular.xml", CORRUPT),
        ]);
        let err = run_batch(&config).unwrap_err();

        assert!(matches!(err, BatchError::Fatal(LoadError::Corrupt { .. })));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_run_from_config_file() {
        let (dir, _) = setup(&[("index.xml", INDEX.as_bytes())]);
        let yaml = "sources:\n  - {name: Index, path: index.xml, kind: index}\noutputs:\n  primary: cm.json\n  secondary: pcs.json\n  categories: tab.json\n";
        let config_path = dir.path().join("run.yaml");
        fs::write(&config_path, yaml).unwrap();

        let summary = run_batch_file(&config_path).unwrap();
        assert_eq!(summary.primary, 3);
        assert!(dir.path().join("tab.json").exists());
        assert_eq!(read_json(dir.path().join("tab.json")), Value::Object(Default::default()));
    }

    #[test]
    fn test_write_failure_reported() {
        let (dir, mut config) = setup(&[("index.xml", INDEX.as_bytes())]);
        fs::write(dir.path().join("blocker"), "").unwrap();
        config.outputs.primary = PathBuf::from("blocker/cm.json");

        let err = run_batch(&config).unwrap_err();
        assert!(matches!(err, BatchError::Write { .. }));
    }
}

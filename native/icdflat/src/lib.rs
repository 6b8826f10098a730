//! icdflat - Flattening of ICD-10 XML hierarchies
//!
//! Sources:
//! - Alphabetic / external cause / PCS index (term hierarchies)
//! - Neoplasm and drug tables (column cells)
//! - Tabular list (chapter, section and category trees)
//!
//! NIFs flatten an in-memory document or drive a configured batch run.

use rustler::{Binary, Encoder, Env, NifResult, Term};

mod batch;
mod config;
mod core;
mod dom;
mod flatten;
mod loader;
mod reader;
mod term;

use dom::XmlDocument;
use flatten::{build_index, build_tabular, project_categories, IndexKind, IndexSource};
use term::{categories_to_term, error_to_term, index_entries_to_term, summary_to_term};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Document Flattening
// ============================================================================

/// Flatten an index or table document held in memory
/// Returns {:ok, [entry]} or {:error, reason}
#[rustler::nif(schedule = "DirtyCpu")]
fn flatten_index<'a>(
    env: Env<'a>,
    input: Binary<'a>,
    source_name: &str,
    table: bool,
    secondary: bool,
) -> NifResult<Term<'a>> {
    let doc = match XmlDocument::parse_bytes(input.as_slice().to_vec()) {
        Ok(doc) => doc,
        Err(e) => return Ok(error_to_term(env, e)),
    };

    let kind = if secondary { IndexKind::Secondary } else { IndexKind::Primary };
    let source = if table { IndexSource::table(source_name, kind) } else { IndexSource::plain(source_name, kind) };
    let entries = build_index(&doc, source);

    Ok((term::ok(), index_entries_to_term(env, &entries)?).encode(env))
}

/// Flatten a tabular list held in memory
/// Returns {:ok, {categories, projected_entries, dropped_count}} or {:error, reason}
#[rustler::nif(schedule = "DirtyCpu")]
fn flatten_tabular<'a>(env: Env<'a>, input: Binary<'a>, source_name: &str) -> NifResult<Term<'a>> {
    let doc = match XmlDocument::parse_bytes(input.as_slice().to_vec()) {
        Ok(doc) => doc,
        Err(e) => return Ok(error_to_term(env, e)),
    };

    let tabular = build_tabular(&doc);
    let projected = project_categories(&tabular.categories, source_name);
    let result = (
        categories_to_term(env, &tabular.categories)?,
        index_entries_to_term(env, &projected)?,
        tabular.dropped,
    );
    Ok((term::ok(), result).encode(env))
}

// ============================================================================
// Batch Runs
// ============================================================================

/// Run the YAML-configured batch and write the JSON outputs. With `nil`
/// the built-in ICD-10 2023 file list is read from the working directory.
/// Returns {:ok, {primary_count, secondary_count, category_count}} or {:error, reason}
#[rustler::nif(schedule = "DirtyIo")]
fn run_batch<'a>(env: Env<'a>, config_path: Option<String>) -> NifResult<Term<'a>> {
    let result = match config_path {
        Some(path) => batch::run_batch_file(std::path::Path::new(&path)),
        None => batch::run_batch(&config::RunConfig::default_icd10()),
    };
    match result {
        Ok(summary) => Ok((term::ok(), summary_to_term(env, &summary)).encode(env)),
        Err(e) => Ok(error_to_term(env, e)),
    }
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.IcdFlat.Native");

//! Tabular Category Builder
//!
//! Walks `chapter` / `section` / `diag` nesting of the tabular list into a
//! code-keyed `CategoryMap`. Levels follow the element nesting, never the
//! length of the code.

use super::model::{CategoryEntry, CategoryMap, Extension, IndexEntry, IndexKind, NoteKind};
use super::tag::{classified_children, TagKind};
use super::text::normalize_space;
use crate::dom::{DocumentAccess, NodeId};
use std::collections::BTreeMap;
use tracing::debug;

/// Result of flattening one tabular document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TabularOutput {
    pub categories: CategoryMap,
    /// `diag` elements skipped because they or an ancestor lacked name/desc
    pub dropped: usize,
}

pub fn build_tabular<D: DocumentAccess + ?Sized>(doc: &D) -> TabularOutput {
    let mut builder = TabularBuilder::new(doc);
    builder.traverse_document();
    builder.finish()
}

/// Every 3-character category as a level-1 index entry, in code order
pub fn project_categories(categories: &CategoryMap, source_name: &str) -> Vec<IndexEntry> {
    categories
        .values()
        .filter(|c| c.code.chars().count() == 3)
        .map(|c| IndexEntry {
            description: c.term.clone(),
            code: c.code.clone(),
            level: 1,
            index_kind: IndexKind::Primary,
            source_name: source_name.to_string(),
            see: None,
            see_also: None,
            use_: None,
            special_columns: None,
            reference_codes: None,
        })
        .collect()
}

fn is_category_node(kind: TagKind) -> bool {
    matches!(kind, TagKind::Chapter | TagKind::Section | TagKind::Diag)
}

fn note_kind(kind: TagKind) -> Option<NoteKind> {
    match kind {
        TagKind::Includes | TagKind::InclusionTerm => Some(NoteKind::Includes),
        TagKind::Excludes1 => Some(NoteKind::Excludes1),
        TagKind::Excludes2 => Some(NoteKind::Excludes2),
        TagKind::CodeFirst => Some(NoteKind::CodeFirst),
        TagKind::UseAdditionalCode => Some(NoteKind::UseAdditionalCode),
        TagKind::CodeAlso => Some(NoteKind::CodeAlso),
        TagKind::Notes => Some(NoteKind::Notes),
        _ => None,
    }
}

pub struct TabularBuilder<'d, D: DocumentAccess + ?Sized> {
    doc: &'d D,
    output: TabularOutput,
}

impl<'d, D: DocumentAccess + ?Sized> TabularBuilder<'d, D> {
    pub fn new(doc: &'d D) -> Self {
        TabularBuilder { doc, output: TabularOutput::default() }
    }

    /// Continue filling an existing map (codes already in it are left alone)
    #[cfg(test)]
    pub fn with_categories(doc: &'d D, categories: CategoryMap) -> Self {
        TabularBuilder { doc, output: TabularOutput { categories, dropped: 0 } }
    }

    pub fn finish(self) -> TabularOutput {
        self.output
    }

    /// Visit the root, or each top-level chapter/section/diag below it, at level 1
    pub fn traverse_document(&mut self) {
        let Some(root) = self.doc.root_element_id() else {
            return;
        };
        if is_category_node(TagKind::of(self.doc, root)) {
            self.traverse(root, 1);
            return;
        }
        for (kind, child) in classified_children(self.doc, root) {
            if is_category_node(kind) {
                self.traverse(child, 1);
            }
        }
    }

    pub fn traverse(&mut self, node: NodeId, level: u32) {
        match TagKind::of(self.doc, node) {
            TagKind::Chapter | TagKind::Section => {
                for (kind, child) in classified_children(self.doc, node) {
                    if matches!(kind, TagKind::Section | TagKind::Diag) {
                        self.traverse(child, level + 1);
                    }
                }
            }
            TagKind::Diag => self.visit_diag(node, level),
            _ => {}
        }
    }

    fn visit_diag(&mut self, node: NodeId, level: u32) {
        let doc = self.doc;
        let children = classified_children(doc, node);
        let text_of = |kind: TagKind| {
            children
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|&(_, id)| normalize_space(&doc.string_value(id)))
                .unwrap_or_default()
        };
        let code = text_of(TagKind::Name);
        let term = text_of(TagKind::Desc);

        if code.is_empty() || term.is_empty() {
            let dropped = 1 + doc.descendants_by_tag(node, "diag").len();
            debug!(code = %code, dropped, "category without name or description, subtree dropped");
            self.output.dropped += dropped;
            return;
        }
        if self.output.categories.contains(&code) {
            return;
        }

        let mut notes = self.collect_notes(&children);
        let loose = loose_inclusions(doc, node);
        if !loose.is_empty() {
            // The window ends at the first note tag, so loose text precedes tagged inclusions
            let includes = notes.entry(NoteKind::Includes).or_default();
            let tagged = std::mem::replace(includes, loose);
            includes.extend(tagged);
        }
        let extension = self.collect_extension(&children);

        self.output.categories.insert(CategoryEntry { code, term, level, notes, extension });

        for (kind, child) in children {
            if kind == TagKind::Diag {
                self.visit_diag(child, level + 1);
            }
        }
    }

    fn collect_notes(&self, children: &[(TagKind, NodeId)]) -> BTreeMap<NoteKind, Vec<String>> {
        let mut notes: BTreeMap<NoteKind, Vec<String>> = BTreeMap::new();
        for &(kind, child) in children {
            let Some(note_kind) = note_kind(kind) else {
                continue;
            };
            let texts = note_texts(self.doc, child);
            if !texts.is_empty() {
                notes.entry(note_kind).or_default().extend(texts);
            }
        }
        notes
    }

    fn collect_extension(&self, children: &[(TagKind, NodeId)]) -> Option<Extension> {
        let doc = self.doc;
        let mut default = None;
        let mut notes = Vec::new();
        let mut characters = Vec::new();

        for &(kind, child) in children {
            match kind {
                TagKind::SevenChrNote => notes.extend(note_texts(doc, child)),
                TagKind::SevenChrDef => {
                    for ext in doc.children_by_tag(child, "extension") {
                        let text = normalize_space(&doc.string_value(ext));
                        if text.is_empty() {
                            continue;
                        }
                        if default.is_none() {
                            default = Some(text.clone());
                        }
                        match doc.get_attribute(ext, "char").map(str::trim).filter(|c| !c.is_empty()) {
                            Some(ch) => characters.push(format!("{ch} {text}")),
                            None => characters.push(text),
                        }
                    }
                }
                _ => {}
            }
        }

        notes.extend(characters);
        if default.is_none() && notes.is_empty() {
            None
        } else {
            Some(Extension { default, notes })
        }
    }
}

/// `note` leaves of a note tag, or the whole tag text as a single note
fn note_texts<D: DocumentAccess + ?Sized>(doc: &D, tag: NodeId) -> Vec<String> {
    let leaves = doc.children_by_tag(tag, "note");
    if leaves.is_empty() {
        let text = normalize_space(&doc.string_value(tag));
        return if text.is_empty() { Vec::new() } else { vec![text] };
    }
    leaves
        .into_iter()
        .map(|leaf| normalize_space(&doc.string_value(leaf)))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Elements that close the loose-inclusion window of a `diag`
fn ends_loose_window(kind: TagKind) -> bool {
    note_kind(kind).is_some()
        || matches!(kind, TagKind::Diag | TagKind::SevenChrNote | TagKind::SevenChrDef | TagKind::Extension)
}

/// Untagged inclusions: the children after the first `desc` up to the first
/// note, diag or extension tag, in document order. A text run gives one note
/// per line; any other element in the window is a single note.
fn loose_inclusions<D: DocumentAccess + ?Sized>(doc: &D, diag: NodeId) -> Vec<String> {
    let mut notes = Vec::new();
    let mut in_window = false;

    for child in doc.children_vec(diag) {
        if doc.node_name(child).is_some() {
            let kind = TagKind::of(doc, child);
            if !in_window {
                in_window = kind == TagKind::Desc;
                continue;
            }
            if ends_loose_window(kind) {
                break;
            }
            let text = normalize_space(&doc.string_value(child));
            if !text.is_empty() {
                notes.push(text);
            }
        } else if in_window {
            if let Some(text) = doc.text_content(child) {
                notes.extend(text.lines().map(normalize_space).filter(|line| !line.is_empty()));
            }
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    const TABULAR: &str = r#"<ICD10CM.tabular>
      <version>2023</version>
      <chapter>
        <name>4</name>
        <desc>Endocrine, nutritional and metabolic diseases (E00-E89)</desc>
        <section id="E08-E13">
          <desc>Diabetes mellitus (E08-E13)</desc>
          <diag>
            <name>E10</name>
            <desc>Type 1 diabetes mellitus</desc>
            <includes>
              <note>brittle diabetes (mellitus)</note>
              <note>idiopathic diabetes (mellitus)</note>
            </includes>
            <excludes2>
              <note>diabetes mellitus due to underlying condition (E08.-)</note>
              <note>drug or chemical induced diabetes mellitus (E09.-)</note>
            </excludes2>
            <diag>
              <name>E10.1</name>
              <desc>Type 1 diabetes mellitus with ketoacidosis</desc>
              <diag>
                <name>E10.10</name>
                <desc>Type 1 diabetes mellitus with ketoacidosis without coma</desc>
              </diag>
            </diag>
            <diag>
              <name>E10.2</name>
              <diag>
                <name>E10.21</name>
                <desc>Type 1 diabetes mellitus with diabetic nephropathy</desc>
              </diag>
            </diag>
          </diag>
        </section>
      </chapter>
    </ICD10CM.tabular>"#;

    fn tabular(xml: &str) -> TabularOutput {
        let doc = XmlDocument::parse(xml).unwrap();
        build_tabular(&doc)
    }

    #[test]
    fn test_category_with_excludes2() {
        let out = tabular(TABULAR);
        let e10 = out.categories.get("E10").unwrap();
        assert_eq!(e10.term, "Type 1 diabetes mellitus");
        assert_eq!(e10.level, 3);
        assert_eq!(
            e10.notes.get(&NoteKind::Excludes2).unwrap(),
            &vec![
                "diabetes mellitus due to underlying condition (E08.-)".to_string(),
                "drug or chemical induced diabetes mellitus (E09.-)".to_string(),
            ]
        );
        assert_eq!(e10.notes.get(&NoteKind::Includes).unwrap().len(), 2);
        assert!(!e10.notes.contains_key(&NoteKind::Excludes1));
        assert!(e10.extension.is_none());
    }

    #[test]
    fn test_levels_follow_nesting() {
        let out = tabular(TABULAR);
        assert_eq!(out.categories.get("E10.1").unwrap().level, 4);
        assert_eq!(out.categories.get("E10.10").unwrap().level, 5);
    }

    #[test]
    fn test_incomplete_category_drops_subtree() {
        let out = tabular(TABULAR);
        assert!(out.categories.get("E10.2").is_none());
        assert!(out.categories.get("E10.21").is_none());
        assert_eq!(out.dropped, 2);
        assert_eq!(out.categories.len(), 3);
    }

    #[test]
    fn test_existing_code_left_unchanged() {
        let doc = XmlDocument::parse(TABULAR).unwrap();
        let first = build_tabular(&doc);

        let mut builder = TabularBuilder::with_categories(&doc, first.categories.clone());
        builder.traverse_document();
        let again = builder.finish();
        assert_eq!(again.categories, first.categories);

        let other = XmlDocument::parse(
            "<chapter><diag><name>E10</name><desc>Replacement</desc><diag><name>E10.9</name><desc>new</desc></diag></diag></chapter>",
        )
        .unwrap();
        let mut builder = TabularBuilder::with_categories(&other, first.categories);
        builder.traverse_document();
        let merged = builder.finish().categories;
        assert_eq!(merged.get("E10").unwrap().term, "Type 1 diabetes mellitus");
        assert!(merged.get("E10.9").is_none());
    }

    #[test]
    fn test_inclusion_term_and_loose_text() {
        let out = tabular(
            "<chapter><diag><name>F20.2</name><desc>Catatonic schizophrenia</desc>\nCatatonic stupor\nSchizophrenic catalepsy\n<inclusionTerm><note>Schizophrenic flexibilitas cerea</note></inclusionTerm></diag></chapter>",
        );
        let includes = out.categories.get("F20.2").unwrap().notes.get(&NoteKind::Includes).unwrap().clone();
        assert_eq!(
            includes,
            vec!["Catatonic stupor", "Schizophrenic catalepsy", "Schizophrenic flexibilitas cerea"]
        );
    }

    #[test]
    fn test_loose_text_window_ends_at_first_note_tag() {
        let out = tabular(
            "<chapter><diag><name>B20</name>stray<desc>HIV disease</desc>\nAIDS\n<i>Acquired  immune deficiency syndrome</i>\n\
             <excludes1><note>asymptomatic HIV infection status</note></excludes1>\ntrailing text\n\
             <diag><name>B20.1</name><desc>HIV disease with infection</desc></diag>\nafter child\n</diag></chapter>",
        );
        let b20 = out.categories.get("B20").unwrap();
        assert_eq!(
            b20.notes.get(&NoteKind::Includes).unwrap(),
            &vec!["AIDS".to_string(), "Acquired immune deficiency syndrome".to_string()]
        );
        assert_eq!(b20.notes.get(&NoteKind::Excludes1).unwrap(), &vec!["asymptomatic HIV infection status".to_string()]);
        assert!(out.categories.get("B20.1").unwrap().notes.is_empty());
    }

    #[test]
    fn test_tag_text_as_single_note() {
        let out = tabular(
            "<chapter><diag><name>A00</name><desc>Cholera</desc><codeAlso>  any associated\n condition </codeAlso><notes></notes></diag></chapter>",
        );
        let a00 = out.categories.get("A00").unwrap();
        assert_eq!(a00.notes.get(&NoteKind::CodeAlso).unwrap(), &vec!["any associated condition".to_string()]);
        assert!(!a00.notes.contains_key(&NoteKind::Notes));
    }

    #[test]
    fn test_extension_block() {
        let out = tabular(
            r#"<chapter><diag><name>S72</name><desc>Fracture of femur</desc>
                <sevenChrNote><note>The appropriate 7th character is to be added to each code</note></sevenChrNote>
                <sevenChrDef>
                  <extension char="A">initial encounter for closed fracture</extension>
                  <extension char="D">subsequent encounter</extension>
                </sevenChrDef>
              </diag></chapter>"#,
        );
        let ext = out.categories.get("S72").unwrap().extension.clone().unwrap();
        assert_eq!(ext.default.as_deref(), Some("initial encounter for closed fracture"));
        assert_eq!(
            ext.notes,
            vec![
                "The appropriate 7th character is to be added to each code",
                "A initial encounter for closed fracture",
                "D subsequent encounter",
            ]
        );
    }

    #[test]
    fn test_project_three_char_codes() {
        let out = tabular(
            "<chapter><diag><name>B01</name><desc>Varicella</desc><diag><name>B01.9</name><desc>Varicella without complication</desc></diag></diag><diag><name>A00</name><desc>Cholera</desc></diag></chapter>",
        );
        let projected = project_categories(&out.categories, "Tabular");
        assert_eq!(projected.len(), 2);
        assert_eq!(projected[0].code, "A00");
        assert_eq!(projected[1].description, "Varicella");
        assert!(projected.iter().all(|e| e.level == 1 && e.source_name == "Tabular"));
        assert_eq!(out.categories.get("B01.9").unwrap().level, 3);
    }
}

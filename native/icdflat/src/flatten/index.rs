//! Term Index Builder
//!
//! Flattens `mainTerm`/`term` hierarchies (alphabetic index, external cause
//! index, PCS index) and the column tables (neoplasm, drug) into
//! `IndexEntry` records. Description and code are inherited down the tree;
//! references are read from each node's direct children only.

use super::model::{IndexEntry, IndexKind, ReferenceAnnotation};
use super::tag::{classified_children, TagKind};
use super::text::{format_description, normalize_space, split_reference};
use crate::dom::{DocumentAccess, NodeId};
use std::collections::{BTreeMap, HashMap};

/// Placeholder a table cell uses for "no code in this column"
const EMPTY_CELL: &str = "--";

/// How one index document should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSource<'a> {
    pub name: &'a str,
    pub kind: IndexKind,
    /// Column table (cells keyed by `col`) instead of a plain index
    pub table: bool,
}

impl<'a> IndexSource<'a> {
    pub fn plain(name: &'a str, kind: IndexKind) -> Self {
        IndexSource { name, kind, table: false }
    }

    pub fn table(name: &'a str, kind: IndexKind) -> Self {
        IndexSource { name, kind, table: true }
    }
}

/// Flatten every `mainTerm` of `doc`, in document order, at level 1
pub fn build_index<D: DocumentAccess + ?Sized>(doc: &D, source: IndexSource<'_>) -> Vec<IndexEntry> {
    let Some(root) = doc.root_element_id() else {
        return Vec::new();
    };

    let mut builder = IndexBuilder::new(doc, source);
    if source.table {
        builder.columns = column_headers(doc, root);
    }

    let main_terms = if doc.node_name(root) == Some("mainTerm") {
        vec![root]
    } else {
        doc.descendants_by_tag(root, "mainTerm")
    };
    for term in main_terms {
        builder.traverse(term, 1, "", "");
    }
    builder.into_entries()
}

/// Column labels from the first `indexHeading`: `col` -> head text with
/// whitespace and parentheses removed (`Malignant Primary` -> `MalignantPrimary`)
pub fn column_headers<D: DocumentAccess + ?Sized>(doc: &D, root: NodeId) -> HashMap<String, String> {
    let heading = if doc.node_name(root) == Some("indexHeading") {
        Some(root)
    } else {
        doc.descendants_by_tag(root, "indexHeading").into_iter().next()
    };
    let Some(heading) = heading else {
        return HashMap::new();
    };

    doc.descendants_by_tag(heading, "head")
        .into_iter()
        .filter_map(|head| {
            let col = doc.get_attribute(head, "col")?.trim().to_string();
            let label: String = doc
                .string_value(head)
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
                .collect();
            Some((col, label))
        })
        .collect()
}

pub struct IndexBuilder<'d, D: DocumentAccess + ?Sized> {
    doc: &'d D,
    source: IndexSource<'d>,
    columns: HashMap<String, String>,
    entries: Vec<IndexEntry>,
}

/// What a node declares through its direct children
#[derive(Default)]
struct NodeFacts {
    title: Option<NodeId>,
    code: Option<String>,
    see: Option<String>,
    see_also: Option<String>,
    use_: Option<String>,
    /// Reference codes keyed by the output field they belong to
    reference_codes: BTreeMap<String, String>,
    cells: Vec<(String, String)>,
    terms: Vec<NodeId>,
}

impl NodeFacts {
    fn has_reference(&self) -> bool {
        self.see.is_some() || self.see_also.is_some() || self.use_.is_some()
    }
}

/// Fill an empty reference slot, recording its code under `field`
fn record_reference(
    slot: &mut Option<String>,
    codes: &mut BTreeMap<String, String>,
    field: &str,
    annotation: ReferenceAnnotation,
) {
    if let Some((rendered, code)) = annotation.rendered() {
        *slot = Some(rendered);
        if let Some(code) = code {
            codes.insert(field.to_string(), code);
        }
    }
}

impl<'d, D: DocumentAccess + ?Sized> IndexBuilder<'d, D> {
    pub fn new(doc: &'d D, source: IndexSource<'d>) -> Self {
        IndexBuilder { doc, source, columns: HashMap::new(), entries: Vec::new() }
    }

    pub fn into_entries(self) -> Vec<IndexEntry> {
        self.entries
    }

    /// Visit `node` with the context inherited from its ancestors
    pub fn traverse(&mut self, node: NodeId, level: u32, parent_description: &str, parent_code: &str) {
        let facts = self.collect(node);

        let local = facts.title.map(|t| format_description(self.doc, t)).unwrap_or_default();
        let description = join_description(parent_description, &local);
        let code = facts.code.clone().unwrap_or_else(|| parent_code.to_string());

        if !description.is_empty() {
            self.emit(&facts, level, &description, &code);
        }

        for &child in &facts.terms {
            self.traverse(child, level + 1, &description, &code);
        }
    }

    fn collect(&self, node: NodeId) -> NodeFacts {
        let doc = self.doc;
        let mut facts = NodeFacts::default();
        let mut codes: [Option<String>; 3] = [None, None, None];

        for (kind, child) in classified_children(doc, node) {
            match kind {
                TagKind::Title => {
                    facts.title.get_or_insert(child);
                }
                TagKind::Code | TagKind::Codes | TagKind::Tab => {
                    let slot = match kind {
                        TagKind::Code => 0,
                        TagKind::Codes => 1,
                        _ => 2,
                    };
                    if codes[slot].is_none() {
                        let text = normalize_space(&doc.string_value(child));
                        if !text.is_empty() {
                            codes[slot] = Some(text);
                        }
                    }
                }
                TagKind::See if facts.see.is_none() => {
                    record_reference(&mut facts.see, &mut facts.reference_codes, "see", split_reference(doc, child));
                }
                TagKind::SeeAlso if facts.see_also.is_none() => {
                    let annotation = split_reference(doc, child);
                    record_reference(&mut facts.see_also, &mut facts.reference_codes, "seeAlso", annotation);
                }
                TagKind::Use if facts.use_.is_none() => {
                    record_reference(&mut facts.use_, &mut facts.reference_codes, "use", split_reference(doc, child));
                }
                TagKind::Cell if self.source.table => {
                    if let Some(cell) = self.read_cell(child) {
                        facts.cells.push(cell);
                    }
                }
                TagKind::Term => facts.terms.push(child),
                _ => {}
            }
        }

        facts.code = codes.into_iter().flatten().next();
        facts
    }

    /// `(column label, code)` of a cell; cells without a `col` are not columns
    fn read_cell(&self, cell: NodeId) -> Option<(String, String)> {
        let col = self.doc.get_attribute(cell, "col")?.trim();
        let label = self.columns.get(col).cloned().unwrap_or_else(|| col.to_string());
        let mut code = normalize_space(&self.doc.string_value(cell));
        if code == EMPTY_CELL {
            code.clear();
        }
        Some((label, code))
    }

    fn emit(&mut self, facts: &NodeFacts, level: u32, description: &str, code: &str) {
        let top = level == 1;

        if self.source.table {
            if !facts.cells.is_empty() {
                for (label, cell_code) in &facts.cells {
                    let columns = BTreeMap::from([(label.clone(), cell_code.clone())]);
                    self.push(facts, level, description, cell_code, Some(columns));
                }
            } else if top || !code.is_empty() || facts.has_reference() {
                self.push(facts, level, description, code, None);
            }
            return;
        }

        let codable = !code.is_empty() || facts.has_reference();
        let emit = if top { codable && facts.terms.is_empty() } else { codable };
        if emit {
            self.push(facts, level, description, code, None);
        }
    }

    fn push(
        &mut self,
        facts: &NodeFacts,
        level: u32,
        description: &str,
        code: &str,
        special_columns: Option<BTreeMap<String, String>>,
    ) {
        self.entries.push(IndexEntry {
            description: description.to_string(),
            code: code.to_string(),
            level,
            index_kind: self.source.kind,
            source_name: self.source.name.to_string(),
            see: facts.see.clone(),
            see_also: facts.see_also.clone(),
            use_: facts.use_.clone(),
            special_columns,
            reference_codes: (!facts.reference_codes.is_empty()).then(|| facts.reference_codes.clone()),
        });
    }
}

/// `parent, local`, without dangling separators when either side is empty
pub fn join_description(parent: &str, local: &str) -> String {
    match (parent.is_empty(), local.is_empty()) {
        (_, true) => parent.to_string(),
        (true, false) => local.to_string(),
        (false, false) => format!("{parent}, {local}"),
    }
}

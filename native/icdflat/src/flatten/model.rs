//! Flat output records
//!
//! Field presence is part of the output contract: optional fields are
//! omitted rather than written as null, `code` is always written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Diagnosis-oriented (ICD-10-CM)
    Primary,
    /// Procedure-oriented (ICD-10-PCS)
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub description: String,
    /// Empty means no code of its own (reference-only or column row)
    pub code: String,
    pub level: u32,
    pub index_kind: IndexKind,
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub see: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub see_also: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_columns: Option<BTreeMap<String, String>>,
    /// Machine code of each reference that carried one, keyed `see`/`seeAlso`/`use`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_codes: Option<BTreeMap<String, String>>,
}

/// Code and narrative pulled apart from one `see`/`seeAlso`/`use` node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceAnnotation {
    pub code: String,
    pub text: String,
}

impl ReferenceAnnotation {
    /// Display string and code. The string is the narrative when there is
    /// any, else the bare code; None when both are empty.
    pub fn rendered(self) -> Option<(String, Option<String>)> {
        let code = Some(self.code).filter(|c| !c.is_empty());
        if !self.text.is_empty() {
            return Some((self.text, code));
        }
        code.map(|c| (c.clone(), Some(c)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    Includes,
    Excludes1,
    Excludes2,
    CodeFirst,
    UseAdditionalCode,
    CodeAlso,
    Notes,
}

impl NoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteKind::Includes => "Includes",
            NoteKind::Excludes1 => "Excludes1",
            NoteKind::Excludes2 => "Excludes2",
            NoteKind::CodeFirst => "CodeFirst",
            NoteKind::UseAdditionalCode => "UseAdditionalCode",
            NoteKind::CodeAlso => "CodeAlso",
            NoteKind::Notes => "Notes",
        }
    }
}

/// Seventh-character extension block of a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub default: Option<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub code: String,
    pub term: String,
    pub level: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<NoteKind, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<Extension>,
}

/// Code-keyed category records; the first entry stored for a code is kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryMap {
    entries: BTreeMap<String, CategoryEntry>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    #[cfg(test)]
    pub fn get(&self, code: &str) -> Option<&CategoryEntry> {
        self.entries.get(code)
    }

    /// Store `entry` unless its code is taken. Returns whether it was stored.
    pub fn insert(&mut self, entry: CategoryEntry) -> bool {
        if self.entries.contains_key(&entry.code) {
            return false;
        }
        self.entries.insert(entry.code.clone(), entry);
        true
    }

    /// Fold `other` in, keeping existing entries. Returns the entries that
    /// were taken from `other`; codes already present are left out.
    pub fn merge(&mut self, other: CategoryMap) -> CategoryMap {
        let mut added = CategoryMap::new();
        for entry in other.entries.into_values() {
            if !self.contains(&entry.code) {
                added.insert(entry.clone());
                self.insert(entry);
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in code order
    pub fn values(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.entries.values()
    }
}

/// Everything one run produces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatOutput {
    pub primary: Vec<IndexEntry>,
    pub secondary: Vec<IndexEntry>,
    pub categories: CategoryMap,
}

impl FlatOutput {
    /// Route entries to the list matching their kind, preserving order
    pub fn extend_index(&mut self, entries: impl IntoIterator<Item = IndexEntry>) {
        for entry in entries {
            match entry.index_kind {
                IndexKind::Primary => self.primary.push(entry),
                IndexKind::Secondary => self.secondary.push(entry),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(code: &str, term: &str) -> CategoryEntry {
        CategoryEntry { code: code.to_string(), term: term.to_string(), level: 1, notes: BTreeMap::new(), extension: None }
    }

    fn entry(code: &str) -> IndexEntry {
        IndexEntry {
            description: "Appendicitis, acute".to_string(),
            code: code.to_string(),
            level: 2,
            index_kind: IndexKind::Primary,
            source_name: "Index".to_string(),
            see: None,
            see_also: None,
            use_: None,
            special_columns: None,
            reference_codes: None,
        }
    }

    fn reference(code: &str, text: &str) -> ReferenceAnnotation {
        ReferenceAnnotation { code: code.to_string(), text: text.to_string() }
    }

    #[test]
    fn test_rendered_reference_keeps_code() {
        assert_eq!(
            reference("T82.7", "Leak, device").rendered(),
            Some(("Leak, device".to_string(), Some("T82.7".to_string())))
        );
        assert_eq!(reference("0JB8", "").rendered(), Some(("0JB8".to_string(), Some("0JB8".to_string()))));
        assert_eq!(reference("", "Ataxia").rendered(), Some(("Ataxia".to_string(), None)));
        assert_eq!(reference("", "").rendered(), None);
    }

    #[test]
    fn test_first_write_wins() {
        let mut map = CategoryMap::new();
        assert!(map.insert(category("E10", "Type 1 diabetes mellitus")));
        assert!(!map.insert(category("E10", "replacement")));
        assert_eq!(map.get("E10").unwrap().term, "Type 1 diabetes mellitus");
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut first = CategoryMap::new();
        first.insert(category("A00", "Cholera"));
        let mut second = CategoryMap::new();
        second.insert(category("A00", "other"));
        second.insert(category("A01", "Typhoid"));

        let added = first.merge(second);
        assert_eq!(added.len(), 1);
        assert_eq!(added.get("A01").unwrap().term, "Typhoid");
        assert!(!added.contains("A00"));
        assert_eq!(first.len(), 2);
        assert_eq!(first.get("A00").unwrap().term, "Cholera");
    }

    #[test]
    fn test_index_entry_json_omits_absent() {
        let json = serde_json::to_value(entry("")).unwrap();
        assert_eq!(json["code"], "");
        assert_eq!(json["indexKind"], "primary");
        assert_eq!(json["sourceName"], "Index");
        assert!(json.get("see").is_none());
        assert!(json.get("specialColumns").is_none());
        assert!(json.get("referenceCodes").is_none());
    }

    #[test]
    fn test_index_entry_json_use_and_columns() {
        let mut e = entry("");
        e.use_ = Some("Excision".to_string());
        e.special_columns = Some(BTreeMap::from([("Uncertain".to_string(), String::new())]));
        let json = serde_json::to_value(e).unwrap();
        assert_eq!(json["use"], "Excision");
        assert_eq!(json["specialColumns"]["Uncertain"], "");
    }

    #[test]
    fn test_category_json() {
        let mut c = category("S72", "Fracture of femur");
        c.notes.insert(NoteKind::Excludes2, vec!["a".to_string(), "b".to_string()]);
        c.extension = Some(Extension { default: None, notes: vec!["A initial encounter".to_string()] });
        let mut map = CategoryMap::new();
        map.insert(c);
        map.insert(category("A00", "Cholera"));

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["S72"]["notes"]["Excludes2"][1], "b");
        assert!(json["S72"]["extension"]["default"].is_null());
        assert!(json["A00"].get("notes").is_none());
        assert!(json["A00"].get("extension").is_none());
    }

    #[test]
    fn test_extend_index_routes_by_kind() {
        let mut out = FlatOutput::default();
        let mut pcs = entry("0DB");
        pcs.index_kind = IndexKind::Secondary;
        out.extend_index(vec![entry("K35.80"), pcs, entry("K36")]);
        assert_eq!(out.primary.len(), 2);
        assert_eq!(out.secondary[0].code, "0DB");
    }
}

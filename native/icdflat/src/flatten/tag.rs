//! Closed set of element kinds the flatteners care about
//!
//! Resolved once per node; everything else is `Other` and ignored.

use crate::dom::{DocumentAccess, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    // Index documents
    Letter,
    MainTerm,
    Term,
    Title,
    Nemod,
    Code,
    Codes,
    Tab,
    Cell,
    See,
    SeeAlso,
    Use,
    IndexHeading,
    Head,
    // Tabular documents
    Chapter,
    Section,
    Diag,
    Name,
    Desc,
    Note,
    Includes,
    InclusionTerm,
    Excludes1,
    Excludes2,
    CodeFirst,
    UseAdditionalCode,
    CodeAlso,
    Notes,
    SevenChrNote,
    SevenChrDef,
    Extension,
    Other,
}

impl TagKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "letter" => TagKind::Letter,
            "mainTerm" => TagKind::MainTerm,
            "term" => TagKind::Term,
            "title" => TagKind::Title,
            "nemod" => TagKind::Nemod,
            "code" => TagKind::Code,
            "codes" => TagKind::Codes,
            "tab" => TagKind::Tab,
            "cell" => TagKind::Cell,
            "see" => TagKind::See,
            "seeAlso" => TagKind::SeeAlso,
            "use" => TagKind::Use,
            "indexHeading" => TagKind::IndexHeading,
            "head" => TagKind::Head,
            "chapter" => TagKind::Chapter,
            "section" => TagKind::Section,
            "diag" => TagKind::Diag,
            "name" => TagKind::Name,
            "desc" => TagKind::Desc,
            "note" => TagKind::Note,
            "includes" => TagKind::Includes,
            "inclusionTerm" => TagKind::InclusionTerm,
            "excludes1" => TagKind::Excludes1,
            "excludes2" => TagKind::Excludes2,
            "codeFirst" => TagKind::CodeFirst,
            "useAdditionalCode" => TagKind::UseAdditionalCode,
            "codeAlso" => TagKind::CodeAlso,
            "notes" => TagKind::Notes,
            "sevenChrNote" => TagKind::SevenChrNote,
            "sevenChrDef" => TagKind::SevenChrDef,
            "extension" => TagKind::Extension,
            _ => TagKind::Other,
        }
    }

    /// Kind of `id`; text and other non-element nodes are `Other`
    pub fn of<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> Self {
        doc.node_name(id).map_or(TagKind::Other, Self::from_name)
    }

    /// Elements that carry a machine code inside a term or reference
    pub fn is_code_carrier(self) -> bool {
        matches!(self, TagKind::Code | TagKind::Codes | TagKind::Tab)
    }
}

/// Direct element children paired with their kinds, document order
pub fn classified_children<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> Vec<(TagKind, NodeId)> {
    doc.children_vec(id)
        .into_iter()
        .filter(|&c| doc.is_element(c))
        .map(|c| (TagKind::of(doc, c), c))
        .collect()
}

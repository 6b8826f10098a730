//! Display text and reference splitting
//!
//! Titles in the index carry their modifier as a child element
//! (`<title>Diabetes<nemod>(in children)</nemod></title>`); references embed
//! their target code as a child element inside narrative
//! (`<see>Leak <codes>T82.7</codes></see>`). Both are resolved structurally.

use super::model::ReferenceAnnotation;
use super::tag::TagKind;
use crate::dom::{DocumentAccess, Fragment, NodeId};

/// Collapse whitespace runs to a single space and trim the ends
pub fn normalize_space(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Render a `title` node: primary text, then the inline modifier as a
/// trailing parenthetical.
pub fn format_description<D: DocumentAccess + ?Sized>(doc: &D, title: NodeId) -> String {
    let raw = doc.string_value(title);
    let modifier = doc
        .first_child_by_tag(title, "nemod")
        .map(|m| doc.string_value(m))
        .filter(|m| !m.trim().is_empty());

    let Some(modifier) = modifier else {
        let text = normalize_space(&raw);
        return balance_parens(text);
    };

    let base = match raw.find(modifier.as_str()) {
        Some(pos) => {
            let mut stripped = String::with_capacity(raw.len());
            stripped.push_str(&raw[..pos]);
            stripped.push_str(&raw[pos + modifier.len()..]);
            normalize_space(&stripped)
        }
        None => normalize_space(&raw),
    };

    let modifier = normalize_space(&modifier);
    let modifier = if modifier.starts_with('(') { modifier } else { format!("({modifier})") };

    if base.is_empty() {
        modifier
    } else {
        format!("{base} {modifier}")
    }
}

/// Close a parenthesis the source left open
fn balance_parens(mut text: String) -> String {
    let open = text.matches('(').count();
    let close = text.matches(')').count();
    if open > close {
        text.push(')');
    }
    text
}

/// Split a reference node into its embedded code and its narrative.
///
/// Works on a detached copy: the first code element is read, removed from
/// the copy, and only then is the remaining text read. Narrative that
/// happens to look like a code is never touched.
pub fn split_reference<D: DocumentAccess + ?Sized>(doc: &D, node: NodeId) -> ReferenceAnnotation {
    let mut fragment = Fragment::copy_of(doc, node);
    let code = fragment
        .take_first(|name| TagKind::from_name(name).is_code_carrier())
        .map(|taken| normalize_space(&taken.text_content()))
        .unwrap_or_default();
    let text = normalize_space(&fragment.text_content());
    ReferenceAnnotation { code, text }
}

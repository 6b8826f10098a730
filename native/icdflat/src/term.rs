//! Elixir Term Conversion
//!
//! Index entries and categories become maps with atom keys. Absent optional
//! fields are left out of the map, mirroring the JSON output.

use crate::batch::RunSummary;
use crate::flatten::{CategoryEntry, CategoryMap, Extension, IndexEntry, IndexKind};
use rustler::{Encoder, Env, NifResult, Term};
use std::collections::BTreeMap;

// Pre-defined atoms, created once per load
rustler::atoms! {
    ok,
    error,
    description,
    code,
    level,
    index_kind,
    source_name,
    see,
    see_also,
    use_ = "use",
    special_columns,
    reference_codes,
    term,
    notes,
    extension,
    default,
    primary,
    secondary,
}

fn index_kind_atom(kind: IndexKind) -> rustler::Atom {
    match kind {
        IndexKind::Primary => primary(),
        IndexKind::Secondary => secondary(),
    }
}

fn string_map_to_term<'a, V: Encoder>(env: Env<'a>, map: &BTreeMap<String, V>) -> NifResult<Term<'a>> {
    let pairs: Vec<(Term<'a>, Term<'a>)> = map.iter().map(|(k, v)| (k.encode(env), v.encode(env))).collect();
    Term::map_from_pairs(env, &pairs)
}

/// `%{description: ..., code: ..., level: ..., index_kind: :primary, ...}`
pub fn index_entry_to_term<'a>(env: Env<'a>, entry: &IndexEntry) -> NifResult<Term<'a>> {
    let mut pairs: Vec<(Term<'a>, Term<'a>)> = vec![
        (description().encode(env), entry.description.encode(env)),
        (code().encode(env), entry.code.encode(env)),
        (level().encode(env), entry.level.encode(env)),
        (index_kind().encode(env), index_kind_atom(entry.index_kind).encode(env)),
        (source_name().encode(env), entry.source_name.encode(env)),
    ];
    if let Some(value) = &entry.see {
        pairs.push((see().encode(env), value.encode(env)));
    }
    if let Some(value) = &entry.see_also {
        pairs.push((see_also().encode(env), value.encode(env)));
    }
    if let Some(value) = &entry.use_ {
        pairs.push((use_().encode(env), value.encode(env)));
    }
    if let Some(columns) = &entry.special_columns {
        pairs.push((special_columns().encode(env), string_map_to_term(env, columns)?));
    }
    if let Some(codes) = &entry.reference_codes {
        pairs.push((reference_codes().encode(env), string_map_to_term(env, codes)?));
    }
    Term::map_from_pairs(env, &pairs)
}

pub fn index_entries_to_term<'a>(env: Env<'a>, entries: &[IndexEntry]) -> NifResult<Term<'a>> {
    // Build in reverse so prepend keeps document order
    let mut list = Term::list_new_empty(env);
    for entry in entries.iter().rev() {
        list = list.list_prepend(index_entry_to_term(env, entry)?);
    }
    Ok(list)
}

fn extension_to_term<'a>(env: Env<'a>, ext: &Extension) -> NifResult<Term<'a>> {
    let pairs = [
        (default().encode(env), ext.default.encode(env)),
        (notes().encode(env), ext.notes.encode(env)),
    ];
    Term::map_from_pairs(env, &pairs)
}

pub fn category_to_term<'a>(env: Env<'a>, category: &CategoryEntry) -> NifResult<Term<'a>> {
    let mut pairs: Vec<(Term<'a>, Term<'a>)> = vec![
        (code().encode(env), category.code.encode(env)),
        (term().encode(env), category.term.encode(env)),
        (level().encode(env), category.level.encode(env)),
    ];
    if !category.notes.is_empty() {
        let note_pairs: Vec<(Term<'a>, Term<'a>)> = category
            .notes
            .iter()
            .map(|(kind, texts)| (kind.as_str().encode(env), texts.encode(env)))
            .collect();
        pairs.push((notes().encode(env), Term::map_from_pairs(env, &note_pairs)?));
    }
    if let Some(ext) = &category.extension {
        pairs.push((extension().encode(env), extension_to_term(env, ext)?));
    }
    Term::map_from_pairs(env, &pairs)
}

/// `%{"A00" => %{code: "A00", ...}, ...}`
pub fn categories_to_term<'a>(env: Env<'a>, categories: &CategoryMap) -> NifResult<Term<'a>> {
    let mut pairs = Vec::with_capacity(categories.len());
    for category in categories.values() {
        pairs.push((category.code.encode(env), category_to_term(env, category)?));
    }
    Term::map_from_pairs(env, &pairs)
}

/// `{primary_count, secondary_count, category_count}`
pub fn summary_to_term<'a>(env: Env<'a>, summary: &RunSummary) -> Term<'a> {
    (summary.primary, summary.secondary, summary.categories).encode(env)
}

/// `{:error, reason}` with a binary reason
pub fn error_to_term<'a>(env: Env<'a>, reason: impl std::fmt::Display) -> Term<'a> {
    (error(), reason.to_string()).encode(env)
}

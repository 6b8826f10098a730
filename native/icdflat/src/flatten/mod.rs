//! Hierarchy flattening
//!
//! Turns parsed index and tabular documents into flat records:
//! - `index`: term hierarchies and column tables -> `IndexEntry`
//! - `tabular`: category trees -> `CategoryMap`, plus 3-char projection
//! - `text`: title rendering and reference splitting shared by both
//! - `tag`: element kinds resolved once per node

pub mod index;
pub mod model;
pub mod tabular;
pub mod tag;
pub mod text;

pub use index::{build_index, IndexSource};
pub use model::{CategoryEntry, CategoryMap, Extension, FlatOutput, IndexEntry, IndexKind};
pub use tabular::{build_tabular, project_categories};

//! String interning pool
//!
//! Element and attribute names repeat millions of times across an index
//! file (`term`, `title`, `code`, `cell`), so names and short text values are
//! stored once and referenced by id. Id 0 is reserved for the empty string.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

#[derive(Debug, Default)]
pub struct StringPool {
    /// (offset, len) into `data` for each id
    entries: Vec<(u32, u32)>,
    data: String,
    /// Content hash -> ids with that hash (collisions are rare but handled)
    hash_index: HashMap<u64, Vec<u32>>,
}

impl StringPool {
    pub fn new() -> Self {
        StringPool {
            entries: vec![(0, 0)],
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
        }
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern `s`, returning the id of an existing copy when there is one
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == Some(s) {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);
        let id = self.entries.len() as u32;
        self.entries.push((offset, s.len() as u32));
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        let &(offset, len) = self.entries.get(id as usize)?;
        let start = offset as usize;
        self.data.get(start..start + len as usize)
    }

    /// Number of distinct strings, the reserved empty entry included
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

//! Text interning for repeated short strings.
//!
//! Table names, header names, identifier values and composite keys repeat
//! many thousands of times across a schedule export. Interning hands out a
//! shared `Arc<str>` for each distinct value.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

static INTERN: Lazy<DashMap<Arc<str>, ()>> = Lazy::new(DashMap::new);

/// Return the shared copy of `value`, inserting it on first sight
pub fn intern(value: &str) -> Arc<str> {
    if let Some(existing) = INTERN.get(value) {
        return existing.key().clone();
    }
    INTERN
        .entry(Arc::from(value))
        .or_insert(())
        .key()
        .clone()
}

/// Intern `value` only when it is at most `max_len` bytes long
pub fn intern_bounded(value: &str, max_len: usize) -> Arc<str> {
    if value.len() <= max_len {
        intern(value)
    } else {
        Arc::from(value)
    }
}

/// Composite join key: `<origin file>.<raw id>`.
///
/// The same raw id from one file always yields the same key, while the same
/// raw id from two different files yields two distinct keys. A blank id has
/// no identity and yields an empty key.
pub fn composite_key(file_name: &str, raw_id: &str) -> Arc<str> {
    let raw_id = raw_id.trim();
    if raw_id.is_empty() {
        return intern("");
    }
    let mut key = String::with_capacity(file_name.len() + raw_id.len() + 1);
    key.push_str(file_name);
    key.push('.');
    key.push_str(raw_id);
    intern(&key)
}

/// Number of distinct interned strings
pub fn len() -> usize {
    INTERN.len()
}

/// Drop every interned string
pub fn clear() {
    INTERN.clear();
}

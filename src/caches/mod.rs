//! Process-wide caches shared by the parser and the transformer.
//!
//! Both caches are safe for concurrent read and insert. They fill up during
//! a processing run and must be cleared between independent runs to bound
//! memory; values already handed out stay valid after a clear.

pub mod date_cache;
pub mod intern;

use tracing::debug;

/// Clear the intern cache and the date cache
pub fn clear_all() {
    debug!(
        "Clearing caches: {} interned strings, {} dates",
        intern::len(),
        date_cache::len()
    );
    intern::clear();
    date_cache::clear();
}

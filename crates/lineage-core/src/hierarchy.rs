//! # Domain Hierarchy Walker
//!
//! Dotted names form a tree rooted at their rightmost label:
//!
//! ```text
//!   ua.org.com ──► org.com ──► com
//! ```
//!
//! Ancestors are produced by stripping the leftmost label (up to and
//! including the next `.`) until nothing is left. The name itself is never
//! one of its own ancestors.

/// Label separator
pub const SEPARATOR: char = '.';

/// Iterator over the strictly shorter ancestors of a name, nearest first
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.rest.find(SEPARATOR)?;
        self.rest = &self.rest[idx + SEPARATOR.len_utf8()..];
        if self.rest.is_empty() {
            None
        } else {
            Some(self.rest)
        }
    }
}

/// Ancestors of `name`, nearest first
pub fn ancestors(name: &str) -> Ancestors<'_> {
    Ancestors { rest: name }
}

/// Nearest ancestor of `name` for which `is_registered` holds
///
/// Stops at the first hit, so only the closest registered ancestor is ever
/// returned even when several are registered further up the chain.
pub fn nearest_registered_ancestor<'a, F>(name: &'a str, mut is_registered: F) -> Option<&'a str>
where
    F: FnMut(&str) -> bool,
{
    let found = ancestors(name).find(|candidate| is_registered(*candidate));
    tracing::debug!(name, ancestor = ?found, "hierarchy walk");
    found
}

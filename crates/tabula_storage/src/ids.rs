//! Identifier allocation for auto-assigned integer ids.

use tabula_foundation::{Error, Id, Result};

/// Hands out integer identifiers one greater than any seen so far.
///
/// The allocator is seeded from a folded branch and then advanced by every
/// explicit integer identifier in a pending create, so identifiers assigned
/// within one batch are strictly increasing and never collide with each
/// other or with existing records. String identifiers do not affect it.
///
/// Once `i64::MAX` has been observed or handed out, allocation fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdAllocator {
    next: Option<i64>,
}

impl IdAllocator {
    /// Creates an allocator that starts at 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: Some(0) }
    }

    /// Creates an allocator past every integer identifier in `ids`.
    #[must_use]
    pub fn seeded<'a>(ids: impl IntoIterator<Item = &'a Id>) -> Self {
        let mut allocator = Self::new();
        for id in ids {
            allocator.observe(id);
        }
        allocator
    }

    /// Records an identifier that is now taken.
    pub fn observe(&mut self, id: &Id) {
        if let (Some(n), Some(next)) = (id.as_int(), self.next) {
            if n >= next {
                self.next = n.checked_add(1);
            }
        }
    }

    /// Returns the identifier the next allocation will produce, if any.
    #[must_use]
    pub fn peek(&self) -> Option<Id> {
        self.next.map(Id::Int)
    }

    /// Allocates a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns an exhausted error once `i64::MAX` is taken.
    pub fn allocate(&mut self) -> Result<Id> {
        let next = self.next.ok_or_else(Error::ids_exhausted)?;
        self.next = next.checked_add(1);
        Ok(Id::Int(next))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

//! Unique-by-construction numeric IDs.
//!
//! Argument placeholders must never collide: a matcher nested inside another
//! matcher's clause body binds its own placeholders while the outer ones are
//! still live, and the lowered tree refers to both by name. Each placeholder
//! therefore takes a fresh [`Uid`] and derives its name from it.
//!
//! If a pair of [`Uid`] values are equal, then they are guaranteed to be
//! copies of each other: one was created by [`Uid::fresh`] and the other is a
//! copy of that original.

use std::{
    num::NonZeroU32,
    sync::atomic::{AtomicU32, Ordering},
};

static COUNTER: AtomicU32 = AtomicU32::new(1);

/// A unique-by-construction numeric identifier.
#[derive(Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Uid(NonZeroU32);

impl std::fmt::Debug for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "⟨{}⟩", self.0)
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Uid {
    /// Returns a new unique [`Uid`].
    pub fn fresh() -> Uid {
        let raw_id = COUNTER.fetch_add(1, Ordering::Relaxed);

        match NonZeroU32::new(raw_id) {
            Some(id) => Uid(id),
            // COUNTER starts at 1 and only wraps after 2^32 placeholders
            None => panic!("exhausted the Uid space"),
        }
    }
}

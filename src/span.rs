//! Source locations attached to patterns and expressions.
//!
//! The upstream parser hands us byte spans; the core never looks at source
//! text, it only threads spans through so diagnostics can point back at the
//! offending clause, pattern or expression.

use std::ops::{Deref, DerefMut};

/// A spanned sequence of spanned values of `T`.
pub type SpanSeq<T> = Box<[Spanned<T>]>;

/// A spanned boxed value of `T`.
pub type SpanBox<T> = Box<Spanned<T>>;

/// A value of `T` together with its [`Span`] in the source.
///
/// This type implements [`Deref`] and [`DerefMut`] for `Target = T`, and so
/// methods on `&T` and `&mut T` can be called transparently on `&Spanned<T>`
/// and `&mut Spanned<T>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        self.span.with(f(self.item))
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

impl<T> DerefMut for Spanned<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.item
    }
}

/// A half-open byte span in the source code.
///
/// The default span is the empty span at offset 0, used for synthesized
/// nodes that have no source of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: SpanIndex,
    pub end: SpanIndex,
}

/// The integer type used for span indices.
pub type SpanIndex = u32;

impl Span {
    pub const fn new(start: SpanIndex, end: SpanIndex) -> Self {
        Self { start, end }
    }

    /// Returns the length of the byte range represented by `self`.
    pub fn length(&self) -> SpanIndex {
        self.end - self.start
    }

    /// Returns the smallest span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Attaches `self` to `item`.
    pub fn with<T>(self, item: T) -> Spanned<T> {
        Spanned { item, span: self }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

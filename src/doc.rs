//! Pretty-printing with [`pretty`].

use std::sync::Arc;

use pretty::RcDoc;

use crate::symbol::{StringInterner, Symbol};

/// The line width used by [`render`].
pub const RENDER_WIDTH: usize = 80;

/// Types that can be rendered against a [`StringInterner`].
pub trait ToDoc {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()>;
}

impl ToDoc for Symbol {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()> {
        RcDoc::as_string(interner.display(*self))
    }
}

impl<T: ToDoc + ?Sized> ToDoc for Arc<T> {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()> {
        self.as_ref().to_doc(interner)
    }
}

impl<T: ToDoc + ?Sized> ToDoc for &T {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()> {
        (*self).to_doc(interner)
    }
}

/// Renders `item` at [`RENDER_WIDTH`].
pub fn render<T: ToDoc + ?Sized>(item: &T, interner: &StringInterner) -> String {
    format!("{}", item.to_doc(interner).pretty(RENDER_WIDTH))
}

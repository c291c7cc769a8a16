//! Recoverable compile-time problems.
//!
//! None of these abort compilation: each is pushed onto an error list in
//! order of discovery and the offending node is given a best-effort type, so
//! a fully formed tree is always produced.

use std::sync::Arc;

use pretty::RcDoc;

use crate::{
    doc::ToDoc,
    span::Span,
    symbol::{StringInterner, Symbol},
    ty::{Ty, Var},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    TypeMismatch {
        expected: Arc<Ty>,
        actual: Arc<Ty>,
        span: Span,
    },
    CircularType {
        ty: Arc<Ty>,
        var: Var,
        span: Span,
    },
    SymbolNotFound {
        symbol: Symbol,
        span: Span,
    },
    ArityMismatch {
        declared: usize,
        found: usize,
        span: Span,
    },
}

impl Diagnostic {
    pub fn span(&self) -> Span {
        match self {
            Diagnostic::TypeMismatch { span, .. }
            | Diagnostic::CircularType { span, .. }
            | Diagnostic::SymbolNotFound { span, .. }
            | Diagnostic::ArityMismatch { span, .. } => *span,
        }
    }
}

fn quoted(doc: RcDoc<'static, ()>) -> RcDoc<'static, ()> {
    RcDoc::text("`").append(doc).append(RcDoc::text("`"))
}

impl ToDoc for Diagnostic {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()> {
        let location = RcDoc::as_string(self.span()).append(RcDoc::text(": "));

        let message = match self {
            Diagnostic::TypeMismatch {
                expected, actual, ..
            } => RcDoc::text("type mismatch: expected")
                .append(RcDoc::space())
                .append(quoted(expected.to_doc(interner)))
                .append(RcDoc::text(", found"))
                .append(RcDoc::space())
                .append(quoted(actual.to_doc(interner))),
            Diagnostic::CircularType { ty, var, .. } => {
                RcDoc::text("circular type: ")
                    .append(quoted(var.name.to_doc(interner)))
                    .append(RcDoc::text(" occurs in "))
                    .append(quoted(ty.to_doc(interner)))
            }
            Diagnostic::SymbolNotFound { symbol, .. } => {
                RcDoc::text("cannot find ")
                    .append(quoted(symbol.to_doc(interner)))
                    .append(RcDoc::text(" in this scope"))
            }
            Diagnostic::ArityMismatch {
                declared, found, ..
            } => RcDoc::as_string(format!(
                "arity mismatch: expected {declared} patterns, found {found}"
            )),
        };

        location.append(message)
    }
}

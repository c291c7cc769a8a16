//! The lowered expression language.
//!
//! This is the only output of the crate: a tree of lets, conditionals, field
//! accesses, tag tests and calls that a backend can emit directly. It renders
//! as an S-expression.

use pretty::RcDoc;
use recursion::{Collapsible, CollapsibleExt, MappableFrame, PartiallyApplied};

use crate::{
    ast::Literal,
    doc::ToDoc,
    symbol::{StringInterner, Symbol},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A plain identifier.
    Symbol(Symbol),
    Builtin(Builtin),
    /// An expression of the form `(<callee> <args>)`.
    Call {
        callee: Box<Self>,
        args: Box<[Self]>,
    },
    If {
        condition: Box<Self>,
        consequence: Box<Self>,
        alternative: Box<Self>,
    },
    /// A single binding `(let [[<name> <value>]] <body>)`.
    Let {
        name: Symbol,
        value: Box<Self>,
        body: Box<Self>,
    },
    /// Projects `field` out of `value`. The `tag` is the constructor `value`
    /// has already been tested against, if any.
    Access {
        value: Box<Self>,
        field: Symbol,
        tag: Option<Symbol>,
    },
    /// Tests whether `value` was built with the constructor `tag`.
    IsTag { value: Box<Self>, tag: Symbol },
    Fault(Fault),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Structural equality.
    Eq,
    /// Short-circuiting conjunction.
    And,
}

impl Builtin {
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Eq => "equal?",
            Self::And => "and",
        }
    }
}

/// A runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// No clause of `matcher` matched its arguments.
    NonExhaustiveMatch { matcher: Symbol },
}

impl Expr {
    pub fn call(callee: Self, args: impl IntoIterator<Item = Self>) -> Self {
        Self::Call {
            callee: Box::new(callee),
            args: args.into_iter().collect(),
        }
    }

    pub fn builtin(builtin: Builtin, args: impl IntoIterator<Item = Self>) -> Self {
        Self::call(Self::Builtin(builtin), args)
    }

    /// Returns the number of fault nodes in `self`.
    pub fn fault_count(&self) -> usize {
        self.clone().collapse_frames(|frame| match frame {
            ExprFrame::Fault(_) => 1,
            ExprFrame::Call { callee, args } => callee + args.iter().sum::<usize>(),
            ExprFrame::If {
                condition,
                consequence,
                alternative,
            } => condition + consequence + alternative,
            ExprFrame::Let { value, body, .. } => value + body,
            ExprFrame::Access { value, .. } | ExprFrame::IsTag { value, .. } => {
                value
            }
            ExprFrame::Literal(_) | ExprFrame::Symbol(_) | ExprFrame::Builtin(_) => 0,
        })
    }
}

impl Collapsible for Expr {
    type FrameToken = ExprFrame<PartiallyApplied>;

    fn into_frame(self) -> <Self::FrameToken as MappableFrame>::Frame<Self> {
        match self {
            Expr::Literal(literal) => ExprFrame::Literal(literal),
            Expr::Symbol(symbol) => ExprFrame::Symbol(symbol),
            Expr::Builtin(builtin) => ExprFrame::Builtin(builtin),
            Expr::Call { callee, args } => ExprFrame::Call {
                callee: *callee,
                args,
            },
            Expr::If {
                condition,
                consequence,
                alternative,
            } => ExprFrame::If {
                condition: *condition,
                consequence: *consequence,
                alternative: *alternative,
            },
            Expr::Let { name, value, body } => ExprFrame::Let {
                name,
                value: *value,
                body: *body,
            },
            Expr::Access { value, field, tag } => ExprFrame::Access {
                value: *value,
                field,
                tag,
            },
            Expr::IsTag { value, tag } => ExprFrame::IsTag { value: *value, tag },
            Expr::Fault(fault) => ExprFrame::Fault(fault),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprFrame<A> {
    Literal(Literal),
    Symbol(Symbol),
    Builtin(Builtin),
    Call {
        callee: A,
        args: Box<[A]>,
    },
    If {
        condition: A,
        consequence: A,
        alternative: A,
    },
    Let {
        name: Symbol,
        value: A,
        body: A,
    },
    Access {
        value: A,
        field: Symbol,
        tag: Option<Symbol>,
    },
    IsTag {
        value: A,
        tag: Symbol,
    },
    Fault(Fault),
}

impl MappableFrame for ExprFrame<PartiallyApplied> {
    type Frame<X> = ExprFrame<X>;

    fn map_frame<A, B>(
        input: Self::Frame<A>,
        mut f: impl FnMut(A) -> B,
    ) -> Self::Frame<B> {
        match input {
            ExprFrame::Literal(literal) => ExprFrame::Literal(literal),
            ExprFrame::Symbol(symbol) => ExprFrame::Symbol(symbol),
            ExprFrame::Builtin(builtin) => ExprFrame::Builtin(builtin),
            ExprFrame::Call { callee, args } => ExprFrame::Call {
                callee: f(callee),
                args: args.into_iter().map(f).collect(),
            },
            ExprFrame::If {
                condition,
                consequence,
                alternative,
            } => ExprFrame::If {
                condition: f(condition),
                consequence: f(consequence),
                alternative: f(alternative),
            },
            ExprFrame::Let { name, value, body } => ExprFrame::Let {
                name,
                value: f(value),
                body: f(body),
            },
            ExprFrame::Access { value, field, tag } => ExprFrame::Access {
                value: f(value),
                field,
                tag,
            },
            ExprFrame::IsTag { value, tag } => ExprFrame::IsTag {
                value: f(value),
                tag,
            },
            ExprFrame::Fault(fault) => ExprFrame::Fault(fault),
        }
    }
}

impl ExprFrame<RcDoc<'static, ()>> {
    pub fn to_doc(self, interner: &StringInterner) -> RcDoc<'static, ()> {
        match self {
            ExprFrame::Literal(literal) => literal.to_doc(interner),
            ExprFrame::Symbol(symbol) => symbol.to_doc(interner),
            ExprFrame::Builtin(builtin) => RcDoc::text(builtin.identifier()),
            ExprFrame::Call { callee, args } => RcDoc::text("(")
                .append(
                    RcDoc::intersperse(
                        std::iter::once(callee).chain(args),
                        RcDoc::line(),
                    )
                    .nest(1)
                    .group(),
                )
                .append(RcDoc::text(")")),
            ExprFrame::If {
                condition,
                consequence,
                alternative,
            } => RcDoc::text("(if ")
                .append(condition)
                .append(
                    RcDoc::hardline()
                        .append(consequence)
                        .append(RcDoc::hardline())
                        .append(alternative)
                        .nest(2),
                )
                .append(RcDoc::text(")")),
            ExprFrame::Let { name, value, body } => RcDoc::text("(let [[")
                .append(name.to_doc(interner))
                .append(RcDoc::space())
                .append(value)
                .append(RcDoc::text("]]"))
                .append(RcDoc::hardline().append(body).nest(2))
                .append(RcDoc::text(")")),
            ExprFrame::Access { value, field, tag } => {
                let doc = RcDoc::text("(field ")
                    .append(value)
                    .append(RcDoc::space())
                    .append(field.to_doc(interner));

                match tag {
                    Some(tag) => doc
                        .append(RcDoc::text(" #:tag "))
                        .append(tag.to_doc(interner)),
                    None => doc,
                }
                .append(RcDoc::text(")"))
            }
            ExprFrame::IsTag { value, tag } => RcDoc::text("(tag? ")
                .append(value)
                .append(RcDoc::space())
                .append(tag.to_doc(interner))
                .append(RcDoc::text(")")),
            ExprFrame::Fault(Fault::NonExhaustiveMatch { matcher }) => {
                RcDoc::text("(fault non-exhaustive-match ")
                    .append(matcher.to_doc(interner))
                    .append(RcDoc::text(")"))
            }
        }
    }
}

impl ToDoc for Literal {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()> {
        match self {
            Literal::Unit => RcDoc::text("(void)"),
            Literal::Bool(true) => RcDoc::text("#t"),
            Literal::Bool(false) => RcDoc::text("#f"),
            Literal::Int(value) => RcDoc::as_string(value),
            Literal::Float(value) => RcDoc::as_string(format!("#i{value}")),
            Literal::Char(value) => RcDoc::as_string(format!("#\\{value}")),
            Literal::String(content) => RcDoc::text("\"")
                .append(content.to_doc(interner))
                .append(RcDoc::text("\"")),
        }
    }
}

impl ToDoc for Expr {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()> {
        self.clone().collapse_frames(|frame| frame.to_doc(interner))
    }
}

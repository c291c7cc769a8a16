//! Structural patterns and the matchers built from them.
//!
//! # Lifecycle
//! A [`PatternMatcher`] arrives from upstream with unbound patterns. It is
//! then
//! 1. arity-checked ([`PatternMatcher::check_arity`]);
//! 2. bound ([`PatternMatcher::bind`]), attaching to every pattern the
//!    runtime [`Value`] it will be matched against;
//! 3. type-checked (see [`crate::check`]), and finally;
//! 4. reduced into a single expression (see [`crate::lower`]).
//!
//! Binding and checking consume or clone their input and return new nodes;
//! reduction only borrows.

use std::sync::Arc;

use crate::{
    config::Config,
    diagnostic::Diagnostic,
    span::{Span, SpanSeq, Spanned},
    symbol::{StringInterner, Symbol},
    ty::{Substitution, Ty},
};

use super::{Argument, Expr, Literal, Value};

/// The state needed to bind patterns: positional fields are projected by
/// interned names derived from the [`Config`].
pub struct BindScope<'a> {
    pub interner: &'a mut StringInterner,
    pub config: &'a Config,
}

impl BindScope<'_> {
    /// Returns the field name used to project the `index`-th positional
    /// field of a tuple-like constructor.
    pub fn positional_field(&mut self, index: usize) -> Symbol {
        self.config.positional_field(self.interner, index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternMatch {
    /// Matches anything and binds it to `name`.
    Capture {
        name: Symbol,
        ty: Option<Arc<Ty>>,
        bound: Option<Value>,
    },
    /// Matches anything.
    Ignore,
    /// Matches values equal to a literal or to a named constant.
    Equal {
        value: EqualTo,
        bound: Option<Value>,
    },
    /// Matches a constructor by tag, then each named field.
    Struct {
        constr: Spanned<Symbol>,
        fields: Box<[FieldPattern]>,
        bound: Option<Value>,
    },
    /// Matches a constructor by tag, then each positional field.
    Tuple {
        constr: Spanned<Symbol>,
        fields: SpanSeq<Self>,
        bound: Option<Value>,
    },
    /// A sequence of patterns whose grouping has not been resolved yet.
    Unshuffled(SpanSeq<Self>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EqualTo {
    Literal(Literal),
    Name(Symbol),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPattern {
    pub name: Spanned<Symbol>,
    pub pattern: Spanned<PatternMatch>,
}

impl PatternMatch {
    pub fn capture(name: Symbol) -> Self {
        Self::Capture {
            name,
            ty: None,
            bound: None,
        }
    }

    pub fn equal(value: EqualTo) -> Self {
        Self::Equal { value, bound: None }
    }

    pub fn structure(
        constr: Spanned<Symbol>,
        fields: impl IntoIterator<Item = FieldPattern>,
    ) -> Self {
        Self::Struct {
            constr,
            fields: fields.into_iter().collect(),
            bound: None,
        }
    }

    pub fn tuple(
        constr: Spanned<Symbol>,
        fields: impl IntoIterator<Item = Spanned<Self>>,
    ) -> Self {
        Self::Tuple {
            constr,
            fields: fields.into_iter().collect(),
            bound: None,
        }
    }

    /// Returns the value `self` is bound to, if any. [`PatternMatch::Ignore`]
    /// never carries a value.
    pub fn bound_value(&self) -> Option<&Value> {
        match self {
            PatternMatch::Capture { bound, .. }
            | PatternMatch::Equal { bound, .. }
            | PatternMatch::Struct { bound, .. }
            | PatternMatch::Tuple { bound, .. } => bound.as_ref(),
            PatternMatch::Ignore | PatternMatch::Unshuffled(_) => None,
        }
    }

    /// Returns `true` if and only if `self` and all its subpatterns are bound.
    pub fn is_bound(&self) -> bool {
        match self {
            PatternMatch::Ignore => true,
            PatternMatch::Unshuffled(_) => false,
            PatternMatch::Capture { bound, .. }
            | PatternMatch::Equal { bound, .. } => bound.is_some(),
            PatternMatch::Struct { fields, bound, .. } => {
                bound.is_some()
                    && fields.iter().all(|field| field.pattern.is_bound())
            }
            PatternMatch::Tuple { fields, bound, .. } => {
                bound.is_some() && fields.iter().all(|field| field.is_bound())
            }
        }
    }

    /// Returns `true` if no [`PatternMatch::Unshuffled`] group remains
    /// anywhere in `self`.
    pub fn is_shuffled(&self) -> bool {
        match self {
            PatternMatch::Unshuffled(_) => false,
            PatternMatch::Struct { fields, .. } => {
                fields.iter().all(|field| field.pattern.is_shuffled())
            }
            PatternMatch::Tuple { fields, .. } => {
                fields.iter().all(|field| field.is_shuffled())
            }
            _ => true,
        }
    }

    /// Rewrites every [`PatternMatch::Unshuffled`] group with `resolve`,
    /// innermost groups first.
    pub fn resolve_unshuffled(
        self,
        resolve: &mut impl FnMut(SpanSeq<Self>) -> Self,
    ) -> Self {
        match self {
            PatternMatch::Unshuffled(group) => {
                let group = group
                    .into_iter()
                    .map(|elem| elem.map(|elem| elem.resolve_unshuffled(resolve)))
                    .collect();

                resolve(group)
            }
            PatternMatch::Struct {
                constr,
                fields,
                bound,
            } => PatternMatch::Struct {
                constr,
                fields: fields
                    .into_iter()
                    .map(|FieldPattern { name, pattern }| FieldPattern {
                        name,
                        pattern: pattern
                            .map(|pattern| pattern.resolve_unshuffled(resolve)),
                    })
                    .collect(),
                bound,
            },
            PatternMatch::Tuple {
                constr,
                fields,
                bound,
            } => PatternMatch::Tuple {
                constr,
                fields: fields
                    .into_iter()
                    .map(|field| {
                        field.map(|field| field.resolve_unshuffled(resolve))
                    })
                    .collect(),
                bound,
            },
            other => other,
        }
    }

    /// Attaches `value` to `self`. Constructor patterns tag `value` with
    /// their constructor and bind each field to a projection of it.
    ///
    /// # Panics
    /// Panics if `self` is already bound or is still unshuffled.
    pub fn bind(self, value: Value, scope: &mut BindScope<'_>) -> Self {
        match self {
            PatternMatch::Ignore => PatternMatch::Ignore,
            PatternMatch::Unshuffled(_) => {
                panic!("tried to bind an unshuffled pattern")
            }
            PatternMatch::Capture { bound: Some(_), .. }
            | PatternMatch::Equal { bound: Some(_), .. }
            | PatternMatch::Struct { bound: Some(_), .. }
            | PatternMatch::Tuple { bound: Some(_), .. } => {
                panic!("tried to bind a pattern twice")
            }

            PatternMatch::Capture { name, ty, .. } => PatternMatch::Capture {
                name,
                ty,
                bound: Some(value),
            },
            PatternMatch::Equal { value: expected, .. } => PatternMatch::Equal {
                value: expected,
                bound: Some(value),
            },
            PatternMatch::Struct { constr, fields, .. } => {
                let value = value.tagged(constr.item);
                let fields = fields
                    .into_iter()
                    .map(|FieldPattern { name, pattern }| {
                        let field_value = value.access(name.item);
                        FieldPattern {
                            name,
                            pattern: pattern
                                .map(|pattern| pattern.bind(field_value, scope)),
                        }
                    })
                    .collect();

                PatternMatch::Struct {
                    constr,
                    fields,
                    bound: Some(value),
                }
            }
            PatternMatch::Tuple { constr, fields, .. } => {
                let value = value.tagged(constr.item);
                let fields = fields
                    .into_iter()
                    .enumerate()
                    .map(|(index, field)| {
                        let name = scope.positional_field(index);
                        let field_value = value.access(name);
                        field.map(|field| field.bind(field_value, scope))
                    })
                    .collect();

                PatternMatch::Tuple {
                    constr,
                    fields,
                    bound: Some(value),
                }
            }
        }
    }
}

/// A single clause of a [`PatternMatcher`].
#[derive(Debug, Clone)]
pub struct PatternCase {
    pub matches: SpanSeq<PatternMatch>,
    pub body: Spanned<Expr>,
}

/// A multi-clause definition: clauses are tried top to bottom, and the first
/// clause whose patterns all match determines the result.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pub name: Spanned<Symbol>,
    pub arguments: Box<[Argument]>,
    pub return_ty: Arc<Ty>,
    pub cases: SpanSeq<PatternCase>,
}

impl PatternMatcher {
    pub fn new(
        name: Spanned<Symbol>,
        arguments: impl IntoIterator<Item = Argument>,
        return_ty: Arc<Ty>,
        cases: impl IntoIterator<Item = Spanned<PatternCase>>,
    ) -> Self {
        Self {
            name,
            arguments: arguments.into_iter().collect(),
            return_ty,
            cases: cases.into_iter().collect(),
        }
    }

    /// Creates a matcher with `arity` fresh argument placeholders, each with
    /// a fresh type, and a fresh return type.
    pub fn with_fresh_arguments(
        interner: &mut StringInterner,
        subst: &mut Substitution,
        name: Spanned<Symbol>,
        arity: usize,
        cases: impl IntoIterator<Item = Spanned<PatternCase>>,
    ) -> Self {
        let arguments: Vec<_> = (0..arity)
            .map(|_| {
                let ty = subst.fresh(interner);
                Argument::fresh(interner, ty)
            })
            .collect();
        let return_ty = subst.fresh(interner);

        Self::new(name, arguments, return_ty, cases)
    }

    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    /// Reports every case (of `self` and of the matchers nested in its
    /// bodies) whose arity differs from its matcher's.
    pub fn check_arity(&self, errors: &mut Vec<Diagnostic>) {
        let declared = self.arity();

        for case in self.cases.iter() {
            let found = case.matches.len();

            if found != declared {
                errors.push(Diagnostic::ArityMismatch {
                    declared,
                    found,
                    span: case.span,
                });
            }

            case.body
                .visit_matchers(&mut |matcher| matcher.check_arity(errors));
        }
    }

    /// Binds the patterns of every case to the argument placeholders.
    ///
    /// Cases with too few patterns are padded with [`PatternMatch::Ignore`]
    /// and surplus patterns are dropped, so every case is still emitted.
    pub fn bind(self, scope: &mut BindScope<'_>) -> Self {
        let Self {
            name,
            arguments,
            return_ty,
            cases,
        } = self;

        log::debug!(
            "binding matcher `{}` ({} cases)",
            scope.interner.display(name.item),
            cases.len()
        );

        let cases = cases
            .into_iter()
            .map(|case| {
                case.map(|PatternCase { matches, body }| {
                    let matches = fit_to_arity(matches, arguments.len(), body.span);

                    let matches = matches
                        .into_iter()
                        .zip(arguments.iter())
                        .map(|(pattern, argument)| {
                            let value = Value::argument(argument);
                            pattern.map(|pattern| pattern.bind(value, scope))
                        })
                        .collect();

                    let body = body.map(|body| body.bind_matchers(scope));
                    PatternCase { matches, body }
                })
            })
            .collect();

        Self {
            name,
            arguments,
            return_ty,
            cases,
        }
    }
}

/// Pads `matches` with [`PatternMatch::Ignore`] up to `arity`, or truncates
/// it down to `arity`.
fn fit_to_arity(
    matches: SpanSeq<PatternMatch>,
    arity: usize,
    body_span: Span,
) -> Vec<Spanned<PatternMatch>> {
    let mut matches = matches.into_vec();

    if matches.len() < arity {
        log::debug!(
            "padding case at {body_span} with {} ignored patterns",
            arity - matches.len()
        );

        let span = matches.last().map_or(body_span, |last| last.span);
        matches.resize_with(arity, || span.with(PatternMatch::Ignore));
    } else if matches.len() > arity {
        log::debug!(
            "dropping {} surplus patterns from case at {body_span}",
            matches.len() - arity
        );

        matches.truncate(arity);
    }

    matches
}

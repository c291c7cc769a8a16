//! Checking patterns, clauses and matchers.

use std::sync::Arc;

use crate::{
    ast::{
        EqualTo, FieldPattern, PatternCase, PatternMatch, PatternMatcher, Typed,
        Value, ValueKind,
    },
    diagnostic::Diagnostic,
    span::{Span, SpanSeq, Spanned},
    symbol::Symbol,
    ty::Ty,
};

use super::{Checker, ConstrDecl};

impl PatternMatch {
    /// Checks `self` against the type of its bound value, recording any
    /// captures in the innermost scope of `checker`.
    ///
    /// # Panics
    /// Panics if `self` is unbound or unshuffled.
    pub fn check_types(&self, span: Span, checker: &mut Checker<'_>) -> Typed<Self> {
        match self {
            PatternMatch::Ignore => checker.fresh().with(PatternMatch::Ignore),
            PatternMatch::Unshuffled(_) => {
                panic!("tried to check an unshuffled pattern")
            }

            PatternMatch::Capture { name, ty, bound } => {
                let value_ty = checker.type_of_value(expect_bound(bound));
                let declared = match ty {
                    Some(ty) => ty.clone(),
                    None => checker.fresh(),
                };

                let ty = checker.unify_at(&value_ty, &declared, span);
                checker.bind_local(*name, ty.clone());

                ty.with(PatternMatch::Capture {
                    name: *name,
                    ty: Some(ty.clone()),
                    bound: bound.clone(),
                })
            }

            PatternMatch::Equal { value, bound } => {
                let value_ty = checker.type_of_value(expect_bound(bound));
                let expected_ty = match value {
                    EqualTo::Literal(literal) => checker.literal_ty(literal),
                    EqualTo::Name(name) => match checker.lookup(*name) {
                        Some(ty) => ty,
                        None => {
                            checker.report(Diagnostic::SymbolNotFound {
                                symbol: *name,
                                span,
                            });
                            value_ty.clone()
                        }
                    },
                };

                checker
                    .unify_at(&value_ty, &expected_ty, span)
                    .with(self.clone())
            }

            PatternMatch::Struct {
                constr,
                fields,
                bound,
            } => {
                let value_ty = checker.type_of_value(expect_bound(bound));
                let decl = lookup_constr(checker, constr);

                let mut field_tys = Vec::with_capacity(fields.len());
                let fields: Box<[FieldPattern]> = fields
                    .iter()
                    .map(|FieldPattern { name, pattern }| {
                        if let Some(decl) = &decl {
                            check_field_declared(checker, decl, name.item, name.span);
                        }

                        let Typed { item, ty } =
                            pattern.check_types(pattern.span, checker);
                        field_tys.push(ty);

                        FieldPattern {
                            name: *name,
                            pattern: pattern.span.with(item),
                        }
                    })
                    .collect();

                let ty = unify_with_tuple(checker, &value_ty, field_tys, span);
                ty.with(PatternMatch::Struct {
                    constr: *constr,
                    fields,
                    bound: bound.clone(),
                })
            }

            PatternMatch::Tuple {
                constr,
                fields,
                bound,
            } => {
                let value_ty = checker.type_of_value(expect_bound(bound));
                let decl = lookup_constr(checker, constr);

                let mut field_tys = Vec::with_capacity(fields.len());
                let fields: SpanSeq<Self> = fields
                    .iter()
                    .map(|field| {
                        let projected = field.bound_value().and_then(field_name);
                        if let (Some(decl), Some(name)) = (&decl, projected) {
                            check_field_declared(checker, decl, name, field.span);
                        }

                        let Typed { item, ty } =
                            field.check_types(field.span, checker);
                        field_tys.push(ty);
                        field.span.with(item)
                    })
                    .collect();

                let ty = unify_with_tuple(checker, &value_ty, field_tys, span);
                ty.with(PatternMatch::Tuple {
                    constr: *constr,
                    fields,
                    bound: bound.clone(),
                })
            }
        }
    }
}

fn expect_bound(bound: &Option<Value>) -> &Value {
    match bound {
        Some(value) => value,
        None => panic!("tried to check an unbound pattern"),
    }
}

/// Returns the field a value projects, if it is a field access.
fn field_name(value: &Value) -> Option<Symbol> {
    match &value.kind {
        ValueKind::Access { field, .. } => Some(*field),
        ValueKind::Argument(_) => None,
    }
}

fn lookup_constr(
    checker: &mut Checker<'_>,
    constr: &Spanned<Symbol>,
) -> Option<ConstrDecl> {
    let decl = checker.env.constr(constr.item).cloned();

    if decl.is_none() && checker.config.report_undeclared_constructors {
        checker.report(Diagnostic::SymbolNotFound {
            symbol: constr.item,
            span: constr.span,
        });
    }

    decl
}

fn check_field_declared(
    checker: &mut Checker<'_>,
    decl: &ConstrDecl,
    field: Symbol,
    span: Span,
) {
    if decl.field(field).is_none() {
        checker.report(Diagnostic::SymbolNotFound {
            symbol: field,
            span,
        });
    }
}

/// Unifies the type of a destructured value with the synthesized nominal
/// tuple type of its fields.
fn unify_with_tuple(
    checker: &mut Checker<'_>,
    value_ty: &Arc<Ty>,
    field_tys: Vec<Arc<Ty>>,
    span: Span,
) -> Arc<Ty> {
    let name = checker
        .interner
        .intern_indexed(&checker.config.tuple_type_prefix, field_tys.len());
    let tuple_ty = Ty::nominal(name, field_tys);

    checker.unify_at(value_ty, &tuple_ty, span)
}

impl PatternCase {
    /// Checks the patterns and body of `self` in a new scope, unifying the
    /// type of the body with `return_ty`.
    pub fn check_types(
        &self,
        checker: &mut Checker<'_>,
        return_ty: &Arc<Ty>,
    ) -> Typed<Self> {
        checker.with_scope(|checker| {
            let matches = self
                .matches
                .iter()
                .map(|pattern| {
                    let typed = pattern.check_types(pattern.span, checker);
                    pattern.span.with(typed.item)
                })
                .collect();

            let body_ty = checker.infer(&self.body);
            let ty = checker.unify_at(return_ty, &body_ty, self.body.span);

            ty.with(PatternCase {
                matches,
                body: self.body.clone(),
            })
        })
    }
}

impl PatternMatcher {
    /// Returns `arg0 -> arg1 -> .. -> return`.
    pub fn fn_ty(&self) -> Arc<Ty> {
        let params: Vec<_> =
            self.arguments.iter().map(|arg| arg.ty.clone()).collect();
        Ty::curried(params, self.return_ty.clone())
    }

    /// Checks every case of `self` in source order, with the name of `self`
    /// in scope so that bodies may recurse.
    ///
    /// If the global environment already declares a signature for `self`,
    /// the inferred type is unified with it.
    pub fn check_types(&self, checker: &mut Checker<'_>) -> Typed<Self> {
        log::debug!(
            "checking matcher `{}`",
            checker.interner.display(self.name.item)
        );

        let ty = self.fn_ty();

        if let Some(declared) = checker.env.global(self.name.item).cloned() {
            let declared = checker.subst.instantiate(checker.interner, &declared);
            checker.unify_at(&declared, &ty, self.name.span);
        }

        let cases = checker.with_scope(|checker| {
            checker.bind_local(self.name.item, ty.clone());
            checker.check_cases(self)
        });

        let ty = checker.subst.resolve(&ty);
        ty.with(PatternMatcher {
            name: self.name,
            arguments: self.arguments.clone(),
            return_ty: self.return_ty.clone(),
            cases,
        })
    }
}

impl Checker<'_> {
    /// Checks the cases of `matcher` in source order.
    pub fn check_cases(&mut self, matcher: &PatternMatcher) -> SpanSeq<PatternCase> {
        matcher
            .cases
            .iter()
            .map(|case| {
                let typed = case.check_types(self, &matcher.return_ty);
                case.span.with(typed.item)
            })
            .collect()
    }
}

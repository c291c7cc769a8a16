//! Reducing checked matchers into single expressions.
//!
//! # Protocol
//! The [`Reducer`] is driven by a fixed sequence of calls per matcher:
//! ```text
//! begin_pattern
//!   (lower the body, begin_pattern_case, reduce_patterns.., end_pattern_case)..
//! end_pattern
//! reduce_pattern
//! ```
//! [`Reducer::reduce`] performs this sequence for a whole matcher. Each
//! matcher in flight has its own state on a stack, and a matcher nested in a
//! clause body is reduced to completion (pushed and popped) before the
//! enclosing clause is opened. Calls out of sequence panic.
//!
//! # Output
//! Each clause becomes its body wrapped in one `let` per capture, earliest
//! capture outermost. Clauses are chained with `if`, testing the conjunction
//! of their conditions in order, and the final `else` is a non-exhaustive
//! match fault. A clause with no conditions always matches: it becomes the
//! final `else` and any later clauses are dropped as unreachable.

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use pretty::RcDoc;

use crate::{
    ast::{self, EqualTo, PatternMatch, PatternMatcher, Value, ValueKind},
    doc::ToDoc,
    symbol::{StringInterner, Symbol},
    ty::Ty,
};

pub mod ir;

use ir::{Builtin, Fault};

/// A fully reduced matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Lowered {
    pub name: Symbol,
    /// The names of the argument placeholders, in order.
    pub params: Box<[Symbol]>,
    pub ty: Arc<Ty>,
    pub body: ir::Expr,
}

impl ToDoc for Lowered {
    fn to_doc(&self, interner: &StringInterner) -> RcDoc<'static, ()> {
        let signature = std::iter::once(self.name)
            .chain(self.params.iter().copied())
            .map(|name| name.to_doc(interner));

        RcDoc::text("(define (")
            .append(RcDoc::intersperse(signature, RcDoc::space()))
            .append(RcDoc::text(")"))
            .append(RcDoc::hardline().append(self.body.to_doc(interner)).nest(2))
            .append(RcDoc::text(")"))
    }
}

/// A runtime check a clause must pass.
#[derive(Debug, Clone, Copy)]
pub enum Condition<'a> {
    /// The value was built with the constructor `tag`.
    Tag { value: &'a Value, tag: Symbol },
    /// The value equals `expected`.
    Equal {
        value: &'a Value,
        expected: &'a EqualTo,
    },
}

impl Condition<'_> {
    fn lower(self) -> ir::Expr {
        match self {
            Condition::Tag { value, tag } => ir::Expr::IsTag {
                value: Box::new(lower_value(value)),
                tag,
            },
            Condition::Equal { value, expected } => {
                let expected = match expected {
                    EqualTo::Literal(literal) => ir::Expr::Literal(*literal),
                    EqualTo::Name(name) => ir::Expr::Symbol(*name),
                };

                ir::Expr::builtin(Builtin::Eq, [lower_value(value), expected])
            }
        }
    }
}

/// Lowers a bound value into the expression that computes it.
pub fn lower_value(value: &Value) -> ir::Expr {
    match &value.kind {
        ValueKind::Argument(argument) => ir::Expr::Symbol(argument.name),
        ValueKind::Access { value: parent, field } => ir::Expr::Access {
            value: Box::new(lower_value(parent)),
            field: *field,
            tag: parent.tag,
        },
    }
}

#[derive(Debug)]
struct CaseState {
    assignments: Vec<(Symbol, ir::Expr)>,
    conditions: Vec<ir::Expr>,
    body: ir::Expr,
}

impl CaseState {
    /// Wraps the body in the assignments, earliest outermost.
    fn into_expr(self) -> ir::Expr {
        self.assignments
            .into_iter()
            .rev()
            .fold(self.body, |body, (name, value)| ir::Expr::Let {
                name,
                value: Box::new(value),
                body: Box::new(body),
            })
    }

    fn condition(&mut self) -> ir::Expr {
        let mut conditions = std::mem::take(&mut self.conditions);

        match conditions.len() {
            1 => conditions.remove(0),
            _ => ir::Expr::builtin(Builtin::And, conditions),
        }
    }
}

#[derive(Debug)]
struct PatternState {
    matcher: Symbol,
    cases: Vec<CaseState>,
    open: Option<CaseState>,
    ended: bool,
}

#[derive(Debug, Default)]
pub struct Reducer {
    stack: Vec<PatternState>,
}

impl Reducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of matchers currently in flight.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn top(&mut self) -> &mut PatternState {
        match self.stack.last_mut() {
            Some(state) => state,
            None => panic!("no pattern is being reduced"),
        }
    }

    fn open_case(&mut self) -> &mut CaseState {
        match self.top().open.as_mut() {
            Some(case) => case,
            None => panic!("no pattern case is open"),
        }
    }

    pub fn begin_pattern(&mut self, matcher: &PatternMatcher) {
        self.stack.push(PatternState {
            matcher: matcher.name.item,
            cases: Vec::with_capacity(matcher.cases.len()),
            open: None,
            ended: false,
        });
    }

    pub fn begin_pattern_case(&mut self, body: ir::Expr) {
        let state = self.top();
        assert!(!state.ended, "tried to add a case to an ended pattern");
        assert!(state.open.is_none(), "a pattern case is already open");

        state.open = Some(CaseState {
            assignments: Vec::new(),
            conditions: Vec::new(),
            body,
        });
    }

    pub fn add_assignment(&mut self, name: Symbol, value: &Value) {
        let value = lower_value(value);
        self.open_case().assignments.push((name, value));
    }

    pub fn add_condition(&mut self, condition: Condition<'_>) {
        let condition = condition.lower();
        self.open_case().conditions.push(condition);
    }

    pub fn end_pattern_case(&mut self) {
        let state = self.top();

        match state.open.take() {
            Some(case) => state.cases.push(case),
            None => panic!("no pattern case is open"),
        }
    }

    pub fn end_pattern(&mut self) {
        let state = self.top();
        assert!(state.open.is_none(), "a pattern case is still open");
        state.ended = true;
    }

    /// Pops the innermost pattern and builds its expression.
    pub fn reduce_pattern(&mut self) -> ir::Expr {
        let state = match self.stack.pop() {
            Some(state) if state.ended => state,
            Some(_) => panic!("tried to reduce a pattern before ending it"),
            None => panic!("no pattern is being reduced"),
        };

        let mut cases = state.cases;
        let fallback = match cases.iter().position(|case| case.conditions.is_empty()) {
            Some(index) => {
                let unreachable = cases.len() - index - 1;
                if unreachable > 0 {
                    log::debug!("dropping {unreachable} unreachable cases");
                }

                cases.truncate(index + 1);
                cases.pop().map(CaseState::into_expr)
            }
            None => None,
        };

        let fallback = fallback.unwrap_or(ir::Expr::Fault(Fault::NonExhaustiveMatch {
            matcher: state.matcher,
        }));

        cases.into_iter().rev().fold(fallback, |alternative, mut case| {
            ir::Expr::If {
                condition: Box::new(case.condition()),
                consequence: Box::new(case.into_expr()),
                alternative: Box::new(alternative),
            }
        })
    }

    /// Reduces a whole (bound, checked) matcher.
    ///
    /// The stack is restored to its depth at entry even if reduction panics.
    pub fn reduce(&mut self, matcher: &PatternMatcher) -> ir::Expr {
        log::debug!("reducing matcher with {} cases", matcher.cases.len());

        let mut reducer = DepthGuard::new(self);
        reducer.begin_pattern(matcher);

        for case in matcher.cases.iter() {
            let body = reducer.lower_expr(&case.body);
            reducer.begin_pattern_case(body);

            for pattern in case.matches.iter() {
                pattern.reduce_patterns(&mut reducer);
            }

            reducer.end_pattern_case();
        }

        reducer.end_pattern();
        reducer.reduce_pattern()
    }

    /// Lowers a clause body, reducing any nested matchers.
    pub fn lower_expr(&mut self, expr: &ast::Expr) -> ir::Expr {
        match expr {
            ast::Expr::Literal(literal) => ir::Expr::Literal(*literal),
            ast::Expr::Name(name) => ir::Expr::Symbol(*name),
            ast::Expr::Call { callee, args } => {
                let callee = self.lower_expr(callee);
                let args: Vec<_> =
                    args.iter().map(|arg| self.lower_expr(arg)).collect();
                ir::Expr::call(callee, args)
            }
            ast::Expr::If {
                condition,
                consequence,
                alternative,
            } => ir::Expr::If {
                condition: Box::new(self.lower_expr(condition)),
                consequence: Box::new(self.lower_expr(consequence)),
                alternative: Box::new(self.lower_expr(alternative)),
            },
            ast::Expr::Let { name, value, body } => ir::Expr::Let {
                name: name.item,
                value: Box::new(self.lower_expr(value)),
                body: Box::new(self.lower_expr(body)),
            },
            ast::Expr::Access { value, field } => ir::Expr::Access {
                value: Box::new(self.lower_expr(value)),
                field: field.item,
                tag: None,
            },
            ast::Expr::Match {
                scrutinees,
                matcher,
            } => {
                let scrutinees: Vec<_> =
                    scrutinees.iter().map(|s| self.lower_expr(s)).collect();
                let body = self.reduce(matcher);

                // bind the placeholders around the reduced matcher
                matcher
                    .arguments
                    .iter()
                    .zip(scrutinees)
                    .rev()
                    .fold(body, |body, (argument, scrutinee)| ir::Expr::Let {
                        name: argument.name,
                        value: Box::new(scrutinee),
                        body: Box::new(body),
                    })
            }
        }
    }
}

/// Truncates the stack of a [`Reducer`] back to its original depth on drop.
struct DepthGuard<'r> {
    reducer: &'r mut Reducer,
    depth: usize,
}

impl<'r> DepthGuard<'r> {
    fn new(reducer: &'r mut Reducer) -> Self {
        let depth = reducer.depth();
        Self { reducer, depth }
    }
}

impl Deref for DepthGuard<'_> {
    type Target = Reducer;

    fn deref(&self) -> &Self::Target {
        self.reducer
    }
}

impl DerefMut for DepthGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reducer
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.reducer.stack.truncate(self.depth);
    }
}

impl PatternMatch {
    /// Feeds the assignments and conditions of `self` to `reducer`.
    ///
    /// # Panics
    /// Panics if `self` is unbound or unshuffled.
    pub fn reduce_patterns(&self, reducer: &mut Reducer) {
        match self {
            PatternMatch::Ignore => {}
            PatternMatch::Unshuffled(_) => {
                panic!("tried to reduce an unshuffled pattern")
            }
            PatternMatch::Capture { name, bound, .. } => {
                reducer.add_assignment(*name, expect_bound(bound));
            }
            PatternMatch::Equal { value, bound } => {
                reducer.add_condition(Condition::Equal {
                    value: expect_bound(bound),
                    expected: value,
                });
            }
            PatternMatch::Struct {
                constr,
                fields,
                bound,
            } => {
                reducer.add_condition(Condition::Tag {
                    value: expect_bound(bound),
                    tag: constr.item,
                });

                for field in fields.iter() {
                    field.pattern.reduce_patterns(reducer);
                }
            }
            PatternMatch::Tuple {
                constr,
                fields,
                bound,
            } => {
                reducer.add_condition(Condition::Tag {
                    value: expect_bound(bound),
                    tag: constr.item,
                });

                for field in fields.iter() {
                    field.reduce_patterns(reducer);
                }
            }
        }
    }
}

fn expect_bound(bound: &Option<Value>) -> &Value {
    match bound {
        Some(value) => value,
        None => panic!("tried to reduce an unbound pattern"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        ast::{
            Argument, BindScope, FieldPattern, Literal, PatternCase,
            PatternMatcher,
        },
        config::Config,
        doc::render,
        span::{Span, Spanned},
        ty::Substitution,
    };

    struct Fixture {
        interner: StringInterner,
        subst: Substitution,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();

            Self {
                interner: StringInterner::new(),
                subst: Substitution::new(),
                config: Config::default(),
            }
        }

        fn sym(&mut self, name: &str) -> Symbol {
            self.interner.intern(name)
        }

        fn unbound(
            &mut self,
            name: &str,
            arity: usize,
            cases: impl IntoIterator<Item = Spanned<PatternCase>>,
        ) -> PatternMatcher {
            let name = self.sym(name);
            PatternMatcher::with_fresh_arguments(
                &mut self.interner,
                &mut self.subst,
                spanned(name),
                arity,
                cases,
            )
        }

        fn matcher(
            &mut self,
            name: &str,
            arity: usize,
            cases: impl IntoIterator<Item = Spanned<PatternCase>>,
        ) -> PatternMatcher {
            let matcher = self.unbound(name, arity, cases);

            matcher.bind(&mut BindScope {
                interner: &mut self.interner,
                config: &self.config,
            })
        }

        fn arg(&self, matcher: &PatternMatcher, index: usize) -> String {
            self.interner
                .display(matcher.arguments[index].name)
                .to_string()
        }
    }

    fn spanned<T>(item: T) -> Spanned<T> {
        Span::default().with(item)
    }

    fn case(
        matches: impl IntoIterator<Item = PatternMatch>,
        body: ast::Expr,
    ) -> Spanned<PatternCase> {
        spanned(PatternCase {
            matches: matches.into_iter().map(spanned).collect(),
            body: spanned(body),
        })
    }

    #[test]
    fn single_capture_becomes_a_let() {
        let mut fx = Fixture::new();
        let x = fx.sym("x");

        let m = fx.matcher(
            "id",
            1,
            [case([PatternMatch::capture(x)], ast::Expr::Name(x))],
        );

        let expr = Reducer::new().reduce(&m);
        assert_eq!(
            render(&expr, &fx.interner),
            format!("(let [[x {}]]\n  x)", fx.arg(&m, 0))
        );
        assert_eq!(expr.fault_count(), 0);
    }

    #[test]
    fn cases_chain_in_declared_order() {
        let mut fx = Fixture::new();
        let (zero, nonzero) = (fx.sym("zero"), fx.sym("nonzero"));
        let n = fx.sym("n");

        let m = fx.matcher(
            "describe",
            1,
            [
                case(
                    [PatternMatch::equal(EqualTo::Literal(Literal::Int(0)))],
                    ast::Expr::Literal(Literal::String(zero)),
                ),
                case(
                    [PatternMatch::capture(n)],
                    ast::Expr::Literal(Literal::String(nonzero)),
                ),
            ],
        );

        let expr = Reducer::new().reduce(&m);
        let arg = fx.arg(&m, 0);
        assert_eq!(
            render(&expr, &fx.interner),
            format!(
                "(if (equal? {arg} 0)\n  \"zero\"\n  (let [[n {arg}]]\n    \"nonzero\"))"
            )
        );
    }

    #[test]
    fn name_equality_compares_against_the_name() {
        let mut fx = Fixture::new();
        let origin = fx.sym("origin");

        let m = fx.matcher(
            "is_origin",
            1,
            [case(
                [PatternMatch::equal(EqualTo::Name(origin))],
                ast::Expr::Literal(Literal::Bool(true)),
            )],
        );

        let expr = Reducer::new().reduce(&m);
        assert_eq!(
            render(&expr, &fx.interner),
            format!(
                "(if (equal? {} origin)\n  #t\n  (fault non-exhaustive-match is_origin))",
                fx.arg(&m, 0)
            )
        );
        assert_eq!(expr.fault_count(), 1);
    }

    #[test]
    fn struct_fields_are_read_after_the_tag_test() {
        let mut fx = Fixture::new();
        let (pair, first, second) =
            (fx.sym("Pair"), fx.sym("first"), fx.sym("second"));
        let (a, b) = (fx.sym("a"), fx.sym("b"));

        let pattern = PatternMatch::structure(
            spanned(pair),
            [
                FieldPattern {
                    name: spanned(first),
                    pattern: spanned(PatternMatch::capture(a)),
                },
                FieldPattern {
                    name: spanned(second),
                    pattern: spanned(PatternMatch::capture(b)),
                },
            ],
        );

        let m = fx.matcher("swap", 1, [case([pattern], ast::Expr::Name(b))]);
        let expr = Reducer::new().reduce(&m);
        let arg = fx.arg(&m, 0);

        assert_eq!(
            render(&expr, &fx.interner),
            format!(
                "(if (tag? {arg} Pair)\n  \
                 (let [[a (field {arg} first #:tag Pair)]]\n    \
                 (let [[b (field {arg} second #:tag Pair)]]\n      \
                 b))\n  \
                 (fault non-exhaustive-match swap))"
            )
        );
    }

    #[test]
    fn multiple_conditions_are_conjoined() {
        let mut fx = Fixture::new();
        let some = fx.sym("Some");

        let pattern = PatternMatch::tuple(
            spanned(some),
            [spanned(PatternMatch::equal(EqualTo::Literal(Literal::Bool(true))))],
        );

        let m = fx.matcher(
            "is_some_true",
            1,
            [
                case([pattern], ast::Expr::Literal(Literal::Bool(true))),
                case([PatternMatch::Ignore], ast::Expr::Literal(Literal::Bool(false))),
            ],
        );

        let expr = Reducer::new().reduce(&m);
        let ir::Expr::If { condition, .. } = &expr else {
            panic!("expected a conditional");
        };

        let arg = fx.arg(&m, 0);
        assert_eq!(
            render(condition.as_ref(), &fx.interner),
            format!("(and (tag? {arg} Some) (equal? (field {arg} _0 #:tag Some) #t))")
        );
        assert_eq!(expr.fault_count(), 0);
    }

    #[test]
    fn unconditional_cases_end_the_chain() {
        let mut fx = Fixture::new();

        let m = fx.matcher(
            "first",
            1,
            [
                case([PatternMatch::Ignore], ast::Expr::Literal(Literal::Int(1))),
                case(
                    [PatternMatch::equal(EqualTo::Literal(Literal::Int(2)))],
                    ast::Expr::Literal(Literal::Int(2)),
                ),
            ],
        );

        let expr = Reducer::new().reduce(&m);
        assert_eq!(expr, ir::Expr::Literal(Literal::Int(1)));
    }

    #[test]
    fn nested_matchers_bind_their_placeholders() {
        let mut fx = Fixture::new();
        let (x, y) = (fx.sym("x"), fx.sym("y"));

        // bound together with the outer matcher
        let inner = fx.unbound(
            "inner",
            1,
            [case([PatternMatch::capture(y)], ast::Expr::Name(y))],
        );
        let inner_arg = fx.arg(&inner, 0);

        let body = ast::Expr::Match {
            scrutinees: Box::new([spanned(ast::Expr::Name(x))]),
            matcher: Box::new(inner),
        };
        let outer = fx.matcher("outer", 1, [case([PatternMatch::capture(x)], body)]);
        let outer_arg = fx.arg(&outer, 0);

        let mut reducer = Reducer::new();
        let expr = reducer.reduce(&outer);
        assert_eq!(reducer.depth(), 0);
        assert_eq!(
            render(&expr, &fx.interner),
            format!(
                "(let [[x {outer_arg}]]\n  \
                 (let [[{inner_arg} x]]\n    \
                 (let [[y {inner_arg}]]\n      \
                 y)))"
            )
        );
    }

    #[test]
    fn manual_protocol() {
        let mut fx = Fixture::new();
        let ty = fx.subst.fresh(&mut fx.interner);
        let argument = Argument::fresh(&mut fx.interner, ty);
        let value = Value::argument(&argument);
        let name = fx.sym("f");
        let z = fx.sym("z");

        let matcher = PatternMatcher::new(
            spanned(name),
            [argument],
            fx.subst.fresh(&mut fx.interner),
            [],
        );

        let mut reducer = Reducer::new();
        reducer.begin_pattern(&matcher);
        reducer.begin_pattern_case(ir::Expr::Symbol(z));
        reducer.add_assignment(z, &value);
        reducer.end_pattern_case();
        reducer.end_pattern();

        let expr = reducer.reduce_pattern();
        assert!(matches!(expr, ir::Expr::Let { .. }));
        assert_eq!(reducer.depth(), 0);
    }

    #[test]
    #[should_panic(expected = "no pattern case is open")]
    fn assignments_outside_a_case_panic() {
        let mut fx = Fixture::new();
        let m = fx.matcher("f", 1, []);
        let x = fx.sym("x");
        let value = Value::argument(&m.arguments[0]);

        let mut reducer = Reducer::new();
        reducer.begin_pattern(&m);
        reducer.add_assignment(x, &value);
    }

    #[test]
    #[should_panic(expected = "before ending it")]
    fn reducing_an_open_pattern_panics() {
        let mut fx = Fixture::new();
        let m = fx.matcher("f", 1, []);

        let mut reducer = Reducer::new();
        reducer.begin_pattern(&m);
        reducer.reduce_pattern();
    }

    #[test]
    fn depth_is_restored_after_a_panic() {
        let mut fx = Fixture::new();
        let x = fx.sym("x");

        // an unbound pattern panics halfway through the reduction
        let unbound = fx.unbound(
            "broken",
            1,
            [case([PatternMatch::capture(x)], ast::Expr::Name(x))],
        );

        let mut reducer = Reducer::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            reducer.reduce(&unbound)
        }));

        assert!(result.is_err());
        assert_eq!(reducer.depth(), 0);
    }
}

//! Type inference and pattern-match compilation for multi-clause function
//! definitions.
//!
//! A [`PatternMatcher`](ast::PatternMatcher) is checked against a
//! Hindley-Milner style unifier ([`ty`]) and reduced into a decision chain
//! of tag tests, equality tests and field projections ([`lower`]). The
//! [`driver::Session`] runs both passes over a compilation unit.

pub mod ast;
pub mod check;
pub mod config;
pub mod diagnostic;
pub mod doc;
pub mod driver;
pub mod interp;
pub mod lower;
pub mod span;
pub mod symbol;
pub mod ty;
pub mod unique;

//! Translate query expressions to SQL expressions.

pub mod expression;
pub mod factory;
pub mod providers;
pub mod query;

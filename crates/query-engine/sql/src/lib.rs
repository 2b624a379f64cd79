//! The relational side of query translation: a SQL expression tree, the
//! SELECT builder used while composing subqueries, and a printer.

pub mod sql;

//! Translation of query expressions over the conceptual model into SQL
//! expression trees.

pub mod translation;

//! The conceptual model queries are written against, and the mapping of its
//! scalar types onto storage types.

pub mod metadata;

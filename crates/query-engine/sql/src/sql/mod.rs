//! SQL AST types, construction helpers, and a textual rendering.

pub mod ast;
pub mod convert;
pub mod helpers;
pub mod projection;
pub mod select;
pub mod string;

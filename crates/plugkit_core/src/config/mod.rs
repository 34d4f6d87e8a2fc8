//! Extension configuration contracts.

pub mod schema;

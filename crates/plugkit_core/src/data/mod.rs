//! Extension data: typed refs, erased values and validated containers.
//!
//! # Responsibility
//! - Name the categories of values extensions exchange (`ExtensionDataRef`).
//! - Validate factory output against a declared output set.
//!
//! # Invariants
//! - A data ref is identified by its id alone; the type parameter is a
//!   compile-time guarantee for `get`/`value` callers.

pub mod container;
pub mod data_ref;

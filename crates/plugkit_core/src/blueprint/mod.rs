//! Extension blueprint factory.
//!
//! A blueprint declares a reusable extension kind once; plugin authors then
//! instantiate it with `make` or layer their own inputs, output, config and
//! factory logic on top of it with `make_with_overrides`.

pub mod factory;
pub mod original;
pub mod request;

//! Extension contracts.
//!
//! This module defines the extension construction primitive, input slot
//! resolution and the in-process definition registry. Rendering and app tree
//! ordering belong to the host and are out of scope here.

pub mod definition;
pub mod input;
pub mod registry;

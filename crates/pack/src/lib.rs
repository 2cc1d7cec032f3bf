//! Content packer
//!
//! Collects the content items of one package into a namespace tree, then
//! serializes that tree twice: once as a runtime payload artifact per audio
//! format, and once as a typed source declaration describing the packed
//! shape. Both serializations traverse the same tree, so the declaration is
//! always an exact map of the payload index.

pub mod codegen;
pub mod namespace;
pub mod payload;

pub use codegen::serialize_code;
pub use namespace::{Namespace, Node};
pub use payload::serialize_payload;

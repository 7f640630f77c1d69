//! Alternative backends over the IR
//!
//! The VM under `crate::vm` is the authoritative execution path; the
//! backends here only render the module in other forms.

pub mod go;

pub use go::emit_module;

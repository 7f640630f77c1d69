//! Runtime value model shared by the VM and its builtins

pub mod value;

pub use value::{Key, StructObj, Value};

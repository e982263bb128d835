pub mod compiler;
pub mod document;
pub mod error;
pub mod graph;
pub mod sql;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use compiler::{Compilation, Compiler, CompilerConfig, TypeArtifacts};
pub use error::{CompileError, CompileResult, CompileWarning};
pub use graph::{Element, Format, Property, PropertyKind, ScalarType, TypeDef, TypeGraph};

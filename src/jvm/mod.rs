//! Source-side vocabulary: JVM names, access flags and classfile metadata
//!
//! Everything the engine knows about the input program arrives through the
//! types here. The [`class_file::ClassFileProvider`] trait is the seam to
//! the upstream bytecode parser.

mod access_flags;
pub mod class_file;
mod names;

pub use access_flags::*;
pub use class_file::{ClassFileProvider, ClassInfo, ClassInfoTable, ClassKind, FieldInfo, MethodInfo};
pub use names::*;

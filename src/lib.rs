//! Type layout and dispatch table engine for compiling JVM class files into
//! a typed stack-machine module.
//!
//! The rest of the compiler hands this crate class names and method
//! signatures while it translates method bodies; this crate interns every
//! referenced type, resolves the inheritance and interface hierarchy, and
//! lays out the runtime metadata the translated code dispatches through:
//!
//!   - per-class field layouts (every instance starts with the synthetic
//!     `.vtable` and `.hashcode` words),
//!   - virtual dispatch tables and per-interface dispatch tables,
//!   - a binary *type descriptor* per type in the module's data section,
//!   - import records describing each class to the target module, and
//!   - the small synthetic routines (virtual call, interface call,
//!     `instanceof`/cast) that walk those descriptors at run time.
//!
//! ### Phases
//!
//! The engine is driven in a strict order. During the *scan* phase
//! consumers request types through [`translate::TypeManager::value_of`],
//! [`translate::TypeManager::array_type`] and
//! [`translate::TypeManager::value_of_sig`] and mark functions used on the
//! [`translate::FunctionRegistry`]. Closing the scan
//! ([`translate::TypeManager::scan_type_hierarchy`] followed by
//! [`translate::TypeManager::prepare_finish`]) resolves hierarchies, builds
//! the tables and emits everything through the
//! [`translate::ModuleWriter`]. Interning a new type afterwards is a fatal
//! error.
//!
//! Collaborators (classfile provider, function registry, module writer) are
//! traits in [`jvm`] and [`translate`]; the bytecode parser, method-body
//! translator and CLI live in the embedding compiler.

pub mod jawa;
pub mod jvm;
pub mod translate;
pub mod wasm;

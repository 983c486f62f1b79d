//! Parsed classfile metadata, as the hierarchy scanner consumes it
//!
//! Bytecode parsing itself happens upstream; the engine only ever sees the
//! signature-level view below, served on demand through a
//! [`ClassFileProvider`].

use crate::jvm::{
    BinaryName, ClassAccessFlags, FieldAccessFlags, FunctionName, MethodAccessFlags,
    UnqualifiedName,
};
use elsa::FrozenMap;

/// Whether a classfile declares a class or an interface
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClassKind {
    Class,
    Interface,
}

/// Signature-level view of one classfile
#[derive(Debug)]
pub struct ClassInfo {
    pub name: BinaryName,
    pub kind: ClassKind,
    pub access_flags: ClassAccessFlags,

    /// Missing only for `java/lang/Object`
    pub super_name: Option<BinaryName>,

    /// Directly implemented (or, for an interface, directly extended)
    pub interfaces: Vec<BinaryName>,

    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    pub fn new(
        name: BinaryName,
        kind: ClassKind,
        access_flags: ClassAccessFlags,
        super_name: Option<BinaryName>,
    ) -> ClassInfo {
        ClassInfo {
            name,
            kind,
            access_flags,
            super_name,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::ABSTRACT)
    }

    /// Find a declared method by name and signature
    pub fn method(&self, name: &UnqualifiedName, signature: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| &m.name == name && m.descriptor == signature)
    }
}

/// One declared field
#[derive(Debug)]
pub struct FieldInfo {
    pub name: UnqualifiedName,
    pub descriptor: String,
    pub access_flags: FieldAccessFlags,
}

impl FieldInfo {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::STATIC)
    }
}

/// One declared method
#[derive(Debug)]
pub struct MethodInfo {
    /// The class whose classfile declares the method
    pub class_name: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: String,
    pub access_flags: MethodAccessFlags,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == UnqualifiedName::INIT
    }

    /// The function this method implements
    pub fn function_name(&self) -> FunctionName {
        FunctionName::new(
            self.class_name.clone(),
            self.name.clone(),
            self.descriptor.clone(),
        )
    }
}

/// Source of classfile metadata
///
/// Implementations may parse lazily; the engine calls `get` repeatedly for
/// the same name and expects a stable answer. Returning `None` for a name
/// the hierarchy needs is fatal for the compilation.
pub trait ClassFileProvider {
    fn get(&self, name: &str) -> Option<&ClassInfo>;
}

/// In-memory, append-only provider
///
/// Backs the test harnesses and embedders that parse classfiles up front.
/// The map is append-only so lookups can hand out plain references while
/// new classes are still being registered.
#[derive(Default)]
pub struct ClassInfoTable {
    classes: FrozenMap<String, Box<ClassInfo>>,
}

impl ClassInfoTable {
    pub fn new() -> ClassInfoTable {
        ClassInfoTable {
            classes: FrozenMap::new(),
        }
    }

    /// Register a classfile, returning a reference valid for the table's
    /// lifetime. A second registration under the same name is ignored.
    pub fn add(&self, class: ClassInfo) -> &ClassInfo {
        let name = class.name.as_str().to_owned();
        if let Some(existing) = self.classes.get(&name) {
            return existing;
        }
        self.classes.insert(name, Box::new(class))
    }
}

impl ClassFileProvider for ClassInfoTable {
    fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn object() -> ClassInfo {
        ClassInfo::new(
            BinaryName::OBJECT,
            ClassKind::Class,
            ClassAccessFlags::PUBLIC,
            None,
        )
    }

    #[test]
    fn method_lookup() {
        let mut class = object();
        class.methods.push(MethodInfo {
            class_name: BinaryName::OBJECT,
            name: UnqualifiedName::from_string("hashCode".into()).unwrap(),
            descriptor: String::from("()I"),
            access_flags: MethodAccessFlags::PUBLIC,
        });

        let hash_code = UnqualifiedName::from_string("hashCode".into()).unwrap();
        assert!(class.method(&hash_code, "()I").is_some());
        assert!(class.method(&hash_code, "()J").is_none());
    }

    #[test]
    fn table_is_stable_across_inserts() {
        let table = ClassInfoTable::new();
        let first = table.add(object()) as *const ClassInfo;
        table.add(ClassInfo::new(
            BinaryName::STRING,
            ClassKind::Class,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
            Some(BinaryName::OBJECT),
        ));
        assert_eq!(
            table.get("java/lang/Object").map(|c| c as *const ClassInfo),
            Some(first)
        );
        assert!(table.get("java/lang/Missing").is_none());
    }
}

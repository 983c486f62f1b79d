//! Fixtures shared by the unit tests: an in-memory module writer and a
//! classfile builder

use crate::jvm::{
    BinaryName, ClassAccessFlags, ClassInfo, ClassKind, FieldAccessFlags, FieldInfo, FunctionName,
    MethodAccessFlags, MethodInfo, UnqualifiedName,
};
use crate::translate::{ImportArgument, ModuleWriter, TypeId};
use indexmap::IndexMap;
use std::cell::RefCell;

/// A recorded declaration import
pub(crate) struct TypeImport {
    pub payload: Vec<u8>,
    pub declared: String,
    pub args: Vec<String>,
}

/// A recorded definition import; arguments rendered as strings
pub(crate) struct CommandImport {
    pub payload: Vec<u8>,
    pub args: Vec<String>,
}

/// Module writer that records everything and assigns function ids in
/// first-query order
#[derive(Default)]
pub(crate) struct MockWriter {
    pub data: Vec<u8>,
    pub type_imports: Vec<TypeImport>,
    pub commands: Vec<CommandImport>,
    pub imported_functions: Vec<FunctionName>,
    pub struct_types: Vec<String>,
    function_ids: RefCell<IndexMap<FunctionName, u32>>,
}

impl MockWriter {
    pub fn new() -> MockWriter {
        MockWriter::default()
    }

    /// The id this writer hands out for `function`
    pub fn id_of(&self, function: &FunctionName) -> u32 {
        self.function_id(function)
    }

    fn function_id(&self, function: &FunctionName) -> u32 {
        let mut ids = self.function_ids.borrow_mut();
        let next = ids.len() as u32;
        *ids.entry(function.clone()).or_insert(next)
    }
}

impl<'g> ModuleWriter<'g> for MockWriter {
    fn import_type(
        &mut self,
        _module: &str,
        payload: Vec<u8>,
        declared: TypeId<'g>,
        args: &[TypeId<'g>],
    ) {
        self.type_imports.push(TypeImport {
            payload,
            declared: declared.name().to_owned(),
            args: args.iter().map(|a| a.name().to_owned()).collect(),
        });
    }

    fn import_command(&mut self, _module: &str, payload: Vec<u8>, args: Vec<ImportArgument<'g>>) {
        let args = args
            .iter()
            .map(|arg| match arg {
                ImportArgument::Type(t) => format!("{}", t),
                ImportArgument::Function(id) => format!("fn#{}", id),
            })
            .collect();
        self.commands.push(CommandImport { payload, args });
    }

    fn import_function(&mut self, function: &FunctionName) {
        self.imported_functions.push(function.clone());
    }

    fn write_struct_type(&mut self, declared: TypeId<'g>) -> u32 {
        self.struct_types.push(declared.name().to_owned());
        (self.struct_types.len() - 1) as u32
    }

    fn function_id(&self, function: &FunctionName) -> u32 {
        MockWriter::function_id(self, function)
    }

    fn data(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    fn data_size(&self) -> usize {
        self.data.len()
    }
}

/// Little-endian i32 at `offset` of `data`
pub(crate) fn read_i32(data: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

/// Builder for classfile fixtures
pub(crate) struct ClassBuilder {
    info: ClassInfo,
}

impl ClassBuilder {
    pub fn class(name: &str, super_name: &str) -> ClassBuilder {
        ClassBuilder {
            info: ClassInfo::new(
                binary(name),
                ClassKind::Class,
                ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
                Some(binary(super_name)),
            ),
        }
    }

    pub fn object() -> ClassBuilder {
        ClassBuilder {
            info: ClassInfo::new(
                BinaryName::OBJECT,
                ClassKind::Class,
                ClassAccessFlags::PUBLIC,
                None,
            ),
        }
    }

    pub fn interface(name: &str) -> ClassBuilder {
        ClassBuilder {
            info: ClassInfo::new(
                binary(name),
                ClassKind::Interface,
                ClassAccessFlags::PUBLIC
                    | ClassAccessFlags::INTERFACE
                    | ClassAccessFlags::ABSTRACT,
                Some(BinaryName::OBJECT),
            ),
        }
    }

    pub fn abstract_class(name: &str, super_name: &str) -> ClassBuilder {
        let mut builder = ClassBuilder::class(name, super_name);
        builder.info.access_flags |= ClassAccessFlags::ABSTRACT;
        builder
    }

    pub fn implements(mut self, interface_name: &str) -> ClassBuilder {
        self.info.interfaces.push(binary(interface_name));
        self
    }

    pub fn field(mut self, name: &str, descriptor: &str) -> ClassBuilder {
        self.info.fields.push(FieldInfo {
            name: unqualified(name),
            descriptor: descriptor.to_owned(),
            access_flags: FieldAccessFlags::PUBLIC,
        });
        self
    }

    pub fn static_field(mut self, name: &str, descriptor: &str) -> ClassBuilder {
        self.info.fields.push(FieldInfo {
            name: unqualified(name),
            descriptor: descriptor.to_owned(),
            access_flags: FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC,
        });
        self
    }

    pub fn method(mut self, name: &str, descriptor: &str) -> ClassBuilder {
        let class_name = self.info.name.clone();
        self.info.methods.push(MethodInfo {
            class_name,
            name: unqualified(name),
            descriptor: descriptor.to_owned(),
            access_flags: MethodAccessFlags::PUBLIC,
        });
        self
    }

    pub fn static_method(mut self, name: &str, descriptor: &str) -> ClassBuilder {
        let class_name = self.info.name.clone();
        self.info.methods.push(MethodInfo {
            class_name,
            name: unqualified(name),
            descriptor: descriptor.to_owned(),
            access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        });
        self
    }

    pub fn build(self) -> ClassInfo {
        self.info
    }
}

/// `(class, method, signature)` shorthand
pub(crate) fn func(class: &str, method: &str, signature: &str) -> FunctionName {
    FunctionName::new(binary(class), unqualified(method), signature)
}

fn binary(name: &str) -> BinaryName {
    BinaryName::from_string(name.to_owned()).unwrap()
}

fn unqualified(name: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(name.to_owned()).unwrap()
}

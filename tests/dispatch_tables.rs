//! End-to-end check of the emitted dispatch metadata: builds a small
//! hierarchy, closes the scan, then walks the descriptor bytes with the
//! same algorithms the synthetic stubs use at run time.

use class2wasm::jvm::{
    BinaryName, ClassAccessFlags, ClassInfo, ClassInfoTable, ClassKind, FieldAccessFlags,
    FieldInfo, FunctionName, MethodAccessFlags, MethodInfo, UnqualifiedName,
};
use class2wasm::translate::{
    FunctionManager, FunctionRegistry, ImportArgument, ModuleWriter, StringManager, TypeArena,
    TypeId, TypeManager, TYPE_DESCRIPTION_INSTANCEOF_OFFSET, TYPE_DESCRIPTION_INTERFACE_OFFSET,
};
use class2wasm::wasm::{ValueType, WasmType};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Default)]
struct RecordingWriter {
    data: Vec<u8>,
    struct_types: Vec<String>,
    type_imports: Vec<String>,
    command_count: usize,
    imported_functions: Vec<FunctionName>,
    function_ids: RefCell<HashMap<FunctionName, u32>>,
    next_function_id: RefCell<u32>,
}

impl RecordingWriter {
    fn id_of(&self, function: &FunctionName) -> u32 {
        self.function_id(function)
    }

    fn function_id(&self, function: &FunctionName) -> u32 {
        let mut ids = self.function_ids.borrow_mut();
        if let Some(id) = ids.get(function) {
            return *id;
        }
        let mut next = self.next_function_id.borrow_mut();
        let id = *next;
        *next += 1;
        ids.insert(function.clone(), id);
        id
    }
}

impl<'g> ModuleWriter<'g> for RecordingWriter {
    fn import_type(&mut self, _module: &str, _payload: Vec<u8>, declared: TypeId<'g>, _args: &[TypeId<'g>]) {
        self.type_imports.push(declared.name().to_owned());
    }

    fn import_command(&mut self, _module: &str, _payload: Vec<u8>, _args: Vec<ImportArgument<'g>>) {
        self.command_count += 1;
    }

    fn import_function(&mut self, function: &FunctionName) {
        self.imported_functions.push(function.clone());
    }

    fn write_struct_type(&mut self, declared: TypeId<'g>) -> u32 {
        self.struct_types.push(declared.name().to_owned());
        (self.struct_types.len() - 1) as u32
    }

    fn function_id(&self, function: &FunctionName) -> u32 {
        RecordingWriter::function_id(self, function)
    }

    fn data(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    fn data_size(&self) -> usize {
        self.data.len()
    }
}

fn binary(name: &str) -> BinaryName {
    BinaryName::from_string(name.to_owned()).unwrap()
}

fn unqualified(name: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(name.to_owned()).unwrap()
}

fn func(class: &str, method: &str, signature: &str) -> FunctionName {
    FunctionName::new(binary(class), unqualified(method), signature)
}

fn method(class: &str, name: &str, descriptor: &str) -> MethodInfo {
    MethodInfo {
        class_name: binary(class),
        name: unqualified(name),
        descriptor: descriptor.to_owned(),
        access_flags: MethodAccessFlags::PUBLIC,
    }
}

fn fixture_classes() -> ClassInfoTable {
    let provider = ClassInfoTable::new();
    provider.add(ClassInfo::new(
        BinaryName::OBJECT,
        ClassKind::Class,
        ClassAccessFlags::PUBLIC,
        None,
    ));
    provider.add(ClassInfo::new(
        BinaryName::STRING,
        ClassKind::Class,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
        Some(BinaryName::OBJECT),
    ));

    let mut greeter = ClassInfo::new(
        binary("demo/Greeter"),
        ClassKind::Interface,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT,
        Some(BinaryName::OBJECT),
    );
    greeter.methods.push(method("demo/Greeter", "greet", "()I"));
    provider.add(greeter);

    let mut base = ClassInfo::new(
        binary("demo/Base"),
        ClassKind::Class,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        Some(BinaryName::OBJECT),
    );
    base.interfaces.push(binary("demo/Greeter"));
    base.fields.push(FieldInfo {
        name: unqualified("count"),
        descriptor: String::from("I"),
        access_flags: FieldAccessFlags::PUBLIC,
    });
    base.methods.push(method("demo/Base", "greet", "()I"));
    provider.add(base);

    let mut derived = ClassInfo::new(
        binary("demo/Derived"),
        ClassKind::Class,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        Some(binary("demo/Base")),
    );
    derived.methods.push(method("demo/Derived", "greet", "()I"));
    provider.add(derived);

    provider
}

fn read_i32(data: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

/// The interface-call stub over the emitted bytes: resolve `class_index`'s
/// itable in the descriptor at `descriptor`, then load the id at
/// `itable_byte_index`
fn walk_interface_call(
    data: &[u8],
    descriptor: usize,
    class_index: i32,
    itable_byte_index: usize,
) -> Option<i32> {
    let mut table = descriptor
        + read_i32(data, descriptor + TYPE_DESCRIPTION_INTERFACE_OFFSET) as usize;
    loop {
        let next_class = read_i32(data, table);
        if next_class == class_index {
            return Some(read_i32(data, table + itable_byte_index));
        }
        if next_class == 0 {
            return None;
        }
        table += read_i32(data, table + 4) as usize;
    }
}

/// The instanceof stub over the emitted bytes
fn walk_instance_of(data: &[u8], descriptor: usize, class_index: i32) -> bool {
    let list = descriptor
        + read_i32(data, descriptor + TYPE_DESCRIPTION_INSTANCEOF_OFFSET) as usize;
    let count = read_i32(data, list) as usize;
    (0..count).any(|entry| read_i32(data, list + 4 + 4 * entry) == class_index)
}

#[test]
fn dispatch_tables_round_trip() {
    let provider = fixture_classes();
    let arena = TypeArena::new();
    let types = TypeManager::new(&arena);
    let mut functions = FunctionManager::new();

    let greeter_func = func("demo/Greeter", "greet", "()I");
    let base_func = func("demo/Base", "greet", "()I");
    let derived_func = func("demo/Derived", "greet", "()I");
    functions.mark_as_needed(&greeter_func);
    functions.mark_as_needed(&base_func);

    let greeter = types.value_of("demo/Greeter").unwrap();
    let base = types.value_of("demo/Base").unwrap();
    let derived = types.value_of("demo/Derived").unwrap();
    let string = types.value_of("java/lang/String").unwrap();
    base.use_field_name("count");
    let ints = types.array_type(WasmType::Val(ValueType::I32)).unwrap();

    types.scan_type_hierarchy(&provider, &mut functions).unwrap();

    // the override of a used method is itself needed now
    assert!(functions.is_used(&derived_func));

    let mut writer = RecordingWriter::default();
    let mut strings = StringManager::new();
    types
        .prepare_finish(&mut writer, &provider, &mut functions, &mut strings)
        .unwrap();

    // every type follows its supertypes in the emitted order, and the
    // import stream covers exactly the declarable types
    assert!(writer.type_imports.contains(&String::from("demo/Derived")));
    assert!(!writer.type_imports.contains(&String::from("[I")));
    assert_eq!(writer.struct_types.len(), writer.type_imports.len());
    // definitions follow only for declared (non-external) types
    assert_eq!(writer.command_count, 3);

    // region offsets point where the regions were written
    for ty in [base, derived] {
        let descriptor = ty.vtable_offset();
        let itable_offset = read_i32(&writer.data, descriptor + TYPE_DESCRIPTION_INTERFACE_OFFSET);
        let vtable_len = ty.vtable().len();
        assert_eq!(itable_offset as usize, 16 + 4 * vtable_len);
        let instanceof_offset =
            read_i32(&writer.data, descriptor + TYPE_DESCRIPTION_INSTANCEOF_OFFSET);
        // itable region: one interface entry (header + one method) plus
        // the sentinel
        assert_eq!(instanceof_offset as usize, itable_offset as usize + 4 * 3 + 4);
    }

    // virtual dispatch: the published vtable index leads to the override
    let vtable_index = functions.vtable_index(&derived_func).unwrap();
    assert_eq!(vtable_index, 4);
    let loaded = read_i32(&writer.data, derived.vtable_offset() + 4 * vtable_index);
    assert_eq!(loaded as u32, writer.id_of(&derived_func));

    // interface dispatch: walking Derived's itable for Greeter resolves
    // the override, walking Base's resolves Base's own method
    let itable_index = functions.itable_index(&greeter_func).unwrap();
    assert_eq!(itable_index, 2);
    let resolved = walk_interface_call(
        &writer.data,
        derived.vtable_offset(),
        greeter.class_index() as i32,
        4 * itable_index,
    )
    .unwrap();
    assert_eq!(resolved as u32, writer.id_of(&derived_func));
    let resolved_base = walk_interface_call(
        &writer.data,
        base.vtable_offset(),
        greeter.class_index() as i32,
        4 * itable_index,
    )
    .unwrap();
    assert_eq!(resolved_base as u32, writer.id_of(&base_func));

    // a class index outside the itable hits the sentinel
    assert_eq!(
        walk_interface_call(
            &writer.data,
            derived.vtable_offset(),
            string.class_index() as i32,
            4 * itable_index,
        ),
        None
    );

    // instanceof: everything in the set answers 1, everything else 0
    for target in [derived, base, greeter] {
        assert!(walk_instance_of(
            &writer.data,
            derived.vtable_offset(),
            target.class_index() as i32,
        ));
    }
    let object = types.lookup("java/lang/Object").unwrap();
    assert!(walk_instance_of(
        &writer.data,
        derived.vtable_offset(),
        object.class_index() as i32,
    ));
    assert!(!walk_instance_of(
        &writer.data,
        derived.vtable_offset(),
        string.class_index() as i32,
    ));
    assert!(!walk_instance_of(
        &writer.data,
        base.vtable_offset(),
        derived.class_index() as i32,
    ));

    // arrays carry their component index and are assignable to Object
    assert_eq!(
        read_i32(&writer.data, ints.vtable_offset() + 12),
        5
    );
    assert!(walk_instance_of(
        &writer.data,
        ints.vtable_offset(),
        ints.class_index() as i32,
    ));

    // the flat type table holds one descriptor offset per registered type,
    // in registry order
    let table = types.type_table_offset();
    let registered = types.registered();
    assert_eq!(writer.data.len(), table + 4 * registered.len());
    for (entry, ty) in registered.iter().enumerate() {
        assert_eq!(
            read_i32(&writer.data, table + 4 * entry),
            ty.vtable_offset() as i32
        );
    }

    // the accessor stub reports exactly that offset
    let accessor = types.type_table_offset_function(&mut functions);
    assert_eq!(accessor.code, format!("i32.const {}", table));
    assert!(functions.is_used(&accessor.name));

    // scan is closed now
    assert!(types.value_of("too/Late").is_err());
}

#[test]
fn dispatch_stubs_register_against_the_writer() {
    let provider = fixture_classes();
    let arena = TypeArena::new();
    let types = TypeManager::new(&arena);
    let mut functions = FunctionManager::new();

    types.value_of("demo/Base").unwrap();
    types.scan_type_hierarchy(&provider, &mut functions).unwrap();

    let mut writer = RecordingWriter::default();
    let stubs = types
        .register_dispatch_stubs(&mut writer, &mut functions)
        .unwrap();

    let names: Vec<String> = stubs.iter().map(|s| s.name.full_name()).collect();
    assert_eq!(
        names,
        vec![".callVirtual", ".callInterface", ".instanceof", ".cast"]
    );
    assert_eq!(writer.imported_functions.len(), 4);
    for stub in &stubs {
        assert!(functions.is_used(&stub.name));
    }

    // the first stub parameter is always the receiver
    for stub in &stubs {
        assert!(matches!(stub.params[0], WasmType::Struct(_)));
    }
}

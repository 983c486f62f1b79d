//! The synthetic dispatch routines
//!
//! Three fixed routines walk the descriptors of
//! [`crate::translate::descriptor`] at run time: virtual call, interface
//! call and `instanceof` (with `cast` on top of it). They are expressed in
//! the target's textual instruction form and parameterized only by the
//! descriptor header offsets, so the byte layout and this code move
//! together.

use crate::translate::descriptor::{
    TYPE_DESCRIPTION_INSTANCEOF_OFFSET, TYPE_DESCRIPTION_INTERFACE_OFFSET,
};
use crate::jvm::{BinaryName, FunctionName, UnqualifiedName};
use crate::translate::{Error, FunctionRegistry, ModuleWriter, TypeManager};
use crate::wasm::{ValueType, WasmType};

/// A function the engine synthesizes: a name, a signature over engine
/// types and a textual instruction body
pub struct SyntheticFunction<'g> {
    pub name: FunctionName,
    pub params: Vec<WasmType<'g>>,
    pub result: Option<WasmType<'g>>,
    pub code: String,
}

impl<'g> TypeManager<'g> {
    /// `(this, vtable_byte_index) -> function_id`
    pub fn create_call_virtual(&self) -> Result<SyntheticFunction<'g>, Error> {
        let object = WasmType::Struct(self.value_of("java/lang/Object")?);
        Ok(SyntheticFunction {
            name: FunctionName::synthetic(UnqualifiedName::CALL_VIRTUAL),
            params: vec![object, WasmType::Val(ValueType::I32)],
            result: Some(WasmType::Val(ValueType::I32)),
            code: [
                "local.get 0",                          // this
                "struct.get java/lang/Object .vtable",  // descriptor start
                "local.get 1",                          // vtable byte index
                "i32.add",
                "i32.load offset=0 align=4",
                "return",
            ]
            .join(" "),
        })
    }

    /// `(this, class_index, itable_byte_index) -> function_id`
    ///
    /// Walks the itable region: each interface entry is its class index,
    /// the byte stride to the next entry, then the function ids. A zero
    /// class index is the end sentinel.
    pub fn create_call_interface(&self) -> Result<SyntheticFunction<'g>, Error> {
        let object = WasmType::Struct(self.value_of("java/lang/Object")?);
        let code = format!(
            concat!(
                "local.get 0 ",
                "struct.get java/lang/Object .vtable ", // descriptor start
                "local.tee 3 ",
                "i32.load offset={itable} align=4 ",
                "local.get 3 ",
                "i32.add ",
                "local.set 3 ", // now the itable region
                "loop ",
                "local.get 3 ",
                "i32.load offset=0 align=4 ",
                "local.tee 4 ", // candidate class index
                "local.get 1 ",
                "i32.eq ",
                "if ",
                "local.get 3 ",
                "local.get 2 ",
                "i32.add ",
                "i32.load offset=0 align=4 ",
                "return ",
                "end ",
                "local.get 4 ",
                "i32.eqz ",
                "if ", // sentinel: interface not found
                "unreachable ",
                "end ",
                "local.get 3 ",
                "i32.const 4 ",
                "i32.add ",
                "i32.load offset=0 align=4 ", // stride to the next entry
                "local.get 3 ",
                "i32.add ",
                "local.set 3 ",
                "br 0 ",
                "end ",
                "unreachable"
            ),
            itable = TYPE_DESCRIPTION_INTERFACE_OFFSET,
        );
        Ok(SyntheticFunction {
            name: FunctionName::synthetic(UnqualifiedName::CALL_INTERFACE),
            params: vec![
                object,
                WasmType::Val(ValueType::I32),
                WasmType::Val(ValueType::I32),
            ],
            result: Some(WasmType::Val(ValueType::I32)),
            code,
        })
    }

    /// `(this, class_index) -> 0 | 1`
    ///
    /// Reads the instanceof count and compares each listed class index.
    pub fn create_instance_of(&self) -> Result<SyntheticFunction<'g>, Error> {
        let object = WasmType::Struct(self.value_of("java/lang/Object")?);
        let code = format!(
            concat!(
                "local.get 0 ",
                "struct.get java/lang/Object .vtable ", // descriptor start
                "local.tee 2 ",
                "i32.load offset={instanceof} align=4 ",
                "local.get 2 ",
                "i32.add ",
                "local.tee 2 ", // now the instanceof region
                "i32.load offset=0 align=4 ", // entry count
                "i32.const 4 ",
                "i32.mul ",
                "local.get 2 ",
                "i32.add ",
                "local.set 3 ", // end position
                "loop ",
                "local.get 2 ",
                "local.get 3 ",
                "i32.eq ",
                "if ", // exhausted without a match
                "i32.const 0 ",
                "return ",
                "end ",
                "local.get 2 ",
                "i32.const 4 ",
                "i32.add ",
                "local.tee 2 ",
                "i32.load offset=0 align=4 ",
                "local.get 1 ",
                "i32.ne ",
                "br_if 0 ",
                "end ",
                "i32.const 1 ",
                "return"
            ),
            instanceof = TYPE_DESCRIPTION_INSTANCEOF_OFFSET,
        );
        Ok(SyntheticFunction {
            name: FunctionName::synthetic(UnqualifiedName::INSTANCE_OF),
            params: vec![object, WasmType::Val(ValueType::I32)],
            result: Some(WasmType::Val(ValueType::I32)),
            code,
        })
    }

    /// `(this, class_index) -> this`, trapping when the instance check
    /// fails
    pub fn create_cast(&self) -> Result<SyntheticFunction<'g>, Error> {
        let object = WasmType::Struct(self.value_of("java/lang/Object")?);
        Ok(SyntheticFunction {
            name: FunctionName::synthetic(UnqualifiedName::CAST),
            params: vec![object, WasmType::Val(ValueType::I32)],
            result: Some(object),
            code: [
                "local.get 0",          // this
                "local.get 1",          // class index
                "call $.instanceof()V", // synthetic placeholder signature
                "i32.eqz",
                "if",
                "unreachable",
                "end",
                "local.get 0",
                "return",
            ]
            .join(" "),
        })
    }

    /// Accessor for the byte offset of the flat type table; marked used so
    /// reflective code can always call it
    pub fn type_table_offset_function<F: FunctionRegistry>(
        &self,
        functions: &mut F,
    ) -> SyntheticFunction<'g> {
        let name = FunctionName::new(
            BinaryName::CLASS,
            UnqualifiedName::TYPE_TABLE_MEMORY_OFFSET,
            "()I",
        );
        functions.mark_as_needed(&name);
        SyntheticFunction {
            name,
            params: vec![],
            result: Some(WasmType::Val(ValueType::I32)),
            code: format!("i32.const {}", self.type_table_offset()),
        }
    }

    /// The pre-declared factory reflective code calls to materialize a
    /// `java/lang/Class` from a class index
    pub fn class_constant_function(&self) -> FunctionName {
        FunctionName::new(
            BinaryName::CLASS,
            UnqualifiedName::CLASS_CONSTANT,
            "(I)Ljava/lang/Class;",
        )
    }

    /// Synthesize all four dispatch stubs, mark them used and import them
    /// into the module
    pub fn register_dispatch_stubs<F, W>(
        &self,
        writer: &mut W,
        functions: &mut F,
    ) -> Result<Vec<SyntheticFunction<'g>>, Error>
    where
        F: FunctionRegistry,
        W: ModuleWriter<'g>,
    {
        let stubs = vec![
            self.create_call_virtual()?,
            self.create_call_interface()?,
            self.create_instance_of()?,
            self.create_cast()?,
        ];
        for stub in &stubs {
            functions.mark_as_needed(&stub.name);
            writer.import_function(&stub.name);
        }
        Ok(stubs)
    }
}

#[cfg(test)]
mod test {
    use crate::translate::testing::MockWriter;
    use crate::translate::{FunctionManager, FunctionRegistry, TypeArena, TypeManager};

    #[test]
    fn stub_offsets_match_descriptor_layout() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);

        let interface_call = types.create_call_interface().unwrap();
        assert!(interface_call.code.contains("i32.load offset=0 align=4"));
        assert_eq!(interface_call.params.len(), 3);

        let instance_of = types.create_instance_of().unwrap();
        assert!(instance_of.code.contains("i32.load offset=4 align=4"));
        assert_eq!(instance_of.name.full_name(), ".instanceof");
    }

    #[test]
    fn cast_calls_the_instanceof_stub() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        let cast = types.create_cast().unwrap();
        assert!(cast.code.contains("call $.instanceof()V"));
        assert!(cast.result.is_some());
    }

    #[test]
    fn registering_stubs_marks_them_used() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        let mut writer = MockWriter::new();
        let mut functions = FunctionManager::new();

        let stubs = types
            .register_dispatch_stubs(&mut writer, &mut functions)
            .unwrap();
        assert_eq!(stubs.len(), 4);
        assert_eq!(writer.imported_functions.len(), 4);
        for stub in &stubs {
            assert!(functions.is_used(&stub.name));
        }
    }

    #[test]
    fn type_table_accessor_is_marked_used() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        let mut functions = FunctionManager::new();
        let accessor = types.type_table_offset_function(&mut functions);
        assert_eq!(accessor.code, "i32.const 0");
        assert!(functions.is_used(&accessor.name));
        assert_eq!(
            accessor.name.signature_name(),
            "java/lang/Class.typeTableMemoryOffset()I"
        );
    }

    #[test]
    fn class_constant_factory_name() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        assert_eq!(
            types.class_constant_function().signature_name(),
            "java/lang/Class.classConstant(I)Ljava/lang/Class;"
        );
    }
}

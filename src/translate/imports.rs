//! Emission of per-type declaration and definition imports
//!
//! Declarations introduce a type by name, flags and supertypes; for
//! declared (non-external) classes and interfaces a definition follows
//! listing members. Reference types inside payloads collapse to `L` with
//! the actual handle carried as an import argument.

use crate::jawa::{jawa_field_type, JawaFieldFlags, JawaMethodFlags, JawaSignature, PayloadWriter, TypeOpcode};
use crate::jvm::{ClassFileProvider, FieldInfo, MethodInfo};
use crate::translate::{
    Error, FunctionRegistry, ImportArgument, ModuleWriter, TypeId, TypeManager, IMPORT_MODULE,
};
use crate::wasm::WasmType;
use tracing::debug;

impl<'g> TypeManager<'g> {
    /// Emit the declaration import of `ty`, then its definition when it is
    /// declared here rather than externally defined
    pub(crate) fn write_import_type<P, F, W>(
        &self,
        ty: TypeId<'g>,
        writer: &mut W,
        provider: &P,
        functions: &mut F,
    ) -> Result<(), Error>
    where
        P: ClassFileProvider,
        F: FunctionRegistry,
        W: ModuleWriter<'g>,
    {
        debug!("write type import: {}", ty.name());
        let opcode = match ty.type_code() {
            Some(opcode) => opcode,
            // primitives and arrays take no import record
            None => return Ok(()),
        };

        let mut payload = PayloadWriter::new();
        payload.write_opcode(opcode)?;
        payload.write_name(ty.name())?;

        match opcode {
            TypeOpcode::DeclClass => {
                payload.write_ji2(ty.target_flags().map(|f| f.bits()).unwrap_or(0))?;
                let mut args: Vec<TypeId<'g>> = vec![];
                if let Some(parent) = ty.parent() {
                    args.push(parent);
                }
                {
                    let interfaces = ty.interfaces();
                    payload.write_ji4(interfaces.len() as u32)?;
                    args.extend(interfaces.iter().copied());
                }
                writer.import_type(IMPORT_MODULE, payload.into_bytes(), ty, &args);
                self.write_import_command(ty, writer, provider, functions)?;
            }
            TypeOpcode::DeclInterface => {
                let args: Vec<TypeId<'g>> = {
                    let interfaces = ty.interfaces();
                    payload.write_ji4(interfaces.len() as u32)?;
                    interfaces.iter().copied().collect()
                };
                writer.import_type(IMPORT_MODULE, payload.into_bytes(), ty, &args);
                self.write_import_command(ty, writer, provider, functions)?;
            }
            _ => {
                // externally defined: name and parent only
                let mut args: Vec<TypeId<'g>> = vec![];
                if let Some(parent) = ty.parent() {
                    args.push(parent);
                }
                writer.import_type(IMPORT_MODULE, payload.into_bytes(), ty, &args);
            }
        }
        Ok(())
    }

    fn write_import_command<P, F, W>(
        &self,
        ty: TypeId<'g>,
        writer: &mut W,
        provider: &P,
        functions: &mut F,
    ) -> Result<(), Error>
    where
        P: ClassFileProvider,
        F: FunctionRegistry,
        W: ModuleWriter<'g>,
    {
        debug!("write type definition: {}", ty.name());
        let class_file = provider.get(ty.name()).ok_or_else(|| Error::MissingClass {
            class_name: ty.name().to_owned(),
        })?;

        if class_file.is_interface() {
            let mut payload = PayloadWriter::new();
            payload.write_opcode(TypeOpcode::DefInterface)?;
            let mut args = vec![ImportArgument::Type(WasmType::Struct(ty))];

            let used_methods: Vec<&MethodInfo> = class_file
                .methods
                .iter()
                .filter(|method| functions.is_used(&method.function_name()))
                .collect();
            payload.write_ji4(used_methods.len() as u32)?;
            for method in used_methods {
                self.write_method_record(&mut payload, &mut args, method, writer)?;
            }

            writer.import_command(IMPORT_MODULE, payload.into_bytes(), args);
            return Ok(());
        }

        let (static_fields, instance_fields): (Vec<&FieldInfo>, Vec<&FieldInfo>) =
            class_file.fields.iter().partition(|field| field.is_static());
        let used_methods: Vec<&MethodInfo> = class_file
            .methods
            .iter()
            .filter(|method| functions.is_used(&method.function_name()))
            .collect();
        let (static_methods, instance_methods): (Vec<&MethodInfo>, Vec<&MethodInfo>) =
            used_methods.into_iter().partition(|method| method.is_static());

        let mut payload = PayloadWriter::new();
        payload.write_opcode(TypeOpcode::DefClass)?;
        let mut args = vec![ImportArgument::Type(WasmType::Struct(ty))];

        payload.write_ji4(instance_fields.len() as u32)?;
        for field in instance_fields {
            self.write_field_record(&mut payload, &mut args, field)?;
        }
        payload.write_ji4(instance_methods.len() as u32)?;
        for method in instance_methods {
            self.write_method_record(&mut payload, &mut args, method, writer)?;
        }
        payload.write_ji4(static_fields.len() as u32)?;
        for field in static_fields {
            self.write_field_record(&mut payload, &mut args, field)?;
        }
        payload.write_ji4(static_methods.len() as u32)?;
        for method in static_methods {
            self.write_method_record(&mut payload, &mut args, method, writer)?;
        }

        writer.import_command(IMPORT_MODULE, payload.into_bytes(), args);
        Ok(())
    }

    fn write_field_record(
        &self,
        payload: &mut PayloadWriter,
        args: &mut Vec<ImportArgument<'g>>,
        field: &FieldInfo,
    ) -> Result<(), Error> {
        payload.write_name(field.name.as_str())?;
        payload.write_ji2(JawaFieldFlags::from_jvm(field.access_flags).bits())?;
        match jawa_field_type(&field.descriptor, self)? {
            None => payload.write_sig(&field.descriptor)?,
            Some(field_type) => {
                payload.write_sig("L")?;
                args.push(ImportArgument::Type(WasmType::Struct(field_type)));
            }
        }
        Ok(())
    }

    fn write_method_record<W: ModuleWriter<'g>>(
        &self,
        payload: &mut PayloadWriter,
        args: &mut Vec<ImportArgument<'g>>,
        method: &MethodInfo,
        writer: &W,
    ) -> Result<(), Error> {
        payload.write_name(method.name.as_str())?;
        payload.write_ji2(JawaMethodFlags::from_jvm(method.access_flags).bits())?;
        let signature = JawaSignature::build(&method.descriptor, self)?;
        // the count excludes the return character
        payload.write_ji2((signature.sig().len() - 1) as u16)?;
        payload.write_sig(signature.sig())?;
        for type_arg in signature.type_args() {
            args.push(ImportArgument::Type(WasmType::Struct(*type_arg)));
        }
        args.push(ImportArgument::Function(
            writer.function_id(&method.function_name()),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::jawa::TypeOpcode;
    use crate::jvm::ClassInfoTable;
    use crate::translate::testing::{func, ClassBuilder, MockWriter};
    use crate::translate::{FunctionManager, FunctionRegistry, StringManager, TypeArena, TypeManager};

    #[test]
    fn declaration_and_definition_payloads() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        let provider = ClassInfoTable::new();
        provider.add(ClassBuilder::object().build());
        provider.add(ClassBuilder::interface("Greets").method("greet", "()V").build());
        provider.add(
            ClassBuilder::class("Person", "java/lang/Object")
                .implements("Greets")
                .field("age", "I")
                .static_field("count", "I")
                .method("greet", "()V")
                .build(),
        );

        let mut functions = FunctionManager::new();
        functions.mark_as_needed(&func("Greets", "greet", "()V"));
        functions.mark_as_needed(&func("Person", "greet", "()V"));

        types.value_of("Greets").unwrap();
        let person = types.value_of("Person").unwrap();
        person.use_field_name("age");
        types.scan_type_hierarchy(&provider, &mut functions).unwrap();

        let mut writer = MockWriter::new();
        let mut strings = StringManager::new();
        types
            .prepare_finish(&mut writer, &provider, &mut functions, &mut strings)
            .unwrap();

        // Object (external), Greets, Person - in emission order
        assert_eq!(writer.type_imports.len(), 3);
        let object = &writer.type_imports[0];
        assert_eq!(object.declared, "java/lang/Object");
        assert_eq!(object.payload[0], TypeOpcode::ExtClass.opcode());
        assert!(object.args.is_empty());

        let greets = &writer.type_imports[1];
        assert_eq!(greets.payload[0], TypeOpcode::DeclInterface.opcode());
        assert!(greets.args.is_empty());

        let person_import = &writer.type_imports[2];
        assert_eq!(person_import.payload[0], TypeOpcode::DeclClass.opcode());
        assert_eq!(person_import.args, vec!["java/lang/Object", "Greets"]);

        // one definition each for Greets and Person
        assert_eq!(writer.commands.len(), 2);
        let greets_def = &writer.commands[0];
        assert_eq!(greets_def.payload[0], TypeOpcode::DefInterface.opcode());
        let person_def = &writer.commands[1];
        assert_eq!(person_def.payload[0], TypeOpcode::DefClass.opcode());
        // self, the greet function id; the static count field is declared
        // but references no type
        assert_eq!(person_def.args[0], "$Person");
        let greet_id = writer.id_of(&func("Person", "greet", "()V"));
        assert!(person_def.args.contains(&format!("fn#{}", greet_id)));

        // struct types registered for every declarable type, in emission
        // order
        assert_eq!(
            writer.struct_types,
            vec!["java/lang/Object", "Greets", "Person"]
        );
    }

    #[test]
    fn definition_counts_cover_all_four_groups() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        let provider = ClassInfoTable::new();
        provider.add(ClassBuilder::object().build());
        provider.add(
            ClassBuilder::class("Counter", "java/lang/Object")
                .field("value", "I")
                .static_field("total", "J")
                .method("value", "()I")
                .static_method("total", "()J")
                .build(),
        );

        let mut functions = FunctionManager::new();
        functions.mark_as_needed(&func("Counter", "value", "()I"));
        functions.mark_as_needed(&func("Counter", "total", "()J"));

        types.value_of("Counter").unwrap();
        types.scan_type_hierarchy(&provider, &mut functions).unwrap();

        let mut writer = MockWriter::new();
        let mut strings = StringManager::new();
        types
            .prepare_finish(&mut writer, &provider, &mut functions, &mut strings)
            .unwrap();

        let def = &writer.commands[0];
        // opcode, then [count=1]["value" I][count=1][method][count=1]
        // ["total" J][count=1][method]
        assert_eq!(def.payload[0], TypeOpcode::DefClass.opcode());
        let mut offset = 1;
        let mut counts = vec![];
        for _ in 0..2 {
            // field group
            counts.push(u32::from_le_bytes(def.payload[offset..offset + 4].try_into().unwrap()));
            offset += 4;
            let name_len =
                u16::from_le_bytes(def.payload[offset..offset + 2].try_into().unwrap()) as usize;
            offset += 2 + name_len + 2 + 1; // name, flags, one signature char
            // method group
            counts.push(u32::from_le_bytes(def.payload[offset..offset + 4].try_into().unwrap()));
            offset += 4;
            let name_len =
                u16::from_le_bytes(def.payload[offset..offset + 2].try_into().unwrap()) as usize;
            offset += 2 + name_len + 2;
            let sig_len =
                u16::from_le_bytes(def.payload[offset..offset + 2].try_into().unwrap()) as usize;
            offset += 2 + sig_len + 1; // sig chars include the return type
        }
        assert_eq!(counts, vec![1, 1, 1, 1]);
        assert_eq!(offset, def.payload.len());
    }
}

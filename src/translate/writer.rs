use crate::jvm::FunctionName;
use crate::translate::TypeId;
use crate::wasm::WasmType;

/// Namespace every engine import lands in
pub const IMPORT_MODULE: &str = "jawa";

/// One argument of a definition import
#[derive(Debug)]
pub enum ImportArgument<'g> {
    /// A type the payload references out of band
    Type(WasmType<'g>),

    /// The id of an implementing function
    Function(u32),
}

/// The module being produced, as the type engine drives it
///
/// The engine never touches the output file: it describes types through
/// import records, asks for function ids, and appends descriptor bytes to
/// the data section. The writer owns section layout, renaming and the
/// final encoding.
pub trait ModuleWriter<'g> {
    /// Emit a declaration import for `declared`; `args` are the type
    /// handles the payload references (parent, interfaces)
    fn import_type(&mut self, module: &str, payload: Vec<u8>, declared: TypeId<'g>, args: &[TypeId<'g>]);

    /// Emit a definition import (member lists) with its argument vector
    fn import_command(&mut self, module: &str, payload: Vec<u8>, args: Vec<ImportArgument<'g>>);

    /// Import a synthetic function so the target module can call it
    fn import_function(&mut self, function: &FunctionName);

    /// Register `declared` in the module's struct-type section, returning
    /// its type code
    fn write_struct_type(&mut self, declared: TypeId<'g>) -> u32;

    /// Final function id of a needed function
    fn function_id(&self, function: &FunctionName) -> u32;

    /// The data section; its current length is the write cursor
    fn data(&mut self) -> &mut Vec<u8>;

    /// Current byte offset of the data section cursor
    fn data_size(&self) -> usize;
}

use crate::translate::TypeId;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Value types of the target stack machine
///
/// `I8`, `U16` and `I16` are storage-only widths (field and array
/// elements); on the evaluation stack they widen to `I32`. There is no
/// `void` variant: an absent [`WasmType`] encodes `void`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ValueType {
    Bool,
    I8,
    U16,
    I16,
    I32,
    I64,
    F32,
    F64,
    Externref,
    Funcref,
    Anyref,
    Eqref,
}

impl ValueType {
    /// The JVM descriptor character whose values this type stores, or
    /// `None` for reference types without a storage class of their own
    ///
    /// `I8` answers `B`: the descriptor grammar folds `char` into the byte
    /// storage class, so `C` never round-trips.
    pub fn descriptor_char(self) -> Option<char> {
        match self {
            ValueType::Bool => Some('Z'),
            ValueType::I8 => Some('B'),
            ValueType::U16 => Some('C'),
            ValueType::I16 => Some('S'),
            ValueType::I32 => Some('I'),
            ValueType::I64 => Some('J'),
            ValueType::F32 => Some('F'),
            ValueType::F64 => Some('D'),
            ValueType::Externref | ValueType::Funcref | ValueType::Anyref | ValueType::Eqref => {
                None
            }
        }
    }
}

/// Renders the textual instruction-form name (`i32`, `externref`, ...)
impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::I8 => "i8",
            ValueType::U16 => "u16",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::Externref => "externref",
            ValueType::Funcref => "funcref",
            ValueType::Anyref => "anyref",
            ValueType::Eqref => "eqref",
        };
        f.write_str(name)
    }
}

/// Any type a signature can mention: a plain value type or a handle to a
/// registered struct type (class, interface or array)
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum WasmType<'g> {
    Val(ValueType),
    Struct(TypeId<'g>),
}

impl<'g> WasmType<'g> {
    pub fn is_ref_type(&self) -> bool {
        matches!(self, WasmType::Struct(_))
    }

    /// The struct handle, when this is one
    pub fn struct_type(&self) -> Option<TypeId<'g>> {
        match self {
            WasmType::Val(_) => None,
            WasmType::Struct(id) => Some(*id),
        }
    }
}

impl<'g> Display for WasmType<'g> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WasmType::Val(value_type) => value_type.fmt(f),
            WasmType::Struct(id) => write!(f, "${}", id.name()),
        }
    }
}

impl<'g> From<ValueType> for WasmType<'g> {
    fn from(value_type: ValueType) -> WasmType<'g> {
        WasmType::Val(value_type)
    }
}

//! Translation of JVM method descriptors into the target's signature form
//!
//! The target collapses every reference type to the single character `L`
//! and carries the actual type as an out-of-band import argument. Primitive
//! characters pass through unchanged, so `(ILjava/lang/String;)V` becomes
//! the signature string `ILV` plus one type argument for the string class.

use crate::translate::{Error, TypeId, TypeManager};
use crate::wasm::WasmType;
use std::str::Chars;

/// A method descriptor translated for an import record
pub struct JawaSignature<'g> {
    sig: String,
    type_args: Vec<TypeId<'g>>,
}

impl<'g> JawaSignature<'g> {
    /// Translate `descriptor`, resolving reference types through `types`
    ///
    /// Every type the descriptor mentions must already be interned (or the
    /// scan phase must still be open); import emission runs after scan
    /// close, when a fresh name would be a late registration.
    pub fn build(descriptor: &str, types: &TypeManager<'g>) -> Result<JawaSignature<'g>, Error> {
        let bad = || Error::BadSignature {
            signature: descriptor.to_owned(),
        };

        let mut chars = descriptor.chars();
        if chars.next() != Some('(') {
            return Err(bad());
        }

        let mut sig = String::new();
        let mut type_args = vec![];
        let push = |token: String,
                        sig: &mut String,
                        type_args: &mut Vec<TypeId<'g>>|
         -> Result<(), Error> {
            match types.value_of_sig(&token)? {
                Some(WasmType::Val(value_type)) => {
                    // single primitive character, kept verbatim
                    sig.push_str(&token);
                    debug_assert_eq!(token.len(), 1, "primitive token {:?}", value_type);
                }
                Some(WasmType::Struct(id)) => {
                    sig.push('L');
                    type_args.push(id);
                }
                None => return Err(bad()),
            }
            Ok(())
        };

        while chars.clone().next() != Some(')') {
            let token = next_field_type(&mut chars).ok_or_else(bad)?;
            push(token, &mut sig, &mut type_args)?;
        }
        let _ = chars.next();

        // return type; `V` has no registry entry
        match chars.clone().next() {
            None => return Err(bad()),
            Some('V') => {
                let _ = chars.next();
                sig.push('V');
            }
            Some(_) => {
                let token = next_field_type(&mut chars).ok_or_else(bad)?;
                push(token, &mut sig, &mut type_args)?;
            }
        }
        if chars.next().is_some() {
            return Err(bad());
        }

        Ok(JawaSignature { sig, type_args })
    }

    /// Parameter characters followed by the return character
    pub fn sig(&self) -> &str {
        &self.sig
    }

    /// Reference types in signature order (return type last, when present)
    pub fn type_args(&self) -> &[TypeId<'g>] {
        &self.type_args
    }
}

/// Resolve a field descriptor for an import record: `None` means the
/// primitive character is written verbatim, `Some` means `L` plus a type
/// argument
pub fn jawa_field_type<'g>(
    descriptor: &str,
    types: &TypeManager<'g>,
) -> Result<Option<TypeId<'g>>, Error> {
    match types.value_of_sig(descriptor)? {
        Some(WasmType::Val(_)) => Ok(None),
        Some(WasmType::Struct(id)) => Ok(Some(id)),
        None => Err(Error::BadSignature {
            signature: descriptor.to_owned(),
        }),
    }
}

/// Split one field-type token off the front of a descriptor cursor
fn next_field_type(chars: &mut Chars) -> Option<String> {
    match chars.next()? {
        c @ ('Z' | 'B' | 'C' | 'S' | 'I' | 'J' | 'F' | 'D') => Some(c.to_string()),
        'L' => {
            let mut token = String::from("L");
            loop {
                let c = chars.next()?;
                token.push(c);
                if c == ';' {
                    return Some(token);
                }
            }
        }
        '[' => {
            let inner = next_field_type(chars)?;
            Some(format!("[{}", inner))
        }
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::translate::{TypeArena, TypeManager};

    #[test]
    fn primitives_pass_through() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        let sig = JawaSignature::build("(IZD)J", &types).unwrap();
        assert_eq!(sig.sig(), "IZDJ");
        assert!(sig.type_args().is_empty());
    }

    #[test]
    fn references_collapse_to_l() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        let sig = JawaSignature::build("(ILjava/lang/String;)Ljava/lang/Object;", &types).unwrap();
        assert_eq!(sig.sig(), "ILL");
        assert_eq!(sig.type_args().len(), 2);
        assert_eq!(sig.type_args()[0].name(), "java/lang/String");
        assert_eq!(sig.type_args()[1].name(), "java/lang/Object");
    }

    #[test]
    fn arrays_are_references() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        let sig = JawaSignature::build("([I)V", &types).unwrap();
        assert_eq!(sig.sig(), "LV");
        assert_eq!(sig.type_args()[0].name(), "[I");
    }

    #[test]
    fn malformed_descriptors_are_rejected() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        assert!(JawaSignature::build("(Q)V", &types).is_err());
        assert!(JawaSignature::build("(I", &types).is_err());
        assert!(JawaSignature::build("IV", &types).is_err());
        assert!(JawaSignature::build("(I)VX", &types).is_err());
    }

    #[test]
    fn field_types() {
        let arena = TypeArena::new();
        let types = TypeManager::new(&arena);
        assert!(jawa_field_type("I", &types).unwrap().is_none());
        let object = jawa_field_type("Ljava/lang/Object;", &types).unwrap();
        assert_eq!(object.map(|t| t.name().to_owned()).as_deref(), Some("java/lang/Object"));
        assert!(jawa_field_type("V", &types).is_err());
    }
}

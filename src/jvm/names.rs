use std::borrow::Cow;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

/// Names of classes and interfaces, slash-separated (`java/lang/Object`)
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct BinaryName(Cow<'static, str>);

/// Names of methods and fields
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.2>
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct UnqualifiedName(Cow<'static, str>);

impl BinaryName {
    const fn name(value: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(value))
    }

    /// Check if a string would be a valid binary name
    pub fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(String::from("Binary name is empty"));
        }
        for segment in name.split('/') {
            UnqualifiedName::check_valid(segment)?;
        }
        Ok(())
    }

    pub fn from_string(name: String) -> Result<BinaryName, String> {
        BinaryName::check_valid(&name)?;
        Ok(BinaryName(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    /// The dotted form used by reflective metadata (`java.lang.Object`)
    pub fn dotted(&self) -> String {
        self.as_str().replace('/', ".")
    }

    /// Owner component of synthetic functions; renders to nothing so the
    /// full name starts with a dot, which is not a valid Java identifier
    pub(crate) const SYNTHETIC: Self = Self::name("");

    pub const OBJECT: Self = Self::name("java/lang/Object");
    pub const STRING: Self = Self::name("java/lang/String");
    pub const CLASS: Self = Self::name("java/lang/Class");
}

impl UnqualifiedName {
    const fn name(value: &'static str) -> UnqualifiedName {
        UnqualifiedName(Cow::Borrowed(value))
    }

    /// Check if a string would be a valid unqualified name
    pub fn check_valid(name: impl AsRef<str>) -> Result<(), String> {
        let name = name.as_ref();
        if name.is_empty() {
            Err(String::from("Unqualified name is empty"))
        } else if name.contains(&['.', ';', '[', '/'][..]) {
            Err(format!(
                "Unqualified name '{}' contains an illegal character",
                name
            ))
        } else {
            Ok(())
        }
    }

    pub fn from_string(name: String) -> Result<UnqualifiedName, String> {
        UnqualifiedName::check_valid(&name)?;
        Ok(UnqualifiedName(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    // Special names - only these may contain angle brackets
    pub const INIT: Self = Self::name("<init>");
    pub const CLINIT: Self = Self::name("<clinit>");

    // Synthetic instance fields, dot-prefixed so no Java field can collide
    pub const VTABLE: Self = Self::name(".vtable");
    pub const HASHCODE: Self = Self::name(".hashcode");

    // Names of the synthesized dispatch routines
    pub const CALL_VIRTUAL: Self = Self::name("callVirtual");
    pub const CALL_INTERFACE: Self = Self::name("callInterface");
    pub const INSTANCE_OF: Self = Self::name("instanceof");
    pub const CAST: Self = Self::name("cast");
    pub const TYPE_TABLE_MEMORY_OFFSET: Self = Self::name("typeTableMemoryOffset");
    pub const CLASS_CONSTANT: Self = Self::name("classConstant");
}

impl AsRef<str> for BinaryName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl AsRef<str> for UnqualifiedName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Debug for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_ref())
    }
}

impl Debug for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_ref())
    }
}

impl Display for BinaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_ref())
    }
}

impl Display for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_ref())
    }
}

/// Identity of a function: owning class, method name and JVM signature
///
/// Dispatch tables, the function registry and the module writer all agree
/// on this triple; two handles naming the same triple are the same
/// function.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct FunctionName {
    pub class_name: BinaryName,
    pub method_name: UnqualifiedName,
    pub signature: String,
}

impl FunctionName {
    pub fn new(
        class_name: BinaryName,
        method_name: UnqualifiedName,
        signature: impl Into<String>,
    ) -> FunctionName {
        FunctionName {
            class_name,
            method_name,
            signature: signature.into(),
        }
    }

    /// Name a synthetic function that belongs to no class; these carry the
    /// placeholder `()V` signature and render as `.name`
    pub fn synthetic(method_name: UnqualifiedName) -> FunctionName {
        FunctionName {
            class_name: BinaryName::SYNTHETIC,
            method_name,
            signature: String::from("()V"),
        }
    }

    /// `class.method` without the signature
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }

    /// `class.method(sig)ret`, the form used in diagnostics
    pub fn signature_name(&self) -> String {
        format!("{}{}", self.full_name(), self.signature)
    }
}

impl Debug for FunctionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}:{}",
            self.class_name, self.method_name, self.signature
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(BinaryName::check_valid("java/lang/Object").is_ok());
        assert!(BinaryName::check_valid("Simple").is_ok());
        assert!(BinaryName::check_valid("bad//segment").is_err());
        assert!(BinaryName::check_valid("").is_err());
        assert!(UnqualifiedName::check_valid("size").is_ok());
        assert!(UnqualifiedName::check_valid("a.b").is_err());
    }

    #[test]
    fn synthetic_full_name_starts_with_dot() {
        let name =
            FunctionName::synthetic(UnqualifiedName::from_string("instanceof".into()).unwrap());
        assert_eq!(name.full_name(), ".instanceof");
        assert_eq!(name.signature_name(), ".instanceof()V");
    }

    #[test]
    fn dotted() {
        assert_eq!(BinaryName::OBJECT.dotted(), "java.lang.Object");
    }
}

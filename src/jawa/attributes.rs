//! Translation of JVM access flags into the target module's taxonomy
//!
//! The target keeps only the bits its loader and verifier act on; JVM-only
//! bits (SUPER, SYNCHRONIZED, BRIDGE, ...) are dropped here.

use crate::jvm::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use bitflags::bitflags;

bitflags! {
    /// Class attributes in the target taxonomy
    pub struct JawaClassFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0002;
        const INTERFACE = 0x0004;
        const ABSTRACT = 0x0008;
    }
}

bitflags! {
    /// Field attributes in the target taxonomy
    pub struct JawaFieldFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
    }
}

bitflags! {
    /// Method attributes in the target taxonomy
    pub struct JawaMethodFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const ABSTRACT = 0x0020;
    }
}

impl JawaClassFlags {
    pub fn from_jvm(flags: ClassAccessFlags) -> JawaClassFlags {
        let mut jawa = JawaClassFlags::empty();
        if flags.contains(ClassAccessFlags::PUBLIC) {
            jawa |= JawaClassFlags::PUBLIC;
        }
        if flags.contains(ClassAccessFlags::FINAL) {
            jawa |= JawaClassFlags::FINAL;
        }
        if flags.contains(ClassAccessFlags::INTERFACE) {
            jawa |= JawaClassFlags::INTERFACE;
        }
        if flags.contains(ClassAccessFlags::ABSTRACT) {
            jawa |= JawaClassFlags::ABSTRACT;
        }
        jawa
    }
}

impl JawaFieldFlags {
    pub fn from_jvm(flags: FieldAccessFlags) -> JawaFieldFlags {
        let mut jawa = JawaFieldFlags::empty();
        if flags.contains(FieldAccessFlags::PUBLIC) {
            jawa |= JawaFieldFlags::PUBLIC;
        }
        if flags.contains(FieldAccessFlags::PRIVATE) {
            jawa |= JawaFieldFlags::PRIVATE;
        }
        if flags.contains(FieldAccessFlags::PROTECTED) {
            jawa |= JawaFieldFlags::PROTECTED;
        }
        if flags.contains(FieldAccessFlags::STATIC) {
            jawa |= JawaFieldFlags::STATIC;
        }
        if flags.contains(FieldAccessFlags::FINAL) {
            jawa |= JawaFieldFlags::FINAL;
        }
        jawa
    }
}

impl JawaMethodFlags {
    pub fn from_jvm(flags: MethodAccessFlags) -> JawaMethodFlags {
        let mut jawa = JawaMethodFlags::empty();
        if flags.contains(MethodAccessFlags::PUBLIC) {
            jawa |= JawaMethodFlags::PUBLIC;
        }
        if flags.contains(MethodAccessFlags::PRIVATE) {
            jawa |= JawaMethodFlags::PRIVATE;
        }
        if flags.contains(MethodAccessFlags::PROTECTED) {
            jawa |= JawaMethodFlags::PROTECTED;
        }
        if flags.contains(MethodAccessFlags::STATIC) {
            jawa |= JawaMethodFlags::STATIC;
        }
        if flags.contains(MethodAccessFlags::FINAL) {
            jawa |= JawaMethodFlags::FINAL;
        }
        if flags.contains(MethodAccessFlags::ABSTRACT) {
            jawa |= JawaMethodFlags::ABSTRACT;
        }
        jawa
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn class_flags_drop_jvm_only_bits() {
        let jvm = ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER | ClassAccessFlags::ABSTRACT;
        assert_eq!(
            JawaClassFlags::from_jvm(jvm),
            JawaClassFlags::PUBLIC | JawaClassFlags::ABSTRACT
        );
    }

    #[test]
    fn interface_bit_translates() {
        let jvm = ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
        let jawa = JawaClassFlags::from_jvm(jvm);
        assert!(jawa.contains(JawaClassFlags::INTERFACE));
    }
}

use crate::jawa::TypeOpcode;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Error, ErrorKind, Result};

/// Builder for type import payloads
///
/// Integer widths follow the target's `JI2`/`JI4` convention (2 and 4
/// little-endian bytes); names are JI2-length-prefixed UTF-8; signature
/// characters are written raw.
#[derive(Default)]
pub struct PayloadWriter {
    bytes: Vec<u8>,
}

impl PayloadWriter {
    pub fn new() -> PayloadWriter {
        PayloadWriter { bytes: vec![] }
    }

    pub fn write_opcode(&mut self, opcode: TypeOpcode) -> Result<()> {
        self.bytes.write_u8(opcode.opcode())
    }

    pub fn write_ji2(&mut self, value: u16) -> Result<()> {
        self.bytes.write_u16::<LittleEndian>(value)
    }

    pub fn write_ji4(&mut self, value: u32) -> Result<()> {
        self.bytes.write_u32::<LittleEndian>(value)
    }

    /// Length-prefixed name
    pub fn write_name(&mut self, name: &str) -> Result<()> {
        let length = u16::try_from(name.len()).map_err(|_| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Name too long for a JI2 length prefix: {}", name),
            )
        })?;
        self.write_ji2(length)?;
        self.bytes.extend_from_slice(name.as_bytes());
        Ok(())
    }

    /// Raw signature characters, no length prefix
    pub fn write_sig(&mut self, sig: &str) -> Result<()> {
        self.bytes.extend_from_slice(sig.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integers_are_little_endian() {
        let mut payload = PayloadWriter::new();
        payload.write_ji2(0x0102).unwrap();
        payload.write_ji4(0x0A0B0C0D).unwrap();
        assert_eq!(
            payload.into_bytes(),
            vec![0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A]
        );
    }

    #[test]
    fn names_are_length_prefixed() {
        let mut payload = PayloadWriter::new();
        payload.write_opcode(TypeOpcode::DeclClass).unwrap();
        payload.write_name("A/B").unwrap();
        assert_eq!(
            payload.into_bytes(),
            vec![0x01, 0x03, 0x00, b'A', b'/', b'B']
        );
    }
}

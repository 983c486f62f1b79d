//! Serialization of per-type runtime descriptors into the data section
//!
//! The dispatch stubs walk these bytes at run time, so the layout here and
//! the code in [`crate::translate::stubs`] must stay in lock step.

use crate::translate::types::VTABLE_FIRST_FUNCTION_INDEX;
use crate::translate::{ModuleWriter, StringManager, TypeData};
use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

/// Byte position of the offset to the itable region. Length 4 bytes.
pub const TYPE_DESCRIPTION_INTERFACE_OFFSET: usize = 0;

/// Byte position of the offset to the instanceof list. Length 4 bytes.
pub const TYPE_DESCRIPTION_INSTANCEOF_OFFSET: usize = 4;

/// Byte position of the class name's string id. Length 4 bytes.
pub const TYPE_DESCRIPTION_TYPE_NAME: usize = 8;

/// Byte position of the array component class index. Length 4 bytes.
pub const TYPE_DESCRIPTION_ARRAY_TYPE: usize = 12;

impl<'g> TypeData<'g> {
    /// Append this type's descriptor to the data section and record its
    /// offset
    ///
    /// ```text
    ///  ┌───────────────────────────────────────┐
    ///  | Offset to the itable        [4 bytes] |
    ///  ├───────────────────────────────────────┤
    ///  | Offset to the instanceof    [4 bytes] |
    ///  ├───────────────────────────────────────┤
    ///  | String id of the class name [4 bytes] |
    ///  ├───────────────────────────────────────┤
    ///  | Array component class index [4 bytes] |
    ///  ├───────────────────────────────────────┤
    ///  | vtable entries          [4 bytes each]|
    ///  ├───────────────────────────────────────┤
    ///  | itable per interface:                 |
    ///  |   class index, byte stride, entries   |
    ///  |   ... then a 0 sentinel     [4 bytes] |
    ///  ├───────────────────────────────────────┤
    ///  | instanceof count, then class indices  |
    ///  └───────────────────────────────────────┘
    /// ```
    ///
    /// The two region offsets are relative to the descriptor start; the
    /// first vtable entry sits at byte 16, so each offset is the body size
    /// written so far plus the 16-byte header.
    pub fn write_descriptor<W: ModuleWriter<'g>>(
        &self,
        writer: &mut W,
        strings: &mut StringManager,
    ) -> Result<(), crate::translate::Error> {
        debug!("write type descriptor: {}", self.name());
        self.set_vtable_offset(writer.data_size());

        let mut header = Vec::with_capacity(4 * VTABLE_FIRST_FUNCTION_INDEX);
        let mut body: Vec<u8> = vec![];

        {
            let vtable = self.vtable();
            for func in vtable.iter() {
                body.write_i32::<LittleEndian>(writer.function_id(func) as i32)?;
            }
        }

        // header position TYPE_DESCRIPTION_INTERFACE_OFFSET
        header.write_i32::<LittleEndian>((body.len() + 4 * VTABLE_FIRST_FUNCTION_INDEX) as i32)?;
        {
            let itables = self.itables();
            for (interface, methods) in itables.iter() {
                body.write_i32::<LittleEndian>(interface.class_index() as i32)?;
                body.write_i32::<LittleEndian>((4 * (2 + methods.len())) as i32)?;
                for func in methods {
                    body.write_i32::<LittleEndian>(writer.function_id(func) as i32)?;
                }
            }
        }
        body.write_i32::<LittleEndian>(0)?; // no more interfaces

        // header position TYPE_DESCRIPTION_INSTANCEOF_OFFSET
        header.write_i32::<LittleEndian>((body.len() + 4 * VTABLE_FIRST_FUNCTION_INDEX) as i32)?;
        {
            let instance_of = self.instance_of();
            body.write_i32::<LittleEndian>(instance_of.len() as i32)?;
            for ty in instance_of.iter() {
                body.write_i32::<LittleEndian>(ty.class_index() as i32)?;
            }
        }

        // header positions TYPE_DESCRIPTION_TYPE_NAME and
        // TYPE_DESCRIPTION_ARRAY_TYPE
        header.write_i32::<LittleEndian>(strings.get(self.dotted_name()) as i32)?;
        header.write_i32::<LittleEndian>(self.component_class_index())?;

        let data = writer.data();
        data.extend_from_slice(&header);
        data.extend_from_slice(&body);
        Ok(())
    }
}

//! # Row Codec
//!
//! A row slot is a 4-byte big-endian key followed by one fixed-width cell
//! per declared field, two bytes per character:
//!
//! ```text
//! Offset            Size          Description
//! ------            ----          ---------------------------
//! 0                 4             key: i32
//! 4                 2*len[0]      field 0, null-padded
//! 4 + 2*len[0]      2*len[1]      field 1, null-padded
//! ...
//! ```
//!
//! Characters are UTF-16 code units, big-endian. A field shorter than its
//! declared length is padded with null units; decoding stops at the first
//! null, and anything after it in the cell is ignored (recycled slots are
//! not zeroed). A field at exactly its declared length has no terminator.

use eyre::{ensure, Result, WrapErr};

use crate::storage::{BlockStorage, RowFileHeader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: i32,
    pub fields: Vec<String>,
}

impl Row {
    pub fn new(key: i32, fields: Vec<String>) -> Self {
        Self { key, fields }
    }

    /// Decodes the row slot at `addr`, stripping null padding.
    pub fn read(storage: &BlockStorage, addr: i64, header: &RowFileHeader) -> Result<Self> {
        let bytes = storage.slice(addr as u64, header.row_size())?;

        let key = i32::from_be_bytes(bytes[0..4].try_into().unwrap());

        let mut fields = Vec::with_capacity(header.field_count());
        let mut offset = 4;
        for (i, &len) in header.field_lengths().iter().enumerate() {
            let mut units = Vec::with_capacity(len as usize);
            for j in 0..len as usize {
                let at = offset + 2 * j;
                let unit = u16::from_be_bytes(bytes[at..at + 2].try_into().unwrap());
                if unit == 0 {
                    break;
                }
                units.push(unit);
            }

            let field = String::from_utf16(&units)
                .wrap_err_with(|| format!("field {} at row {} is not valid UTF-16", i, addr))?;
            fields.push(field);
            offset += 2 * len as usize;
        }

        Ok(Self { key, fields })
    }

    /// Encodes the row into the slot at `addr`, null-padding every cell to
    /// its declared length.
    pub fn write(&self, storage: &mut BlockStorage, addr: i64, header: &RowFileHeader) -> Result<()> {
        ensure!(
            self.fields.len() == header.field_count(),
            "row has {} fields, schema declares {}",
            self.fields.len(),
            header.field_count()
        );

        let bytes = storage.slice_mut(addr as u64, header.row_size())?;

        bytes[0..4].copy_from_slice(&self.key.to_be_bytes());

        let mut offset = 4;
        for (i, (field, &len)) in self.fields.iter().zip(header.field_lengths()).enumerate() {
            let units: Vec<u16> = field.encode_utf16().collect();
            ensure!(
                units.len() <= len as usize,
                "field {} is {} units, declared length is {}",
                i,
                units.len(),
                len
            );

            for (j, unit) in units.iter().enumerate() {
                let at = offset + 2 * j;
                bytes[at..at + 2].copy_from_slice(&unit.to_be_bytes());
            }
            // Slots are recycled, so padding must be written, not assumed.
            for j in units.len()..len as usize {
                let at = offset + 2 * j;
                bytes[at..at + 2].copy_from_slice(&[0, 0]);
            }
            offset += 2 * len as usize;
        }

        Ok(())
    }
}

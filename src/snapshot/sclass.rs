//! SCLA (storage class) section decoding.
//!
//! Only the replication factors matter for aggregation: for each class id
//! the number of copies kept for regular chunks (`keep`) and for archived
//! chunks (`arch`). Label expressions are skipped.

use std::io::{Read, Seek, SeekFrom};

use super::codec::{Fields, read_exact, read_u8, read_vec, skip};
use crate::constants::sclass::{
    DEFAULT_FACTOR_LIMIT, LABEL_DESCRIPTIONS, LABEL_SIZE, MAX_COPIES, MAX_DESCRIPTION_LENGTH,
    NODE_CLASS_SLOTS,
};
use crate::errors::{MetaError, MetaResult};
use crate::types::{SectionDescriptor, StorageClass};

const TAG: &str = "SCLA";

/// Keep/arch factors indexed by the class id stored in NODE records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageClassTable {
    keep: [u8; NODE_CLASS_SLOTS],
    arch: [u8; NODE_CLASS_SLOTS],
    classes: Vec<StorageClass>,
}

impl Default for StorageClassTable {
    /// Classes 1..=9 keep that many copies; everything else counts zero.
    fn default() -> Self {
        let mut keep = [0u8; NODE_CLASS_SLOTS];
        for (id, factor) in keep.iter_mut().enumerate() {
            if (id as u16) < DEFAULT_FACTOR_LIMIT {
                *factor = id as u8;
            }
        }
        Self {
            keep,
            arch: keep,
            classes: Vec::new(),
        }
    }
}

impl StorageClassTable {
    pub fn keep_factor(&self, sclass: u8) -> u64 {
        u64::from(self.keep[usize::from(sclass)])
    }

    pub fn arch_factor(&self, sclass: u8) -> u64 {
        u64::from(self.arch[usize::from(sclass)])
    }

    /// Classes defined in the section, in file order
    pub fn classes(&self) -> &[StorageClass] {
        &self.classes
    }

    pub fn define(&mut self, class: StorageClass) {
        match u8::try_from(class.id) {
            Ok(slot) => {
                self.keep[usize::from(slot)] = class.keep_copies;
                self.arch[usize::from(slot)] = class.arch_copies;
            }
            Err(_) => log::warn!(
                "storage class {} is outside the node class range and is ignored",
                class.id
            ),
        }
        self.classes.push(class);
    }
}

/// Width of the fixed per-class header for a section version.
pub fn class_header_size(section_version: u8) -> usize {
    match section_version {
        0x12 => 11,
        v if v <= 0x13 => 3,
        0x14 => 5,
        0x15 => 8,
        _ => 10,
    }
}

/// Decodes the whole section into a factor table.
pub fn read_storage_classes<R: Read + Seek>(
    source: &mut R,
    section: &SectionDescriptor,
) -> MetaResult<StorageClassTable> {
    let section_version = section.version;
    if section_version > 0x16 {
        return Err(MetaError::UnsupportedVersion {
            tag: TAG,
            version: section_version,
        });
    }
    source.seek(SeekFrom::Start(section.offset))?;
    let mut table = StorageClassTable::default();

    if section_version < 0x15 {
        for _ in 0..LABEL_DESCRIPTIONS {
            let length = read_u8(source, "label description")?;
            if length > MAX_DESCRIPTION_LENGTH {
                return Err(MetaError::malformed(
                    TAG,
                    format!("label description of {length} bytes"),
                ));
            }
            skip(source, u64::from(length), "label description")?;
        }
    }
    let or_groups = if section_version == 0x10 {
        1
    } else {
        read_u8(source, "storage class header")?
    };
    if or_groups < 1 {
        return Err(MetaError::malformed(TAG, "zero label groups"));
    }

    let header_size = class_header_size(section_version);
    let mut raw = [0u8; 11];
    loop {
        let raw = &mut raw[..header_size];
        read_exact(source, raw, "storage class header")?;
        let mut fields = Fields::new(raw);
        let id = fields.u16();
        let mut name_length = 0u8;
        let mut chunk_count = 0u32;
        let (create, keep, arch) = match section_version {
            0x16 => {
                name_length = fields.u8();
                fields.skip(4); // admin only, create mode, arch delay
                (fields.u8(), fields.u8(), fields.u8())
            }
            0x15 => {
                fields.skip(2); // create mode, arch delay
                (fields.u8(), fields.u8(), fields.u8())
            }
            0x14 => {
                fields.skip(1); // create mode
                let create = fields.u8();
                let keep = fields.u8();
                (create, keep, keep)
            }
            _ => {
                let create = fields.u8();
                if section_version == 0x12 {
                    chunk_count = fields.u32();
                }
                (create, create, create)
            }
        };
        let name = if name_length > 0 {
            let bytes = read_vec(source, usize::from(name_length), "storage class name")?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };
        if id == 0 && create == 0 && keep == 0 && arch == 0 {
            return Ok(table);
        }
        if !(1..=MAX_COPIES).contains(&keep) || !(1..=MAX_COPIES).contains(&arch) {
            return Err(MetaError::malformed(
                TAG,
                format!("class {id} has keep={keep} arch={arch}"),
            ));
        }
        let labels = match section_version {
            v if v > 0x14 => u64::from(create) + u64::from(keep) + u64::from(arch),
            0x14 => u64::from(create) + u64::from(keep),
            _ => u64::from(create),
        };
        skip(
            source,
            labels * LABEL_SIZE * u64::from(or_groups),
            "label expressions",
        )?;
        skip(source, u64::from(chunk_count) * 8, "storage class chunks")?;
        table.define(StorageClass {
            id,
            create_copies: create,
            keep_copies: keep,
            arch_copies: arch,
            name,
        });
    }
}

//! Fixed-width on-disk records
//!
//! All integers are little-endian with no padding. Records are decoded and
//! encoded field by field; nothing here relies on struct layout.
//!
//! ```text
//! ... entries ... | directory | EndRecord(22) | ExtendedHeader(8) | SigningHeader(132) | EncryptionHeader(2180)
//!                                               \______________ end-record comment _______________/
//! ```

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use cpak_crypto::{KEY_TABLE_SIZE, WRAPPED_BLOCK_SIZE};

pub const END_RECORD_SIGNATURE: u32 = 0x0605_4b50;
pub const DIRECTORY_ENTRY_SIGNATURE: u32 = 0x0201_4b50;
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// General-purpose flag bit 3: sizes and CRC follow the body
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Descriptor without / with its optional leading signature
pub const DATA_DESCRIPTOR_SIZE: u64 = 12;
pub const SIGNED_DATA_DESCRIPTOR_SIZE: u64 = 16;

pub const SIGNING_HEADER_SIZE: usize = 4 + WRAPPED_BLOCK_SIZE;

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

// ── End of central directory ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndRecord {
    pub disk_number: u16,
    pub directory_disk: u16,
    pub entries_on_disk: u16,
    pub entries_total: u16,
    pub directory_size: u32,
    pub directory_offset: u32,
    pub comment_length: u16,
}

impl EndRecord {
    pub const SIZE: usize = 22;

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        if r.read_u32::<LittleEndian>()? != END_RECORD_SIGNATURE {
            return Err(invalid("bad end-record signature"));
        }
        Ok(Self {
            disk_number: r.read_u16::<LittleEndian>()?,
            directory_disk: r.read_u16::<LittleEndian>()?,
            entries_on_disk: r.read_u16::<LittleEndian>()?,
            entries_total: r.read_u16::<LittleEndian>()?,
            directory_size: r.read_u32::<LittleEndian>()?,
            directory_offset: r.read_u32::<LittleEndian>()?,
            comment_length: r.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(END_RECORD_SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.disk_number)?;
        w.write_u16::<LittleEndian>(self.directory_disk)?;
        w.write_u16::<LittleEndian>(self.entries_on_disk)?;
        w.write_u16::<LittleEndian>(self.entries_total)?;
        w.write_u32::<LittleEndian>(self.directory_size)?;
        w.write_u32::<LittleEndian>(self.directory_offset)?;
        w.write_u16::<LittleEndian>(self.comment_length)
    }
}

// ── Central directory entry (fixed part) ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectoryEntry {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_length: u16,
    pub extra_length: u16,
    pub comment_length: u16,
    pub disk_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub local_header_offset: u32,
}

impl DirectoryEntry {
    pub const SIZE: usize = 46;

    /// Bytes of name + extra + comment following the fixed part
    pub fn variable_length(&self) -> usize {
        self.name_length as usize + self.extra_length as usize + self.comment_length as usize
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            signature: r.read_u32::<LittleEndian>()?,
            version_made_by: r.read_u16::<LittleEndian>()?,
            version_needed: r.read_u16::<LittleEndian>()?,
            flags: r.read_u16::<LittleEndian>()?,
            method: r.read_u16::<LittleEndian>()?,
            mod_time: r.read_u16::<LittleEndian>()?,
            mod_date: r.read_u16::<LittleEndian>()?,
            crc32: r.read_u32::<LittleEndian>()?,
            compressed_size: r.read_u32::<LittleEndian>()?,
            uncompressed_size: r.read_u32::<LittleEndian>()?,
            name_length: r.read_u16::<LittleEndian>()?,
            extra_length: r.read_u16::<LittleEndian>()?,
            comment_length: r.read_u16::<LittleEndian>()?,
            disk_start: r.read_u16::<LittleEndian>()?,
            internal_attributes: r.read_u16::<LittleEndian>()?,
            external_attributes: r.read_u32::<LittleEndian>()?,
            local_header_offset: r.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.signature)?;
        w.write_u16::<LittleEndian>(self.version_made_by)?;
        w.write_u16::<LittleEndian>(self.version_needed)?;
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.method)?;
        w.write_u16::<LittleEndian>(self.mod_time)?;
        w.write_u16::<LittleEndian>(self.mod_date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name_length)?;
        w.write_u16::<LittleEndian>(self.extra_length)?;
        w.write_u16::<LittleEndian>(self.comment_length)?;
        w.write_u16::<LittleEndian>(self.disk_start)?;
        w.write_u16::<LittleEndian>(self.internal_attributes)?;
        w.write_u32::<LittleEndian>(self.external_attributes)?;
        w.write_u32::<LittleEndian>(self.local_header_offset)
    }
}

// ── Local file header ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalHeader {
    pub signature: u32,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_length: u16,
    pub extra_length: u16,
}

impl LocalHeader {
    pub const SIZE: usize = 30;

    /// Header plus name and extra field, i.e. everything before the body
    pub fn total_length(&self) -> u64 {
        Self::SIZE as u64 + self.name_length as u64 + self.extra_length as u64
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            signature: r.read_u32::<LittleEndian>()?,
            version_needed: r.read_u16::<LittleEndian>()?,
            flags: r.read_u16::<LittleEndian>()?,
            method: r.read_u16::<LittleEndian>()?,
            mod_time: r.read_u16::<LittleEndian>()?,
            mod_date: r.read_u16::<LittleEndian>()?,
            crc32: r.read_u32::<LittleEndian>()?,
            compressed_size: r.read_u32::<LittleEndian>()?,
            uncompressed_size: r.read_u32::<LittleEndian>()?,
            name_length: r.read_u16::<LittleEndian>()?,
            extra_length: r.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.signature)?;
        w.write_u16::<LittleEndian>(self.version_needed)?;
        w.write_u16::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.method)?;
        w.write_u16::<LittleEndian>(self.mod_time)?;
        w.write_u16::<LittleEndian>(self.mod_date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(self.compressed_size)?;
        w.write_u32::<LittleEndian>(self.uncompressed_size)?;
        w.write_u16::<LittleEndian>(self.name_length)?;
        w.write_u16::<LittleEndian>(self.extra_length)
    }
}

// ── Proprietary trailer ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedHeader {
    pub header_size: u32,
    pub encryption_type: u16,
    pub signature_type: u16,
}

impl ExtendedHeader {
    pub const SIZE: usize = 8;

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            header_size: r.read_u32::<LittleEndian>()?,
            encryption_type: r.read_u16::<LittleEndian>()?,
            signature_type: r.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.header_size)?;
        w.write_u16::<LittleEndian>(self.encryption_type)?;
        w.write_u16::<LittleEndian>(self.signature_type)
    }
}

/// Wrapped key material. On disk the IV block precedes the key blocks.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionHeader {
    pub header_size: u32,
    pub wrapped_iv: [u8; WRAPPED_BLOCK_SIZE],
    pub wrapped_keys: Vec<[u8; WRAPPED_BLOCK_SIZE]>,
}

impl EncryptionHeader {
    pub const SIZE: usize = 4 + WRAPPED_BLOCK_SIZE + KEY_TABLE_SIZE * WRAPPED_BLOCK_SIZE;

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        let header_size = r.read_u32::<LittleEndian>()?;
        let mut wrapped_iv = [0u8; WRAPPED_BLOCK_SIZE];
        r.read_exact(&mut wrapped_iv)?;

        let mut wrapped_keys = Vec::with_capacity(KEY_TABLE_SIZE);
        for _ in 0..KEY_TABLE_SIZE {
            let mut block = [0u8; WRAPPED_BLOCK_SIZE];
            r.read_exact(&mut block)?;
            wrapped_keys.push(block);
        }

        Ok(Self {
            header_size,
            wrapped_iv,
            wrapped_keys,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.header_size)?;
        w.write_all(&self.wrapped_iv)?;
        for block in &self.wrapped_keys {
            w.write_all(block)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EncryptionHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionHeader")
            .field("header_size", &self.header_size)
            .field("wrapped_keys", &self.wrapped_keys.len())
            .finish_non_exhaustive()
    }
}

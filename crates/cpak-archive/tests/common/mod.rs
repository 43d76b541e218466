//! Builds synthetic encrypted paks with the fixture RSA key.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cpak_archive::entry::{entry_iv, entry_key};
use cpak_archive::format::{
    DirectoryEntry, EncryptionHeader, EndRecord, ExtendedHeader, LocalHeader,
    DATA_DESCRIPTOR_SIGNATURE, DIRECTORY_ENTRY_SIGNATURE, END_RECORD_SIGNATURE,
    FLAG_DATA_DESCRIPTOR, LOCAL_HEADER_SIGNATURE, SIGNING_HEADER_SIZE,
};
use cpak_crypto::testing::{fixture_directory_iv, fixture_keys, test_public_key_der, wrap_block};
use cpak_crypto::{decrypt_in_place, KeySet, Padding, WRAPPED_BLOCK_SIZE};

/// Method code for "stored, key-table stream cipher"
pub const METHOD_STORE_KEYTABLE: u16 = 13;

#[derive(Debug, Clone)]
pub struct TestEntry {
    pub name: String,
    pub body: Vec<u8>,
    pub descriptor: Option<Descriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// `PK 07 08`, CRC, sizes: 16 bytes
    Signed,
    /// CRC, sizes: 12 bytes
    Unsigned,
    /// `PK 05 06` in place of the CRC, then sizes: 12 bytes
    EndMarker,
}

impl TestEntry {
    pub fn new(name: &str, body: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            body: body.to_vec(),
            descriptor: None,
        }
    }

    pub fn with_descriptor(mut self, kind: Descriptor) -> Self {
        self.descriptor = Some(kind);
        self
    }

    fn descriptor_bytes(&self, crc: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        match self.descriptor {
            None => return buf,
            Some(Descriptor::Signed) => buf.extend(DATA_DESCRIPTOR_SIGNATURE.to_le_bytes()),
            Some(Descriptor::Unsigned) => {}
            Some(Descriptor::EndMarker) => {
                buf.extend(END_RECORD_SIGNATURE.to_le_bytes());
                buf.extend((self.body.len() as u32).to_le_bytes());
                buf.extend((self.body.len() as u32).to_le_bytes());
                return buf;
            }
        }
        buf.extend(crc.to_le_bytes());
        buf.extend((self.body.len() as u32).to_le_bytes());
        buf.extend((self.body.len() as u32).to_le_bytes());
        buf
    }
}

pub struct PakBuilder {
    entries: Vec<TestEntry>,
    encryption_type: u16,
    reverse_directory: bool,
    directory_padding: usize,
    signing_bytes: Vec<u8>,
}

/// Where the pieces of a built archive landed
#[derive(Debug, Clone)]
pub struct Layout {
    pub end_record: usize,
    pub wrapped_iv: usize,
    pub wrapped_keys: usize,
    pub directory_offset: usize,
    pub directory_size: usize,
}

impl PakBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            encryption_type: 3,
            reverse_directory: false,
            directory_padding: 0,
            signing_bytes: vec![0u8; SIGNING_HEADER_SIZE - 4],
        }
    }

    pub fn entry(mut self, entry: TestEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn encryption_type(mut self, code: u16) -> Self {
        self.encryption_type = code;
        self
    }

    /// List directory records in the reverse of their data order.
    pub fn reverse_directory(mut self) -> Self {
        self.reverse_directory = true;
        self
    }

    /// Zero bytes after the last directory record, counted in the declared
    /// directory size.
    pub fn directory_padding(mut self, len: usize) -> Self {
        self.directory_padding = len;
        self
    }

    /// Contents of the (unverified) signature block.
    pub fn signature(mut self, bytes: &[u8]) -> Self {
        self.signing_bytes = bytes.to_vec();
        self.signing_bytes.resize(SIGNING_HEADER_SIZE - 4, 0);
        self
    }

    pub fn build(&self) -> (Vec<u8>, Layout) {
        let keys = KeySet::new(fixture_keys(), fixture_directory_iv());
        let mut out = Vec::new();
        let mut records = Vec::new();

        for entry in &self.entries {
            let crc = crc32fast::hash(&entry.body);
            let size = entry.body.len() as u32;
            let flags = if entry.descriptor.is_some() {
                FLAG_DATA_DESCRIPTOR
            } else {
                0
            };

            let header = DirectoryEntry {
                signature: DIRECTORY_ENTRY_SIGNATURE,
                version_made_by: 20,
                version_needed: 20,
                flags,
                method: METHOD_STORE_KEYTABLE,
                crc32: crc,
                compressed_size: size,
                uncompressed_size: size,
                name_length: entry.name.len() as u16,
                local_header_offset: out.len() as u32,
                ..Default::default()
            };

            let mut head = Vec::new();
            LocalHeader {
                signature: LOCAL_HEADER_SIGNATURE,
                version_needed: 20,
                flags,
                crc32: crc,
                compressed_size: size,
                uncompressed_size: size,
                name_length: entry.name.len() as u16,
                ..Default::default()
            }
            .write_to(&mut head)
            .unwrap();
            head.extend_from_slice(entry.name.as_bytes());

            out.extend(encrypt_section(&keys, &header, &head));
            if !entry.body.is_empty() {
                out.extend(encrypt_section(&keys, &header, &entry.body));
            }
            if entry.descriptor.is_some() {
                out.extend(encrypt_section(&keys, &header, &entry.descriptor_bytes(crc)));
            }

            records.push((header, entry.name.as_bytes().to_vec()));
        }

        if self.reverse_directory {
            records.reverse();
        }

        let directory_offset = out.len();
        let mut directory = Vec::new();
        for (header, name) in &records {
            header.write_to(&mut directory).unwrap();
            directory.extend_from_slice(name);
        }
        directory.resize(directory.len() + self.directory_padding, 0);
        let directory_size = directory.len();
        decrypt_in_place(keys.directory_key(), keys.directory_iv(), &mut directory).unwrap();
        out.extend(directory);

        let trailer_len = ExtendedHeader::SIZE + SIGNING_HEADER_SIZE + EncryptionHeader::SIZE;
        let end_record = out.len();
        EndRecord {
            entries_on_disk: records.len() as u16,
            entries_total: records.len() as u16,
            directory_size: directory_size as u32,
            directory_offset: directory_offset as u32,
            comment_length: trailer_len as u16,
            ..Default::default()
        }
        .write_to(&mut out)
        .unwrap();

        ExtendedHeader {
            header_size: ExtendedHeader::SIZE as u32,
            encryption_type: self.encryption_type,
            signature_type: 1,
        }
        .write_to(&mut out)
        .unwrap();
        out.extend((SIGNING_HEADER_SIZE as u32).to_le_bytes());
        out.extend(&self.signing_bytes);

        let wrapped_iv = out.len() + 4;
        wrapped_encryption_header(&keys).write_to(&mut out).unwrap();

        let layout = Layout {
            end_record,
            wrapped_iv,
            wrapped_keys: wrapped_iv + WRAPPED_BLOCK_SIZE,
            directory_offset,
            directory_size,
        };
        (out, layout)
    }

    pub fn write(&self, dir: &Path, name: &str) -> (PathBuf, Layout) {
        let (bytes, layout) = self.build();
        let path = dir.join(name);
        std::fs::write(&path, bytes).expect("write test archive");
        (path, layout)
    }
}

fn encrypt_section(keys: &KeySet, header: &DirectoryEntry, plain: &[u8]) -> Vec<u8> {
    let iv = entry_iv(header.crc32, header.compressed_size, header.uncompressed_size);
    let mut buf = plain.to_vec();
    decrypt_in_place(entry_key(keys, header).unwrap(), &iv, &mut buf).unwrap();
    buf
}

fn wrapped_encryption_header(keys: &KeySet) -> EncryptionHeader {
    let block = |message: &[u8]| -> [u8; WRAPPED_BLOCK_SIZE] {
        wrap_block(message, Padding::OaepSha256).try_into().unwrap()
    };
    EncryptionHeader {
        header_size: EncryptionHeader::SIZE as u32,
        wrapped_iv: block(keys.directory_iv().as_bytes()),
        wrapped_keys: (0..16)
            .map(|i| block(keys.key(i).unwrap().as_bytes()))
            .collect(),
    }
}

pub fn public_key() -> Vec<u8> {
    test_public_key_der()
}

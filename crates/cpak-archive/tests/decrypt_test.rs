//! End-to-end decryption of synthetic encrypted paks.
//!
//! Archives are built with the fixture RSA key, decrypted through the public
//! API, and the output is read back with the `zip` crate as an independent
//! reader.

mod common;

use std::io::Read;

use common::{Descriptor, PakBuilder, TestEntry};
use cpak_archive::format::{DirectoryEntry, EndRecord};
use cpak_archive::{decrypt_archive, decrypt_archive_with, DecryptOptions, ErrorCode};
use tempfile::TempDir;

fn decrypt_bytes(tmp: &TempDir, builder: &PakBuilder) -> Vec<u8> {
    let (input, _) = builder.write(tmp.path(), "in.pak");
    let output = tmp.path().join("out.zip");
    decrypt_archive(&input, &output, &common::public_key()).expect("decrypt should succeed");
    std::fs::read(&output).unwrap()
}

fn directory_of(archive: &[u8]) -> (EndRecord, Vec<DirectoryEntry>) {
    let end = EndRecord::read_from(&mut &archive[archive.len() - EndRecord::SIZE..]).unwrap();
    let mut dir = &archive[end.directory_offset as usize..];
    let mut entries = Vec::new();
    for _ in 0..end.entries_total {
        let entry = DirectoryEntry::read_from(&mut dir).unwrap();
        dir = &dir[entry.variable_length()..];
        entries.push(entry);
    }
    (end, entries)
}

#[test]
fn single_stored_entry_is_readable_by_zip() {
    let tmp = TempDir::new().unwrap();
    let builder = PakBuilder::new().entry(TestEntry::new("a.txt", b"hello"));
    let out = decrypt_bytes(&tmp, &builder);

    assert_eq!(&out[..4], b"PK\x03\x04");

    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(out)).expect("valid zip");
    assert_eq!(zip.len(), 1);
    let mut file = zip.by_name("a.txt").expect("entry present");
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    assert_eq!(content, "hello");
}

#[test]
fn many_entries_get_increasing_offsets() {
    let tmp = TempDir::new().unwrap();
    let mut builder = PakBuilder::new();
    for i in 0..12 {
        let body = vec![b'a' + i as u8; 10 + i * 37];
        builder = builder.entry(TestEntry::new(&format!("dir/file{i:02}.bin"), &body));
    }
    let out = decrypt_bytes(&tmp, &builder);

    let (end, entries) = directory_of(&out);
    assert_eq!(end.entries_total, 12);
    assert_eq!(end.comment_length, 0);
    assert_eq!(
        end.directory_offset as usize + end.directory_size as usize + EndRecord::SIZE,
        out.len()
    );

    let offsets: Vec<u32> = entries.iter().map(|e| e.local_header_offset).collect();
    assert!(offsets.windows(2).all(|w| w[0] < w[1]), "offsets {offsets:?}");
    for offset in offsets {
        assert_eq!(&out[offset as usize..offset as usize + 4], b"PK\x03\x04");
    }
    // Method 13 in the encrypted directory reads back as plain store
    assert!(entries.iter().all(|e| e.method == 0));

    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(out)).unwrap();
    for i in 0..12 {
        let mut file = zip.by_name(&format!("dir/file{i:02}.bin")).unwrap();
        let mut body = Vec::new();
        file.read_to_end(&mut body).unwrap();
        assert_eq!(body, vec![b'a' + i as u8; 10 + i * 37]);
    }
}

#[test]
fn directory_out_of_data_order_is_sorted_by_offset() {
    let tmp = TempDir::new().unwrap();
    let builder = PakBuilder::new()
        .entry(TestEntry::new("first", b"1111"))
        .entry(TestEntry::new("second", b"22"))
        .entry(TestEntry::new("third", b"333333"))
        .reverse_directory();
    let out = decrypt_bytes(&tmp, &builder);

    let (_, entries) = directory_of(&out);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].local_header_offset, 0);
    assert!(entries[0].local_header_offset < entries[1].local_header_offset);
    assert!(entries[1].local_header_offset < entries[2].local_header_offset);

    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(out)).unwrap();
    let mut third = String::new();
    zip.by_name("third")
        .unwrap()
        .read_to_string(&mut third)
        .unwrap();
    assert_eq!(third, "333333");
}

#[test]
fn empty_entry_has_no_body() {
    let tmp = TempDir::new().unwrap();
    let builder = PakBuilder::new()
        .entry(TestEntry::new("empty.txt", b""))
        .entry(TestEntry::new("after.txt", b"x"));
    let out = decrypt_bytes(&tmp, &builder);

    let (_, entries) = directory_of(&out);
    assert_eq!(entries[1].local_header_offset, 30 + "empty.txt".len() as u32);

    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(out)).unwrap();
    assert_eq!(zip.by_name("empty.txt").unwrap().size(), 0);
}

#[test]
fn data_descriptors_are_copied() {
    let tmp = TempDir::new().unwrap();
    let builder = PakBuilder::new()
        .entry(TestEntry::new("signed", b"abcd").with_descriptor(Descriptor::Signed))
        .entry(TestEntry::new("marked", b"efgh").with_descriptor(Descriptor::EndMarker))
        .entry(TestEntry::new("unsigned", b"ijkl").with_descriptor(Descriptor::Unsigned))
        .entry(TestEntry::new("plain", b"mnop"));
    let out = decrypt_bytes(&tmp, &builder);

    let (_, entries) = directory_of(&out);
    let signed_len = 30 + 6 + 4 + 16;
    let marked_len = 30 + 6 + 4 + 12;
    // Anything but the end-record marker is read as 16 bytes, so the bare
    // descriptor carries 4 bytes of the next entry with it.
    let unsigned_len = 30 + 8 + 4 + 16;
    assert_eq!(entries[1].local_header_offset, signed_len);
    assert_eq!(entries[2].local_header_offset, signed_len + marked_len);
    assert_eq!(
        entries[3].local_header_offset,
        signed_len + marked_len + unsigned_len
    );

    // Descriptor after the first body opens with its signature in the clear
    let at = (30 + 6 + 4) as usize;
    assert_eq!(&out[at..at + 4], b"PK\x07\x08");
    assert_eq!(&out[at + 4..at + 8], &crc32fast::hash(b"abcd").to_le_bytes());

    let marked_at = (signed_len + 30 + 6 + 4) as usize;
    assert_eq!(&out[marked_at..marked_at + 4], b"PK\x05\x06");

    let plain_at = entries[3].local_header_offset as usize;
    assert_eq!(&out[plain_at..plain_at + 4], b"PK\x03\x04");
}

#[test]
fn signature_bytes_in_trailer_do_not_confuse_locator() {
    let tmp = TempDir::new().unwrap();
    let mut fake = b"PK\x05\x06".to_vec();
    fake.extend_from_slice(&[0u8; 40]);
    let builder = PakBuilder::new()
        .entry(TestEntry::new("a.txt", b"hello"))
        .signature(&fake);
    let out = decrypt_bytes(&tmp, &builder);

    let mut zip = zip::ZipArchive::new(std::io::Cursor::new(out)).unwrap();
    assert_eq!(zip.by_name("a.txt").unwrap().size(), 5);
}

#[test]
fn flipped_wrapped_key_byte_fails_decryption() {
    let tmp = TempDir::new().unwrap();
    let (bytes, layout) = PakBuilder::new()
        .entry(TestEntry::new("a.txt", b"hello"))
        .build();
    let output = tmp.path().join("out.zip");

    let positions = [
        layout.wrapped_iv,
        layout.wrapped_iv + 127,
        layout.wrapped_keys,
        layout.wrapped_keys + 63,
        layout.wrapped_keys + 5 * 128 + 100,
        layout.wrapped_keys + 15 * 128 + 127,
    ];
    for pos in positions {
        let mut tampered = bytes.clone();
        tampered[pos] ^= 0x01;
        let input = tmp.path().join("tampered.pak");
        std::fs::write(&input, &tampered).unwrap();

        let err = decrypt_archive(&input, &output, &common::public_key()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DecryptionFailed, "flip at {pos}");
    }
}

#[test]
fn unsupported_encryption_type() {
    let tmp = TempDir::new().unwrap();
    let (input, _) = PakBuilder::new()
        .entry(TestEntry::new("a.txt", b"hello"))
        .encryption_type(2)
        .write(tmp.path(), "tea.pak");

    let err = decrypt_archive(&input, &tmp.path().join("out"), &common::public_key()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnsupportedEncryption);
}

#[test]
fn short_trailer_has_no_extended_header() {
    let tmp = TempDir::new().unwrap();
    let (bytes, layout) = PakBuilder::new()
        .entry(TestEntry::new("a.txt", b"hello"))
        .build();

    // Keep the end record but shorten its comment to 4 bytes.
    let mut cut = bytes[..layout.end_record + EndRecord::SIZE + 4].to_vec();
    cut[layout.end_record + 20..layout.end_record + 22].copy_from_slice(&4u16.to_le_bytes());
    let input = tmp.path().join("short.pak");
    std::fs::write(&input, &cut).unwrap();

    let err = decrypt_archive(&input, &tmp.path().join("out"), &common::public_key()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoExtendedHeader);
}

#[test]
fn missing_input_is_file_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = decrypt_archive(
        &tmp.path().join("nope.pak"),
        &tmp.path().join("out"),
        &common::public_key(),
    )
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::FileNotFound);
}

#[test]
fn wrong_public_key_fails_decryption() {
    use rsa::pkcs1::EncodeRsaPublicKey;
    use rsa::traits::PublicKeyParts;
    use rsa::{BigUint, RsaPublicKey};

    let tmp = TempDir::new().unwrap();
    let (input, _) = PakBuilder::new()
        .entry(TestEntry::new("a.txt", b"hello"))
        .write(tmp.path(), "in.pak");

    // Same modulus, different exponent: every block unwraps to garbage.
    let fixture = cpak_crypto::testing::test_private_key().to_public_key();
    let other = RsaPublicKey::new(fixture.n().clone(), BigUint::from(3u32)).unwrap();
    let der = other.to_pkcs1_der().unwrap();

    let err = decrypt_archive(&input, &tmp.path().join("out"), der.as_bytes()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DecryptionFailed);
}

#[test]
fn lenient_directory_size_tolerates_padding() {
    let tmp = TempDir::new().unwrap();
    let (input, _) = PakBuilder::new()
        .entry(TestEntry::new("a.txt", b"hello"))
        .directory_padding(4)
        .write(tmp.path(), "padded.pak");
    let output = tmp.path().join("out.zip");

    let strict = decrypt_archive(&input, &output, &common::public_key()).unwrap_err();
    assert_eq!(strict.code(), ErrorCode::DecryptionFailed);

    let options = DecryptOptions {
        strict_directory_size: false,
        directory_digest: false,
    };
    let summary = decrypt_archive_with(&input, &output, &common::public_key(), &options).unwrap();
    assert_eq!(summary.entries, 1);

    let mut zip = zip::ZipArchive::new(std::fs::File::open(&output).unwrap()).unwrap();
    assert_eq!(zip.by_name("a.txt").unwrap().size(), 5);
}

#[test]
fn directory_past_end_record_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let (bytes, layout) = PakBuilder::new()
        .entry(TestEntry::new("a.txt", b"hello"))
        .build();
    let size_at = layout.end_record + 12;
    let offset_at = layout.end_record + 16;

    let patches: [(usize, u32); 3] = [
        // Oversized directory
        (size_at, 0xFFFF_FFF0),
        // One byte into the end record
        (size_at, layout.directory_size as u32 + 1),
        // Directory starting past the end record
        (offset_at, layout.end_record as u32 + 1),
    ];
    for (at, value) in patches {
        let mut patched = bytes.clone();
        patched[at..at + 4].copy_from_slice(&value.to_le_bytes());
        let input = tmp.path().join("bad-dir.pak");
        std::fs::write(&input, &patched).unwrap();

        let options = DecryptOptions {
            strict_directory_size: false,
            directory_digest: false,
        };
        let err = decrypt_archive_with(
            &input,
            &tmp.path().join("out"),
            &common::public_key(),
            &options,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DecryptionFailed, "patch at {at} = {value:#x}");
    }
}

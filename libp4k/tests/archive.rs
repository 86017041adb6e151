//! Cross-module scenarios from the archive's own testable-properties list:
//! a full encrypted, Zstandard-compressed entry round-trips through the
//! public API end to end, and a single flipped ciphertext byte surfaces as
//! a decompress failure rather than silently returning garbage.

use std::io::Read;

use libcommon::ByteView;
use libp4k::{P4kArchive, DEFAULT_KEY};

fn aes_cbc_encrypt(key: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    use aes::cipher::{BlockEncryptMut, KeyIvInit};
    use cbc::cipher::generic_array::GenericArray;
    use aes::Aes128;

    let mut padded = plaintext.to_vec();
    while padded.len() % 16 != 0 {
        padded.push(0);
    }
    let zero_iv = [0u8; 16];
    let mut encryptor = cbc::Encryptor::<Aes128>::new(GenericArray::from_slice(key), GenericArray::from_slice(&zero_iv));
    for block in padded.chunks_exact_mut(16) {
        encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    padded
}

fn build_archive(name: &[u8], compress_type: u16, ciphertext: &[u8], file_size: u32, extra_encrypted: bool) -> Vec<u8> {
    let mut extra = Vec::new();
    if extra_encrypted {
        extra = vec![0u8; 169];
        extra[168] = 1;
    }

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&[0x50, 0x4B, 0x03, 0x14]); // local header magic
    bytes.extend_from_slice(&20u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
    bytes.extend_from_slice(&compress_type.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // crc32 (unverified)
    bytes.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // local extra_field_length: 0, extra lives only in CD
    bytes.extend_from_slice(name);
    bytes.extend_from_slice(ciphertext);

    let header_offset = 0u32;
    let dir_offset = bytes.len() as u32;

    let mut cd = Vec::new();
    cd.extend_from_slice(&0x0201_4B50u32.to_le_bytes());
    cd.extend_from_slice(&0u16.to_le_bytes());
    cd.extend_from_slice(&20u16.to_le_bytes());
    cd.extend_from_slice(&0u16.to_le_bytes());
    cd.extend_from_slice(&compress_type.to_le_bytes());
    cd.extend_from_slice(&0u16.to_le_bytes());
    cd.extend_from_slice(&0u16.to_le_bytes());
    cd.extend_from_slice(&0u32.to_le_bytes());
    cd.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    cd.extend_from_slice(&file_size.to_le_bytes());
    cd.extend_from_slice(&(name.len() as u16).to_le_bytes());
    cd.extend_from_slice(&(extra.len() as u16).to_le_bytes());
    cd.extend_from_slice(&0u16.to_le_bytes());
    cd.extend_from_slice(&0u16.to_le_bytes());
    cd.extend_from_slice(&0u16.to_le_bytes());
    cd.extend_from_slice(&0u32.to_le_bytes());
    cd.extend_from_slice(&header_offset.to_le_bytes());
    cd.extend_from_slice(name);
    cd.extend_from_slice(&extra);
    bytes.extend_from_slice(&cd);
    let dir_size = cd.len() as u32;

    bytes.extend_from_slice(&0x0605_4B50u32.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&dir_size.to_le_bytes());
    bytes.extend_from_slice(&dir_offset.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());

    bytes
}

#[test]
fn encrypted_zstd_entry_round_trips_through_the_public_api() {
    let plaintext = b"the quick brown fox jumps over the lazy dog, repeated: the quick brown fox jumps over the lazy dog";
    let compressed = zstd::stream::encode_all(&plaintext[..], 0).unwrap();
    let ciphertext = aes_cbc_encrypt(&DEFAULT_KEY, &compressed);

    let archive_bytes = build_archive(b"encrypted.bin", 100, &ciphertext, plaintext.len() as u32, true);
    let view = ByteView::new(&archive_bytes);
    let archive = P4kArchive::load(view, DEFAULT_KEY).unwrap();

    let entry = archive.by_name("encrypted.bin").unwrap();
    assert!(entry.is_encrypted());

    let mut reader = archive.open_entry(entry).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, plaintext);
}

#[test]
fn a_single_flipped_ciphertext_byte_surfaces_as_a_decompress_failure() {
    let plaintext = b"the quick brown fox jumps over the lazy dog, repeated: the quick brown fox jumps over the lazy dog";
    let compressed = zstd::stream::encode_all(&plaintext[..], 0).unwrap();
    let mut ciphertext = aes_cbc_encrypt(&DEFAULT_KEY, &compressed);
    ciphertext[0] ^= 0xFF;

    let archive_bytes = build_archive(b"corrupt.bin", 100, &ciphertext, plaintext.len() as u32, true);
    let view = ByteView::new(&archive_bytes);
    let archive = P4kArchive::load(view, DEFAULT_KEY).unwrap();
    let entry = archive.by_name("corrupt.bin").unwrap();

    let mut reader = archive.open_entry(entry).unwrap();
    let mut out = Vec::new();
    assert!(reader.read_to_end(&mut out).is_err());
}

#[test]
fn encrypted_ciphertext_not_a_multiple_of_the_block_size_reports_decrypt_error() {
    let ciphertext = vec![0u8; 17];
    let archive_bytes = build_archive(b"odd.bin", 0, &ciphertext, 17, true);
    let view = ByteView::new(&archive_bytes);
    let archive = P4kArchive::load(view, DEFAULT_KEY).unwrap();
    let entry = archive.by_name("odd.bin").unwrap();

    assert!(matches!(archive.open_entry(entry), Err(libp4k::Error::Decrypt(_))));
}

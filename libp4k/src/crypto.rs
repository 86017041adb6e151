//! AES-CBC decryption for P4K's encrypted entries.
//!
//! The producer always uses a zero IV and never pads: an encrypted entry's
//! ciphertext length is exactly its `compress_size`, and compressed payload
//! bytes (Zstandard frames, mostly) tolerate arbitrary trailing garbage, so
//! there is nothing to unpad. This module decrypts whole 16-byte blocks in
//! place rather than going through `cbc`'s `Decryptor::decrypt_padded_*`
//! helpers, which assume PKCS#7 padding is present on the final block.

use aes::Aes128;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};

use crate::error::{Error, Result};

/// The default 16-byte key P4K archives are encrypted with when the caller
/// does not supply their own (`examples/original_source/scdatatools/p4k.py`'s
/// `DEFAULT_P4K_KEY`).
pub const DEFAULT_KEY: [u8; 16] = [
    0x5E, 0x7A, 0x20, 0x02, 0x30, 0x2E, 0xEB, 0x1A, 0x3B, 0xB6, 0x17, 0xC3, 0x0F, 0xDE, 0x1E, 0x47,
];

type Decryptor = cbc::Decryptor<Aes128>;

/// Decrypts `ciphertext` in place with AES-128-CBC, zero IV, under `key`.
///
/// `ciphertext`'s length must be a multiple of 16; anything else is a
/// malformed encrypted entry (§8 boundary: "encrypted size not a multiple
/// of 16 reports `DecryptError`").
pub fn decrypt(key: &[u8; 16], ciphertext: &mut [u8]) -> Result<()> {
    if ciphertext.len() % 16 != 0 {
        return Err(Error::decrypt(format!(
            "ciphertext length {} is not a multiple of the AES block size",
            ciphertext.len()
        )));
    }
    let zero_iv = [0u8; 16];
    let mut decryptor = Decryptor::new(GenericArray::from_slice(key), GenericArray::from_slice(&zero_iv));
    for block in ciphertext.chunks_exact_mut(16) {
        decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encrypt_then_decrypt() {
        use aes::cipher::BlockEncryptMut;

        let key = DEFAULT_KEY;
        let plaintext = b"0123456789ABCDEF0123456789ABCDEF".to_vec(); // 32 bytes, two blocks
        let mut ciphertext = plaintext.clone();
        let zero_iv = [0u8; 16];
        let mut encryptor = cbc::Encryptor::<Aes128>::new(GenericArray::from_slice(&key), GenericArray::from_slice(&zero_iv));
        for block in ciphertext.chunks_exact_mut(16) {
            encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }

        decrypt(&key, &mut ciphertext).unwrap();
        assert_eq!(ciphertext, plaintext);
    }

    #[test]
    fn rejects_ciphertext_not_a_multiple_of_block_size() {
        let mut data = vec![0u8; 17];
        assert!(matches!(decrypt(&DEFAULT_KEY, &mut data), Err(Error::Decrypt(_))));
    }
}

// title/crypto.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the common crypto functions required to handle DSi content encryption.

use aes::cipher::{BlockDecryptMut, KeyIvInit};
use aes::cipher::block_padding::NoPadding;
use thiserror::Error;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encrypted data is {0} bytes long, which is not a multiple of the AES block size")]
    Misaligned(usize),
}

// Convert a Title ID into the format required for use as the Title Key decryption IV.
pub fn title_id_to_iv(title_id: [u8; 8]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&title_id);
    iv
}

// Convert a content index into the format required for use as a content decryption IV.
pub fn content_index_to_iv(index: u16) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..2].copy_from_slice(&index.to_be_bytes());
    iv
}

/// Decrypts data in place with AES-128-CBC. No padding is removed, so the data must already be a
/// whole number of blocks.
pub fn decrypt_cbc(data: &mut [u8], key: [u8; 16], iv: [u8; 16]) -> Result<(), CryptoError> {
    let len = data.len();
    if len % BLOCK_SIZE != 0 {
        return Err(CryptoError::Misaligned(len));
    }
    let decryptor = Aes128CbcDec::new(&key.into(), &iv.into());
    decryptor.decrypt_padded_mut::<NoPadding>(data).map_err(|_| CryptoError::Misaligned(len))?;
    Ok(())
}

// Decrypt a Title Key using the shared common key.
pub fn decrypt_title_key(title_key_enc: [u8; 16], common_key: [u8; 16], title_id: [u8; 8]) -> [u8; 16] {
    let mut title_key = title_key_enc;
    // A single block can never be misaligned.
    let _ = decrypt_cbc(&mut title_key, common_key, title_id_to_iv(title_id));
    title_key
}

// Decrypt a content file using the specified Title Key.
pub fn decrypt_content(data: &[u8], title_key: [u8; 16], index: u16) -> Result<Vec<u8>, CryptoError> {
    let mut content = data.to_vec();
    decrypt_cbc(&mut content, title_key, content_index_to_iv(index))?;
    Ok(content)
}

#[cfg(test)]
pub(crate) fn encrypt_content(data: &[u8], title_key: [u8; 16], index: u16) -> Vec<u8> {
    use aes::cipher::BlockEncryptMut;
    type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
    let encryptor = Aes128CbcEnc::new(&title_key.into(), &content_index_to_iv(index).into());
    let mut content = data.to_vec();
    let len = content.len();
    encryptor.encrypt_padded_mut::<NoPadding>(&mut content, len).unwrap();
    content
}

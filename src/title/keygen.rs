// title/keygen.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the derivation of Title Keys from a Title ID and password, used to recover the keys
// of titles that have no ticket available.

use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use crate::title::TitleId;

/// The passwords known to have been used to generate DSiWare Title Keys, in the order they should
/// be tried.
pub const DEFAULT_PASSWORDS: [&str; 9] = ["nintendo", "mypass", "FB10", "test", "", "password", "twilight", "twl", "shop"];

const KEYGEN_SECRET: [u8; 10] = [0xFD, 0x04, 0x01, 0x05, 0x06, 0x0B, 0x11, 0x1C, 0x2D, 0x49];
const KEYGEN_ITERATIONS: u32 = 20;

/// Something that can turn a Title ID and a candidate password into a Title Key.
pub trait TitleKeyDeriver: Send + Sync {
    fn derive(&self, title_id: &TitleId, password: &str) -> [u8; 16];
}

/// The standard Nintendo Title Key generator: PBKDF2-HMAC-SHA1 salted with the MD5 of a fixed
/// secret followed by the Title ID without its leading zero bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pbkdf2KeyDeriver;

impl Pbkdf2KeyDeriver {
    fn salt(title_id: &TitleId) -> [u8; 16] {
        let tid = title_id.bytes();
        let first = tid.iter().position(|b| *b != 0).unwrap_or(tid.len());
        let mut salt_source = KEYGEN_SECRET.to_vec();
        salt_source.extend_from_slice(&tid[first..]);
        md5::compute(&salt_source).0
    }
}

impl TitleKeyDeriver for Pbkdf2KeyDeriver {
    fn derive(&self, title_id: &TitleId, password: &str) -> [u8; 16] {
        let salt = Pbkdf2KeyDeriver::salt(title_id);
        let mut key = [0u8; 16];
        pbkdf2_hmac::<Sha1>(password.as_bytes(), &salt, KEYGEN_ITERATIONS, &mut key);
        key
    }
}

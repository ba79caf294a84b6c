// title/ticket.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the structures and methods required for parsing the "cetk" tickets served by the NUS.

use std::io::{Cursor, Read};
use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;
use crate::title::crypto::decrypt_title_key;
use crate::title::TitleId;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticket data is not in a valid format")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Ticket {
    pub signature_type: u32,
    pub signature_issuer: [u8; 64],
    pub ticket_version: u8,
    pub title_key: [u8; 16],
    pub ticket_id: [u8; 8],
    pub console_id: [u8; 4],
    pub title_id: TitleId,
    pub title_version: u16,
    pub common_key_index: u8,
}

impl Ticket {
    /// Parses the fixed part of a ticket. Anything after the common key index (content access
    /// permissions, limits, and the certificate chain appended by the CDN) is ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TicketError> {
        let mut buf = Cursor::new(data);
        let signature_type = buf.read_u32::<BigEndian>()?;
        // Signature and padding.
        let mut skipped = [0u8; 316];
        buf.read_exact(&mut skipped)?;
        let mut signature_issuer = [0u8; 64];
        buf.read_exact(&mut signature_issuer)?;
        let mut ecdh_data = [0u8; 60];
        buf.read_exact(&mut ecdh_data)?;
        let ticket_version = buf.read_u8()?;
        let mut reserved = [0u8; 2];
        buf.read_exact(&mut reserved)?;
        let mut title_key = [0u8; 16];
        buf.read_exact(&mut title_key)?;
        let _unknown = buf.read_u8()?;
        let mut ticket_id = [0u8; 8];
        buf.read_exact(&mut ticket_id)?;
        let mut console_id = [0u8; 4];
        buf.read_exact(&mut console_id)?;
        let mut title_id = [0u8; 8];
        buf.read_exact(&mut title_id)?;
        let mut unknown = [0u8; 2];
        buf.read_exact(&mut unknown)?;
        let title_version = buf.read_u16::<BigEndian>()?;
        // Permitted titles mask, permit mask, and the export flag.
        let mut skipped = [0u8; 9];
        buf.read_exact(&mut skipped)?;
        let common_key_index = buf.read_u8()?;
        Ok(Ticket {
            signature_type,
            signature_issuer,
            ticket_version,
            title_key,
            ticket_id,
            console_id,
            title_id: TitleId::new(title_id),
            title_version,
            common_key_index,
        })
    }

    /// Decrypts the Title Key using the shared common key.
    pub fn dec_title_key(&self, common_key: [u8; 16]) -> [u8; 16] {
        decrypt_title_key(self.title_key, common_key, self.title_id.bytes())
    }
}

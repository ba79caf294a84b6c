// title/tmd.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements the structures and methods required for parsing the TMDs of DSi titles.

use std::io::{Cursor, Read};
use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;
use crate::title::TitleId;

#[derive(Debug, Error)]
pub enum TMDError {
    #[error("TMD declares {declared} contents but only {found} content records could be read")]
    TruncatedRecords { declared: u16, found: usize },
    #[error("TMD data is not in a valid format")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub content_id: u32,
    pub index: u16,
    pub content_type: u16,
    pub content_size: u64,
    pub content_hash: [u8; 20],
}

impl ContentRecord {
    /// Gets the name that the CDN stores this content under, which is its Content ID as 8 hex
    /// characters.
    pub fn file_name(&self) -> String {
        format!("{:08x}", self.content_id)
    }
}

#[derive(Debug, Clone)]
pub struct TMD {
    pub signature_type: u32,
    pub signature_issuer: [u8; 64],
    pub tmd_version: u8,
    pub ca_crl_version: u8,
    pub signer_crl_version: u8,
    pub system_version: [u8; 8],
    pub title_id: TitleId,
    pub title_type: [u8; 4],
    pub group_id: u16,
    pub region: u16,
    pub access_rights: u32,
    pub title_version: u16,
    pub num_contents: u16,
    pub boot_index: u16,
    pub content_records: Vec<ContentRecord>,
}

impl TMD {
    pub fn from_bytes(data: &[u8]) -> Result<Self, TMDError> {
        let mut buf = Cursor::new(data);
        let signature_type = buf.read_u32::<BigEndian>()?;
        // The RSA-2048 signature and its padding aren't needed for anything here.
        let mut skipped = [0u8; 316];
        buf.read_exact(&mut skipped)?;
        let mut signature_issuer = [0u8; 64];
        buf.read_exact(&mut signature_issuer)?;
        let tmd_version = buf.read_u8()?;
        let ca_crl_version = buf.read_u8()?;
        let signer_crl_version = buf.read_u8()?;
        let _reserved = buf.read_u8()?;
        let mut system_version = [0u8; 8];
        buf.read_exact(&mut system_version)?;
        let mut title_id = [0u8; 8];
        buf.read_exact(&mut title_id)?;
        let mut title_type = [0u8; 4];
        buf.read_exact(&mut title_type)?;
        let group_id = buf.read_u16::<BigEndian>()?;
        let mut padding = [0u8; 2];
        buf.read_exact(&mut padding)?;
        let region = buf.read_u16::<BigEndian>()?;
        // Ratings, reserved bytes, the IPC mask, and more reserved bytes.
        let mut skipped = [0u8; 58];
        buf.read_exact(&mut skipped)?;
        let access_rights = buf.read_u32::<BigEndian>()?;
        let title_version = buf.read_u16::<BigEndian>()?;
        let num_contents = buf.read_u16::<BigEndian>()?;
        let boot_index = buf.read_u16::<BigEndian>()?;
        let _minor_version = buf.read_u16::<BigEndian>()?;
        // Build content records by iterating over the rest of the data num_contents times.
        let mut content_records = Vec::with_capacity(num_contents as usize);
        for _ in 0..num_contents {
            let record = match read_content_record(&mut buf) {
                Ok(record) => record,
                Err(_) => return Err(TMDError::TruncatedRecords { declared: num_contents, found: content_records.len() }),
            };
            content_records.push(record);
        }
        Ok(TMD {
            signature_type,
            signature_issuer,
            tmd_version,
            ca_crl_version,
            signer_crl_version,
            system_version,
            title_id: TitleId::new(title_id),
            title_type,
            group_id,
            region,
            access_rights,
            title_version,
            num_contents,
            boot_index,
            content_records,
        })
    }

    /// Gets the content record with the specified Content ID, if the TMD lists one.
    pub fn content_record_by_cid(&self, cid: u32) -> Option<&ContentRecord> {
        self.content_records.iter().find(|record| record.content_id == cid)
    }

    pub fn signature_issuer(&self) -> String {
        String::from_utf8_lossy(&self.signature_issuer).trim_end_matches('\0').to_owned()
    }
}

fn read_content_record(buf: &mut Cursor<&[u8]>) -> Result<ContentRecord, std::io::Error> {
    let content_id = buf.read_u32::<BigEndian>()?;
    let index = buf.read_u16::<BigEndian>()?;
    let content_type = buf.read_u16::<BigEndian>()?;
    let content_size = buf.read_u64::<BigEndian>()?;
    let mut content_hash = [0u8; 20];
    buf.read_exact(&mut content_hash)?;
    Ok(ContentRecord {
        content_id,
        index,
        content_type,
        content_size,
        content_hash,
    })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use byteorder::WriteBytesExt;

    pub(crate) const TEST_TITLE_ID: [u8; 8] = [0x00, 0x03, 0x00, 0x04, b'K', b'G', b'F', b'E'];

    /// Builds a TMD listing the given (Content ID, index, size, SHA1) records.
    pub(crate) fn build_tmd(title_id: [u8; 8], title_version: u16, records: &[(u32, u16, u64, [u8; 20])]) -> Vec<u8> {
        let mut data = vec![0u8; 0x1E4];
        data[0..4].copy_from_slice(&0x00010004u32.to_be_bytes());
        data[0x140..0x14F].copy_from_slice(b"Root-CA00000001");
        data[0x18C..0x194].copy_from_slice(&title_id);
        data[0x1DC..0x1DE].copy_from_slice(&title_version.to_be_bytes());
        data[0x1DE..0x1E0].copy_from_slice(&(records.len() as u16).to_be_bytes());
        for (cid, index, size, hash) in records {
            data.write_u32::<BigEndian>(*cid).unwrap();
            data.write_u16::<BigEndian>(*index).unwrap();
            data.write_u16::<BigEndian>(1).unwrap();
            data.write_u64::<BigEndian>(*size).unwrap();
            data.extend_from_slice(hash);
        }
        data
    }

    #[test]
    fn test_parse_tmd() {
        let data = build_tmd(TEST_TITLE_ID, 1280, &[(0x00000002, 0, 0x1000, [0xAB; 20]), (0x00000003, 1, 0x200, [0xCD; 20])]);
        let tmd = TMD::from_bytes(&data).unwrap();
        assert_eq!(tmd.title_version, 1280);
        assert_eq!(tmd.num_contents, 2);
        assert_eq!(tmd.title_id.to_string(), "000300044b474645");
        assert_eq!(tmd.signature_issuer(), "Root-CA00000001");
        assert_eq!(tmd.content_records[1].index, 1);
        assert_eq!(tmd.content_records[1].content_hash, [0xCD; 20]);
        assert_eq!(tmd.content_records[0].content_size, 0x1000);
        assert_eq!(tmd.content_records[0].file_name(), "00000002");
        assert_eq!(tmd.content_record_by_cid(3).map(|r| r.index), Some(1));
        assert!(tmd.content_record_by_cid(4).is_none());
    }

    #[test]
    fn test_truncated_tmd() {
        let mut data = build_tmd(TEST_TITLE_ID, 0, &[(0x00000000, 0, 0x1000, [0; 20])]);
        data.truncate(data.len() - 4);
        assert!(matches!(TMD::from_bytes(&data), Err(TMDError::TruncatedRecords { declared: 1, found: 0 })));
        assert!(matches!(TMD::from_bytes(&data[..0x100]), Err(TMDError::IO(_))));
    }
}

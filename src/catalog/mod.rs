// catalog/mod.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Root for all catalog-related modules, and the errors that can stop a title from being catalogued.

pub mod config;
pub mod dat;
pub mod export;
pub mod family;
pub mod name;
pub mod provenance;
pub mod record;
pub mod reference;

use std::path::PathBuf;
use thiserror::Error;
use crate::title::rom::RomError;
use crate::title::ticket::TicketError;
use crate::title::tmd::TMDError;
use crate::title::TitleId;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0:?} is not named after a Title ID")]
    BadTitleDirectory(PathBuf),
    #[error("title {title_id} only has {count} TMD and content files, it is likely incomplete")]
    TooFewFiles { title_id: TitleId, count: usize },
    #[error("title {0} has no TMD")]
    MissingTmd(TitleId),
    #[error("title {0} has no decrypted copy of the first content of its newest TMD")]
    MissingNewestContent(TitleId),
    #[error("TMD {path:?} could not be read")]
    TMD {
        path: PathBuf,
        #[source]
        source: TMDError,
    },
    #[error("ticket {path:?} could not be read")]
    Ticket {
        path: PathBuf,
        #[source]
        source: TicketError,
    },
    #[error("the checkpoint {path:?} exists but could not be loaded")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("the checkpoint could not be written")]
    Json(#[from] serde_json::Error),
    #[error("ROM data could not be read")]
    Rom(#[from] RomError),
    #[error("catalog data could not be read or written")]
    IO(#[from] std::io::Error),
}

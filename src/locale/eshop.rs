// locale/eshop.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Implements looking up the languages of DSiWare titles that were later ported to the 3DS, using
// the listings of the 3DS eShop.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use log::{debug, trace, warn};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::blocking::Client;
use thiserror::Error;
use crate::locale::language::Language;
use crate::locale::resolver::LanguageSource;
use crate::title::TitleId;

const NINJA_ENDPOINT: &str = "https://ninja.ctr.shop.nintendo.net/ninja/ws/titles/id_pair";
const SAMURAI_ENDPOINT: &str = "https://samurai.ctr.shop.nintendo.net/samurai/ws";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum EshopError {
    #[error("the eShop returned HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("the eShop could not be reached")]
    Request(#[from] reqwest::Error),
    #[error("the eShop returned invalid XML")]
    Xml(#[from] quick_xml::Error),
}

/// Finds the eShop content ID (the "ns_uid" element) in a ninja ID pair response.
pub fn parse_content_id(xml: &str) -> Result<Option<String>, EshopError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut in_ns_uid = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"ns_uid" => in_ns_uid = true,
            Event::Text(e) if in_ns_uid => {
                let content_id = e.unescape()?.trim().to_owned();
                return Ok(Some(content_id).filter(|id| !id.is_empty()));
            }
            Event::End(e) if e.name().as_ref() == b"ns_uid" => in_ns_uid = false,
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Reads the "iso_code" of every entry in the "languages" element of a samurai title response.
/// Codes that don't map to a known language are skipped.
pub fn parse_languages(xml: &str) -> Result<Vec<Language>, EshopError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut languages = Vec::new();
    let mut in_languages = false;
    let mut in_iso_code = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"languages" => in_languages = true,
                b"iso_code" if in_languages => in_iso_code = true,
                _ => {}
            },
            Event::Text(e) if in_iso_code => {
                let code = e.unescape()?;
                match code.parse::<Language>() {
                    Ok(language) if !languages.contains(&language) => languages.push(language),
                    Ok(_) => {}
                    Err(err) => debug!("Skipping eShop language: {}", err),
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"languages" => in_languages = false,
                b"iso_code" => in_iso_code = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(languages)
}

/// Looks up titles on the 3DS eShop by way of a map from DSi Title IDs to the Title IDs of their
/// 3DS ports.
pub struct EshopClient {
    client: Client,
    port_map: HashMap<TitleId, TitleId>,
    content_ids: Mutex<HashMap<TitleId, Option<String>>>,
}

impl EshopClient {
    /// Creates a client. The ninja server only answers clients presenting a 3DS client
    /// certificate, which can be supplied as a PEM containing both the certificate and its key.
    pub fn new(port_map: HashMap<TitleId, TitleId>, identity_pem: Option<&[u8]>, timeout: Duration) -> Result<Self, EshopError> {
        let mut builder = Client::builder().timeout(timeout);
        match identity_pem {
            Some(pem) => builder = builder.identity(reqwest::Identity::from_pem(pem)?),
            None => warn!("No client certificate was provided, 3DS eShop info will likely be unavailable"),
        }
        Ok(EshopClient {
            client: builder.build()?,
            port_map,
            content_ids: Mutex::new(HashMap::new()),
        })
    }

    fn get_text(&self, url: &str) -> Result<String, EshopError> {
        trace!("Requesting {}", url);
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(EshopError::Status(response.status()));
        }
        Ok(response.text()?)
    }

    fn fetch_content_id(&self, port_id: &TitleId) -> Result<Option<String>, EshopError> {
        let url = format!("{}?title_id[]={}", NINJA_ENDPOINT, port_id.to_string().to_uppercase());
        parse_content_id(&self.get_text(&url)?)
    }

    /// Gets the eShop content ID of a 3DS title, asking ninja only once per title.
    fn content_id(&self, title_id: &TitleId, port_id: &TitleId) -> Option<String> {
        if let Ok(cache) = self.content_ids.lock() {
            if let Some(cached) = cache.get(port_id) {
                return cached.clone();
            }
        }
        let content_id = match self.fetch_content_id(port_id) {
            Ok(Some(content_id)) => Some(content_id),
            Ok(None) => {
                debug!("Unable to get the eShop content ID for title {} ({} on 3DS)", title_id, port_id);
                None
            }
            Err(err) => {
                debug!("Title {} ({} on 3DS) could not be looked up on ninja: {}", title_id, port_id, err);
                None
            }
        };
        if let Ok(mut cache) = self.content_ids.lock() {
            cache.insert(*port_id, content_id.clone());
        }
        content_id
    }
}

impl LanguageSource for EshopClient {
    fn languages(&self, title_id: &TitleId, country_code: &str) -> Option<Vec<Language>> {
        let port_id = self.port_map.get(title_id)?;
        let content_id = self.content_id(title_id, port_id)?;
        let url = format!("{}/{}/title/{}", SAMURAI_ENDPOINT, country_code, content_id);
        match self.get_text(&url).and_then(|xml| parse_languages(&xml)) {
            Ok(languages) if languages.is_empty() => {
                debug!("Title {} ({} on 3DS) has no listed languages in the {} eShop", title_id, port_id, country_code);
                None
            }
            Ok(languages) => Some(languages),
            Err(err) => {
                debug!("Title {} ({} on 3DS) could not be looked up on samurai ({}): {}", title_id, port_id, country_code, err);
                None
            }
        }
    }

    fn covers(&self, title_id: &TitleId) -> bool {
        self.port_map.contains_key(title_id)
    }
}

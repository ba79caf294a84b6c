// dat.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Code for the dat command in the nuscat CLI.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use clap::Args;
use log::info;
use nuscat::catalog::config::{CatalogConfig, DEFAULT_CONFIG_FILE};
use nuscat::catalog::dat::{write_catalog_file, write_nds_copies};
use nuscat::catalog::export::{write_media, write_media_files, write_titles};
use nuscat::catalog::family::assign_archive_ids;
use nuscat::catalog::name::DeunicodeTransliterator;
use nuscat::catalog::record::{load_or_collect, CollectionContext};
use nuscat::locale::classifier::WhatlangClassifier;
use nuscat::locale::eshop::{EshopClient, DEFAULT_TIMEOUT};
use nuscat::locale::resolver::{LanguageSource, NoLanguageSource};

#[derive(Args)]
pub struct DatArgs {
    /// The decrypted archive directory, containing one directory per Title ID
    archive: PathBuf,
    /// The path to write the datafile to
    #[arg(short, long)]
    output: PathBuf,
    /// The catalog config file naming the archive's contributors
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Save collected titles here, and reuse them on later runs
    #[arg(long)]
    checkpoint: Option<PathBuf>,
    /// Also write a media sheet here, with a table of catalog names next to it
    #[arg(long)]
    media_csv: Option<PathBuf>,
    /// Write the table of catalog names here instead of next to the media sheet
    #[arg(long)]
    titles_csv: Option<PathBuf>,
    /// A PEM containing the client certificate and key used for 3DS eShop lookups
    #[arg(long)]
    eshop_identity: Option<PathBuf>,
    /// Don't look up languages on the 3DS eShop
    #[arg(long)]
    offline: bool,
    /// Ignore an existing checkpoint and collect every title again
    #[arg(long)]
    no_cache: bool,
    /// Copy the newest content of every title next to it under its catalog name
    #[arg(long)]
    nds_copies: bool,
    /// The name credited with the local archive, overriding the config
    #[arg(long)]
    dumper: Option<String>,
}

fn language_source(config: &CatalogConfig, args: &DatArgs) -> Result<Box<dyn LanguageSource>> {
    if args.offline {
        info!("Running offline, languages will only be guessed from ROM titles");
        return Ok(Box::new(NoLanguageSource));
    }
    let port_map = config.load_port_map().with_context(|| "The 3DS port map could not be loaded.")?;
    let identity = match &args.eshop_identity {
        Some(path) => Some(fs::read(path).with_context(|| format!("The eShop identity \"{}\" could not be read.", path.display()))?),
        None => None,
    };
    let client = EshopClient::new(port_map, identity.as_deref(), DEFAULT_TIMEOUT)
        .with_context(|| "The eShop client could not be created.")?;
    Ok(Box::new(client))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("\"{}\" could not be created.", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn dat(args: &DatArgs) -> Result<()> {
    if !args.archive.is_dir() {
        bail!("Archive directory \"{}\" does not exist.", args.archive.display());
    }
    let mut config = CatalogConfig::load(&args.config).with_context(|| "The catalog config could not be loaded.")?;
    if let Some(dumper) = &args.dumper {
        config.primary_dumper = dumper.clone();
    }
    let title_overrides = config.load_title_overrides().with_context(|| "The title name overrides could not be loaded.")?;
    let contributors = config.load_contributors().with_context(|| "The contributor tables could not be loaded.")?;
    let source = language_source(&config, args)?;
    let classifier = WhatlangClassifier::default();
    let transliterator = DeunicodeTransliterator;
    let ctx = CollectionContext {
        classifier: &classifier,
        language_source: source.as_ref(),
        transliterator: &transliterator,
        title_overrides: &title_overrides,
    };
    let checkpoint: Option<&Path> = args.checkpoint.as_deref();
    if args.no_cache {
        if let Some(path) = checkpoint.filter(|p| p.exists()) {
            fs::remove_file(path).with_context(|| format!("The checkpoint \"{}\" could not be removed.", path.display()))?;
        }
    }
    let records = load_or_collect(checkpoint, &args.archive, &ctx).with_context(|| "The archive could not be collected.")?;
    if records.is_empty() {
        bail!("No titles could be collected from \"{}\".", args.archive.display());
    }
    let entries = assign_archive_ids(&records);
    write_catalog_file(&args.output, &records, &entries, &config.primary_dumper, &contributors)
        .with_context(|| format!("The catalog could not be written to \"{}\".", args.output.display()))?;
    match (&args.media_csv, &args.titles_csv) {
        (Some(media_path), None) => {
            let titles_path = write_media_files(media_path, &records, &entries)
                .with_context(|| format!("The media sheet could not be written to \"{}\".", media_path.display()))?;
            info!("Wrote the media sheet and {}", titles_path.display());
        },
        (media_path, titles_path) => {
            if let Some(path) = media_path {
                write_media(create(path)?, &records, &entries)
                    .with_context(|| format!("The media sheet could not be written to \"{}\".", path.display()))?;
            }
            if let Some(path) = titles_path {
                write_titles(create(path)?, &records, &entries)
                    .with_context(|| format!("The title table could not be written to \"{}\".", path.display()))?;
            }
        }
    }
    if args.nds_copies {
        write_nds_copies(&records, &entries).with_context(|| "The convenience copies could not be written.")?;
    }
    println!("Successfully cataloged {} titles to \"{}\".", entries.len(), args.output.display());
    Ok(())
}

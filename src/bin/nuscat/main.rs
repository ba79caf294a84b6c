// main.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Base for the nuscat CLI that handles argument parsing and directs execution to the proper module.

mod dat;
mod decrypt;
mod info;

use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
enum Commands {
    /// Decrypt the contents of every title in a NUS rip
    Decrypt {
        /// The archive directory, containing one directory per Title ID
        archive: PathBuf,
        /// The DSi common key, either as a file or as 32 hex characters
        #[arg(short, long)]
        common_key: Option<String>,
        /// Only decrypt this title
        #[arg(short, long)]
        title: Option<String>,
        /// Passwords to try when recovering Title Keys, in order, instead of the built-in list
        #[arg(short, long, value_delimiter = ',')]
        passwords: Option<Vec<String>>,
        /// A CSV of known decrypted Title Keys
        #[arg(long)]
        title_keys: Option<PathBuf>,
    },
    /// Build a DAT-o-MATIC catalog from a decrypted NUS rip
    Dat {
        #[command(flatten)]
        args: dat::DatArgs,
    },
    /// Get information about a TMD, Ticket, or decrypted content
    Info {
        /// The path to a TMD, Ticket, or decrypted content
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Decrypt { archive, common_key, title, passwords, title_keys }) => {
            decrypt::decrypt(archive, common_key.as_deref(), title.as_deref(), passwords.clone(), title_keys.as_deref())?
        },
        Some(Commands::Dat { args }) => {
            dat::dat(args)?
        },
        Some(Commands::Info { input }) => {
            info::info(input)?
        },
        None => { /* Clap handles no passed command by itself */ }
    }
    Ok(())
}

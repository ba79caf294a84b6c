// info.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Code for the info command in the nuscat CLI.

use std::fs;
use std::path::Path;
use anyhow::{bail, Context, Result};
use nuscat::locale::region::{region_from_code, region_names};
use nuscat::title::filetypes::{identify_path_role, FileRole};
use nuscat::title::rom::{RomInfo, TitleSlot};
use nuscat::title::{ticket, tmd, versions, TitleId};

fn print_tid(title_id: &TitleId) {
    let game_code = title_id.game_code();
    if game_code.chars().all(|c| c.is_ascii_alphanumeric()) {
        println!("  Title ID: {} ({})", title_id.to_string().to_uppercase(), game_code);
    } else {
        println!("  Title ID: {}", title_id.to_string().to_uppercase());
    }
}

fn print_certificate(issuer: &str, retail: &str, development: &str) {
    if issuer.contains(retail) {
        println!("  Certificate: {} (Retail)", retail);
    } else if issuer.contains(development) {
        println!("  Certificate: {} (Development)", development);
    } else {
        println!("  Certificate Info: {} (Unknown)", issuer);
    }
}

fn print_tmd_info(tmd: tmd::TMD) {
    println!("Title Info");
    print_tid(&tmd.title_id);
    println!("  Title Version: {} ({})", tmd.title_version, versions::dec_to_standard(tmd.title_version));
    println!("  TMD Version: {}", tmd.tmd_version);
    print_certificate(&tmd.signature_issuer(), "CP00000007", "CP00000005");
    println!("\nContent Info");
    println!("  Total Contents: {}", tmd.num_contents);
    println!("  Boot Content Index: {}", tmd.boot_index);
    println!("  Content Records:");
    for content in tmd.content_records {
        println!("    Content Index: {}", content.index);
        println!("      Content ID: {:08X}", content.content_id);
        println!("      Content Type: {}", content.content_type);
        println!("      Content Size: {} bytes", content.content_size);
        println!("      Content Hash: {}", hex::encode(content.content_hash));
    }
}

fn print_ticket_info(ticket: ticket::Ticket) {
    println!("Ticket Info");
    print_tid(&ticket.title_id);
    println!("  Title Version: {} ({})", ticket.title_version, versions::dec_to_standard(ticket.title_version));
    println!("  Ticket Version: {}", ticket.ticket_version);
    let issuer = String::from_utf8_lossy(&ticket.signature_issuer).trim_end_matches('\0').to_owned();
    print_certificate(&issuer, "XS00000006", "XS00000004");
    println!("  Common Key Index: {}", ticket.common_key_index);
    println!("  Title Key (Encrypted): {}", hex::encode(ticket.title_key));
}

fn print_rom_info(rom: RomInfo) {
    println!("ROM Info");
    println!("  Game Title: {}", rom.game_title);
    println!("  Game Code: {}", rom.game_code);
    match rom.region_code {
        Some(code) => println!("  Region: {} ({})", region_names(region_from_code(code)), code),
        None => println!("  Region: Unknown"),
    }
    println!("  System Title: {}", rom.has_system_game_code());
    match rom.banner_version {
        Some(version) => println!("  Banner Version: {:#06x}", version),
        None => println!("  Banner Version: N/A"),
    }
    println!("\nBanner Titles");
    for slot in TitleSlot::ALL {
        if let Some(title) = rom.titles.get_unless_default(slot) {
            println!("  {}: {}", slot.language().english_name(), title.replace('\n', " / "));
        }
    }
}

fn is_rom(input: &Path) -> bool {
    let by_extension = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ["app", "nds", "srl"].contains(&e.to_lowercase().as_str()));
    by_extension || identify_path_role(input) == Some(FileRole::DecryptedContent)
}

pub fn info(input: &Path) -> Result<()> {
    if !input.exists() {
        bail!("Input file \"{}\" does not exist.", input.display());
    }
    match identify_path_role(input) {
        Some(FileRole::Tmd) | Some(FileRole::MetaId) => {
            let data = fs::read(input).with_context(|| format!("\"{}\" could not be read.", input.display()))?;
            let tmd = tmd::TMD::from_bytes(&data).with_context(|| "The provided TMD is not valid.")?;
            print_tmd_info(tmd);
        },
        Some(FileRole::Ticket) => {
            let data = fs::read(input).with_context(|| format!("\"{}\" could not be read.", input.display()))?;
            let ticket = ticket::Ticket::from_bytes(&data).with_context(|| "The provided Ticket is not valid.")?;
            print_ticket_info(ticket);
        },
        _ if is_rom(input) => {
            let rom = RomInfo::from_file(input).with_context(|| format!("\"{}\" could not be read.", input.display()))?;
            if !rom.valid {
                bail!("\"{}\" is not a decrypted DSi ROM, its header checksum does not match.", input.display());
            }
            print_rom_info(rom);
        },
        _ => {
            bail!("Information cannot be displayed for this file type.");
        }
    }
    Ok(())
}

// locale/mod.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Root for the modules that work out the regions and languages of titles.

pub mod classifier;
pub mod eshop;
pub mod language;
pub mod region;
pub mod resolver;

// lib.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Root level module that imports the feature modules.

pub mod catalog;
pub mod locale;
pub mod title;

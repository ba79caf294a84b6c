// title/versions.rs from nuscat (c) 2025 NinjaCheetah & Contributors
// https://github.com/NinjaCheetah/nuscat
//
// Handles converting packed DSi title versions into their human-readable forms.

/// Converts a packed title version into "major.minor.micro" form. The major version occupies the
/// high byte, followed by one nibble each for the minor and micro versions.
pub fn dec_to_standard(version: u16) -> String {
    format!("{}.{}.{}", version >> 8, (version >> 4) & 0xF, version & 0xF)
}

/// Builds the version string recorded for each catalog file: the raw version followed by its
/// human-readable form.
pub fn catalog_version_string(version: u16) -> String {
    format!("{},{}", version, dec_to_standard(version))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dec_to_standard() {
        assert_eq!(dec_to_standard(0), "0.0.0");
        assert_eq!(dec_to_standard(256), "1.0.0");
        assert_eq!(dec_to_standard(0x0213), "2.1.3");
    }

    #[test]
    fn test_catalog_version_string() {
        assert_eq!(catalog_version_string(1280), "1280,5.0.0");
    }
}

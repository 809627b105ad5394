//! ComparisonKey - what two files are judged equal by

use serde::{Deserialize, Serialize};
use std::fmt;

/// How file equality is judged
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Logical byte length from a metadata query
    #[default]
    Size,

    /// Whole-file MD5 digest
    Checksum,
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareMode::Size => f.write_str("size"),
            CompareMode::Checksum => f.write_str("checksum"),
        }
    }
}

/// Per-file value compared between source and destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonKey {
    Size(u64),
    Checksum([u8; 16]),
}

impl ComparisonKey {
    /// Mode that produces this kind of key
    pub fn mode(&self) -> CompareMode {
        match self {
            ComparisonKey::Size(_) => CompareMode::Size,
            ComparisonKey::Checksum(_) => CompareMode::Checksum,
        }
    }
}

impl fmt::Display for ComparisonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonKey::Size(size) => write!(f, "{size} bytes"),
            ComparisonKey::Checksum(digest) => {
                for byte in digest {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mode() {
        assert_eq!(ComparisonKey::Size(10).mode(), CompareMode::Size);
        assert_eq!(ComparisonKey::Checksum([0; 16]).mode(), CompareMode::Checksum);
    }

    #[test]
    fn test_checksum_display_is_hex() {
        let mut digest = [0u8; 16];
        digest[0] = 0xab;
        digest[15] = 0x01;
        let shown = ComparisonKey::Checksum(digest).to_string();
        assert_eq!(shown.len(), 32);
        assert!(shown.starts_with("ab"));
        assert!(shown.ends_with("01"));
    }

    #[test]
    fn test_compare_mode_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: CompareMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"checksum\"").expect("parse mode");
        assert_eq!(parsed.mode, CompareMode::Checksum);
    }
}

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of a content-store entry: a lowercase hex digest of the
/// entry's bytes.
///
/// The digest algorithm (currently MD5, used for deduplication identity
/// only) is confined to `from_data`; everything else treats the hash as an
/// opaque fixed-width hex string, so the algorithm can be swapped without
/// touching the persisted schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn from_data(data: &[u8]) -> Self {
        Self(format!("{:x}", md5::compute(data)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.is_empty() {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self(hex::encode(bytes)))
    }
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ContentHash::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a snapshot stores its payload. Serialized with the ledger's
/// historical tag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotKind {
    #[serde(rename = "md5")]
    Dedup,
    #[serde(rename = "legacy")]
    Legacy,
}

/// One file in a dedup snapshot's metadata list. Field names match the
/// persisted `files.json` schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    #[serde(rename = "md5")]
    pub hash: ContentHash,
    pub size: u64,
    pub mtime: f64,
}

/// Outcome of a restore: what was written and what was skipped, by reason.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    pub restored_count: usize,
    pub total_records: usize,
    pub corrupted_paths: Vec<String>,
    pub missing_paths: Vec<String>,
    pub invalid_paths: Vec<String>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.corrupted_paths.is_empty()
            && self.missing_paths.is_empty()
            && self.invalid_paths.is_empty()
    }
}

/// Ledger timestamp. Fixed-width ISO-8601 in UTC so that lexicographic
/// comparison of two timestamps equals chronological comparison.
pub fn ledger_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Compact timestamp used to keep snapshot directory names unique.
pub fn dir_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Strips characters that are illegal in filenames on common platforms so a
/// user-supplied backup name can be used as a directory name.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_lowercase_hex() {
        let hash = ContentHash::from_data(b"hello");
        assert_eq!(hash.as_str(), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn hash_parse_normalizes_case_and_rejects_garbage() {
        let upper: ContentHash = "5D41402ABC4B2A76B9719D911017C592".parse().unwrap();
        assert_eq!(upper.as_str(), "5d41402abc4b2a76b9719d911017c592");

        assert!("not-hex".parse::<ContentHash>().is_err());
        assert!("abc".parse::<ContentHash>().is_err()); // odd length
        assert!("".parse::<ContentHash>().is_err());
    }

    #[test]
    fn ledger_timestamp_is_fixed_width() {
        let a = ledger_timestamp();
        let b = ledger_timestamp();
        assert_eq!(a.len(), "2026-01-02T03:04:05.123456Z".len());
        assert_eq!(a.len(), b.len());
        assert!(a <= b);
    }

    #[test]
    fn sanitize_strips_illegal_characters() {
        assert_eq!(sanitize_name("boss: before/after?"), "boss beforeafter");
        assert_eq!(sanitize_name("plain name"), "plain name");
    }
}

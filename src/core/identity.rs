//! Record identity using type-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Record type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Scheduled project on a client's cronograma
    Prj,
    /// Submitted survey response
    Srv,
    /// Quotation
    Quot,
    /// Creative brief
    Brf,
}

impl EntityPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Prj => "PRJ",
            EntityPrefix::Srv => "SRV",
            EntityPrefix::Quot => "QUOT",
            EntityPrefix::Brf => "BRF",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[
            EntityPrefix::Prj,
            EntityPrefix::Srv,
            EntityPrefix::Quot,
            EntityPrefix::Brf,
        ]
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PRJ" => Ok(EntityPrefix::Prj),
            "SRV" => Ok(EntityPrefix::Srv),
            "QUOT" => Ok(EntityPrefix::Quot),
            "BRF" => Ok(EntityPrefix::Brf),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique record identifier combining a type prefix and ULID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl EntityId {
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }

    /// True if `query` names this id, either fully or as a case-insensitive prefix
    /// of at least 6 characters (e.g. `PRJ-01J9`).
    pub fn matches(&self, query: &str) -> bool {
        let full = self.to_string();
        let query = query.trim().to_uppercase();
        full == query || (query.len() >= 6 && full.starts_with(&query))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid record prefix: '{0}' (valid: PRJ, SRV, QUOT, BRF)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in record ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id = EntityId::new(EntityPrefix::Prj);
        assert!(id.to_string().starts_with("PRJ-"));
        assert_eq!(id.to_string().len(), 30); // PRJ- (4) + ULID (26)
    }

    #[test]
    fn test_entity_id_roundtrip() {
        let original = EntityId::new(EntityPrefix::Srv);
        let parsed = EntityId::parse(&original.to_string()).unwrap();
        assert_eq!(original, parsed);
        assert_eq!(parsed.prefix(), EntityPrefix::Srv);
    }

    #[test]
    fn test_entity_id_invalid_prefix() {
        let err = EntityId::parse("XXX-01HQ3K4N5M6P7R8S9T0UVWXYZ").unwrap_err();
        assert!(matches!(err, IdParseError::InvalidPrefix(_)));
    }

    #[test]
    fn test_entity_id_missing_delimiter() {
        let err = EntityId::parse("PRJ01HQ3K4N5M6P7R8S9T0UVWXYZ").unwrap_err();
        assert!(matches!(err, IdParseError::MissingDelimiter(_)));
    }

    #[test]
    fn test_entity_id_invalid_ulid() {
        let err = EntityId::parse("PRJ-notaulid").unwrap_err();
        assert!(matches!(err, IdParseError::InvalidUlid(_, _)));
    }

    #[test]
    fn test_matches_prefix() {
        let id = EntityId::new(EntityPrefix::Prj);
        let full = id.to_string();
        assert!(id.matches(&full));
        assert!(id.matches(&full[..10].to_lowercase()));
        assert!(!id.matches("PRJ"));
    }
}

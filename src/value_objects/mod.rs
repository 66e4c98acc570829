//! Graph value objects
//!
//! Identifiers are immutable value types compared by value. Node identifiers are
//! time-ordered so that nodes minted later never sort before nodes minted in an
//! earlier millisecond; graph identifiers are plain random identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

mod identity;

pub use identity::{NodeIdGenerator, SystemClock, TimeOrderedIdGenerator};

/// Length of the canonical hyphenated text form (8-4-4-4-12).
const CANONICAL_LEN: usize = 36;

/// Byte offsets of the hyphens in the canonical text form
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Error returned when parsing an identifier from text fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed identifier: {0:?}")]
pub struct IdentifierParseError(pub String);

/// Unique identifier of a node within (and across) graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Wrap an existing 128-bit value
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an identifier from its raw big-endian bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// The underlying 128-bit value
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Millisecond timestamp stored in the 48-bit prefix
    pub fn timestamp_millis(&self) -> u64 {
        let bytes = self.0.as_bytes();
        bytes[..6]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
    }

    /// Check whether `text` is a node identifier in canonical textual form.
    ///
    /// Never fails: malformed input simply yields `false`.
    pub fn is_valid(text: &str) -> bool {
        is_canonical(text)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NodeId {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_canonical(s).map(Self)
    }
}

impl From<Uuid> for NodeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Unique identifier of a graph aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(Uuid);

impl GraphId {
    /// Create a new random graph identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing 128-bit value
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying 128-bit value
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for GraphId {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_canonical(s).map(Self)
    }
}

fn is_canonical(text: &str) -> bool {
    if text.len() != CANONICAL_LEN {
        return false;
    }

    text.bytes().enumerate().all(|(index, byte)| {
        if HYPHEN_POSITIONS.contains(&index) {
            byte == b'-'
        } else {
            matches!(byte, b'0'..=b'9' | b'a'..=b'f')
        }
    })
}

fn parse_canonical(text: &str) -> Result<Uuid, IdentifierParseError> {
    if !is_canonical(text) {
        return Err(IdentifierParseError(text.to_string()));
    }
    Uuid::parse_str(text).map_err(|_| IdentifierParseError(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_text_round_trip() {
        let text = "01890a5d-ac96-774b-bcce-b302099a8057";
        let id: NodeId = text.parse().unwrap();

        assert_eq!(id.to_string(), text);
        assert!(NodeId::is_valid(text));
    }

    #[test]
    fn test_node_id_validation_rejects_non_canonical_forms() {
        assert!(!NodeId::is_valid(""));
        assert!(!NodeId::is_valid("   "));
        assert!(!NodeId::is_valid("not-a-uuid"));
        // simple form without hyphens
        assert!(!NodeId::is_valid("01890a5dac96774bbcceb302099a8057"));
        // braced form
        assert!(!NodeId::is_valid("{01890a5d-ac96-774b-bcce-b302099a8057}"));
        // hyphen in the wrong place
        assert!(!NodeId::is_valid("01890a5da-c96-774b-bcce-b302099a8057"));
        assert!(!NodeId::is_valid("01890a5d-ac96-774b-bcce-b302099a805g"));
        // uppercase hex
        assert!(!NodeId::is_valid("01890A5D-AC96-774B-BCCE-B302099A8057"));
        assert!("01890a5d-ac96-774b-bcce-B302099a8057".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_parse_error_carries_input() {
        let err = "garbage".parse::<NodeId>().unwrap_err();
        assert_eq!(err, IdentifierParseError("garbage".to_string()));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn test_timestamp_prefix_extraction() {
        let mut bytes = [0u8; 16];
        bytes[..6].copy_from_slice(&[0x01, 0x89, 0x0a, 0x5d, 0xac, 0x96]);
        let id = NodeId::from_bytes(bytes);

        assert_eq!(id.timestamp_millis(), 0x0189_0a5d_ac96);
    }

    #[test]
    fn test_graph_ids_are_unique() {
        let a = GraphId::new();
        let b = GraphId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<GraphId>().unwrap(), a);
    }

    #[test]
    fn test_node_id_serializes_as_text() {
        let id: NodeId = "01890a5d-ac96-774b-bcce-b302099a8057".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"01890a5d-ac96-774b-bcce-b302099a8057\"");

        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

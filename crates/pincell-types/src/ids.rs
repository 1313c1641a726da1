//! Typed identifiers for cells and mirrors.
//!
//! Both ID types wrap UUIDv7 (time-ordered, globally unique) and display as
//! standard UUID text for logging. The `short()` form (first 8 hex chars) is
//! for human-facing UI only, never a lookup key. `to_hex()` is the form used
//! in flow subjects (`cell.<hex>.scheduled`), so it must never contain dots.
//!
//! Cell identity is stable for the life of a cell. A cell's *position* in its
//! document is not, so anything that needs an index resolves it from the ID
//! at the moment of use.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a canonical cell in the host document (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(uuid::Uuid);

/// Identity of a mirror instance (UUIDv7). Never reused after disposal.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MirrorId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// First 8 hex characters, for logs and Debug output.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// Full 32-character hex string (no hyphens).
            pub fn to_hex(&self) -> String {
                self.0.as_simple().to_string()
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Full UUID with hyphens for log readability
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(CellId, "CellId");
impl_typed_id!(MirrorId, "MirrorId");

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unique() {
        let a = CellId::new();
        let b = CellId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_is_8_chars() {
        let id = MirrorId::new();
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn test_hex_has_no_subject_separators() {
        let id = CellId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 32);
        assert!(!hex.contains('.'));
        assert!(!hex.contains('-'));
    }

    #[test]
    fn test_parse_hex_and_uuid_forms() {
        let id = CellId::new();
        assert_eq!(CellId::parse(&id.to_hex()).unwrap(), id);
        assert_eq!(CellId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_debug_uses_short_form() {
        let id = MirrorId::new();
        assert_eq!(format!("{id:?}"), format!("MirrorId({})", id.short()));
    }

    #[test]
    fn test_serde_transparent() {
        let id = CellId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: CellId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// All backend primary keys are BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque correlation token identifying one invitation (or one project /
/// milestone in invitee-facing links).
///
/// A `PublicId` is issued by the backend, is immutable for the lifetime of
/// the record, and is the only identifier an unauthenticated invitee ever
/// holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicId(String);

impl PublicId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PublicId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for PublicId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

//! Identifiers used while a consultation is still a draft.
//!
//! The parent reference is a tagged variant rather than a magic string:
//! `ParentRef::Draft` can never compare equal to a committed id, and every
//! call site has to handle both states.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DraftError;
use crate::config::DRAFT_PARENT_SENTINEL;

/// Identifier issued by the backend for a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Parse a backend id. Empty strings and the draft sentinel are rejected.
    pub fn parse(value: impl Into<String>) -> Result<Self, DraftError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DraftError::Validation("remote id cannot be empty".into()));
        }
        if trimmed == DRAFT_PARENT_SENTINEL {
            return Err(DraftError::Validation(format!(
                "remote id cannot be the draft sentinel {DRAFT_PARENT_SENTINEL:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for RemoteId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DraftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RemoteId> for String {
    fn from(value: RemoteId) -> Self {
        value.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The consultation a child entry hangs off.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParentRef {
    /// Parent exists only in the open dialog.
    Draft,
    /// Parent has been created and has a backend id.
    Committed(RemoteId),
}

impl ParentRef {
    pub fn is_draft(&self) -> bool {
        matches!(self, ParentRef::Draft)
    }

    pub fn committed_id(&self) -> Option<&RemoteId> {
        match self {
            ParentRef::Draft => None,
            ParentRef::Committed(id) => Some(id),
        }
    }

    /// Foreign-key value as the host form would send it.
    pub fn as_wire(&self) -> &str {
        match self {
            ParentRef::Draft => DRAFT_PARENT_SENTINEL,
            ParentRef::Committed(id) => id.as_str(),
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for ParentRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ParentRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == DRAFT_PARENT_SENTINEL {
            return Ok(ParentRef::Draft);
        }
        RemoteId::parse(raw)
            .map(ParentRef::Committed)
            .map_err(serde::de::Error::custom)
    }
}

macro_rules! local_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh id; never reused within the process.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

local_id!(
    /// Client-side id of a staging entry, stable across promotion.
    LocalId
);

local_id!(
    /// Client-side id of a selection set entry.
    SelectionId
);

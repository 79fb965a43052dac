//! Slot identifiers: the names under which level snapshots are persisted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix of the file-name part of every slot id.
const SLOT_PREFIX: &str = "AutoSave";

/// Per-installation namespace that keeps slot names from colliding when
/// several installs share the same storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionNamespace(String);

impl SessionNamespace {
    /// Wraps a namespace string. Path separators are replaced so a namespace
    /// always maps to exactly one directory level.
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self(name.replace(['/', '\\'], "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Names one persisted level snapshot: `<namespace>/AutoSave<sequence>`.
///
/// Sequence numbers increase monotonically within a session, so a freshly
/// stored slot never reuses the name of a snapshot still reachable by undo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId {
    pub namespace: SessionNamespace,
    pub sequence: u64,
}

impl SlotId {
    pub fn new(namespace: SessionNamespace, sequence: u64) -> Self {
        Self {
            namespace,
            sequence,
        }
    }

    /// File-name part of the slot, without namespace or extension.
    pub fn file_stem(&self) -> String {
        format!("{SLOT_PREFIX}{}", self.sequence)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{SLOT_PREFIX}{}", self.namespace, self.sequence)
    }
}

/// Returned when a string is not of the form `<namespace>/AutoSave<n>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotIdParseError(pub String);

impl fmt::Display for SlotIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid slot id: {:?}", self.0)
    }
}

impl std::error::Error for SlotIdParseError {}

impl FromStr for SlotId {
    type Err = SlotIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || SlotIdParseError(s.to_string());
        let (namespace, stem) = s.rsplit_once('/').ok_or_else(err)?;
        if namespace.is_empty() {
            return Err(err());
        }
        let sequence = stem
            .strip_prefix(SLOT_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .ok_or_else(err)?;
        Ok(SlotId::new(SessionNamespace::new(namespace), sequence))
    }
}

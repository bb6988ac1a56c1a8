// flowvcs: Git-backed project storage for flow hosts
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Key the host encrypts the credentials file with.
///
/// Persisted as `false` (disabled), a string (custom) or nothing (inherit
/// the system-wide key).
#[derive(Clone, Default, PartialEq, Eq)]
pub enum CredentialSecret {
    Disabled,
    #[default]
    Default,
    Custom(String),
}

impl CredentialSecret {
    #[must_use]
    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    #[must_use]
    pub fn as_custom(&self) -> Option<&str> {
        match self {
            Self::Custom(key) => Some(key),
            _ => None,
        }
    }

    /// The key the host should use, given the system default.
    #[must_use]
    pub fn resolve(&self, system: Option<&str>) -> Option<String> {
        match self {
            Self::Disabled => None,
            Self::Default => system.map(String::from),
            Self::Custom(key) => Some(key.clone()),
        }
    }
}

impl fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom([hidden])"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Flag(bool),
    Key(String),
}

impl Serialize for CredentialSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Disabled => serializer.serialize_bool(false),
            Self::Default => serializer.serialize_none(),
            Self::Custom(key) => serializer.serialize_str(key),
        }
    }
}

impl<'de> Deserialize<'de> for CredentialSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Stored>::deserialize(deserializer)? {
            Some(Stored::Flag(false)) => Self::Disabled,
            Some(Stored::Key(key)) if !key.is_empty() => Self::Custom(key),
            _ => Self::Default,
        })
    }
}

//! Namespaced channel identifiers.
//!
//! A [`ChannelId`] is the `namespace:path` name a channel is addressed by.
//! Identifiers are case-sensitive and compared by value. Length is not
//! limited here; registries enforce [`MAX_CHANNEL_NAME_LENGTH`] when a
//! handler is registered.
//!
//! [`MAX_CHANNEL_NAME_LENGTH`]: crate::core::MAX_CHANNEL_NAME_LENGTH

use crate::error::{constants, ChannelError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Separator between namespace and path
pub const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId {
    namespace: String,
    path: String,
}

impl ChannelId {
    /// Build an identifier from its two halves
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let path = path.into();

        if namespace.is_empty() {
            return Err(ChannelError::InvalidChannelId(
                constants::ERR_EMPTY_NAMESPACE.to_string(),
            ));
        }
        if path.is_empty() {
            return Err(ChannelError::InvalidChannelId(
                constants::ERR_EMPTY_PATH.to_string(),
            ));
        }
        if namespace.contains(SEPARATOR) || !is_legal(&namespace) || !is_legal(&path) {
            return Err(ChannelError::InvalidChannelId(format!(
                "{}: \"{namespace}{SEPARATOR}{path}\"",
                constants::ERR_ILLEGAL_CHARACTER
            )));
        }

        Ok(Self { namespace, path })
    }

    /// Parse `namespace:path`, splitting on the first separator
    pub fn parse(raw: &str) -> Result<Self> {
        let (namespace, path) = raw.split_once(SEPARATOR).ok_or_else(|| {
            ChannelError::InvalidChannelId(format!(
                "{}: \"{raw}\"",
                constants::ERR_MISSING_SEPARATOR
            ))
        })?;
        Self::new(namespace, path)
    }

    /// Construct from known-good literals without validation
    pub(crate) fn from_static(namespace: &'static str, path: &'static str) -> Self {
        Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Length in characters of the `namespace:path` form
    #[inline]
    pub fn serialized_len(&self) -> usize {
        self.namespace.chars().count() + 1 + self.path.chars().count()
    }
}

fn is_legal(part: &str) -> bool {
    !part.chars().any(|c| c.is_whitespace() || c.is_control())
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.namespace, self.path)
    }
}

impl FromStr for ChannelId {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ChannelId {
    type Error = ChannelError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl Serialize for ChannelId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ChannelId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

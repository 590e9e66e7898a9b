//! Validated identifier types that enforce invariants at construction time

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::protocol::GROUP_NAME_MAX_LEN;

/// Validation errors for file identifiers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("group name cannot be empty")]
    EmptyGroupName,

    #[error("group name {0:?} exceeds {max} bytes", max = GROUP_NAME_MAX_LEN)]
    GroupNameTooLong(String),

    #[error("remote filename cannot be empty")]
    EmptyRemoteFilename,

    #[error("file id {0:?} is not of the form group/remote_filename")]
    MissingSeparator(String),
}

/// Macro to generate validated string newtypes.
///
/// Each type gets a validating `new()`, `as_str()`, `AsRef<str>`, `Deref`,
/// `Display`, `TryFrom<String>` and serde impls that run the validation.
macro_rules! validated_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident(String) {
            validation: |$s_param:ident| $validation:expr,
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        $vis struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", stringify!($name), " after validation")]
            pub fn new($s_param: String) -> Result<Self, ValidationError> {
                let validate = || $validation;
                validate()?;
                Ok(Self($s_param))
            }

            #[doc = concat!("Get the ", stringify!($name), " as a string slice")]
            #[must_use]
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from($s_param: String) -> Result<Self, Self::Error> {
                Self::new($s_param)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

validated_string! {
    /// A storage group name: non-empty and at most 16 bytes on the wire
    ///
    /// # Examples
    /// ```
    /// use fdfs_client::types::GroupName;
    ///
    /// let group = GroupName::new("group1".to_string()).unwrap();
    /// assert_eq!(group.as_str(), "group1");
    ///
    /// assert!(GroupName::new("".to_string()).is_err());
    /// assert!(GroupName::new("a-group-name-that-is-too-long".to_string()).is_err());
    /// ```
    pub struct GroupName(String) {
        validation: |s| {
            if s.is_empty() {
                Err(ValidationError::EmptyGroupName)
            } else if s.len() > GROUP_NAME_MAX_LEN {
                Err(ValidationError::GroupNameTooLong(s.clone()))
            } else {
                Ok(())
            }
        },
    }
}

validated_string! {
    /// Path of a file inside its group, e.g. `M00/00/00/wKgAAWc.txt`
    pub struct RemoteFilename(String) {
        validation: |s| {
            if s.is_empty() {
                Err(ValidationError::EmptyRemoteFilename)
            } else {
                Ok(())
            }
        },
    }
}

/// Identifier the storage node hands back for an uploaded file
///
/// Rendered as `group/remote_filename`; only the first `/` separates the
/// two parts, the remote filename itself contains more.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId {
    group: GroupName,
    remote_filename: RemoteFilename,
}

impl FileId {
    /// Build a file id from already validated parts
    #[must_use]
    pub fn new(group: GroupName, remote_filename: RemoteFilename) -> Self {
        Self {
            group,
            remote_filename,
        }
    }

    /// Parse `group/remote_filename`
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let (group, remote) = s
            .split_once('/')
            .ok_or_else(|| ValidationError::MissingSeparator(s.to_string()))?;
        Ok(Self {
            group: GroupName::new(group.to_string())?,
            remote_filename: RemoteFilename::new(remote.to_string())?,
        })
    }

    #[must_use]
    pub fn group(&self) -> &GroupName {
        &self.group
    }

    #[must_use]
    pub fn remote_filename(&self) -> &RemoteFilename {
        &self.remote_filename
    }
}

impl FromStr for FileId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.remote_filename)
    }
}

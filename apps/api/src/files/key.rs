//! Resource keys and the positional ownership policy.
//!
//! A key is a `/`-separated path into the blob store. Keys under the
//! `users` namespace encode their owner in the second segment
//! (`users/<owner>/<resource>.<ext>`) and are readable only by that owner.
//! Keys outside the namespace are not owner-restricted.

use std::borrow::Cow;

use thiserror::Error;

use crate::auth::UserId;

pub const USER_NAMESPACE: &str = "users";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Resource key is empty")]
    Empty,

    #[error("Path segment {0:?} is not valid percent-encoded UTF-8")]
    BadEncoding(String),

    #[error("User id {0:?} cannot be used as a key segment")]
    InvalidOwner(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Builds a key from still-encoded path segments.
    ///
    /// Each segment is decoded on its own before joining, so an encoded `/`
    /// (`%2F`) is decoded inside its segment rather than re-splitting the
    /// path before decoding.
    pub fn from_encoded_segments<'a, I>(segments: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let decoded = segments
            .into_iter()
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(Cow::into_owned)
                    .map_err(|_| KeyError::BadEncoding(segment.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let key = decoded.join("/");
        if key.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(key))
    }

    /// Splits a raw (percent-encoded) request path on `/` and decodes it.
    pub fn from_raw_path(raw: &str) -> Result<Self, KeyError> {
        Self::from_encoded_segments(raw.split('/'))
    }

    /// `users/<owner>/<resource_id>.<extension>`
    ///
    /// Fails when the owner id would not survive as the second segment.
    pub fn for_user(owner: &UserId, resource_id: &str, extension: &str) -> Result<Self, KeyError> {
        if !owner.is_path_safe() {
            return Err(KeyError::InvalidOwner(owner.to_string()));
        }
        Ok(Self(format!("{USER_NAMESPACE}/{owner}/{resource_id}.{extension}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The owner segment, when the key lives under the user namespace.
    pub fn owner(&self) -> Option<&str> {
        let mut parts = self.0.split('/');
        if parts.next() != Some(USER_NAMESPACE) {
            return None;
        }
        parts.next()
    }

    pub fn is_accessible_by(&self, user: &UserId) -> bool {
        match self.owner() {
            Some(owner) => owner == user.as_str(),
            None => true,
        }
    }

    /// Path under which the gateway serves this key, each segment re-encoded.
    pub fn url_path(&self) -> String {
        let encoded: Vec<_> = self.0.split('/').map(urlencoding::encode).collect();
        format!("/files/{}", encoded.join("/"))
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

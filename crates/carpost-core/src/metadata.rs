//! # Job Metadata
//!
//! The metadata document attached to every job, plus the [`ImageSource`] sum
//! type for its image reference.
//!
//! ## Wire Form
//!
//! The document is stored as `metadata.json` next to the job's blocks:
//!
//! ```json
//! {
//!   "name": "...",
//!   "description": "...",
//!   "image": "ipfs://<dir-cid>/cat.png",
//!   "properties": { "tags": [], "content": "", "payment": "", "location": "" }
//! }
//! ```
//!
//! On the wire the image is always a string. A local payload has no wire form
//! and must go through the block encoder first; serializing one fails.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::error::ParseError;
use crate::resolver::gatewayize;

/// Descriptive properties of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub payment: String,
    #[serde(default)]
    pub location: String,
}

/// A job's metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub image: ImageSource,
    #[serde(default)]
    pub properties: Properties,
}

impl Metadata {
    /// Resolve the image reference to a fetchable URL through `gateway`.
    ///
    /// Local payloads have no URL until they are encoded.
    pub fn image_url(&self, gateway: &str) -> Result<Option<Url>, ParseError> {
        match &self.image {
            ImageSource::Remote(url) => gatewayize(url.as_str(), gateway).map(Some),
            ImageSource::Resolved(uri) => gatewayize(uri, gateway).map(Some),
            ImageSource::Local(_) => Ok(None),
        }
    }
}

/// Where a job's image lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An HTTP(S) URL hosted elsewhere.
    Remote(Url),
    /// A local binary payload not yet content-addressed.
    Local(LocalFile),
    /// An already-resolved content URI string, e.g. `ipfs://<cid>/cat.png`.
    Resolved(String),
}

impl ImageSource {
    /// Short variant name for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::Local(_) => "local",
            Self::Resolved(_) => "resolved",
        }
    }
}

impl Serialize for ImageSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Remote(url) => serializer.serialize_str(url.as_str()),
            Self::Resolved(uri) => serializer.serialize_str(uri),
            Self::Local(file) => Err(serde::ser::Error::custom(format!(
                "local image {:?} must be encoded before serialization",
                file.name
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for ImageSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        match Url::parse(&text) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Remote(url)),
            _ => Ok(Self::Resolved(text)),
        }
    }
}

/// A local binary payload with the filename it will be published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub payload: Payload,
}

impl LocalFile {
    /// A payload already held in memory.
    pub fn in_memory(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Memory(bytes.into()),
        }
    }

    /// A payload read from disk when it is encoded.
    ///
    /// The published filename is the path's final component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            payload: Payload::Path(path),
        }
    }
}

/// The bytes behind a [`LocalFile`].
#[derive(Clone, PartialEq, Eq)]
pub enum Payload {
    Memory(Bytes),
    Path(PathBuf),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            Self::Path(path) => write!(f, "Path({})", path.display()),
        }
    }
}

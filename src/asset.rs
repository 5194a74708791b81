// src/asset.rs
// User-supplied image: bytes plus declared media type, and the local upload guard

use crate::error::Result;
use mime_guess::mime::{self, Mime};
use std::path::Path;
use thiserror::Error;

/// Media type used when nothing better can be guessed from a file name
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Why a candidate image was refused before any upload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetRejection {
    #[error("'{media_type}' is not an image type")]
    NotAnImage { media_type: String },

    #[error("'{media_type}' is not a valid media type")]
    InvalidMediaType { media_type: String },

    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("image file is empty")]
    Empty,
}

/// An image selected by the user for one classification cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    file_name: String,
    media_type: String,
    data: Vec<u8>,
}

impl ImageAsset {
    /// Wrap raw bytes. No checks happen here; see [`ImageAsset::validate`].
    pub fn new(file_name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    /// Read an image from disk, guessing its media type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self::new(file_name, media_type, data))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Check the upload invariants: an `image/*` media type and at most `max_bytes` of data.
    pub fn validate(&self, max_bytes: u64) -> std::result::Result<(), AssetRejection> {
        let parsed: Mime = self
            .media_type
            .parse()
            .map_err(|_| AssetRejection::InvalidMediaType {
                media_type: self.media_type.clone(),
            })?;
        if parsed.type_() != mime::IMAGE {
            return Err(AssetRejection::NotAnImage {
                media_type: self.media_type.clone(),
            });
        }
        if self.data.is_empty() {
            return Err(AssetRejection::Empty);
        }
        if self.size() > max_bytes {
            return Err(AssetRejection::TooLarge {
                size: self.size(),
                max: max_bytes,
            });
        }
        Ok(())
    }
}

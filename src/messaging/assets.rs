//! Image asset upload decisions.
//!
//! A new asset is uploaded together with its encrypted bytes. When the
//! backend later reports missing recipients, a non-inline asset that already
//! has an id is re-sent through the retry endpoint with metadata only; an
//! inline asset always travels with its bytes.

use crate::messaging::EncryptedPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image rendition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Small placeholder
    Preview,
    /// Display size
    Medium,
    /// Unscaled original
    Original,
    /// Profile picture
    Profile,
}

impl ImageFormat {
    /// Rendition actually uploaded for a request in this format: medium
    /// stays medium, everything else goes up as the preview.
    pub fn upload_format(self) -> Self {
        match self {
            Self::Medium => Self::Medium,
            Self::Preview | Self::Original | Self::Profile => Self::Preview,
        }
    }
}

/// An image message as seen by the request factory
pub trait AssetMessage {
    /// Backend asset id, once the first upload succeeded.
    ///
    /// Asset ids are UUIDs on the wire; they appear in upload paths in
    /// hyphenated form. The fetch side,
    /// [`crate::messaging::MessageRequestFactory::request_to_get_asset`],
    /// takes a plain string since it also serves ids read back from the
    /// backend, so `asset_id.to_string()` addresses the same asset.
    fn asset_id(&self) -> Option<Uuid>;

    /// Whether `format` is embedded in the message instead of referenced
    fn is_inline(&self, format: ImageFormat) -> bool;

    /// Image bytes for `format`, encrypted when `encrypted` is set
    fn image_data(&self, format: ImageFormat, encrypted: bool) -> Option<Vec<u8>>;

    /// Metadata message for `format`, encrypted for all recipients
    fn encrypted_metadata(&self, format: ImageFormat) -> Option<EncryptedPayload>;

    /// Human readable description for request diagnostics
    fn debug_description(&self, format: ImageFormat) -> String {
        format!("{format:?} image asset")
    }
}

/// Which asset endpoint to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetUploadDecision {
    /// Upload metadata and the encrypted image bytes
    InsertedWithData(Vec<u8>),
    /// Re-send metadata only, referencing an already uploaded asset
    RetryWithoutData(Uuid),
}

impl AssetUploadDecision {
    /// Decide how to upload `format` of `message`.
    ///
    /// Inline assets and assets without an id need their bytes; `None` if
    /// those bytes are not available yet.
    pub fn for_message<M>(message: &M, format: ImageFormat) -> Option<Self>
    where
        M: AssetMessage + ?Sized,
    {
        match (message.is_inline(format), message.asset_id()) {
            (true, _) | (false, None) => {
                message.image_data(format, true).map(Self::InsertedWithData)
            }
            (false, Some(asset_id)) => Some(Self::RetryWithoutData(asset_id)),
        }
    }
}

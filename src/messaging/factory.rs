//! Upstream requests for encrypted messages and image assets.

use crate::messaging::{AssetMessage, AssetUploadDecision, ImageFormat, MissingClientStrategy};
use crate::transport::{
    Method, MultipartBody, OutboundRequest, IMAGE_ACCEPT_TYPE, OCTET_STREAM_CONTENT_TYPE,
    PROTOBUF_CONTENT_TYPE,
};
use log::debug;
use uuid::Uuid;

/// Ciphertext for all recipients plus how to treat missing devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Serialized encrypted protobuf
    pub data: Vec<u8>,
    /// Strategy for this send attempt
    pub strategy: MissingClientStrategy,
}

impl EncryptedPayload {
    /// Wrap ciphertext with its strategy
    pub fn new(data: Vec<u8>, strategy: MissingClientStrategy) -> Self {
        Self { data, strategy }
    }
}

/// A text (or other non-asset) message ready for encryption
pub trait OtrMessage {
    /// Encrypt for every recipient device; `None` while that is not possible
    fn encrypted_payload(&self) -> Option<EncryptedPayload>;

    /// Whether the payload references externally stored content
    fn is_external(&self) -> bool {
        false
    }

    /// Human readable description for request diagnostics
    fn debug_description(&self) -> String {
        String::new()
    }
}

/// Builds the OTR message and asset requests for a conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageRequestFactory;

impl MessageRequestFactory {
    /// Create a factory
    pub fn new() -> Self {
        Self
    }

    /// `POST /conversations/{id}/otr/messages` with the missing-client
    /// strategy of this attempt as query.
    ///
    /// `None` means the message cannot be encrypted yet; try again later.
    pub fn upstream_request_for_message<M>(
        &self,
        message: &M,
        conversation_id: Uuid,
    ) -> Option<OutboundRequest>
    where
        M: OtrMessage + ?Sized,
    {
        let Some(payload) = message.encrypted_payload() else {
            debug!("message for {conversation_id} not encryptable yet");
            return None;
        };
        let path = payload
            .strategy
            .apply_to_path(&conversation_path(conversation_id, &["otr", "messages"]));

        let description = message.debug_description();
        let description = if message.is_external() {
            format!("External message: {description}")
        } else {
            description
        };

        Some(
            OutboundRequest::binary(path, Method::Post, payload.data, PROTOBUF_CONTENT_TYPE)
                .append_debug_info(description),
        )
    }

    /// Upload request for one rendition of an image message.
    ///
    /// New and inline assets go to `/otr/assets` as multipart with metadata
    /// and bytes; a non-inline asset that already has an id is re-sent to
    /// `/otr/assets/{assetId}` with metadata only. Both are background
    /// requests. `None` if the bytes or metadata are not available yet.
    pub fn upstream_request_for_asset_message<M>(
        &self,
        format: ImageFormat,
        message: &M,
        conversation_id: Uuid,
    ) -> Option<OutboundRequest>
    where
        M: AssetMessage + ?Sized,
    {
        let format = format.upload_format();
        let decision = AssetUploadDecision::for_message(message, format)?;
        let metadata = message.encrypted_metadata(format)?;

        let request = match decision {
            AssetUploadDecision::InsertedWithData(image_data) => {
                let body = MultipartBody::new()
                    .with_part(metadata.data, PROTOBUF_CONTENT_TYPE)
                    .with_part(image_data, OCTET_STREAM_CONTENT_TYPE);
                OutboundRequest::multipart(
                    conversation_path(conversation_id, &["otr", "assets"]),
                    body,
                )
            }
            AssetUploadDecision::RetryWithoutData(asset_id) => {
                let asset_id = asset_id.to_string();
                OutboundRequest::binary(
                    conversation_path(conversation_id, &["otr", "assets", asset_id.as_str()]),
                    Method::Post,
                    metadata.data,
                    PROTOBUF_CONTENT_TYPE,
                )
            }
        };

        Some(
            request
                .append_debug_info(message.debug_description(format))
                .force_background(),
        )
    }

    /// `GET /conversations/{id}[/otr]/assets/{assetId}`
    pub fn request_to_get_asset(
        &self,
        asset_id: &str,
        conversation_id: Uuid,
        is_encrypted: bool,
    ) -> OutboundRequest {
        let path = if is_encrypted {
            conversation_path(conversation_id, &["otr", "assets", asset_id])
        } else {
            conversation_path(conversation_id, &["assets", asset_id])
        };
        OutboundRequest::get(path)
            .with_accept(IMAGE_ACCEPT_TYPE)
            .force_background()
    }
}

fn conversation_path(conversation_id: Uuid, segments: &[&str]) -> String {
    let mut path = format!("/conversations/{conversation_id}");
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RequestBody;

    struct Text {
        payload: Option<EncryptedPayload>,
        external: bool,
    }

    impl OtrMessage for Text {
        fn encrypted_payload(&self) -> Option<EncryptedPayload> {
            self.payload.clone()
        }

        fn is_external(&self) -> bool {
            self.external
        }

        fn debug_description(&self) -> String {
            "text".to_string()
        }
    }

    fn conversation() -> Uuid {
        Uuid::parse_str("0d3bb0a6-35a5-4c0b-9f0e-6a43c0e3b1a7").unwrap()
    }

    #[test]
    fn test_message_paths_per_strategy() {
        let user = Uuid::new_v4();
        let base = "/conversations/0d3bb0a6-35a5-4c0b-9f0e-6a43c0e3b1a7/otr/messages";
        let cases = [
            (MissingClientStrategy::DoNotIgnore, base.to_string()),
            (MissingClientStrategy::IgnoreAll, format!("{base}?ignore_missing")),
            (
                MissingClientStrategy::IgnoreAllExcept(user),
                format!("{base}?report_missing={user}"),
            ),
        ];

        for (strategy, expected) in cases {
            let message = Text {
                payload: Some(EncryptedPayload::new(vec![1, 2], strategy)),
                external: false,
            };
            let request = MessageRequestFactory::new()
                .upstream_request_for_message(&message, conversation())
                .unwrap();

            assert_eq!(request.path(), expected);
            assert_eq!(request.method(), Method::Post);
            assert_eq!(request.content_type(), Some(PROTOBUF_CONTENT_TYPE));
            // The strategy never touches the body.
            assert_eq!(request.body(), &RequestBody::Binary(vec![1, 2]));
            assert!(!request.is_background());
        }
    }

    #[test]
    fn test_unencryptable_message_yields_none() {
        let message = Text {
            payload: None,
            external: false,
        };
        assert!(MessageRequestFactory::new()
            .upstream_request_for_message(&message, conversation())
            .is_none());
    }

    #[test]
    fn test_external_message_debug_info() {
        let message = Text {
            payload: Some(EncryptedPayload::new(vec![1], MissingClientStrategy::DoNotIgnore)),
            external: true,
        };
        let request = MessageRequestFactory::new()
            .upstream_request_for_message(&message, conversation())
            .unwrap();
        assert_eq!(request.debug_info(), &["External message: text".to_string()]);
    }

    #[test]
    fn test_asset_fetch_paths() {
        let factory = MessageRequestFactory::new();

        let encrypted = factory.request_to_get_asset("abc", conversation(), true);
        assert_eq!(
            encrypted.path(),
            "/conversations/0d3bb0a6-35a5-4c0b-9f0e-6a43c0e3b1a7/otr/assets/abc"
        );
        assert_eq!(encrypted.method(), Method::Get);
        assert_eq!(encrypted.accept(), IMAGE_ACCEPT_TYPE);
        assert!(encrypted.is_background());

        let plain = factory.request_to_get_asset("abc", conversation(), false);
        assert_eq!(
            plain.path(),
            "/conversations/0d3bb0a6-35a5-4c0b-9f0e-6a43c0e3b1a7/assets/abc"
        );
        assert!(plain.is_background());
    }

    #[test]
    fn test_uploaded_asset_id_addresses_fetch_path() {
        struct Uploaded(Uuid);

        impl AssetMessage for Uploaded {
            fn asset_id(&self) -> Option<Uuid> {
                Some(self.0)
            }

            fn is_inline(&self, _format: ImageFormat) -> bool {
                false
            }

            fn image_data(&self, _format: ImageFormat, _encrypted: bool) -> Option<Vec<u8>> {
                None
            }

            fn encrypted_metadata(&self, _format: ImageFormat) -> Option<EncryptedPayload> {
                Some(EncryptedPayload::new(vec![7], MissingClientStrategy::DoNotIgnore))
            }
        }

        let asset_id = Uuid::parse_str("3f2a9c4e-1b7d-4e8a-a0c5-9d6b2e4f8a11").unwrap();
        let factory = MessageRequestFactory::new();

        let upload = factory
            .upstream_request_for_asset_message(
                ImageFormat::Medium,
                &Uploaded(asset_id),
                conversation(),
            )
            .unwrap();
        let fetch = factory.request_to_get_asset(&asset_id.to_string(), conversation(), true);

        assert_eq!(
            upload.path(),
            "/conversations/0d3bb0a6-35a5-4c0b-9f0e-6a43c0e3b1a7/otr/assets/\
             3f2a9c4e-1b7d-4e8a-a0c5-9d6b2e4f8a11"
        );
        assert_eq!(upload.path(), fetch.path());
    }
}

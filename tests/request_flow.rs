//! End-to-end request flows: build, hand to a recording transport, complete.

use otr_client::crypto::{PrekeyRecord, LAST_PREKEY_ID};
use otr_client::transport::{
    MultipartBody, RequestBody, OCTET_STREAM_CONTENT_TYPE, PROTOBUF_CONTENT_TYPE,
};
use otr_client::{
    AssetMessage, ClientRequestFactory, DeviceClass, DeviceRecord, DeviceType, EncryptedPayload,
    ImageFormat, KeyMaterialProvider, MessageRequestFactory, Method, MissingClientStrategy,
    OutboundRequest, Outcome, Result, SignalingKeys, SoftwareKeyStore,
};
use std::collections::HashSet;
use uuid::Uuid;

/// Stand-in for the external transport: records requests and answers each
/// with a preset outcome.
struct RecordingTransport {
    sent: Vec<OutboundRequest>,
    outcome: Outcome,
}

impl RecordingTransport {
    fn answering(outcome: Outcome) -> Self {
        Self {
            sent: Vec::new(),
            outcome,
        }
    }

    fn execute(&mut self, request: OutboundRequest, device: &mut DeviceRecord) {
        request.complete(&self.outcome, &mut device.key_state);
        self.sent.push(request);
    }
}

/// Provider with deterministic key bytes
struct CountingProvider;

impl KeyMaterialProvider for CountingProvider {
    fn generate_prekeys(&mut self, count: u16, start: u16) -> Result<Vec<PrekeyRecord>> {
        Ok((start..start + count)
            .map(|id| PrekeyRecord::new(id, vec![id as u8]))
            .collect())
    }

    fn last_prekey(&mut self) -> Result<PrekeyRecord> {
        Ok(PrekeyRecord::last_resort(vec![0xff]))
    }

    fn generate_signaling_keys(&mut self) -> SignalingKeys {
        SignalingKeys::new(vec![0x11; 32], vec![0x22; 32])
    }
}

struct Image {
    inline: bool,
    asset_id: Option<Uuid>,
}

impl AssetMessage for Image {
    fn asset_id(&self) -> Option<Uuid> {
        self.asset_id
    }

    fn is_inline(&self, format: ImageFormat) -> bool {
        self.inline && format == ImageFormat::Preview
    }

    fn image_data(&self, _format: ImageFormat, _encrypted: bool) -> Option<Vec<u8>> {
        Some(b"encrypted image".to_vec())
    }

    fn encrypted_metadata(&self, _format: ImageFormat) -> Option<EncryptedPayload> {
        Some(EncryptedPayload::new(
            b"metadata".to_vec(),
            MissingClientStrategy::IgnoreAll,
        ))
    }
}

fn prekey_ids(request: &OutboundRequest) -> Vec<u64> {
    request.body().as_json().unwrap()["prekeys"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect()
}

#[test]
fn register_two_keys_then_acknowledge() {
    let factory = ClientRequestFactory::new(2);
    let mut device = DeviceRecord::new(DeviceType::Permanent, DeviceClass::Phone);
    let mut transport = RecordingTransport::answering(Outcome::success(201, None));

    let request = factory
        .register_client_request(&mut CountingProvider, &device, None, None)
        .unwrap();
    assert_eq!(prekey_ids(&request), vec![0, 1]);
    assert_eq!(
        request.body().as_json().unwrap()["lastkey"]["id"],
        u64::from(LAST_PREKEY_ID)
    );

    transport.execute(request, &mut device);

    assert_eq!(device.key_state.prekey_watermark, 2);
    assert_eq!(
        device.key_state.signaling_keys,
        Some(SignalingKeys::new(vec![0x11; 32], vec![0x22; 32]))
    );
}

#[test]
fn rejected_registration_leaves_key_state_alone() {
    let factory = ClientRequestFactory::new(2);
    let mut device = DeviceRecord::new(DeviceType::Permanent, DeviceClass::Phone);
    device.key_state.needs_signaling_key_rotation = true;
    let before = device.key_state.clone();

    for outcome in [Outcome::temporary_error(0), Outcome::permanent_error(400, None)] {
        let mut transport = RecordingTransport::answering(outcome);
        let request = factory
            .register_client_request(&mut CountingProvider, &device, None, None)
            .unwrap();
        transport.execute(request, &mut device);
        assert_eq!(device.key_state, before);
    }
}

#[test]
fn successive_replenishments_are_contiguous_and_never_reissue() {
    let factory = ClientRequestFactory::new(5);
    let mut device = DeviceRecord::default().with_remote_identifier("abc123");
    let mut transport = RecordingTransport::answering(Outcome::success(200, None));
    let mut keys = SoftwareKeyStore::new();
    let mut seen = HashSet::new();

    transport.execute(
        factory
            .register_client_request(&mut keys, &device, None, None)
            .unwrap(),
        &mut device,
    );
    seen.extend(prekey_ids(&transport.sent[0]));

    for round in 0..3u64 {
        let watermark = u64::from(device.key_state.prekey_watermark);
        let request = factory.update_prekeys_request(&mut keys, &device).unwrap();
        let ids = prekey_ids(&request);

        assert_eq!(ids, (watermark..watermark + 5).collect::<Vec<_>>(), "round {round}");
        assert!(ids.iter().all(|id| seen.insert(*id)));

        transport.execute(request, &mut device);
    }
    assert_eq!(device.key_state.prekey_watermark, 20);

    // Every uploaded prekey has its private half in the store, once.
    assert_eq!(keys.prekey_count(), 20);
    assert!(keys.take_prekey_secret(19).is_some());
    assert!(keys.take_prekey_secret(19).is_none());
    assert!(keys.take_prekey_secret(20).is_none());
}

#[test]
fn failed_replenishment_reissues_the_same_range() {
    let factory = ClientRequestFactory::new(3);
    let mut device = DeviceRecord::default().with_remote_identifier("abc123");
    device.key_state.prekey_watermark = 40;
    let mut transport = RecordingTransport::answering(Outcome::temporary_error(503));

    let first = factory.update_prekeys_request(&mut CountingProvider, &device).unwrap();
    transport.execute(first, &mut device);
    let second = factory.update_prekeys_request(&mut CountingProvider, &device).unwrap();

    assert_eq!(device.key_state.prekey_watermark, 40);
    assert_eq!(prekey_ids(&second), vec![40, 41, 42]);
}

#[test]
fn retry_of_uploaded_asset_sends_metadata_only() {
    let conversation = Uuid::new_v4();
    let asset_id = Uuid::new_v4();
    let image = Image {
        inline: false,
        asset_id: Some(asset_id),
    };

    let request = MessageRequestFactory::new()
        .upstream_request_for_asset_message(ImageFormat::Medium, &image, conversation)
        .unwrap();

    assert_eq!(
        request.path(),
        format!("/conversations/{conversation}/otr/assets/{asset_id}")
    );
    assert_eq!(request.method(), Method::Post);
    assert_eq!(request.content_type(), Some(PROTOBUF_CONTENT_TYPE));
    assert_eq!(request.body(), &RequestBody::Binary(b"metadata".to_vec()));
    assert!(request.is_background());
}

#[test]
fn new_and_inline_assets_upload_multipart() {
    let conversation = Uuid::new_v4();
    let cases = [
        (
            Image {
                inline: false,
                asset_id: None,
            },
            ImageFormat::Medium,
        ),
        (
            Image {
                inline: true,
                asset_id: Some(Uuid::new_v4()),
            },
            ImageFormat::Preview,
        ),
    ];

    for (image, format) in cases {
        let request = MessageRequestFactory::new()
            .upstream_request_for_asset_message(format, &image, conversation)
            .unwrap();

        // No strategy suffix on asset uploads.
        assert_eq!(request.path(), format!("/conversations/{conversation}/otr/assets"));
        assert_eq!(request.method(), Method::Post);
        assert_eq!(
            request.content_type(),
            Some(MultipartBody::content_type().as_str())
        );
        assert!(request.is_background());

        let parts = request.body().as_multipart().unwrap().parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].content_type, PROTOBUF_CONTENT_TYPE);
        assert_eq!(parts[0].data, b"metadata");
        assert_eq!(parts[1].content_type, OCTET_STREAM_CONTENT_TYPE);
        assert_eq!(parts[1].data, b"encrypted image");
    }
}

#[test]
fn original_format_uploads_as_preview() {
    // Inline only for the preview, so an original-format request for an
    // uploaded asset still goes out with bytes.
    let image = Image {
        inline: true,
        asset_id: Some(Uuid::new_v4()),
    };
    let request = MessageRequestFactory::new()
        .upstream_request_for_asset_message(ImageFormat::Original, &image, Uuid::new_v4())
        .unwrap();
    assert!(request.body().as_multipart().is_some());
}

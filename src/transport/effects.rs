//! Completion effects applied to key state once a request has an outcome.

use crate::client::ClientKeyState;
use crate::crypto::SignalingKeys;
use crate::transport::Outcome;
use log::info;

/// A state change to make when the backend accepts a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEffect {
    /// Move the prekey watermark up to `watermark`
    AdvancePrekeyWatermark {
        /// One past the highest prekey id in the request
        watermark: u16,
    },
    /// Record the uploaded signaling keys and clear the rotation flag
    StoreSignalingKeys {
        /// Keys sent in the request
        keys: SignalingKeys,
    },
}

impl CompletionEffect {
    /// Apply this effect for `outcome`. No-op unless the outcome is a
    /// success; returns whether `state` was changed.
    pub fn apply(&self, outcome: &Outcome, state: &mut ClientKeyState) -> bool {
        if !outcome.is_success() {
            return false;
        }

        match self {
            Self::AdvancePrekeyWatermark { watermark } => {
                if *watermark <= state.prekey_watermark {
                    return false;
                }
                info!("prekey watermark {} -> {}", state.prekey_watermark, watermark);
                state.prekey_watermark = *watermark;
                true
            }
            Self::StoreSignalingKeys { keys } => {
                info!("stored new signaling keys");
                state.signaling_keys = Some(keys.clone());
                state.needs_signaling_key_rotation = false;
                true
            }
        }
    }

    /// Short name used in logs and CLI output
    pub fn name(&self) -> &'static str {
        match self {
            Self::AdvancePrekeyWatermark { .. } => "advance_prekey_watermark",
            Self::StoreSignalingKeys { .. } => "store_signaling_keys",
        }
    }
}

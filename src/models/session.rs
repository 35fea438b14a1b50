use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A per-device asymmetric channel, as persisted in the volatile store.
///
/// Only public keys are ever serialized; the server's private key stays in
/// the process that generated it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The opaque session identifier.
    pub session_id: Uuid,
    /// PEM-encoded server public key handed to the device.
    pub server_public_key: String,
    /// PEM-encoded public key the device supplied at handshake time.
    pub client_public_key: String,
}

/// Maps a stable device fingerprint to its current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBinding {
    pub spec: String,
    pub session_id: Uuid,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Durable status of a client installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Online,
    Offline,
    Maintaining,
    Disabled,
}

impl ClientStatus {
    /// Every recognised status, in storage order.
    pub const ALL: [ClientStatus; 4] = [
        ClientStatus::Online,
        ClientStatus::Offline,
        ClientStatus::Maintaining,
        ClientStatus::Disabled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Online => "online",
            ClientStatus::Offline => "offline",
            ClientStatus::Maintaining => "maintaining",
            ClientStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClientStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unrecognised client status '{}'", s))
    }
}

/// The durable identity of a licensed installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Stable handle used by heartbeats and the liveness cache.
    pub id: Uuid,
    /// Username of the user that first logged in with this serial number.
    pub owning_user: String,
    /// Natural key for identity resolution.
    pub client_sn: String,
    pub network_type: String,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ClientRecord {
    /// A record for a serial number seen for the first time.
    pub fn first_seen(owning_user: &str, client_sn: &str, network_type: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owning_user: owning_user.to_string(),
            client_sn: client_sn.to_string(),
            network_type: network_type.to_string(),
            status: ClientStatus::Online,
            created_at: now,
            modified_at: now,
        }
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a licensed user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's username.
    pub username: String,
    /// How many clients the user may own.
    pub quota: i32,
    /// End of the user's licence validity window.
    pub validate_until: DateTime<Utc>,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub modified_at: DateTime<Utc>,
}

impl UserRecord {
    /// A new user whose licence runs for `days` from now.
    pub fn new(username: &str, quota: i32, days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            quota,
            validate_until: now + Duration::days(days),
            created_at: now,
            modified_at: now,
        }
    }

    /// Replaces quota and restarts the validity window at now + `days`.
    pub fn grant(&mut self, quota: i32, days: i64) {
        let now = Utc::now();
        self.quota = quota;
        self.validate_until = now + Duration::days(days);
        self.modified_at = now;
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.validate_until >= at
    }
}

/// A caller resolved by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(default)]
    pub super_user: bool,
}

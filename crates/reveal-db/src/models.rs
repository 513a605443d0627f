//! Row types that carry more than the public model exposes.
//! Events, votes and gallery posts map straight onto `reveal_types::models`.

use chrono::{DateTime, Utc};
use reveal_types::models::User;
use uuid::Uuid;

pub struct UserRow {
    pub user: User,
    pub password_hash: String,
}

pub struct ResetTokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ResetTokenRow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

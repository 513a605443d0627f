//! Single-use, time-limited password reset tokens.
//!
//! Only the SHA-256 digest of a token is stored. The plaintext leaves this
//! module once, through the [`ResetNotifier`].

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use reveal_db::Database;
use reveal_db::models::ResetTokenRow;
use reveal_db::queries::{reset_tokens, users};
use reveal_types::models::User;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::{passwords, validate};

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;
const TOKEN_BYTES: usize = 32;

/// Delivers a freshly issued token to its owner. Implementations must not
/// block; the call happens on the request path.
pub trait ResetNotifier: Send + Sync {
    fn reset_requested(&self, user: &User, token: &str);
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn required_token(token: &str) -> Result<&str> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CoreError::invalid("token is required"));
    }
    Ok(token)
}

/// Result of the redeem transaction. An expired token is deleted and that
/// deletion has to commit, so expiry is reported as a value, not an error.
enum Redeemed {
    PasswordSet(Uuid),
    Expired,
}

pub struct PasswordResets {
    db: Arc<Database>,
    notifier: Arc<dyn ResetNotifier>,
    ttl: Duration,
}

impl PasswordResets {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn ResetNotifier>) -> Self {
        Self {
            db,
            notifier,
            ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Always succeeds from the caller's point of view, so the response never
    /// tells whether the address is registered.
    pub fn request_reset(&self, email: &str) {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return;
        }

        match self.issue(&email) {
            Ok(Some((user, token))) => {
                info!(user_id = %user.id, "Password reset token issued");
                self.notifier.reset_requested(&user, &token);
            }
            Ok(None) => debug!("Password reset requested for unknown or inactive account"),
            Err(e) => error!("Failed to issue password reset token: {:#}", e),
        }
    }

    fn issue(&self, email: &str) -> anyhow::Result<Option<(User, String)>> {
        let now = Utc::now();
        let ttl = self.ttl;

        self.db.with_tx(|tx| {
            let Some(row) = users::find_active_by_email(tx, email)? else {
                return Ok(None);
            };

            let replaced = reset_tokens::delete_for_user(tx, row.user.id)?;
            if replaced > 0 {
                debug!(user_id = %row.user.id, "Replaced previous reset token");
            }

            let token = generate_token();
            reset_tokens::insert(
                tx,
                &ResetTokenRow {
                    id: Uuid::new_v4(),
                    user_id: row.user.id,
                    token_hash: digest(&token),
                    expires_at: now + ttl,
                    created_at: now,
                },
            )?;
            Ok(Some((row.user, token)))
        })
    }

    /// True while the token exists and has not expired. Never mutates.
    pub fn validate(&self, token: &str) -> Result<bool> {
        let hash = digest(required_token(token)?);
        let found = self.db.with_conn(|c| reset_tokens::find_by_hash(c, &hash))?;
        Ok(found.is_some_and(|t| !t.is_expired(Utc::now())))
    }

    pub fn redeem_and_set_password(&self, token: &str, new_password: &str) -> Result<()> {
        let hash = digest(required_token(token)?);
        validate::password(new_password)?;
        let password_hash = passwords::hash(new_password)?;

        let outcome = self.db.with_tx(|tx| {
            let row = reset_tokens::find_by_hash(tx, &hash)?.ok_or(CoreError::NotFound("token"))?;
            let now = Utc::now();

            if row.is_expired(now) {
                reset_tokens::delete(tx, row.id)?;
                return Ok(Redeemed::Expired);
            }

            let owner = users::find_by_id(tx, row.user_id)?.ok_or(CoreError::NotFound("user"))?;
            if !owner.user.active {
                return Err(CoreError::InactiveAccount);
            }

            users::update_password(tx, row.user_id, &password_hash, now)?;
            reset_tokens::delete(tx, row.id)?;
            Ok(Redeemed::PasswordSet(row.user_id))
        })?;

        match outcome {
            Redeemed::PasswordSet(user_id) => {
                info!(user_id = %user_id, "Password reset completed");
                Ok(())
            }
            Redeemed::Expired => {
                warn!("Expired password reset token presented");
                Err(CoreError::Expired)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::Accounts;
    use crate::testing::{self, RecordingNotifier};

    fn resets(db: &Arc<Database>) -> (PasswordResets, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (PasswordResets::new(db.clone(), notifier.clone()), notifier)
    }

    fn token_rows(db: &Database) -> i64 {
        db.with_conn(|c| {
            Ok(c.query_row("SELECT COUNT(*) FROM password_reset_tokens", [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(digest(&a).len(), 64);
    }

    #[test]
    fn unknown_email_is_silent() {
        let db = testing::db();
        testing::user(&db, "ana@example.com");
        let (resets, notifier) = resets(&db);

        resets.request_reset("nobody@example.com");
        resets.request_reset("   ");
        assert_eq!(notifier.count(), 0);
        assert_eq!(token_rows(&db), 0);

        resets.request_reset("ANA@example.com");
        assert_eq!(notifier.count(), 1);
        assert_eq!(token_rows(&db), 1);
    }

    #[test]
    fn new_request_invalidates_previous_token() {
        let db = testing::db();
        testing::user(&db, "ana@example.com");
        let (resets, notifier) = resets(&db);

        resets.request_reset("ana@example.com");
        let first = notifier.last_token().unwrap();
        resets.request_reset("ana@example.com");
        let second = notifier.last_token().unwrap();

        assert!(!resets.validate(&first).unwrap());
        assert!(resets.validate(&second).unwrap());
        assert_eq!(token_rows(&db), 1);
        assert!(matches!(
            resets.redeem_and_set_password(&first, "novasenha"),
            Err(CoreError::NotFound("token"))
        ));
    }

    #[test]
    fn redeem_sets_password_and_consumes_token() {
        let db = testing::db();
        testing::user(&db, "ana@example.com");
        let (resets, notifier) = resets(&db);
        resets.request_reset("ana@example.com");
        let token = notifier.last_token().unwrap();

        resets.redeem_and_set_password(&token, "novasenha").unwrap();

        let accounts = Accounts::new(db.clone());
        assert!(accounts.login("ana@example.com", "novasenha").is_ok());
        assert!(matches!(
            accounts.login("ana@example.com", testing::PASSWORD),
            Err(CoreError::InvalidCredentials)
        ));
        assert!(!resets.validate(&token).unwrap());
        assert_eq!(token_rows(&db), 0);
    }

    #[test]
    fn expired_token_is_deleted_and_rejected() {
        let db = testing::db();
        testing::user(&db, "ana@example.com");
        let notifier = Arc::new(RecordingNotifier::default());
        let resets = PasswordResets::new(db.clone(), notifier.clone()).with_ttl(Duration::minutes(-1));
        resets.request_reset("ana@example.com");
        let token = notifier.last_token().unwrap();

        assert!(!resets.validate(&token).unwrap());
        assert_eq!(token_rows(&db), 1);

        assert!(matches!(
            resets.redeem_and_set_password(&token, "novasenha"),
            Err(CoreError::Expired)
        ));
        assert_eq!(token_rows(&db), 0);
    }

    #[test]
    fn inactive_owner_cannot_redeem() {
        let db = testing::db();
        let user = testing::user(&db, "ana@example.com");
        let (resets, notifier) = resets(&db);
        resets.request_reset("ana@example.com");
        let token = notifier.last_token().unwrap();

        Accounts::new(db.clone()).deactivate(user.id, user.id).unwrap();
        assert!(matches!(
            resets.redeem_and_set_password(&token, "novasenha"),
            Err(CoreError::InactiveAccount)
        ));
    }

    #[test]
    fn blank_input_is_invalid() {
        let db = testing::db();
        let (resets, _) = resets(&db);

        assert!(matches!(resets.validate("  "), Err(CoreError::InvalidInput(_))));
        assert!(matches!(
            resets.redeem_and_set_password("", "novasenha"),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            resets.redeem_and_set_password("abc", "123"),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(!resets.validate("never-issued").unwrap());
    }
}

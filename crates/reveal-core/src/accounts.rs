use std::sync::Arc;

use chrono::Utc;
use reveal_db::queries::users;
use reveal_db::{Connection, Database, is_unique_violation};
use reveal_types::api::{RegisterRequest, UpdateProfileRequest};
use reveal_types::models::{Role, User};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Conflict, CoreError, Result};
use crate::{passwords, validate};

/// Loads a user that may act on the system. Deactivated accounts are treated
/// as absent so a still-valid JWT cannot keep mutating state.
pub(crate) fn require_active(conn: &Connection, id: Uuid) -> Result<User> {
    match users::find_by_id(conn, id)? {
        Some(row) if row.user.active => Ok(row.user),
        _ => Err(CoreError::NotFound("user")),
    }
}

pub struct Accounts {
    db: Arc<Database>,
}

impl Accounts {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn register(&self, req: RegisterRequest) -> Result<User> {
        let name = validate::required("name", &req.name, validate::NAME_MAX)?;
        let email = validate::email(&req.email)?;
        validate::password(&req.password)?;
        let photo_url = validate::optional("photo_url", req.photo_url.as_deref(), validate::URL_MAX)?;

        if self.db.with_conn(|c| users::find_by_email(c, &email))?.is_some() {
            return Err(CoreError::Conflict(Conflict::EmailTaken));
        }

        let password_hash = passwords::hash(&req.password)?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            photo_url,
            role: Role::Guest,
            active: true,
            created_at: now,
            updated_at: now,
        };

        match self.db.with_conn(|c| users::insert(c, &user, &password_hash)) {
            Ok(()) => {
                info!(user_id = %user.id, "User registered");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(CoreError::Conflict(Conflict::EmailTaken)),
            Err(e) => Err(e.into()),
        }
    }

    /// Unknown email, inactive account and wrong password all fail the same way.
    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let Some(row) = self.db.with_conn(|c| users::find_active_by_email(c, &email))? else {
            warn!("Login attempt for unknown or inactive account");
            return Err(CoreError::InvalidCredentials);
        };

        if !passwords::verify(password, &row.password_hash)? {
            warn!(user_id = %row.user.id, "Login attempt with wrong password");
            return Err(CoreError::InvalidCredentials);
        }

        info!(user_id = %row.user.id, "User logged in");
        Ok(row.user)
    }

    pub fn current_user(&self, id: Uuid) -> Result<User> {
        self.db.with_tx(|tx| require_active(tx, id))
    }

    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.db
            .with_conn(|c| users::find_by_id(c, id))?
            .map(|row| row.user)
            .ok_or(CoreError::NotFound("user"))
    }

    pub fn list_users(&self, requester_id: Uuid) -> Result<Vec<User>> {
        self.db.with_tx(|tx| {
            let requester = require_active(tx, requester_id)?;
            if !requester.is_admin() {
                return Err(CoreError::Forbidden("only administrators can list users"));
            }
            Ok(users::list(tx)?)
        })
    }

    pub fn update_profile(&self, id: Uuid, req: UpdateProfileRequest) -> Result<User> {
        let name = validate::required("name", &req.name, validate::NAME_MAX)?;
        let email = validate::email(&req.email)?;
        let photo_url = validate::optional("photo_url", req.photo_url.as_deref(), validate::URL_MAX)?;
        let now = Utc::now();

        let res = self.db.with_tx(|tx| {
            require_active(tx, id)?;
            if let Some(other) = users::find_by_email(tx, &email)? {
                if other.user.id != id {
                    return Err(CoreError::Conflict(Conflict::EmailTaken));
                }
            }
            users::update_profile(tx, id, &name, &email, photo_url.as_deref(), now)?;
            require_active(tx, id)
        });

        match res {
            Err(CoreError::Internal(e)) if is_unique_violation(&e) => {
                Err(CoreError::Conflict(Conflict::EmailTaken))
            }
            other => other,
        }
    }

    pub fn change_password(&self, id: Uuid, current: &str, new: &str) -> Result<()> {
        validate::password(new)?;

        let row = self
            .db
            .with_conn(|c| users::find_by_id(c, id))?
            .filter(|row| row.user.active)
            .ok_or(CoreError::NotFound("user"))?;

        if !passwords::verify(current, &row.password_hash)? {
            warn!(user_id = %id, "Password change with wrong current password");
            return Err(CoreError::InvalidCredentials);
        }
        if passwords::verify(new, &row.password_hash)? {
            return Err(CoreError::invalid("new password must differ from the current one"));
        }

        let hash = passwords::hash(new)?;
        self.db.with_conn(|c| users::update_password(c, id, &hash, Utc::now()))?;
        info!(user_id = %id, "Password changed");
        Ok(())
    }

    /// Soft delete. Users may deactivate themselves; admins may deactivate anyone.
    pub fn deactivate(&self, target_id: Uuid, requester_id: Uuid) -> Result<()> {
        self.db.with_tx(|tx| {
            let requester = require_active(tx, requester_id)?;
            if requester.id != target_id && !requester.is_admin() {
                return Err(CoreError::Forbidden("cannot deactivate another user"));
            }
            if !users::set_active(tx, target_id, false, Utc::now())? {
                return Err(CoreError::NotFound("user"));
            }
            info!(user_id = %target_id, by = %requester_id, "User deactivated");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn email_uniqueness_ignores_case() {
        let accounts = Accounts::new(testing::db());
        accounts.register(testing::registration("A@X.com")).unwrap();

        let err = accounts.register(testing::registration("a@x.com")).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(Conflict::EmailTaken)));
    }

    #[test]
    fn registered_email_is_stored_lowercase() {
        let accounts = Accounts::new(testing::db());
        let user = accounts.register(testing::registration("  Ana@Example.com ")).unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.role, Role::Guest);
        assert!(user.active);
    }

    #[test]
    fn login_checks_password_and_activity() {
        let accounts = Accounts::new(testing::db());
        let user = accounts.register(testing::registration("ana@example.com")).unwrap();

        assert_eq!(accounts.login("ANA@example.com", testing::PASSWORD).unwrap().id, user.id);
        assert!(matches!(
            accounts.login("ana@example.com", "wrong-password"),
            Err(CoreError::InvalidCredentials)
        ));

        accounts.deactivate(user.id, user.id).unwrap();
        assert!(matches!(
            accounts.login("ana@example.com", testing::PASSWORD),
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(accounts.current_user(user.id), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn change_password_requires_current_and_a_new_value() {
        let accounts = Accounts::new(testing::db());
        let user = accounts.register(testing::registration("ana@example.com")).unwrap();

        assert!(matches!(
            accounts.change_password(user.id, "nope-nope", "novasenha"),
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.change_password(user.id, testing::PASSWORD, testing::PASSWORD),
            Err(CoreError::InvalidInput(_))
        ));

        accounts.change_password(user.id, testing::PASSWORD, "novasenha").unwrap();
        assert!(accounts.login("ana@example.com", "novasenha").is_ok());
    }

    #[test]
    fn profile_update_cannot_steal_an_email() {
        let accounts = Accounts::new(testing::db());
        accounts.register(testing::registration("ana@example.com")).unwrap();
        let bruno = accounts.register(testing::registration("bruno@example.com")).unwrap();

        let err = accounts
            .update_profile(
                bruno.id,
                UpdateProfileRequest {
                    name: "Bruno".into(),
                    email: "ANA@example.com".into(),
                    photo_url: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(Conflict::EmailTaken)));

        let updated = accounts
            .update_profile(
                bruno.id,
                UpdateProfileRequest {
                    name: "Bruno S.".into(),
                    email: "bruno@example.com".into(),
                    photo_url: Some("https://cdn.example.com/b.jpg".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Bruno S.");
        assert_eq!(updated.photo_url.as_deref(), Some("https://cdn.example.com/b.jpg"));
    }

    #[test]
    fn blank_photo_clears_the_profile_picture() {
        let accounts = Accounts::new(testing::db());
        let mut req = testing::registration("ana@example.com");
        req.photo_url = Some("https://cdn.example.com/a.jpg".into());
        let ana = accounts.register(req).unwrap();
        assert!(ana.photo_url.is_some());

        let updated = accounts
            .update_profile(
                ana.id,
                UpdateProfileRequest {
                    name: "Ana".into(),
                    email: "ana@example.com".into(),
                    photo_url: Some("   ".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.photo_url, None);
        assert_eq!(accounts.current_user(ana.id).unwrap().photo_url, None);
    }

    #[test]
    fn only_admins_deactivate_others() {
        let db = testing::db();
        let accounts = Accounts::new(db.clone());
        let ana = accounts.register(testing::registration("ana@example.com")).unwrap();
        let bruno = accounts.register(testing::registration("bruno@example.com")).unwrap();

        assert!(matches!(
            accounts.deactivate(bruno.id, ana.id),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(accounts.list_users(ana.id), Err(CoreError::Forbidden(_))));

        testing::make_admin(&db, ana.id);
        accounts.deactivate(bruno.id, ana.id).unwrap();
        assert!(!accounts.get_user(bruno.id).unwrap().active);
        assert_eq!(accounts.list_users(ana.id).unwrap().len(), 2);
    }
}

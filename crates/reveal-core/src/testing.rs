use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use reveal_db::Database;
use reveal_types::api::{EventRequest, RegisterRequest};
use reveal_types::models::User;
use uuid::Uuid;

use crate::accounts::Accounts;
use crate::password_reset::ResetNotifier;

pub const PASSWORD: &str = "segredo123";

pub fn db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().expect("in-memory db"))
}

pub fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Convidado".into(),
        email: email.into(),
        password: PASSWORD.into(),
        photo_url: None,
    }
}

pub fn user(db: &Arc<Database>, email: &str) -> User {
    Accounts::new(db.clone())
        .register(registration(email))
        .expect("register")
}

pub fn make_admin(db: &Database, id: Uuid) {
    db.with_conn(|c| {
        c.execute("UPDATE users SET role = 'ADMIN' WHERE id = ?1", [id.to_string()])?;
        Ok(())
    })
    .expect("promote");
}

pub fn event_request(title: &str) -> EventRequest {
    EventRequest {
        title: title.into(),
        description: Some("Cha revelacao".into()),
        event_date: Utc::now() + Duration::days(7),
        location: Some("Salao de festas".into()),
        mother_name: "Ana".into(),
        father_name: "Bruno".into(),
        voting_deadline: None,
    }
}

/// Captures (email, token) pairs instead of sending mail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn last_token(&self) -> Option<String> {
        self.sent.lock().unwrap().last().map(|(_, t)| t.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl ResetNotifier for RecordingNotifier {
    fn reset_requested(&self, user: &User, token: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((user.email.clone(), token.to_string()));
    }
}

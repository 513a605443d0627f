pub mod accounts;
pub mod error;
pub mod events;
pub mod gallery;
pub mod media;
pub mod password_reset;
pub mod passwords;
pub mod validate;
pub mod votes;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use chrono::Duration;
use reveal_db::Database;

pub use error::{Conflict, CoreError, Result};
pub use password_reset::ResetNotifier;

use accounts::Accounts;
use events::Events;
use gallery::Gallery;
use media::MediaLibrary;
use password_reset::PasswordResets;
use votes::Votes;

/// Every domain service over one shared database.
pub struct Services {
    pub accounts: Accounts,
    pub events: Events,
    pub votes: Votes,
    pub gallery: Gallery,
    pub media: MediaLibrary,
    pub resets: PasswordResets,
}

impl Services {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn ResetNotifier>, reset_ttl: Duration) -> Self {
        Self {
            accounts: Accounts::new(db.clone()),
            events: Events::new(db.clone()),
            votes: Votes::new(db.clone()),
            gallery: Gallery::new(db.clone()),
            media: MediaLibrary::new(db.clone()),
            resets: PasswordResets::new(db, notifier).with_ttl(reset_ttl),
        }
    }
}

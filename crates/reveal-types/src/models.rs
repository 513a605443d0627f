use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored enum column held a value this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Organizer,
    Guest,
}

text_enum!(Role, "role", { Admin => "ADMIN", Organizer => "ORGANIZER", Guest => "GUEST" });

/// A vote's prediction, and an event's revealed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Guess {
    Boy,
    Girl,
}

text_enum!(Guess, "guess", { Boy => "BOY", Girl => "GIRL" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Active,
    Cancelled,
    Finished,
}

text_enum!(EventStatus, "event status", {
    Active => "ACTIVE",
    Cancelled => "CANCELLED",
    Finished => "FINISHED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

text_enum!(MediaKind, "media kind", { Image => "image", Video => "video" });

/// An upload held by the media host, and who may remove it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub public_id: String,
    pub owner_id: Uuid,
    pub kind: MediaKind,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account. The password hash never leaves the db crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub location: Option<String>,
    pub mother_name: String,
    pub father_name: String,
    pub revealed: bool,
    pub result: Option<Guess>,
    pub status: EventStatus,
    pub voting_closed: bool,
    pub voting_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Voting is open while the flag is clear, the event is active and the
    /// deadline (when set) lies in the future.
    pub fn accepts_votes(&self, now: DateTime<Utc>) -> bool {
        !self.voting_closed
            && self.status == EventStatus::Active
            && self.voting_deadline.is_none_or(|deadline| now < deadline)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub event_id: Uuid,
    pub voter_id: Uuid,
    pub guess: Guess,
    pub justification: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPost {
    pub id: Uuid,
    pub event_id: Uuid,
    pub author_id: Uuid,
    pub message: Option<String>,
    pub photo_url: Option<String>,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub total: u64,
    pub boy: u64,
    pub girl: u64,
}

/// An event together with its organizer and the current vote counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: Event,
    pub organizer: User,
    pub tally: VoteTally,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event() -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Baby Silva".into(),
            description: None,
            event_date: now,
            location: None,
            mother_name: "Ana".into(),
            father_name: "Bruno".into(),
            revealed: false,
            result: None,
            status: EventStatus::Active,
            voting_closed: false,
            voting_deadline: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn enums_parse_their_column_text() {
        assert_eq!("GIRL".parse::<Guess>().unwrap(), Guess::Girl);
        assert_eq!("ORGANIZER".parse::<Role>().unwrap(), Role::Organizer);
        assert_eq!(EventStatus::Cancelled.as_str(), "CANCELLED");
        assert_eq!("video".parse::<MediaKind>().unwrap(), MediaKind::Video);

        let err = "girl".parse::<Guess>().unwrap_err();
        assert_eq!(err.kind, "guess");
    }

    #[test]
    fn guess_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Guess::Boy).unwrap(), "\"BOY\"");
    }

    #[test]
    fn voting_window_rules() {
        let now = Utc::now();
        let mut e = event();
        assert!(e.accepts_votes(now));

        e.voting_deadline = Some(now - Duration::minutes(1));
        assert!(!e.accepts_votes(now));

        e.voting_deadline = Some(now + Duration::minutes(1));
        e.status = EventStatus::Finished;
        assert!(!e.accepts_votes(now));

        e.status = EventStatus::Active;
        e.voting_closed = true;
        assert!(!e.accepts_votes(now));
    }
}

//! Event lifecycle: reads are public, every mutation is owner-only.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use reveal_db::queries::events::{self, EventFilter};
use reveal_db::queries::{users, votes};
use reveal_db::{Connection, Database};
use reveal_types::api::EventRequest;
use reveal_types::models::{Event, EventDetails, EventStatus, Guess};
use tracing::info;
use uuid::Uuid;

use crate::accounts::require_active;
use crate::error::{CoreError, Result};
use crate::validate;

struct EventFields {
    title: String,
    description: Option<String>,
    location: Option<String>,
    mother_name: String,
    father_name: String,
}

fn validated(req: &EventRequest) -> Result<EventFields> {
    Ok(EventFields {
        title: validate::required("title", &req.title, validate::TITLE_MAX)?,
        description: validate::optional(
            "description",
            req.description.as_deref(),
            validate::DESCRIPTION_MAX,
        )?,
        location: validate::optional("location", req.location.as_deref(), validate::LOCATION_MAX)?,
        mother_name: validate::required("mother_name", &req.mother_name, validate::NAME_MAX)?,
        father_name: validate::required("father_name", &req.father_name, validate::NAME_MAX)?,
    })
}

fn details(conn: &Connection, event: Event) -> Result<EventDetails> {
    let organizer = users::find_by_id(conn, event.owner_id)?
        .ok_or_else(|| anyhow!("event {} references missing owner {}", event.id, event.owner_id))?
        .user;
    let tally = votes::tally(conn, event.id)?;
    Ok(EventDetails {
        event,
        organizer,
        tally,
    })
}

/// The event, provided `requester_id` is an active user who owns it.
fn owned_event(conn: &Connection, id: Uuid, requester_id: Uuid) -> Result<Event> {
    require_active(conn, requester_id)?;
    let event = events::find(conn, id)?.ok_or(CoreError::NotFound("event"))?;
    if event.owner_id != requester_id {
        return Err(CoreError::Forbidden("only the organizer can change this event"));
    }
    Ok(event)
}

pub struct Events {
    db: Arc<Database>,
}

impl Events {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(&self, owner_id: Uuid, req: EventRequest) -> Result<EventDetails> {
        let fields = validated(&req)?;
        let now = Utc::now();

        let created = self.db.with_tx(|tx| {
            require_active(tx, owner_id)?;
            let event = Event {
                id: Uuid::new_v4(),
                owner_id,
                title: fields.title,
                description: fields.description,
                event_date: req.event_date,
                location: fields.location,
                mother_name: fields.mother_name,
                father_name: fields.father_name,
                revealed: false,
                result: None,
                status: EventStatus::Active,
                voting_closed: false,
                voting_deadline: req.voting_deadline,
                created_at: now,
                updated_at: now,
            };
            events::insert(tx, &event)?;
            details(tx, event)
        })?;

        info!(event_id = %created.event.id, owner_id = %owner_id, "Event created");
        Ok(created)
    }

    pub fn get(&self, id: Uuid) -> Result<EventDetails> {
        self.db.with_tx(|tx| {
            let event = events::find(tx, id)?.ok_or(CoreError::NotFound("event"))?;
            details(tx, event)
        })
    }

    fn list_filtered(&self, filter: EventFilter) -> Result<Vec<EventDetails>> {
        self.db.with_tx(|tx| {
            events::list(tx, filter)?
                .into_iter()
                .map(|e| details(tx, e))
                .collect()
        })
    }

    pub fn list(&self) -> Result<Vec<EventDetails>> {
        self.list_filtered(EventFilter::All)
    }

    pub fn list_active(&self) -> Result<Vec<EventDetails>> {
        self.list_filtered(EventFilter::Active)
    }

    /// Events currently accepting votes, deadline included.
    pub fn list_open_for_voting(&self) -> Result<Vec<EventDetails>> {
        let now = Utc::now();
        Ok(self
            .list_filtered(EventFilter::VotingOpen)?
            .into_iter()
            .filter(|d| d.event.accepts_votes(now))
            .collect())
    }

    pub fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<EventDetails>> {
        self.list_filtered(EventFilter::Owner(owner_id))
    }

    pub fn update(&self, id: Uuid, req: EventRequest, requester_id: Uuid) -> Result<EventDetails> {
        let fields = validated(&req)?;

        self.db.with_tx(|tx| {
            let mut event = owned_event(tx, id, requester_id)?;
            event.title = fields.title;
            event.description = fields.description;
            event.event_date = req.event_date;
            event.location = fields.location;
            event.mother_name = fields.mother_name;
            event.father_name = fields.father_name;
            event.voting_deadline = req.voting_deadline;
            event.updated_at = Utc::now();

            events::update_details(tx, &event)?;
            info!(event_id = %id, "Event updated");
            details(tx, event)
        })
    }

    /// Publishes the result and closes voting. All three columns change in
    /// one statement, and the CHECK constraint rejects any partial state.
    pub fn reveal(&self, id: Uuid, result: Guess, requester_id: Uuid) -> Result<EventDetails> {
        self.db.with_tx(|tx| {
            owned_event(tx, id, requester_id)?;
            events::reveal(tx, id, result, Utc::now())?;
            let event = events::find(tx, id)?.ok_or(CoreError::NotFound("event"))?;
            info!(event_id = %id, result = %result, "Event revealed");
            details(tx, event)
        })
    }

    pub fn close_voting(&self, id: Uuid, requester_id: Uuid) -> Result<EventDetails> {
        self.db.with_tx(|tx| {
            owned_event(tx, id, requester_id)?;
            events::close_voting(tx, id, Utc::now())?;
            let event = events::find(tx, id)?.ok_or(CoreError::NotFound("event"))?;
            info!(event_id = %id, "Voting closed");
            details(tx, event)
        })
    }

    /// Votes and gallery posts go with the event.
    pub fn delete(&self, id: Uuid, requester_id: Uuid) -> Result<()> {
        self.db.with_tx(|tx| {
            owned_event(tx, id, requester_id)?;
            events::delete(tx, id)?;
            info!(event_id = %id, "Event deleted");
            Ok(())
        })
    }
}

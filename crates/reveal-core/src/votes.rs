use std::sync::Arc;

use chrono::Utc;
use reveal_db::queries::{events, votes};
use reveal_db::{Connection, Database, is_unique_violation};
use reveal_types::api::{CastVoteRequest, UpdateVoteRequest};
use reveal_types::models::{Event, Guess, Vote, VoteTally};
use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts::require_active;
use crate::error::{Conflict, CoreError, Result};
use crate::validate;

fn open_event(conn: &Connection, event_id: Uuid) -> Result<Event> {
    let event = events::find(conn, event_id)?.ok_or(CoreError::NotFound("event"))?;
    if !event.accepts_votes(Utc::now()) {
        return Err(CoreError::VotingClosed);
    }
    Ok(event)
}

/// Folds both duplicate signals, the existence check and the UNIQUE index,
/// into one conflict.
fn reject_duplicate(err: CoreError, event_id: Uuid, voter_id: Uuid) -> CoreError {
    match err {
        CoreError::Internal(e) if is_unique_violation(&e) => {
            warn!(event_id = %event_id, voter_id = %voter_id, "Duplicate vote caught by unique index");
            CoreError::Conflict(Conflict::DuplicateVote)
        }
        CoreError::Conflict(Conflict::DuplicateVote) => {
            warn!(event_id = %event_id, voter_id = %voter_id, "Duplicate vote rejected");
            err
        }
        other => other,
    }
}

/// The vote, provided `voter_id` cast it and its event still takes votes.
fn own_vote(conn: &Connection, id: Uuid, voter_id: Uuid) -> Result<Vote> {
    require_active(conn, voter_id)?;
    let vote = votes::find(conn, id)?.ok_or(CoreError::NotFound("vote"))?;
    if vote.voter_id != voter_id {
        return Err(CoreError::Forbidden("only the voter can change this vote"));
    }
    open_event(conn, vote.event_id)?;
    Ok(vote)
}

pub struct Votes {
    db: Arc<Database>,
}

impl Votes {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// One vote per (event, voter). The existence check gives a clean error
    /// in the common case; the UNIQUE index settles races.
    pub fn cast(&self, voter_id: Uuid, req: CastVoteRequest) -> Result<Vote> {
        let justification = validate::optional(
            "justification",
            req.justification.as_deref(),
            validate::JUSTIFICATION_MAX,
        )?;

        let res = self.db.with_tx(|tx| {
            require_active(tx, voter_id)?;
            open_event(tx, req.event_id)?;
            if votes::exists(tx, req.event_id, voter_id)? {
                return Err(CoreError::Conflict(Conflict::DuplicateVote));
            }

            let vote = Vote {
                id: Uuid::new_v4(),
                event_id: req.event_id,
                voter_id,
                guess: req.guess,
                justification,
                created_at: Utc::now(),
            };
            votes::insert(tx, &vote)?;
            Ok(vote)
        });

        match res {
            Ok(vote) => {
                info!(vote_id = %vote.id, event_id = %vote.event_id, guess = %vote.guess, "Vote cast");
                Ok(vote)
            }
            Err(e) => Err(reject_duplicate(e, req.event_id, voter_id)),
        }
    }

    pub fn update(&self, id: Uuid, voter_id: Uuid, req: UpdateVoteRequest) -> Result<Vote> {
        let justification = validate::optional(
            "justification",
            req.justification.as_deref(),
            validate::JUSTIFICATION_MAX,
        )?;

        self.db.with_tx(|tx| {
            let mut vote = own_vote(tx, id, voter_id)?;
            votes::update(tx, id, req.guess, justification.as_deref())?;
            vote.guess = req.guess;
            vote.justification = justification;
            info!(vote_id = %id, guess = %vote.guess, "Vote updated");
            Ok(vote)
        })
    }

    pub fn delete(&self, id: Uuid, voter_id: Uuid) -> Result<()> {
        self.db.with_tx(|tx| {
            own_vote(tx, id, voter_id)?;
            votes::delete(tx, id)?;
            info!(vote_id = %id, "Vote deleted");
            Ok(())
        })
    }

    pub fn get(&self, id: Uuid) -> Result<Vote> {
        self.db
            .with_conn(|c| votes::find(c, id))?
            .ok_or(CoreError::NotFound("vote"))
    }

    pub fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Vote>> {
        self.db.with_tx(|tx| {
            events::find(tx, event_id)?.ok_or(CoreError::NotFound("event"))?;
            Ok(votes::list_for_event(tx, event_id)?)
        })
    }

    pub fn list_by_voter(&self, voter_id: Uuid) -> Result<Vec<Vote>> {
        Ok(self.db.with_conn(|c| votes::list_by_voter(c, voter_id))?)
    }

    /// The caller's vote on an event, if any.
    pub fn find_for_voter(&self, event_id: Uuid, voter_id: Uuid) -> Result<Option<Vote>> {
        Ok(self.db.with_conn(|c| votes::find_for_voter(c, event_id, voter_id))?)
    }

    pub fn count_by_event(&self, event_id: Uuid) -> Result<u64> {
        Ok(self.db.with_conn(|c| votes::count_by_event(c, event_id))?)
    }

    pub fn count_by_event_and_guess(&self, event_id: Uuid, guess: Guess) -> Result<u64> {
        Ok(self
            .db
            .with_conn(|c| votes::count_by_event_and_guess(c, event_id, guess))?)
    }

    pub fn tally(&self, event_id: Uuid) -> Result<VoteTally> {
        Ok(self.db.with_conn(|c| votes::tally(c, event_id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Events;
    use crate::testing;
    use chrono::Duration;
    use std::thread;

    struct Fixture {
        votes: Votes,
        events: Events,
        owner: Uuid,
        event: Uuid,
    }

    fn fixture(db: &Arc<Database>) -> Fixture {
        let owner = testing::user(db, "owner@example.com").id;
        let events = Events::new(db.clone());
        let event = events.create(owner, testing::event_request("E")).unwrap().event.id;
        Fixture {
            votes: Votes::new(db.clone()),
            events,
            owner,
            event,
        }
    }

    fn ballot(event_id: Uuid, guess: Guess) -> CastVoteRequest {
        CastVoteRequest {
            event_id,
            guess,
            justification: Some("palpite".into()),
        }
    }

    #[test]
    fn second_vote_is_a_conflict() {
        let db = testing::db();
        let f = fixture(&db);
        let voter = testing::user(&db, "guest@example.com").id;

        f.votes.cast(voter, ballot(f.event, Guess::Boy)).unwrap();
        let err = f.votes.cast(voter, ballot(f.event, Guess::Girl)).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(Conflict::DuplicateVote)));
        assert_eq!(f.votes.count_by_event(f.event).unwrap(), 1);
    }

    #[test]
    fn unique_index_violation_reads_as_duplicate_vote() {
        let db = testing::db();
        let f = fixture(&db);
        let first = Vote {
            id: Uuid::new_v4(),
            event_id: f.event,
            voter_id: f.owner,
            guess: Guess::Boy,
            justification: None,
            created_at: Utc::now(),
        };
        let second = Vote {
            id: Uuid::new_v4(),
            guess: Guess::Girl,
            ..first.clone()
        };

        let err = db
            .with_tx(|tx| {
                votes::insert(tx, &first)?;
                votes::insert(tx, &second)?;
                Ok::<_, CoreError>(())
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
        assert!(matches!(
            reject_duplicate(err, f.event, f.owner),
            CoreError::Conflict(Conflict::DuplicateVote)
        ));
        assert_eq!(f.votes.count_by_event(f.event).unwrap(), 0);

        assert!(matches!(
            reject_duplicate(CoreError::VotingClosed, f.event, f.owner),
            CoreError::VotingClosed
        ));
    }

    #[test]
    fn closed_voting_rejects_cast_update_and_delete() {
        let db = testing::db();
        let f = fixture(&db);
        let voter = testing::user(&db, "guest@example.com").id;
        let late = testing::user(&db, "late@example.com").id;

        let vote = f.votes.cast(voter, ballot(f.event, Guess::Boy)).unwrap();
        f.events.close_voting(f.event, f.owner).unwrap();

        assert!(matches!(
            f.votes.cast(late, ballot(f.event, Guess::Girl)),
            Err(CoreError::VotingClosed)
        ));
        let change = UpdateVoteRequest {
            guess: Guess::Girl,
            justification: None,
        };
        assert!(matches!(
            f.votes.update(vote.id, voter, change),
            Err(CoreError::VotingClosed)
        ));
        assert!(matches!(f.votes.delete(vote.id, voter), Err(CoreError::VotingClosed)));
        assert_eq!(f.votes.get(vote.id).unwrap().guess, Guess::Boy);
    }

    #[test]
    fn reveal_closes_voting_for_late_voters() {
        let db = testing::db();
        let f = fixture(&db);
        let voter = testing::user(&db, "guest@example.com").id;

        f.events.reveal(f.event, Guess::Girl, f.owner).unwrap();
        assert!(matches!(
            f.votes.cast(voter, ballot(f.event, Guess::Girl)),
            Err(CoreError::VotingClosed)
        ));
    }

    #[test]
    fn past_deadline_rejects_votes() {
        let db = testing::db();
        let owner = testing::user(&db, "owner@example.com").id;
        let voter = testing::user(&db, "guest@example.com").id;
        let mut req = testing::event_request("E");
        req.voting_deadline = Some(Utc::now() - Duration::minutes(1));
        let event = Events::new(db.clone()).create(owner, req).unwrap().event.id;

        let err = Votes::new(db).cast(voter, ballot(event, Guess::Boy)).unwrap_err();
        assert!(matches!(err, CoreError::VotingClosed));
    }

    #[test]
    fn only_the_voter_may_change_a_vote() {
        let db = testing::db();
        let f = fixture(&db);
        let voter = testing::user(&db, "guest@example.com").id;
        let other = testing::user(&db, "other@example.com").id;
        let vote = f.votes.cast(voter, ballot(f.event, Guess::Boy)).unwrap();

        let change = UpdateVoteRequest {
            guess: Guess::Girl,
            justification: Some("mudei de ideia".into()),
        };
        assert!(matches!(
            f.votes.update(vote.id, other, change.clone()),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(f.votes.delete(vote.id, other), Err(CoreError::Forbidden(_))));

        let updated = f.votes.update(vote.id, voter, change).unwrap();
        assert_eq!(updated.guess, Guess::Girl);
        assert_eq!(updated.id, vote.id);
        assert_eq!(updated.created_at, vote.created_at);
        assert_eq!(f.votes.get(vote.id).unwrap().guess, Guess::Girl);
    }

    #[test]
    fn delete_frees_the_slot() {
        let db = testing::db();
        let f = fixture(&db);
        let voter = testing::user(&db, "guest@example.com").id;
        let vote = f.votes.cast(voter, ballot(f.event, Guess::Boy)).unwrap();

        f.votes.delete(vote.id, voter).unwrap();
        assert!(matches!(f.votes.get(vote.id), Err(CoreError::NotFound("vote"))));
        assert!(f.votes.find_for_voter(f.event, voter).unwrap().is_none());
        f.votes.cast(voter, ballot(f.event, Guess::Girl)).unwrap();
    }

    #[test]
    fn counts_follow_the_votes() {
        let db = testing::db();
        let f = fixture(&db);
        for (i, guess) in [Guess::Boy, Guess::Girl, Guess::Girl].into_iter().enumerate() {
            let voter = testing::user(&db, &format!("guest{i}@example.com")).id;
            f.votes.cast(voter, ballot(f.event, guess)).unwrap();
        }

        assert_eq!(f.votes.count_by_event(f.event).unwrap(), 3);
        assert_eq!(f.votes.count_by_event_and_guess(f.event, Guess::Girl).unwrap(), 2);
        assert_eq!(
            f.votes.tally(f.event).unwrap(),
            VoteTally {
                total: 3,
                boy: 1,
                girl: 2
            }
        );
        assert_eq!(f.votes.list_for_event(f.event).unwrap().len(), 3);
        assert_eq!(f.events.get(f.event).unwrap().tally.total, 3);
    }

    #[test]
    fn unknown_event_is_not_found() {
        let db = testing::db();
        let voter = testing::user(&db, "guest@example.com").id;
        let votes = Votes::new(db);

        assert!(matches!(
            votes.cast(voter, ballot(Uuid::new_v4(), Guess::Boy)),
            Err(CoreError::NotFound("event"))
        ));
        assert!(matches!(
            votes.list_for_event(Uuid::new_v4()),
            Err(CoreError::NotFound("event"))
        ));
    }

    #[test]
    fn concurrent_casts_store_one_vote() {
        let db = testing::db();
        let f = fixture(&db);
        let voter = testing::user(&db, "guest@example.com").id;
        let votes = Arc::new(f.votes);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let votes = votes.clone();
                let event = f.event;
                thread::spawn(move || votes.cast(voter, ballot(event, Guess::Boy)).is_ok())
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(accepted, 1);
        assert_eq!(votes.count_by_event(f.event).unwrap(), 1);
    }
}

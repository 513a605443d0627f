use std::sync::Arc;

use chrono::Utc;
use reveal_db::queries::{events, gallery};
use reveal_db::Database;
use reveal_types::api::GalleryPostRequest;
use reveal_types::models::GalleryPost;
use tracing::info;
use uuid::Uuid;

use crate::accounts::require_active;
use crate::error::{CoreError, Result};
use crate::validate;

pub struct Gallery {
    db: Arc<Database>,
}

impl Gallery {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// A post needs at least one of message, photo or video.
    pub fn create(&self, author_id: Uuid, req: GalleryPostRequest) -> Result<GalleryPost> {
        let message = validate::optional("message", req.message.as_deref(), validate::MESSAGE_MAX)?;
        let photo_url = validate::optional("photo_url", req.photo_url.as_deref(), validate::URL_MAX)?;
        let video_url = validate::optional("video_url", req.video_url.as_deref(), validate::URL_MAX)?;
        if message.is_none() && photo_url.is_none() && video_url.is_none() {
            return Err(CoreError::invalid("a post needs a message, a photo or a video"));
        }

        let post = self.db.with_tx(|tx| {
            require_active(tx, author_id)?;
            events::find(tx, req.event_id)?.ok_or(CoreError::NotFound("event"))?;

            let post = GalleryPost {
                id: Uuid::new_v4(),
                event_id: req.event_id,
                author_id,
                message,
                photo_url,
                video_url,
                created_at: Utc::now(),
            };
            gallery::insert(tx, &post)?;
            Ok::<_, CoreError>(post)
        })?;

        info!(post_id = %post.id, event_id = %post.event_id, "Gallery post created");
        Ok(post)
    }

    pub fn get(&self, id: Uuid) -> Result<GalleryPost> {
        self.db
            .with_conn(|c| gallery::find(c, id))?
            .ok_or(CoreError::NotFound("post"))
    }

    pub fn list_all(&self) -> Result<Vec<GalleryPost>> {
        Ok(self.db.with_conn(gallery::list)?)
    }

    pub fn list_for_event(&self, event_id: Uuid) -> Result<Vec<GalleryPost>> {
        self.db.with_tx(|tx| {
            events::find(tx, event_id)?.ok_or(CoreError::NotFound("event"))?;
            Ok(gallery::list_for_event(tx, event_id)?)
        })
    }

    pub fn list_by_author(&self, author_id: Uuid) -> Result<Vec<GalleryPost>> {
        Ok(self.db.with_conn(|c| gallery::list_by_author(c, author_id))?)
    }

    /// Authors remove their own posts; admins moderate.
    pub fn delete(&self, id: Uuid, requester_id: Uuid) -> Result<()> {
        self.db.with_tx(|tx| {
            let requester = require_active(tx, requester_id)?;
            let post = gallery::find(tx, id)?.ok_or(CoreError::NotFound("post"))?;
            if post.author_id != requester.id && !requester.is_admin() {
                return Err(CoreError::Forbidden("only the author can delete this post"));
            }
            gallery::delete(tx, id)?;
            info!(post_id = %id, by = %requester_id, "Gallery post deleted");
            Ok(())
        })
    }
}

use std::sync::Arc;

use chrono::Utc;
use reveal_db::Database;
use reveal_db::queries::media;
use reveal_types::models::{MediaAsset, MediaKind};
use tracing::{info, warn};
use uuid::Uuid;

use crate::accounts::require_active;
use crate::error::{CoreError, Result};

/// Who uploaded what. The media host only stores bytes; removal rights live here.
pub struct MediaLibrary {
    db: Arc<Database>,
}

impl MediaLibrary {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn record(
        &self,
        owner_id: Uuid,
        kind: MediaKind,
        public_id: &str,
        url: &str,
    ) -> Result<MediaAsset> {
        let asset = self.db.with_tx(|tx| {
            require_active(tx, owner_id)?;
            let asset = MediaAsset {
                public_id: public_id.to_string(),
                owner_id,
                kind,
                url: url.to_string(),
                created_at: Utc::now(),
            };
            media::insert(tx, &asset)?;
            Ok::<_, CoreError>(asset)
        })?;

        info!(owner_id = %owner_id, kind = %kind, "Media recorded");
        Ok(asset)
    }

    /// The asset, provided `requester_id` uploaded it or is an admin.
    /// A kind mismatch reads as absent.
    pub fn authorize_removal(
        &self,
        public_id: &str,
        kind: MediaKind,
        requester_id: Uuid,
    ) -> Result<MediaAsset> {
        self.db.with_tx(|tx| {
            let requester = require_active(tx, requester_id)?;
            let asset = media::find(tx, public_id)?
                .filter(|a| a.kind == kind)
                .ok_or(CoreError::NotFound("media"))?;
            if asset.owner_id != requester.id && !requester.is_admin() {
                warn!(by = %requester_id, owner_id = %asset.owner_id, "Media removal refused");
                return Err(CoreError::Forbidden("only the uploader can delete this media"));
            }
            Ok(asset)
        })
    }

    pub fn forget(&self, public_id: &str) -> Result<()> {
        self.db.with_conn(|c| media::delete(c, public_id))?;
        Ok(())
    }
}

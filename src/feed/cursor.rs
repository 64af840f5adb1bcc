use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::FeedPosition;

/// Opaque continuation token: URL-safe base64 of `"{created_at}:{post_id}"`
/// for the last item of the previous page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCursor(FeedPosition);

impl FeedCursor {
    pub fn new(position: FeedPosition) -> Self {
        Self(position)
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}", self.0.created_at, self.0.post_id))
    }

    pub fn decode(token: &str) -> AppResult<Self> {
        let invalid = || AppError::BadRequest(format!("Invalid feed cursor: {}", token));

        let raw = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| invalid())?;
        let raw = String::from_utf8(raw).map_err(|_| invalid())?;
        let (created_at, post_id) = raw.split_once(':').ok_or_else(invalid)?;
        if post_id.is_empty() {
            return Err(invalid());
        }

        Ok(Self(FeedPosition {
            created_at: created_at.parse().map_err(|_| invalid())?,
            post_id: post_id.to_string(),
        }))
    }

    pub fn position(&self) -> &FeedPosition {
        &self.0
    }

    pub fn into_position(self) -> FeedPosition {
        self.0
    }
}

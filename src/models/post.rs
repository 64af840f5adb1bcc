use serde::{Deserialize, Serialize};

use crate::core::{Millis, PostId, UserId};
use crate::error::{AppError, AppResult};

/// Crop rectangle applied by the client before upload, in source pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropParams {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    pub url: String,
    pub storage_path: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropParams>,
}

/// Canonical post record, owned by its author.
///
/// `created_at` is optional because the client may submit a post before the
/// store assigns its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    #[serde(default)]
    pub author_id: UserId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaDescriptor>,
    #[serde(default)]
    pub aspect_ratio: Option<f64>,
    #[serde(default)]
    pub created_at: Option<Millis>,
    #[serde(default)]
    pub updated_at: Option<Millis>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<Millis>,
}

impl Post {
    /// Text-only post with the given creation time.
    pub fn new(id: impl Into<PostId>, author_id: impl Into<UserId>, created_at: Option<Millis>) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            text: None,
            media: Vec::new(),
            aspect_ratio: None,
            created_at,
            updated_at: created_at,
            deleted: false,
            deleted_at: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Author id, or a validation error when the post carries none.
    ///
    /// Ids with surrounding whitespace are rejected; feed items and backfill
    /// lookups use `author_id` verbatim.
    pub fn author(&self) -> AppResult<&str> {
        let author = self.author_id.as_str();
        if author.trim().is_empty() {
            return Err(AppError::Validation(format!("post {} has no author id", self.id)));
        }
        if author.trim() != author {
            return Err(AppError::Validation(format!(
                "post {} has a padded author id {:?}",
                self.id, author
            )));
        }
        Ok(author)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.id.trim().is_empty() {
            return Err(AppError::Validation("post id cannot be empty".to_string()));
        }
        self.author()?;
        Ok(())
    }
}

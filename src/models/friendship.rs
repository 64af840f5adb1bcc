use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{Millis, UserId};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Declined,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FriendshipStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FriendshipStatus::Pending),
            "accepted" => Ok(FriendshipStatus::Accepted),
            "declined" => Ok(FriendshipStatus::Declined),
            other => Err(AppError::DeserializationError(format!(
                "unknown friendship status: {}",
                other
            ))),
        }
    }
}

/// Which side of a stored edge a user occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipRole {
    Requester,
    Addressee,
}

/// Directed friendship edge. Visibility treats accepted edges as undirected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friendship {
    pub id: String,
    pub requester_id: UserId,
    pub addressee_id: UserId,
    pub status: FriendshipStatus,
    #[serde(default)]
    pub created_at: Option<Millis>,
    #[serde(default)]
    pub updated_at: Option<Millis>,
}

impl Friendship {
    pub fn new(
        id: impl Into<String>,
        requester_id: impl Into<UserId>,
        addressee_id: impl Into<UserId>,
        status: FriendshipStatus,
    ) -> Self {
        Self {
            id: id.into(),
            requester_id: requester_id.into(),
            addressee_id: addressee_id.into(),
            status,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == FriendshipStatus::Accepted
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.requester_id.trim().is_empty() || self.addressee_id.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "friendship {} is missing a party",
                self.id
            )));
        }
        Ok(())
    }

    pub fn with_status(&self, status: FriendshipStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            FriendshipStatus::Pending,
            FriendshipStatus::Accepted,
            FriendshipStatus::Declined,
        ] {
            assert_eq!(status.as_str().parse::<FriendshipStatus>().unwrap(), status);
        }
        assert!("blocked".parse::<FriendshipStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let edge = Friendship::new("f1", "alice", "bob", FriendshipStatus::Accepted);
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["status"], "accepted");
        assert_eq!(json["requesterId"], "alice");
    }
}

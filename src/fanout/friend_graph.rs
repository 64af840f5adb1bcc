use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::core::UserId;
use crate::error::AppResult;
use crate::infrastructure::database::FriendshipStore;
use crate::models::FriendshipRole;

/// Read side of the friend graph.
///
/// Edges are stored directed (requester -> addressee); the accepted friend set
/// of a user is the union of both roles, read with two concurrent queries.
#[derive(Clone)]
pub struct FriendGraph {
    store: Arc<dyn FriendshipStore>,
    query_limit: u32,
}

impl FriendGraph {
    pub fn new(store: Arc<dyn FriendshipStore>, query_limit: u32) -> Self {
        Self { store, query_limit }
    }

    /// Distinct users holding an accepted friendship with `user_id`, whichever
    /// side initiated it. Fails if either directional query fails.
    #[instrument(skip(self))]
    pub async fn accepted_friends(&self, user_id: &str) -> AppResult<BTreeSet<UserId>> {
        let (as_addressee, as_requester) = tokio::try_join!(
            self.store
                .accepted_friend_ids(user_id, FriendshipRole::Addressee, self.query_limit),
            self.store
                .accepted_friend_ids(user_id, FriendshipRole::Requester, self.query_limit),
        )?;

        for (role, ids) in [("addressee", &as_addressee), ("requester", &as_requester)] {
            if ids.len() >= self.query_limit as usize {
                warn!(
                    user_id,
                    role,
                    limit = self.query_limit,
                    "friend query hit its row cap; friend set is truncated"
                );
            }
        }

        let friends: BTreeSet<UserId> = as_addressee.into_iter().chain(as_requester).collect();
        debug!(user_id, friends = friends.len(), "resolved accepted friends");
        Ok(friends)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::fanout::testing::BrokenFriendshipStore;
    use crate::infrastructure::SqliteDatabase;
    use crate::models::{Friendship, FriendshipStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    /// Each directional query blocks until the other one has started.
    struct RendezvousFriendshipStore {
        barrier: Barrier,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FriendshipStore for RendezvousFriendshipStore {
        async fn accepted_friend_ids(
            &self,
            _user_id: &str,
            role: FriendshipRole,
            _limit: u32,
        ) -> AppResult<Vec<UserId>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.barrier.wait().await;
            Ok(match role {
                FriendshipRole::Requester => vec!["bob".to_string()],
                FriendshipRole::Addressee => vec!["carol".to_string(), "bob".to_string()],
            })
        }

        async fn get_friendship(&self, _id: &str) -> AppResult<Option<Friendship>> {
            Ok(None)
        }

        async fn upsert_friendship(&self, _friendship: &Friendship) -> AppResult<Option<Friendship>> {
            Ok(None)
        }

        async fn delete_friendship(&self, _id: &str) -> AppResult<Option<Friendship>> {
            Ok(None)
        }
    }

    async fn seeded() -> Arc<SqliteDatabase> {
        let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
        let edges = [
            ("f1", "alice", "bob", FriendshipStatus::Accepted),
            ("f2", "carol", "alice", FriendshipStatus::Accepted),
            ("f3", "alice", "dave", FriendshipStatus::Pending),
            ("f4", "erin", "alice", FriendshipStatus::Declined),
            // duplicate edge in the other direction must not double count
            ("f5", "bob", "alice", FriendshipStatus::Accepted),
        ];
        for (id, requester, addressee, status) in edges {
            db.upsert_friendship(&Friendship::new(id, requester, addressee, status))
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn unions_both_directions_and_dedups() {
        let graph = FriendGraph::new(seeded().await, 100);
        let friends = graph.accepted_friends("alice").await.unwrap();
        let friends: Vec<&str> = friends.iter().map(String::as_str).collect();
        assert_eq!(friends, vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn user_without_edges_has_no_friends() {
        let graph = FriendGraph::new(seeded().await, 100);
        assert!(graph.accepted_friends("zoe").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn issues_exactly_two_concurrent_queries() {
        let store = Arc::new(RendezvousFriendshipStore {
            barrier: Barrier::new(2),
            calls: AtomicUsize::new(0),
        });
        let graph = FriendGraph::new(store.clone(), 100);

        let friends = tokio::time::timeout(Duration::from_secs(2), graph.accepted_friends("alice"))
            .await
            .expect("directional queries ran one after the other")
            .unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        let friends: Vec<&str> = friends.iter().map(String::as_str).collect();
        assert_eq!(friends, vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn either_query_failing_fails_the_lookup() {
        let graph = FriendGraph::new(Arc::new(BrokenFriendshipStore), 100);
        let result = graph.accepted_friends("alice").await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }
}

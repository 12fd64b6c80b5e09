//! In-memory test doubles.
//!
//! Enabled for this crate's tests and for dependents through the `mock`
//! feature.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::friendship::{check_send, new_request};
use crate::models::{Friendship, FriendshipRequest, FriendshipRequestStatus};
use crate::traits::{Clock, FriendshipStore};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Default)]
struct FriendshipState {
    requests: Vec<FriendshipRequest>,
    friendships: Vec<Friendship>,
}

impl FriendshipState {
    fn are_friends(&self, a: Uuid, b: Uuid) -> bool {
        self.friendships
            .iter()
            .any(|f| f.involves(a) && f.involves(b) && a != b)
    }

    fn pending_between(&self, a: Uuid, b: Uuid) -> bool {
        self.requests
            .iter()
            .any(|r| r.status == FriendshipRequestStatus::Pending && r.connects(a, b))
    }
}

/// Friendship store backed by vectors under one lock.
///
/// The single lock makes every operation atomic, which is the same
/// guarantee the PostgreSQL store gives per pair and per request.
#[derive(Debug, Default)]
pub struct MemoryFriendshipStore {
    state: AsyncMutex<FriendshipState>,
}

impl MemoryFriendshipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FriendshipStore for MemoryFriendshipStore {
    async fn send_request(
        &self,
        sender: Uuid,
        receiver: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FriendshipRequest> {
        let mut state = self.state.lock().await;
        check_send(
            sender,
            receiver,
            state.are_friends(sender, receiver),
            state.pending_between(sender, receiver),
        )?;
        let request = new_request(sender, receiver, now);
        state.requests.push(request.clone());
        Ok(request)
    }

    async fn respond(
        &self,
        request_id: Uuid,
        decision: FriendshipRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<(FriendshipRequest, Option<Friendship>)> {
        let mut state = self.state.lock().await;
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| Error::NotFound(format!("Friend request {} not found", request_id)))?;

        let friendship = request.respond(decision, now)?;
        let updated = request.clone();
        if let Some(f) = &friendship {
            state.friendships.push(f.clone());
        }
        Ok((updated, friendship))
    }

    async fn remove_friendship(&self, friendship_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        let before = state.friendships.len();
        state.friendships.retain(|f| f.id != friendship_id);
        if state.friendships.len() == before {
            return Err(Error::NotFound(format!(
                "Friendship {} not found",
                friendship_id
            )));
        }
        Ok(())
    }

    async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool> {
        Ok(self.state.lock().await.are_friends(a, b))
    }

    async fn get_request(&self, request_id: Uuid) -> Result<Option<FriendshipRequest>> {
        let state = self.state.lock().await;
        Ok(state.requests.iter().find(|r| r.id == request_id).cloned())
    }

    async fn list_requests(&self, user_id: Uuid) -> Result<Vec<FriendshipRequest>> {
        let state = self.state.lock().await;
        let mut requests: Vec<_> = state
            .requests
            .iter()
            .filter(|r| r.sender_id == user_id || r.receiver_id == user_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn get_friendship(&self, friendship_id: Uuid) -> Result<Option<Friendship>> {
        let state = self.state.lock().await;
        Ok(state.friendships.iter().find(|f| f.id == friendship_id).cloned())
    }

    async fn list_friendships(&self, user_id: Uuid) -> Result<Vec<Friendship>> {
        let state = self.state.lock().await;
        let mut friendships: Vec<_> = state
            .friendships
            .iter()
            .filter(|f| f.involves(user_id))
            .cloned()
            .collect();
        friendships.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(friendships)
    }
}

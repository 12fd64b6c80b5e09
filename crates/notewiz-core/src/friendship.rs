//! Friend request state machine.
//!
//! ```text
//!   send_request          respond(Accepted)
//!  ───────────► Pending ─────────────────────► Accepted  (+ Friendship)
//!                  │
//!                  └──── respond(Rejected) ───► Rejected
//! ```
//!
//! The transition rules are pure functions over already-loaded state so
//! that every [`FriendshipStore`] applies them identically inside its own
//! critical section. [`FriendshipService`] adds the clock and logging.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, FriendshipError, Result};
use crate::models::{Friendship, FriendshipRequest, FriendshipRequestStatus};
use crate::traits::{Clock, FriendshipStore, SystemClock};
use crate::logging::subsystem;

/// Validate a send against the current pair state.
///
/// Self-requests are rejected first, then an existing friendship, then a
/// pending request in either direction.
pub fn check_send(
    sender: Uuid,
    receiver: Uuid,
    already_friends: bool,
    pending_between: bool,
) -> std::result::Result<(), FriendshipError> {
    if sender == receiver {
        return Err(FriendshipError::InvalidRequest);
    }
    if already_friends {
        return Err(FriendshipError::AlreadyFriends);
    }
    if pending_between {
        return Err(FriendshipError::DuplicateRequest);
    }
    Ok(())
}

/// A fresh Pending request.
pub fn new_request(sender: Uuid, receiver: Uuid, now: DateTime<Utc>) -> FriendshipRequest {
    FriendshipRequest {
        id: Uuid::now_v7(),
        sender_id: sender,
        receiver_id: receiver,
        status: FriendshipRequestStatus::Pending,
        created_at: now,
        updated_at: None,
    }
}

/// Parse a client-supplied decision.
///
/// Only `"Accepted"` and `"Rejected"` are decisions; anything else,
/// including `"Pending"`, is bad input.
pub fn parse_decision(raw: &str) -> Result<FriendshipRequestStatus> {
    match raw.parse::<FriendshipRequestStatus>() {
        Ok(status) if status.is_terminal() => Ok(status),
        _ => Err(Error::InvalidInput(
            "Status must be either 'Accepted' or 'Rejected'".to_string(),
        )),
    }
}

/// Canonical ordering of an unordered user pair.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl FriendshipRequest {
    /// Apply a decision to this request.
    ///
    /// A resolved request is rejected before the decision is looked at.
    /// Acceptance returns the friendship to persist alongside the update.
    pub fn respond(
        &mut self,
        decision: FriendshipRequestStatus,
        now: DateTime<Utc>,
    ) -> std::result::Result<Option<Friendship>, FriendshipError> {
        if self.status != FriendshipRequestStatus::Pending {
            return Err(FriendshipError::AlreadyResolved);
        }

        let friendship = match decision {
            FriendshipRequestStatus::Accepted => Some(Friendship {
                id: Uuid::now_v7(),
                user_id: self.sender_id,
                friend_id: self.receiver_id,
                created_at: now,
            }),
            FriendshipRequestStatus::Rejected => None,
            FriendshipRequestStatus::Pending => return Err(FriendshipError::InvalidStatus),
        };

        self.status = decision;
        self.updated_at = Some(now);
        Ok(friendship)
    }

    /// True when the request connects `a` and `b` in either direction.
    pub fn connects(&self, a: Uuid, b: Uuid) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

/// Friendship operations over a store, stamped with a clock.
#[derive(Clone)]
pub struct FriendshipService {
    store: Arc<dyn FriendshipStore>,
    clock: Arc<dyn Clock>,
}

impl FriendshipService {
    pub fn new(store: Arc<dyn FriendshipStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn FriendshipStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Send a friend request from `sender` to `receiver`.
    pub async fn send_request(&self, sender: Uuid, receiver: Uuid) -> Result<FriendshipRequest> {
        // Cheap rejection before the store takes its pair lock.
        check_send(sender, receiver, false, false)?;

        match self.store.send_request(sender, receiver, self.clock.now()).await {
            Ok(request) => {
                info!(
                    subsystem = subsystem::FRIENDSHIP,
                    op = "send_request",
                    friend_request_id = %request.id,
                    sender_id = %sender,
                    receiver_id = %receiver,
                    "Friend request sent"
                );
                Ok(request)
            }
            Err(Error::Friendship(e)) => {
                debug!(
                    subsystem = subsystem::FRIENDSHIP,
                    op = "send_request",
                    sender_id = %sender,
                    receiver_id = %receiver,
                    error = %e,
                    "Friend request refused"
                );
                Err(e.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Accept or reject a pending request.
    pub async fn respond(
        &self,
        request_id: Uuid,
        decision: FriendshipRequestStatus,
    ) -> Result<(FriendshipRequest, Option<Friendship>)> {
        let (request, friendship) = self
            .store
            .respond(request_id, decision, self.clock.now())
            .await?;

        info!(
            subsystem = subsystem::FRIENDSHIP,
            op = "respond",
            friend_request_id = %request.id,
            status = %request.status,
            friendship_id = ?friendship.as_ref().map(|f| f.id),
            "Friend request resolved"
        );
        Ok((request, friendship))
    }

    /// Delete a friendship. Past requests are left untouched.
    pub async fn remove_friendship(&self, friendship_id: Uuid) -> Result<()> {
        if let Err(e) = self.store.remove_friendship(friendship_id).await {
            if matches!(e, Error::NotFound(_)) {
                warn!(
                    subsystem = subsystem::FRIENDSHIP,
                    op = "remove",
                    friendship_id = %friendship_id,
                    "Friendship not found"
                );
            }
            return Err(e);
        }
        info!(
            subsystem = subsystem::FRIENDSHIP,
            op = "remove",
            friendship_id = %friendship_id,
            "Friendship removed"
        );
        Ok(())
    }

    pub async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool> {
        self.store.are_friends(a, b).await
    }

    pub async fn get_request(&self, request_id: Uuid) -> Result<Option<FriendshipRequest>> {
        self.store.get_request(request_id).await
    }

    pub async fn list_requests(&self, user_id: Uuid) -> Result<Vec<FriendshipRequest>> {
        self.store.list_requests(user_id).await
    }

    pub async fn get_friendship(&self, friendship_id: Uuid) -> Result<Option<Friendship>> {
        self.store.get_friendship(friendship_id).await
    }

    pub async fn list_friendships(&self, user_id: Uuid) -> Result<Vec<Friendship>> {
        self.store.list_friendships(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ManualClock, MemoryFriendshipStore};
    use chrono::Duration;

    fn service() -> (FriendshipService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let svc = FriendshipService::with_clock(Arc::new(MemoryFriendshipStore::new()), clock.clone());
        (svc, clock)
    }

    #[test]
    fn test_check_send_order() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(check_send(a, a, true, true), Err(FriendshipError::InvalidRequest));
        assert_eq!(check_send(a, b, true, true), Err(FriendshipError::AlreadyFriends));
        assert_eq!(check_send(a, b, false, true), Err(FriendshipError::DuplicateRequest));
        assert_eq!(check_send(a, b, false, false), Ok(()));
    }

    #[test]
    fn test_respond_checks_resolution_before_decision() {
        let mut req = new_request(Uuid::now_v7(), Uuid::now_v7(), Utc::now());
        req.respond(FriendshipRequestStatus::Rejected, Utc::now()).unwrap();
        assert_eq!(
            req.respond(FriendshipRequestStatus::Pending, Utc::now()),
            Err(FriendshipError::AlreadyResolved)
        );
    }

    #[test]
    fn test_respond_pending_decision_is_invalid_status() {
        let mut req = new_request(Uuid::now_v7(), Uuid::now_v7(), Utc::now());
        assert_eq!(
            req.respond(FriendshipRequestStatus::Pending, Utc::now()),
            Err(FriendshipError::InvalidStatus)
        );
        assert_eq!(req.status, FriendshipRequestStatus::Pending);
        assert!(req.updated_at.is_none());
    }

    #[test]
    fn test_respond_accept_builds_friendship_from_sender() {
        let sender = Uuid::now_v7();
        let receiver = Uuid::now_v7();
        let now = Utc::now();
        let mut req = new_request(sender, receiver, now);

        let friendship = req
            .respond(FriendshipRequestStatus::Accepted, now)
            .unwrap()
            .expect("acceptance creates a friendship");

        assert_eq!(friendship.user_id, sender);
        assert_eq!(friendship.friend_id, receiver);
        assert_eq!(friendship.created_at, now);
        assert_eq!(req.status, FriendshipRequestStatus::Accepted);
        assert_eq!(req.updated_at, Some(now));
    }

    #[test]
    fn test_parse_decision() {
        assert_eq!(parse_decision("Accepted").unwrap(), FriendshipRequestStatus::Accepted);
        assert_eq!(parse_decision("Rejected").unwrap(), FriendshipRequestStatus::Rejected);
        for bad in ["Pending", "accepted", "", "Maybe"] {
            assert!(matches!(parse_decision(bad), Err(Error::InvalidInput(_))), "{bad}");
        }
    }

    #[test]
    fn test_canonical_pair_is_order_independent() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    }

    #[tokio::test]
    async fn test_duplicate_request_in_both_directions() {
        let (svc, _) = service();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        svc.send_request(a, b).await.unwrap();

        let again = svc.send_request(a, b).await.unwrap_err();
        assert!(matches!(again, Error::Friendship(FriendshipError::DuplicateRequest)));
        let reverse = svc.send_request(b, a).await.unwrap_err();
        assert!(matches!(reverse, Error::Friendship(FriendshipError::DuplicateRequest)));
    }

    #[tokio::test]
    async fn test_send_to_existing_friend_is_already_friends() {
        let (svc, _) = service();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        let req = svc.send_request(a, b).await.unwrap();
        svc.respond(req.id, FriendshipRequestStatus::Accepted).await.unwrap();

        for (x, y) in [(a, b), (b, a)] {
            let err = svc.send_request(x, y).await.unwrap_err();
            assert!(matches!(err, Error::Friendship(FriendshipError::AlreadyFriends)));
        }
    }

    #[tokio::test]
    async fn test_self_request_is_invalid() {
        let (svc, _) = service();
        let a = Uuid::now_v7();
        let err = svc.send_request(a, a).await.unwrap_err();
        assert!(matches!(err, Error::Friendship(FriendshipError::InvalidRequest)));
    }

    #[tokio::test]
    async fn test_second_response_is_already_resolved() {
        let (svc, _) = service();
        let req = svc.send_request(Uuid::now_v7(), Uuid::now_v7()).await.unwrap();

        svc.respond(req.id, FriendshipRequestStatus::Accepted).await.unwrap();
        let err = svc
            .respond(req.id, FriendshipRequestStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Friendship(FriendshipError::AlreadyResolved)));

        let stored = svc.get_request(req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, FriendshipRequestStatus::Accepted);
    }

    #[tokio::test]
    async fn test_accept_makes_users_friends() {
        let (svc, clock) = service();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let req = svc.send_request(a, b).await.unwrap();

        clock.advance(Duration::minutes(5));
        let (updated, friendship) = svc
            .respond(req.id, FriendshipRequestStatus::Accepted)
            .await
            .unwrap();

        assert!(svc.are_friends(a, b).await.unwrap());
        assert!(svc.are_friends(b, a).await.unwrap());
        assert_eq!(updated.updated_at, Some(clock.now()));
        assert_eq!(friendship.unwrap().created_at, clock.now());
    }

    #[tokio::test]
    async fn test_reject_allows_a_new_request() {
        let (svc, _) = service();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let req = svc.send_request(a, b).await.unwrap();

        let (_, friendship) = svc
            .respond(req.id, FriendshipRequestStatus::Rejected)
            .await
            .unwrap();
        assert!(friendship.is_none());
        assert!(!svc.are_friends(a, b).await.unwrap());

        // History is retained; a fresh request is a separate record.
        let retry = svc.send_request(b, a).await.unwrap();
        assert_ne!(retry.id, req.id);
        assert_eq!(svc.list_requests(a).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_respond_to_unknown_request_is_not_found() {
        let (svc, _) = service();
        let err = svc
            .respond(Uuid::now_v7(), FriendshipRequestStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_friendship_twice_is_not_found() {
        let (svc, _) = service();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let req = svc.send_request(a, b).await.unwrap();
        let (_, friendship) = svc
            .respond(req.id, FriendshipRequestStatus::Accepted)
            .await
            .unwrap();
        let friendship = friendship.unwrap();

        svc.remove_friendship(friendship.id).await.unwrap();
        assert!(!svc.are_friends(a, b).await.unwrap());

        let err = svc.remove_friendship(friendship.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Past requests survive removal.
        let stored = svc.get_request(req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, FriendshipRequestStatus::Accepted);
    }

    #[tokio::test]
    async fn test_concurrent_sends_admit_exactly_one() {
        let (svc, _) = service();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        let mut handles = Vec::new();
        for i in 0..16 {
            let svc = svc.clone();
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            handles.push(tokio::spawn(async move { svc.send_request(from, to).await }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(
                    e,
                    Error::Friendship(FriendshipError::DuplicateRequest)
                )),
            }
        }
        assert_eq!(ok, 1);
    }
}

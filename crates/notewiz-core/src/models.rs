//! Core data models for the NoteWiz backend.
//!
//! Records reference each other through foreign-key ids only; related data
//! is fetched through explicit repository queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::NOTE_COLOR;

// =============================================================================
// USERS
// =============================================================================

/// A registered user. The password hash is never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Stored login material for a user.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Request for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Request for persisting a freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct CreateAuthTokenRequest {
    pub user_id: Uuid,
    /// SHA-256 hex digest of the token; the raw token is never stored.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub device_info: Option<String>,
}

// =============================================================================
// NOTES
// =============================================================================

/// A note owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub color: String,
    pub is_pinned: bool,
    pub is_private: bool,
    pub cover_image_url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request for creating a note.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_note_color")]
    pub color: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default = "default_true")]
    pub is_private: bool,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub document_id: Option<Uuid>,
}

/// Partial note update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    pub is_pinned: Option<bool>,
    pub is_private: Option<bool>,
    pub cover_image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

fn default_note_color() -> String {
    NOTE_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

/// A grant of a note to another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteShare {
    pub id: Uuid,
    pub note_id: Uuid,
    pub shared_with_user_id: Uuid,
    pub can_edit: bool,
    pub shared_at: DateTime<Utc>,
}

/// What a given viewer may do with a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoteAccess {
    None,
    Read,
    Edit,
    Owner,
}

impl NoteAccess {
    /// Resolve access for `viewer`.
    ///
    /// Owners have full access; shares grant read or edit; a non-private
    /// note is readable by the owner's friends.
    pub fn evaluate(note: &Note, viewer: Uuid, share: Option<&NoteShare>, is_friend: bool) -> Self {
        if note.user_id == viewer {
            return NoteAccess::Owner;
        }
        if let Some(share) = share.filter(|s| s.shared_with_user_id == viewer) {
            return if share.can_edit {
                NoteAccess::Edit
            } else {
                NoteAccess::Read
            };
        }
        if !note.is_private && is_friend {
            return NoteAccess::Read;
        }
        NoteAccess::None
    }

    pub fn can_read(self) -> bool {
        self >= NoteAccess::Read
    }

    pub fn can_edit(self) -> bool {
        self >= NoteAccess::Edit
    }

    pub fn is_owner(self) -> bool {
        self == NoteAccess::Owner
    }
}

/// Freehand strokes attached to a note, stored as the client's JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteDrawing {
    pub id: Uuid,
    pub note_id: Uuid,
    /// Serialized stroke data, kept verbatim.
    pub drawing_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for saving or replacing a drawing.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct SaveDrawingRequest {
    pub drawing_data: String,
}

impl SaveDrawingRequest {
    /// Stroke data must be a non-empty JSON document within the size limit.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::defaults::DRAWING_DATA_MAX_BYTES;

        if self.drawing_data.trim().is_empty() {
            return Err(crate::Error::InvalidInput(
                "Drawing data is required".to_string(),
            ));
        }
        if self.drawing_data.len() > DRAWING_DATA_MAX_BYTES {
            return Err(crate::Error::InvalidInput(format!(
                "Drawing data cannot exceed {} bytes",
                DRAWING_DATA_MAX_BYTES
            )));
        }
        serde_json::from_str::<serde_json::Value>(&self.drawing_data).map_err(|e| {
            crate::Error::InvalidInput(format!("Drawing data is not valid JSON: {}", e))
        })?;
        Ok(())
    }
}

// =============================================================================
// TASKS
// =============================================================================

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    /// 1 (high) to 3 (low).
    pub priority: i16,
    pub reminder: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Full task payload used for both create and update.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct TaskInput {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[serde(default = "default_priority")]
    pub priority: i16,
    pub reminder: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: bool,
}

fn default_priority() -> i16 {
    crate::defaults::TASK_PRIORITY_MAX
}

impl TaskInput {
    /// Check field bounds. Lengths are counted in characters.
    pub fn validate(&self) -> crate::Result<()> {
        use crate::defaults::{
            TASK_DESCRIPTION_MAX_LENGTH, TASK_PRIORITY_MAX, TASK_PRIORITY_MIN,
            TASK_TITLE_MAX_LENGTH,
        };

        if self.title.trim().is_empty() {
            return Err(crate::Error::InvalidInput("Title is required".to_string()));
        }
        if self.title.chars().count() > TASK_TITLE_MAX_LENGTH {
            return Err(crate::Error::InvalidInput(format!(
                "Title cannot exceed {} characters",
                TASK_TITLE_MAX_LENGTH
            )));
        }
        if self.description.chars().count() > TASK_DESCRIPTION_MAX_LENGTH {
            return Err(crate::Error::InvalidInput(format!(
                "Description cannot exceed {} characters",
                TASK_DESCRIPTION_MAX_LENGTH
            )));
        }
        if !(TASK_PRIORITY_MIN..=TASK_PRIORITY_MAX).contains(&self.priority) {
            return Err(crate::Error::InvalidInput(format!(
                "Priority must be between {} and {}",
                TASK_PRIORITY_MIN, TASK_PRIORITY_MAX
            )));
        }
        Ok(())
    }
}

impl Task {
    /// `completed_at` after setting the completion flag to `is_completed`.
    ///
    /// Completing stamps `now` once; staying complete keeps the original
    /// stamp; reopening clears it.
    pub fn next_completed_at(
        &self,
        is_completed: bool,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match (self.is_completed, is_completed) {
            (_, false) => None,
            (true, true) => self.completed_at.or(Some(now)),
            (false, true) => Some(now),
        }
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FriendRequest,
    FriendRequestAccepted,
    NoteShared,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FriendRequest => "friend_request",
            NotificationKind::FriendRequestAccepted => "friend_request_accepted",
            NotificationKind::NoteShared => "note_shared",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "friend_request" => Ok(NotificationKind::FriendRequest),
            "friend_request_accepted" => Ok(NotificationKind::FriendRequestAccepted),
            "note_shared" => Ok(NotificationKind::NoteShared),
            other => Err(format!("Unknown notification kind: {}", other)),
        }
    }
}

/// An in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Request for creating a notification.
#[derive(Debug, Clone)]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_id: Option<Uuid>,
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// An uploaded file with its extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub content_type: String,
    pub file_size: i64,
    pub extracted_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request for recording an uploaded document.
#[derive(Debug, Clone)]
pub struct CreateDocumentRequest {
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_path: String,
    pub content_type: String,
    pub file_size: i64,
    pub extracted_text: Option<String>,
}

// =============================================================================
// FRIENDSHIPS
// =============================================================================

/// Lifecycle state of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum FriendshipRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendshipRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipRequestStatus::Pending => "Pending",
            FriendshipRequestStatus::Accepted => "Accepted",
            FriendshipRequestStatus::Rejected => "Rejected",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FriendshipRequestStatus::Pending)
    }
}

impl std::fmt::Display for FriendshipRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FriendshipRequestStatus {
    type Err = String;

    /// Case-sensitive; stored values are written by `as_str`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(FriendshipRequestStatus::Pending),
            "Accepted" => Ok(FriendshipRequestStatus::Accepted),
            "Rejected" => Ok(FriendshipRequestStatus::Rejected),
            other => Err(format!("Invalid friend request status: {}", other)),
        }
    }
}

/// A directed friend request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FriendshipRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: FriendshipRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An undirected friendship edge. `user_id` is the original sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Friendship {
    pub id: Uuid,
    pub user_id: Uuid,
    pub friend_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    /// True when `user` is one of the two endpoints.
    pub fn involves(&self, user: Uuid) -> bool {
        self.user_id == user || self.friend_id == user
    }

    /// The endpoint that is not `user`.
    pub fn other(&self, user: Uuid) -> Uuid {
        if self.user_id == user {
            self.friend_id
        } else {
            self.user_id
        }
    }
}

// =============================================================================
// AI
// =============================================================================

/// One turn of an AI conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChatMessage {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

/// Record of a completed AI call.
#[derive(Debug, Clone)]
pub struct CreateAiInteractionRequest {
    pub user_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub tokens_used: i32,
    pub processing_time_ms: i32,
    pub model: String,
    pub cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(owner: Uuid, is_private: bool) -> Note {
        Note {
            id: Uuid::now_v7(),
            user_id: owner,
            document_id: None,
            title: "Groceries".to_string(),
            content: "milk".to_string(),
            color: NOTE_COLOR.to_string(),
            is_pinned: false,
            is_private,
            cover_image_url: None,
            tags: vec![],
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_note_access_owner() {
        let owner = Uuid::now_v7();
        let n = note(owner, true);
        assert_eq!(NoteAccess::evaluate(&n, owner, None, false), NoteAccess::Owner);
    }

    #[test]
    fn test_note_access_share_grants_read_or_edit() {
        let owner = Uuid::now_v7();
        let viewer = Uuid::now_v7();
        let n = note(owner, true);
        let mut share = NoteShare {
            id: Uuid::now_v7(),
            note_id: n.id,
            shared_with_user_id: viewer,
            can_edit: false,
            shared_at: Utc::now(),
        };
        assert_eq!(
            NoteAccess::evaluate(&n, viewer, Some(&share), false),
            NoteAccess::Read
        );
        share.can_edit = true;
        let access = NoteAccess::evaluate(&n, viewer, Some(&share), false);
        assert!(access.can_edit());
        assert!(!access.is_owner());
    }

    #[test]
    fn test_note_access_share_for_someone_else_is_ignored() {
        let owner = Uuid::now_v7();
        let viewer = Uuid::now_v7();
        let n = note(owner, true);
        let share = NoteShare {
            id: Uuid::now_v7(),
            note_id: n.id,
            shared_with_user_id: Uuid::now_v7(),
            can_edit: true,
            shared_at: Utc::now(),
        };
        assert_eq!(
            NoteAccess::evaluate(&n, viewer, Some(&share), false),
            NoteAccess::None
        );
    }

    #[test]
    fn test_note_access_public_note_visible_to_friends_only() {
        let owner = Uuid::now_v7();
        let viewer = Uuid::now_v7();
        let public = note(owner, false);
        assert!(NoteAccess::evaluate(&public, viewer, None, true).can_read());
        assert!(!NoteAccess::evaluate(&public, viewer, None, false).can_read());

        let private = note(owner, true);
        assert!(!NoteAccess::evaluate(&private, viewer, None, true).can_read());
    }

    #[test]
    fn test_drawing_request_validation() {
        let ok = SaveDrawingRequest {
            drawing_data: r##"{"strokes":[{"points":[[0,0],[4,2]],"color":"#000000"}]}"##
                .to_string(),
        };
        assert!(ok.validate().is_ok());

        for bad in ["", "   ", "{not json"] {
            let req = SaveDrawingRequest {
                drawing_data: bad.to_string(),
            };
            assert!(matches!(req.validate(), Err(crate::Error::InvalidInput(_))));
        }

        let huge = SaveDrawingRequest {
            drawing_data: format!("\"{}\"", "x".repeat(crate::defaults::DRAWING_DATA_MAX_BYTES)),
        };
        assert!(matches!(huge.validate(), Err(crate::Error::InvalidInput(_))));
    }

    #[test]
    fn test_friendship_request_status_parsing_is_case_sensitive() {
        assert_eq!(
            "Accepted".parse::<FriendshipRequestStatus>().unwrap(),
            FriendshipRequestStatus::Accepted
        );
        assert!("accepted".parse::<FriendshipRequestStatus>().is_err());
        assert!("".parse::<FriendshipRequestStatus>().is_err());
    }

    #[test]
    fn test_friendship_request_status_terminal() {
        assert!(!FriendshipRequestStatus::Pending.is_terminal());
        assert!(FriendshipRequestStatus::Accepted.is_terminal());
        assert!(FriendshipRequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_friendship_other_endpoint() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let f = Friendship {
            id: Uuid::now_v7(),
            user_id: a,
            friend_id: b,
            created_at: Utc::now(),
        };
        assert_eq!(f.other(a), b);
        assert_eq!(f.other(b), a);
        assert!(f.involves(a));
        assert!(!f.involves(Uuid::now_v7()));
    }

    #[test]
    fn test_notification_kind_roundtrip_strings() {
        for kind in [
            NotificationKind::FriendRequest,
            NotificationKind::FriendRequestAccepted,
            NotificationKind::NoteShared,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("party".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn test_create_note_request_defaults() {
        let req: CreateNoteRequest = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(req.color, NOTE_COLOR);
        assert!(req.is_private);
        assert!(!req.is_pinned);
        assert!(req.tags.is_empty());
    }

    fn task_input(title: &str, priority: i16) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: "desc".to_string(),
            due_date: Utc::now(),
            priority,
            reminder: None,
            is_completed: false,
        }
    }

    #[test]
    fn test_task_input_validation() {
        assert!(task_input("Pay rent", 1).validate().is_ok());
        assert!(task_input("Pay rent", 3).validate().is_ok());
        assert!(matches!(
            task_input("Pay rent", 0).validate(),
            Err(crate::Error::InvalidInput(_))
        ));
        assert!(task_input("Pay rent", 4).validate().is_err());
        assert!(task_input("  ", 2).validate().is_err());
        assert!(task_input(&"x".repeat(201), 2).validate().is_err());
        assert!(task_input(&"é".repeat(200), 2).validate().is_ok());

        let mut long_desc = task_input("t", 2);
        long_desc.description = "d".repeat(501);
        assert!(long_desc.validate().is_err());
    }

    #[test]
    fn test_task_input_default_priority_is_lowest() {
        let input: TaskInput = serde_json::from_str(
            r#"{"title":"t","description":"d","due_date":"2026-10-16T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(input.priority, 3);
        assert!(!input.is_completed);
    }

    #[test]
    fn test_task_completed_at_transitions() {
        let created = Utc::now();
        let mut task = Task {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            title: "t".to_string(),
            description: String::new(),
            due_date: created,
            priority: 3,
            reminder: None,
            is_completed: false,
            created_at: created,
            completed_at: None,
        };
        let later = created + chrono::Duration::hours(1);

        assert_eq!(task.next_completed_at(false, later), None);
        assert_eq!(task.next_completed_at(true, later), Some(later));

        task.is_completed = true;
        task.completed_at = Some(created);
        assert_eq!(task.next_completed_at(true, later), Some(created));
        assert_eq!(task.next_completed_at(false, later), None);
    }

    #[test]
    fn test_document_serialization_hides_file_path() {
        let doc = Document {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            title: "report".to_string(),
            file_name: "report.pdf".to_string(),
            file_path: "/var/lib/notewiz/secret.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            file_size: 10,
            extracted_text: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("file_path").is_none());
        assert_eq!(json["file_name"], "report.pdf");
    }
}

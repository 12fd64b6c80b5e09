//! HTTP handlers, one module per resource.

pub mod ai;
pub mod documents;
pub mod drawings;
pub mod friends;
pub mod health;
pub mod notes;
pub mod notifications;
pub mod tasks;
pub mod users;

use tracing::warn;

use notewiz_core::logging::subsystem;
use notewiz_core::{CreateNotificationRequest, NotificationRepository};

use crate::AppState;

/// Record an in-app notification. Failures are logged and never fail the
/// request that triggered them.
pub(crate) async fn notify(state: &AppState, req: CreateNotificationRequest) {
    let user_id = req.user_id;
    let kind = req.kind;
    if let Err(e) = state.db.notifications.insert(req).await {
        warn!(
            subsystem = subsystem::NOTIFICATIONS,
            user_id = %user_id,
            kind = %kind,
            error = %e,
            "Failed to record notification"
        );
    }
}

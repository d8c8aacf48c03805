use crate::traits::NotificationDispatcher;
use crate::types::{NotificationRequest, PermissionStatus, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct DispatchedLine<'a> {
    fired_at: String,
    #[serde(flatten)]
    request: &'a NotificationRequest,
}

/// Prints each notification as one JSON line on stdout.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn dispatch(&self, request: &NotificationRequest) -> Result<()> {
        info!("Notification: {} (trivia {})", request.title, request.data.trivia_item_id);
        let line = DispatchedLine {
            fired_at: Utc::now().to_rfc3339(),
            request,
        };
        println!("{}", serde_json::to_string(&line)?);
        Ok(())
    }
}

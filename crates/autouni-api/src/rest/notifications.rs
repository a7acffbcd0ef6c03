// Server-side notification endpoints

use serde_json::json;

use crate::error::Error;
use crate::rest::client::ApiClient;
use crate::rest::models::ServerNotification;

impl ApiClient {
    /// `GET /notifications`
    pub async fn list_notifications(&self) -> Result<Vec<ServerNotification>, Error> {
        self.get("notifications").await
    }

    /// Unread notifications for the logged-in user.
    ///
    /// `GET /notifications/me/unread`
    pub async fn unread_notifications(&self) -> Result<Vec<ServerNotification>, Error> {
        self.get("notifications/me/unread").await
    }

    /// `PATCH /notifications/{id}/read`
    pub async fn mark_notification_read(&self, id: &str) -> Result<ServerNotification, Error> {
        self.patch(&format!("notifications/{id}/read"), &json!({}))
            .await
    }

    /// `DELETE /notifications/{id}`
    pub async fn delete_notification(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("notifications/{id}")).await
    }
}

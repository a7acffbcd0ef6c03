// Automation endpoints

use serde_json::json;
use tracing::debug;

use crate::error::Error;
use crate::rest::client::ApiClient;
use crate::rest::models::{Automation, CreateAutomationRequest};

impl ApiClient {
    /// `GET /automations`
    pub async fn list_automations(&self) -> Result<Vec<Automation>, Error> {
        self.get("automations").await
    }

    /// `POST /automations`
    pub async fn create_automation(
        &self,
        request: &CreateAutomationRequest,
    ) -> Result<Automation, Error> {
        debug!(name = %request.name, "creating automation");
        self.post("automations", request).await
    }

    /// Enable or disable an automation.
    ///
    /// `PATCH /automations/{id}` with `{enabled}`
    pub async fn set_automation_enabled(&self, id: &str, enabled: bool) -> Result<Automation, Error> {
        self.patch(&format!("automations/{id}"), &json!({ "enabled": enabled }))
            .await
    }

    /// `DELETE /automations/{id}`
    pub async fn delete_automation(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("automations/{id}")).await
    }

    /// Run an automation now.
    ///
    /// `POST /automations/{id}/execute`. The response shape is not fixed,
    /// so it is returned as raw JSON.
    pub async fn execute_automation(&self, id: &str) -> Result<serde_json::Value, Error> {
        debug!(automation_id = id, "executing automation");
        self.post_action(&format!("automations/{id}/execute")).await
    }
}

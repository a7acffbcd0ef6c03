// Report endpoints

use crate::error::Error;
use crate::rest::client::ApiClient;
use crate::rest::models::{GenerateReportRequest, Report};

impl ApiClient {
    /// `GET /reports`
    pub async fn list_reports(&self) -> Result<Vec<Report>, Error> {
        self.get("reports").await
    }

    /// Queue a report. It starts `PENDING`; poll `list_reports` for the file.
    ///
    /// `POST /reports/generate`
    pub async fn generate_report(&self, request: &GenerateReportRequest) -> Result<Report, Error> {
        self.post("reports/generate", request).await
    }

    /// `DELETE /reports/{id}`
    pub async fn delete_report(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("reports/{id}")).await
    }
}

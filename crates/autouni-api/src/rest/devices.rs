// Device endpoints

use tracing::debug;

use crate::error::Error;
use crate::rest::client::ApiClient;
use crate::rest::models::{
    BulkControlRequest, BulkControlResponse, ControlRequest, ControlResponse, DeviceQuery,
    DeviceRecord, DeviceStats,
};

impl ApiClient {
    /// `GET /devices` with optional `status`, `type` and `roomId` filters.
    pub async fn list_devices(&self, query: &DeviceQuery) -> Result<Vec<DeviceRecord>, Error> {
        self.get_with_params("devices", &query.to_params()).await
    }

    /// `GET /devices/{id}`
    pub async fn get_device(&self, id: &str) -> Result<DeviceRecord, Error> {
        self.get(&format!("devices/{id}")).await
    }

    /// `GET /devices/stats`
    pub async fn device_stats(&self) -> Result<DeviceStats, Error> {
        self.get("devices/stats").await
    }

    /// Send one command to one device.
    ///
    /// `POST /devices/{id}/control` with `{command, value?}`
    pub async fn control_device(
        &self,
        id: &str,
        command: &str,
        value: Option<&serde_json::Value>,
    ) -> Result<ControlResponse, Error> {
        debug!(device_id = id, command, "controlling device");
        self.post(
            &format!("devices/{id}/control"),
            &ControlRequest { command, value },
        )
        .await
    }

    /// Send one command to many devices.
    ///
    /// `POST /devices/bulk-control` with `{deviceIds, command}`
    pub async fn bulk_control(
        &self,
        device_ids: &[String],
        command: &str,
    ) -> Result<BulkControlResponse, Error> {
        debug!(count = device_ids.len(), command, "bulk device control");
        self.post(
            "devices/bulk-control",
            &BulkControlRequest {
                device_ids,
                command,
            },
        )
        .await
    }
}

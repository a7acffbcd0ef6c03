// Wire types for the AutoUni REST backend.
//
// Field names follow the backend's camelCase JSON. Enumerations that the
// core layer validates (device status, device type) stay as raw strings
// here; the conversion into domain types decides what to do with unknown
// values.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Auth & users ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Coordinator,
    Technician,
    Viewer,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

// ── Devices ─────────────────────────────────────────────────────────

/// A device as returned by `GET /devices` and nested topology payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: String,
    #[serde(default)]
    pub room_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub status: String,
    #[serde(default)]
    pub mqtt_topic: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Filters for `GET /devices`.
#[derive(Debug, Clone, Default)]
pub struct DeviceQuery {
    pub status: Option<String>,
    pub device_type: Option<String>,
    pub room_id: Option<String>,
}

impl DeviceQuery {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref status) = self.status {
            params.push(("status", status.clone()));
        }
        if let Some(ref device_type) = self.device_type {
            params.push(("type", device_type.clone()));
        }
        if let Some(ref room_id) = self.room_id {
            params.push(("roomId", room_id.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStats {
    pub active_devices: u64,
    pub total_devices: u64,
    #[serde(default)]
    pub by_type: Option<HashMap<String, u64>>,
    #[serde(default)]
    pub by_status: Option<HashMap<String, u64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlRequest<'a> {
    pub command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a serde_json::Value>,
}

/// Synchronous acknowledgement of a single-device command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkControlRequest<'a> {
    pub device_ids: &'a [String],
    pub command: &'a str,
}

/// Per-device confirmation inside a bulk response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeviceResult {
    pub device_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkControlResponse {
    pub success: bool,
    #[serde(default)]
    pub affected_devices: u64,
    #[serde(default)]
    pub failed_devices: Vec<String>,
    /// Newer backends confirm each device with its resulting status.
    #[serde(default)]
    pub results: Option<Vec<BulkDeviceResult>>,
}

// ── Topology ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub floors: Vec<Floor>,
    #[serde(default)]
    pub total_energy: Option<f64>,
    #[serde(default)]
    pub active_devices: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floor {
    pub id: String,
    pub building_id: String,
    pub number: i32,
    pub name: String,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub total_energy: Option<f64>,
    #[serde(default)]
    pub active_devices: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomType {
    Classroom,
    Lab,
    Office,
    Auditorium,
    Library,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub floor_id: String,
    pub number: String,
    pub name: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub total_energy: Option<f64>,
    #[serde(default)]
    pub occupied: Option<bool>,
}

// ── Energy ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyPeriod {
    #[default]
    Today,
    Week,
    Month,
    Custom,
}

impl EnergyPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyLevel {
    #[default]
    General,
    Building,
    Floor,
    Room,
}

impl EnergyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Building => "building",
            Self::Floor => "floor",
            Self::Room => "room",
        }
    }
}

/// Query for the aggregated energy endpoints.
///
/// `level`/`id` are only sent for non-general levels with an id, and the
/// date range only for custom periods.
#[derive(Debug, Clone, Default)]
pub struct EnergyQuery {
    pub period: EnergyPeriod,
    pub level: EnergyLevel,
    pub id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl EnergyQuery {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("period", self.period.as_str().to_owned())];
        if let (false, Some(id)) = (self.level == EnergyLevel::General, self.id.as_ref()) {
            params.push(("level", self.level.as_str().to_owned()));
            params.push(("id", id.clone()));
        }
        if self.period == EnergyPeriod::Custom {
            if let (Some(start), Some(end)) = (&self.start_date, &self.end_date) {
                params.push(("startDate", start.clone()));
                params.push(("endDate", end.clone()));
            }
        }
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyStats {
    /// kWh
    #[serde(default)]
    pub total_energy: f64,
    #[serde(default)]
    pub total_cost: Option<f64>,
    /// Watts
    #[serde(default)]
    pub peak_demand: Option<f64>,
    #[serde(default)]
    pub average_power: Option<f64>,
    #[serde(default)]
    pub period: Option<EnergyRange>,
    #[serde(default)]
    pub by_device_type: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub by_room: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub total_kwh: Option<f64>,
    #[serde(default)]
    pub trend: Option<f64>,
    #[serde(default)]
    pub history: Option<Vec<EnergyPoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyReading {
    pub id: String,
    pub device_id: String,
    pub value_wh: f64,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub current: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimePower {
    pub power: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyComparisonItem {
    pub id: String,
    pub name: String,
    pub energy: f64,
    pub trend: f64,
}

// ── Automations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    Schedule,
    Condition,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Automation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub enabled: bool,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    pub action: String,
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAutomationRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    pub trigger_type: TriggerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub action: String,
}

// ── Reports ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    EnergyConsumption,
    DeviceStatus,
    RoomUsage,
    Incidents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportFormat {
    Pdf,
    Csv,
    Xlsx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub building_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub floor_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub room_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub title: String,
    pub format: ReportFormat,
    pub filters: ReportFilters,
    pub status: ReportStatus,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateReportRequest {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub title: String,
    pub format: ReportFormat,
    pub filters: ReportFilters,
}

// ── Notifications ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerNotification {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub read: bool,
    #[serde(default)]
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn device_record_keeps_unknown_status_verbatim() {
        let json = serde_json::json!({
            "id": "d1",
            "roomId": "r1",
            "name": "Projector",
            "type": "PROJECTOR",
            "status": "WARMING_UP",
            "metadata": { "brand": "Epson", "power": 280 }
        });
        let record: DeviceRecord = serde_json::from_value(json).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(record.status, "WARMING_UP");
        assert_eq!(record.room_id.as_deref(), Some("r1"));
        assert!(record.last_seen.is_none());
    }

    #[test]
    fn energy_query_omits_level_for_general() {
        let query = EnergyQuery {
            id: Some("b1".into()),
            ..EnergyQuery::default()
        };
        assert_eq!(query.to_params(), vec![("period", "today".to_owned())]);
    }

    #[test]
    fn energy_query_custom_range() {
        let query = EnergyQuery {
            period: EnergyPeriod::Custom,
            level: EnergyLevel::Room,
            id: Some("r9".into()),
            start_date: Some("2026-01-01".into()),
            end_date: Some("2026-01-31".into()),
        };
        assert_eq!(
            query.to_params(),
            vec![
                ("period", "custom".to_owned()),
                ("level", "room".to_owned()),
                ("id", "r9".to_owned()),
                ("startDate", "2026-01-01".to_owned()),
                ("endDate", "2026-01-31".to_owned()),
            ]
        );
    }

    #[test]
    fn unknown_role_does_not_fail_user_parsing() {
        let json = r#"{"id":"u","email":"e@x","name":"N","role":"JANITOR"}"#;
        let user: User = serde_json::from_str(json).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(user.role, UserRole::Unknown);
    }
}

// Energy endpoints

use crate::error::Error;
use crate::rest::client::ApiClient;
use crate::rest::models::{
    EnergyComparisonItem, EnergyLevel, EnergyQuery, EnergyReading, EnergyStats, RealtimePower,
};

/// Scope for the per-entity stats endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyScope {
    Building,
    Floor,
    Room,
}

impl EnergyScope {
    fn segment(self) -> &'static str {
        match self {
            Self::Building => "buildings",
            Self::Floor => "floors",
            Self::Room => "rooms",
        }
    }
}

impl ApiClient {
    /// `GET /energy/stats`
    pub async fn energy_stats(&self, query: &EnergyQuery) -> Result<EnergyStats, Error> {
        self.get_with_params("energy/stats", &query.to_params()).await
    }

    /// `GET /energy/history`
    pub async fn energy_history(&self, query: &EnergyQuery) -> Result<Vec<EnergyReading>, Error> {
        self.get_with_params("energy/history", &query.to_params())
            .await
    }

    /// Instantaneous power draw.
    ///
    /// `GET /energy/realtime`. Only `level`/`id` are sent, never a period.
    pub async fn energy_realtime(
        &self,
        level: EnergyLevel,
        id: Option<&str>,
    ) -> Result<RealtimePower, Error> {
        let params = match (level, id) {
            (EnergyLevel::General, _) | (_, None) => Vec::new(),
            (level, Some(id)) => vec![("level", level.as_str().to_owned()), ("id", id.to_owned())],
        };
        self.get_with_params("energy/realtime", &params).await
    }

    /// `GET /energy/comparison?level=...`
    pub async fn energy_comparison(
        &self,
        level: EnergyLevel,
    ) -> Result<Vec<EnergyComparisonItem>, Error> {
        self.get_with_params("energy/comparison", &[("level", level.as_str().to_owned())])
            .await
    }

    /// `GET /energy/{buildings|floors|rooms}/{id}/stats`
    pub async fn energy_stats_for(&self, scope: EnergyScope, id: &str) -> Result<EnergyStats, Error> {
        self.get(&format!("energy/{}/{id}/stats", scope.segment()))
            .await
    }
}

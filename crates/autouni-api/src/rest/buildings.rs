// Building, floor and room endpoints

use crate::error::Error;
use crate::rest::client::ApiClient;
use crate::rest::models::{Building, Floor, Room};

impl ApiClient {
    /// `GET /buildings`
    pub async fn list_buildings(&self) -> Result<Vec<Building>, Error> {
        self.get("buildings").await
    }

    /// `GET /buildings/{id}`
    pub async fn get_building(&self, id: &str) -> Result<Building, Error> {
        self.get(&format!("buildings/{id}")).await
    }

    /// Building with floors, rooms and devices nested.
    ///
    /// `GET /buildings/{id}/details`
    pub async fn building_details(&self, id: &str) -> Result<Building, Error> {
        self.get(&format!("buildings/{id}/details")).await
    }

    /// `GET /floors/{id}/details`
    pub async fn floor_details(&self, id: &str) -> Result<Floor, Error> {
        self.get(&format!("floors/{id}/details")).await
    }

    /// `GET /rooms/{id}/details`
    pub async fn room_details(&self, id: &str) -> Result<Room, Error> {
        self.get(&format!("rooms/{id}/details")).await
    }
}

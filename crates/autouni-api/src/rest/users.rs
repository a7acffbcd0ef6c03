// User management endpoints

use crate::error::Error;
use crate::rest::client::ApiClient;
use crate::rest::models::{CreateUserRequest, UpdateProfileRequest, User};

impl ApiClient {
    /// `GET /users`
    pub async fn list_users(&self) -> Result<Vec<User>, Error> {
        self.get("users").await
    }

    /// `GET /users/{id}`
    pub async fn get_user(&self, id: &str) -> Result<User, Error> {
        self.get(&format!("users/{id}")).await
    }

    /// `POST /users`
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, Error> {
        self.post("users", request).await
    }

    /// `PATCH /users/{id}`
    pub async fn update_user(&self, id: &str, update: &UpdateProfileRequest) -> Result<User, Error> {
        self.patch(&format!("users/{id}"), update).await
    }

    /// Update the logged-in user's own profile.
    ///
    /// `PATCH /users/profile`
    pub async fn update_profile(&self, update: &UpdateProfileRequest) -> Result<User, Error> {
        self.patch("users/profile", update).await
    }

    /// `DELETE /users/{id}`
    pub async fn delete_user(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("users/{id}")).await
    }
}

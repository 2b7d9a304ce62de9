//! Categories API.

use uuid::Uuid;

use crate::client::TallyClient;
use crate::error::Result;
use crate::types::{Category, CategoryRequest};

/// Categories API client.
pub struct CategoriesApi {
    client: TallyClient,
}

impl CategoriesApi {
    pub(crate) fn new(client: TallyClient) -> Self {
        Self { client }
    }

    /// List all categories of the user.
    pub async fn list(&self) -> Result<Vec<Category>> {
        self.client.get("api/categories").await
    }

    /// Create a category.
    pub async fn create(&self, request: &CategoryRequest) -> Result<()> {
        self.client.post("api/categories", request).await
    }

    /// Update a category.
    pub async fn update(&self, id: Uuid, request: &CategoryRequest) -> Result<()> {
        self.client
            .put(&format!("api/categories/{}", id), request)
            .await
    }

    /// Delete a category.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.client.delete(&format!("api/categories/{}", id)).await
    }
}

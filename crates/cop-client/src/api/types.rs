//! Types API.

use reqwest::Method;

use crate::client::CopClient;
use crate::error::Result;

/// Types API client.
pub struct TypesApi {
    client: CopClient,
}

impl TypesApi {
    pub(crate) fn new(client: CopClient) -> Self {
        Self { client }
    }

    /// Get a type definition by fully-qualified name. Returns the raw JSON.
    pub async fn get(&self, type_name: &str) -> Result<Vec<u8>> {
        self.client
            .send(Method::GET, &["types", type_name], None, None)
            .await
    }
}

//! Objects API.

use reqwest::Method;

use crate::client::CopClient;
use crate::error::Result;
use crate::payload::validate_json;
use crate::types::{Layer, ObjectRef};

/// Objects API client.
pub struct ObjectsApi {
    client: CopClient,
}

impl ObjectsApi {
    pub(crate) fn new(client: CopClient) -> Self {
        Self { client }
    }

    /// Get one object. Returns the raw JSON body unchanged.
    pub async fn get(&self, type_name: &str, object_id: &str, layer: &Layer) -> Result<Vec<u8>> {
        self.client
            .send(Method::GET, &["objects", type_name, object_id], Some(layer), None)
            .await
    }

    /// Get the object a reference points at.
    pub async fn get_ref(&self, object: &ObjectRef) -> Result<Vec<u8>> {
        self.get(&object.type_name, &object.object_id, &object.layer)
            .await
    }

    /// List the objects of a type within a layer.
    pub async fn list(&self, type_name: &str, layer: &Layer) -> Result<Vec<u8>> {
        self.client
            .send(Method::GET, &["objects", type_name], Some(layer), None)
            .await
    }

    /// Create an object. Returns whatever the server answered with.
    pub async fn create(&self, type_name: &str, layer: &Layer, payload: &[u8]) -> Result<Vec<u8>> {
        validate_json(payload)?;
        self.client
            .send(Method::POST, &["objects", type_name], Some(layer), Some(payload))
            .await
    }

    /// Replace an object's payload.
    pub async fn update(
        &self,
        type_name: &str,
        object_id: &str,
        layer: &Layer,
        payload: &[u8],
    ) -> Result<()> {
        validate_json(payload)?;
        self.client
            .send(
                Method::PUT,
                &["objects", type_name, object_id],
                Some(layer),
                Some(payload),
            )
            .await?;
        Ok(())
    }

    /// Delete an object.
    pub async fn delete(&self, type_name: &str, object_id: &str, layer: &Layer) -> Result<()> {
        self.client
            .send(Method::DELETE, &["objects", type_name, object_id], Some(layer), None)
            .await?;
        Ok(())
    }
}

use reqwest::{Client, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    types::{Greeting, ItemId, ReadItemResponse, Result, SaveItemResponse},
    validation::{HTTPValidationError, ValidationError},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request validation failed")]
    Validation { errors: Vec<ValidationError> },
}

/// Items API connector. Talks to a running instance of the service over HTTP.
pub struct Connector {
    url: Url,
    http: Client,
}

impl Connector {
    /// Create a new Connector from the base url of the API.
    pub fn new(url: &str) -> Result<Connector> {
        let url = Url::parse(url)?;
        let http = Client::new();
        Ok(Connector { url, http })
    }

    /// Get the OpenAPI document as raw JSON.
    pub async fn openapi_schema(&self) -> Result<Value> {
        let url = self.url.join("openapi.json")?;
        Self::decode(self.http.get(url).send().await?).await
    }

    /// `GET /`.
    pub async fn root(&self) -> Result<Greeting> {
        Self::decode(self.http.get(self.url.clone()).send().await?).await
    }

    /// `GET /items/{item_id}`, with `q` sent only when present.
    pub async fn read_item(&self, item_id: ItemId, q: Option<&str>) -> Result<ReadItemResponse> {
        let url = self.url.join(&format!("items/{item_id}"))?;
        let mut req = self.http.get(url);
        if let Some(q) = q {
            req = req.query(&[("q", q)]);
        }
        Self::decode(req.send().await?).await
    }

    /// `PUT /items/{item_id}`. The body is usually an [`crate::types::Item`], but any
    /// serializable value is sent as is.
    pub async fn save_item<B>(&self, item_id: ItemId, body: &B) -> Result<SaveItemResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url.join(&format!("items/{item_id}"))?;
        Self::decode(self.http.put(url).json(body).send().await?).await
    }

    async fn decode<T: DeserializeOwned>(res: Response) -> Result<T> {
        if res.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let errors = res.json::<HTTPValidationError>().await?.detail;
            return Err(Error::Validation { errors }.into());
        }

        res.error_for_status()?.json::<T>().await.map_err(Into::into)
    }
}

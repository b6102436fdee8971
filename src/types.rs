use std::error::Error;
pub use std::result::Result as stdResult;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::validation::{FieldKind, FieldSpec, StructuralSchema};

pub type Result<T> = stdResult<T, Box<dyn Error + Send + Sync>>;

pub type ItemId = i64;

/// An item as sent in the body of `PUT /items/{item_id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub item_id: ItemId,
    pub q: String,
}

impl StructuralSchema for Item {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec { name: "item_id", kind: FieldKind::Integer },
        FieldSpec { name: "q", kind: FieldKind::String },
    ];
}

/// Reply of the root endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Greeting {
    #[serde(rename = "Hello")]
    pub hello: String,
}

impl Default for Greeting {
    fn default() -> Self {
        Self { hello: "World".to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReadItemResponse {
    pub item_id: ItemId,
    pub q: Option<String>,
}

/// Echo of a saved item. The path id and the body id are never reconciled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaveItemResponse {
    pub item_id: ItemId,
    pub q: Item,
}

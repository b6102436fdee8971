//! Request extractors. Each one rejects with [`ApiError`] so every malformed request is answered
//! with the same 422 body before a handler runs.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header, request::Parts, HeaderMap},
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::{
    types::{stdResult, ItemId},
    validation::{check_fields, ApiError, ErrorType, StructuralSchema, ValidationError},
};

/// The `item_id` path segment.
#[derive(Debug, Deserialize, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ItemPath {
    pub item_id: ItemId,
}

/// The optional `q` query parameter. A repeated `q` keeps the last value.
#[derive(Debug, Default)]
pub struct ItemQuery {
    pub q: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ItemQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> stdResult<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::from_request_parts(parts, state).await?;
        let q = pairs.into_iter().filter(|(key, _)| key == "q").map(|(_, value)| value).last();
        Ok(Self { q })
    }
}

/// JSON body checked against `T`'s structural schema before it is deserialized.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: StructuralSchema + DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> stdResult<Self, Self::Rejection> {
        let is_json = is_json_content_type(req.headers());
        let bytes = Bytes::from_request(req, state).await?;
        parse_body(&bytes, is_json).map(ValidJson)
    }
}

/// Runs a parts extractor and a body extractor, and rejects with the errors of both.
#[derive(Debug)]
pub struct Validated<P, B>(pub P, pub B);

#[async_trait]
impl<P, B, S> FromRequest<S> for Validated<P, B>
where
    P: FromRequestParts<S, Rejection = ApiError> + Send,
    B: FromRequest<S, Rejection = ApiError> + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> stdResult<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let head = P::from_request_parts(&mut parts, state).await;
        let tail = B::from_request(Request::from_parts(parts, body), state).await;
        match (head, tail) {
            (Ok(head), Ok(tail)) => Ok(Self(head, tail)),
            (head, tail) => Err(ApiError::merge(head.err(), tail.err())
                .unwrap_or_else(|| ApiError::Internal("Extractor failed without error".into()))),
        }
    }
}

/// A missing or empty Content-Type, `application/json` and `application/*+json` are JSON.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE) else {
        return true;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if essence.is_empty() {
        return true;
    }
    match essence.split_once('/') {
        Some(("application", subtype)) => subtype == "json" || subtype.ends_with("+json"),
        _ => false,
    }
}

/// Parses and validates a raw request body. A body not declared as JSON is validated as an
/// opaque string and so never matches an object schema.
pub fn parse_body<T>(bytes: &[u8], is_json: bool) -> stdResult<T, ApiError>
where
    T: StructuralSchema + DeserializeOwned,
{
    if bytes.is_empty() {
        let error = ValidationError::new(vec!["body".into()], ErrorType::Missing, Value::Null);
        return Err(ApiError::Validation(vec![error]));
    }

    if !is_json {
        let input = Value::String(String::from_utf8_lossy(bytes).into_owned());
        let error = ValidationError::new(vec!["body".into()], ErrorType::ModelAttributesType, input);
        return Err(ApiError::Validation(vec![error]));
    }

    let mut value: Value = serde_json::from_slice(bytes).map_err(|e| {
        let offset = byte_offset(bytes, e.line(), e.column());
        let error = ValidationError::new(
            vec!["body".into(), offset.into()],
            ErrorType::JsonInvalid,
            json!({}),
        );
        ApiError::Validation(vec![error])
    })?;

    let errors = check_fields(&mut value, T::FIELDS);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    serde_json::from_value(value)
        .map_err(|e| ApiError::Internal(format!("Validated body failed to deserialize: {e}")))
}

/// Converts serde_json's 1-based line/column into a byte offset.
fn byte_offset(bytes: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = bytes
        .split(|b| *b == b'\n')
        .take(line.saturating_sub(1))
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column.saturating_sub(1)).min(bytes.len())
}

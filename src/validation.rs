use std::num::IntErrorKind;

use axum::{
    extract::rejection::{BytesRejection, FailedToDeserializePathParams, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::stdResult;

/// Kind of a structural validation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorType {
    Missing,
    IntParsing,
    IntParsingSize,
    IntType,
    IntFromFloat,
    StringType,
    ModelAttributesType,
    JsonInvalid,
    ValueError,
}

impl ErrorType {
    /// Human readable message reported next to the error type.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Missing => "Field required",
            Self::IntParsing => "Input should be a valid integer, unable to parse string as an integer",
            Self::IntParsingSize => "Unable to parse input as an integer, exceeded maximum size",
            Self::IntType => "Input should be a valid integer",
            Self::IntFromFloat => "Input should be a valid integer, got a number with a fractional part",
            Self::StringType => "Input should be a valid string",
            Self::ModelAttributesType => {
                "Input should be a valid dictionary or object to extract fields from"
            },
            Self::JsonInvalid => "JSON decode error",
            Self::ValueError => "Value error",
        }
    }
}

/// A single element of an error location, e.g. `["body", "q"]` or `["body", 12]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Loc {
    Key(String),
    Index(usize),
}

impl From<&str> for Loc {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Loc {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for Loc {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationError {
    #[serde(rename = "loc")]
    pub location: Vec<Loc>,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub input: Value,
}

impl ValidationError {
    pub fn new(location: Vec<Loc>, error_type: ErrorType, input: Value) -> Self {
        Self { location, message: error_type.message().to_string(), error_type, input }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Body of a 422 response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HTTPValidationError {
    pub detail: Vec<ValidationError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    String,
}

impl FieldKind {
    /// Checks `input` in lax mode. `Ok(Some(_))` carries the coerced value that replaces it.
    fn coerce(&self, input: &Value) -> stdResult<Option<Value>, ErrorType> {
        match (self, input) {
            (Self::Integer, Value::Number(n)) if n.is_i64() => Ok(None),
            (Self::Integer, Value::Number(n)) if n.is_u64() => Err(ErrorType::IntParsingSize),
            (Self::Integer, Value::Number(n)) => {
                float_to_int(n.as_f64().unwrap_or(f64::NAN)).map(|i| Some(i.into()))
            },
            (Self::Integer, Value::String(s)) => str_to_int(s).map(|i| Some(i.into())),
            (Self::Integer, _) => Err(ErrorType::IntType),
            (Self::String, Value::String(_)) => Ok(None),
            (Self::String, _) => Err(ErrorType::StringType),
        }
    }
}

fn float_to_int(f: f64) -> stdResult<i64, ErrorType> {
    if f.fract() != 0.0 {
        return Err(ErrorType::IntFromFloat);
    }
    // i64::MAX as f64 rounds up to 2^63.
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(ErrorType::IntParsingSize);
    }
    Ok(f as i64)
}

/// Parses `" 5 "`, `"+5"` and `"5.00"`, but not `"5.5"` or `"five"`.
fn str_to_int(s: &str) -> stdResult<i64, ErrorType> {
    let s = s.trim();
    let digits = match s.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => whole,
        _ => s,
    };
    digits.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ErrorType::IntParsingSize,
        _ => ErrorType::IntParsing,
    })
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Declared shape of a request body. All fields are required.
pub trait StructuralSchema {
    const FIELDS: &'static [FieldSpec];
}

/// Checks `value` against `fields` and returns every violation found, in declaration order.
/// Fields that pass are replaced by their coerced form, e.g. `"5"` becomes `5` for an integer.
/// Fields not listed in `fields` are ignored.
pub fn check_fields(value: &mut Value, fields: &[FieldSpec]) -> Vec<ValidationError> {
    let original = value.clone();
    let Some(object) = value.as_object_mut() else {
        return vec![ValidationError::new(
            vec!["body".into()],
            ErrorType::ModelAttributesType,
            original,
        )];
    };

    let mut errors = Vec::new();
    for field in fields {
        let location = vec!["body".into(), field.name.into()];
        match object.get_mut(field.name) {
            None => errors.push(ValidationError::new(location, ErrorType::Missing, original.clone())),
            Some(input) => match field.kind.coerce(input) {
                Ok(Some(coerced)) => *input = coerced,
                Ok(None) => {},
                Err(error_type) => {
                    errors.push(ValidationError::new(location, error_type, input.clone()))
                },
            },
        }
    }
    errors
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request validation failed with {} error(s)", .0.len())]
    Validation(Vec<ValidationError>),
    #[error("Failed to read request body: {reason}")]
    Body { status: StatusCode, reason: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Combines the rejections of two extractors. Validation errors are concatenated in order;
    /// any other failure takes precedence.
    pub fn merge(first: Option<ApiError>, second: Option<ApiError>) -> Option<ApiError> {
        match (first, second) {
            (Some(Self::Validation(mut a)), Some(Self::Validation(b))) => {
                a.extend(b);
                Some(Self::Validation(a))
            },
            (Some(err @ Self::Validation(_)), Some(other)) => {
                tracing::debug!("Dropping {err} in favour of {other}");
                Some(other)
            },
            (Some(err), _) | (None, Some(err)) => Some(err),
            (None, None) => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(detail) => {
                for err in &detail {
                    tracing::debug!(
                        error_type = %err.error_type,
                        loc = ?err.location,
                        "Rejected request: {}",
                        err.message
                    );
                }
                (StatusCode::UNPROCESSABLE_ENTITY, Json(HTTPValidationError { detail }))
                    .into_response()
            },
            Self::Body { status, reason } => {
                tracing::debug!("Rejected request body: {reason}");
                (status, Json(json!({ "detail": reason }))).into_response()
            },
            Self::Internal(reason) => {
                tracing::error!("🚫 {reason}");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": "Internal Server Error" })))
                    .into_response()
            },
        }
    }
}

impl From<FailedToDeserializePathParams> for ApiError {
    fn from(err: FailedToDeserializePathParams) -> Self {
        use axum::extract::path::ErrorKind;

        let body_text = err.body_text();
        // Path parameters of this API are integers only.
        let error = match err.into_kind() {
            ErrorKind::ParseErrorAtKey { key, value, .. } => {
                ValidationError::new(vec!["path".into(), key.into()], ErrorType::IntParsing, value.into())
            },
            ErrorKind::ParseErrorAtIndex { index, value, .. } => {
                ValidationError::new(vec!["path".into(), index.into()], ErrorType::IntParsing, value.into())
            },
            ErrorKind::ParseError { value, .. } => {
                ValidationError::new(vec!["path".into()], ErrorType::IntParsing, value.into())
            },
            ErrorKind::InvalidUtf8InPathParam { key } => {
                ValidationError::new(vec!["path".into(), key.into()], ErrorType::IntParsing, Value::Null)
            },
            ErrorKind::WrongNumberOfParameters { .. } | ErrorKind::UnsupportedType { .. } => {
                return Self::Internal(body_text)
            },
            _ => ValidationError::new(vec!["path".into()], ErrorType::ValueError, Value::Null)
                .with_message(body_text),
        };
        Self::Validation(vec![error])
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(err) => err.into(),
            other => Self::Internal(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        let error = ValidationError::new(vec!["query".into()], ErrorType::ValueError, Value::Null)
            .with_message(rejection.body_text());
        Self::Validation(vec![error])
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::Body { status: rejection.status(), reason: rejection.body_text() }
    }
}

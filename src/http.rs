use std::net::{Ipv4Addr, SocketAddr};

use axum::{
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    types::{Greeting, Item, ReadItemResponse, Result, SaveItemResponse},
    validation::{ErrorType, HTTPValidationError, Loc, ValidationError},
};

#[derive(OpenApi)]
#[openapi(
    paths(read_root, items::read_item, items::save_item),
    components(schemas(
        Greeting,
        Item,
        ReadItemResponse,
        SaveItemResponse,
        HTTPValidationError,
        ValidationError,
        ErrorType,
        Loc
    ))
)]
pub struct HttpServer {
    port: u16,
}

impl HttpServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// The whole application: API routes, docs, and JSON fallbacks.
    pub fn router() -> Router {
        Router::new()
            .merge(SwaggerUi::new("/docs").url("/openapi.json", Self::openapi()))
            .route("/", get(read_root))
            .merge(items::routes())
            .fallback(not_found)
            .layer(middleware::map_response(method_not_allowed))
    }

    pub async fn serve(&self, token: CancellationToken) -> Result<()> {
        let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port));
        let listener = TcpListener::bind(&address).await?;
        Self::serve_with(listener, token).await
    }

    /// Serves on an already bound listener until `token` is cancelled.
    pub async fn serve_with(listener: TcpListener, token: CancellationToken) -> Result<()> {
        tracing::info!("🚀 Listening on {}", listener.local_addr()?);
        axum::serve(listener, Self::router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .map_err(Into::into)
    }
}

/// Root greeting. Doubles as a health check.
#[utoipa::path(get, path = "/",
    responses((status = 200, description = "Ok", body = Greeting)))]
async fn read_root() -> Json<Greeting> {
    Json(Greeting::default())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" })))
}

/// Gives the router's bare 405 replies a JSON body, keeping the `Allow` header.
async fn method_not_allowed(res: Response) -> Response {
    if res.status() != StatusCode::METHOD_NOT_ALLOWED {
        return res;
    }

    let allow = res.headers().get(header::ALLOW).cloned();
    let mut res =
        (StatusCode::METHOD_NOT_ALLOWED, Json(json!({ "detail": "Method Not Allowed" })))
            .into_response();
    if let Some(allow) = allow {
        res.headers_mut().insert(header::ALLOW, allow);
    }
    res
}

mod items {
    use super::*;
    use crate::extract::{ItemPath, ItemQuery, ValidJson, Validated};

    pub fn routes() -> Router {
        Router::new().route("/items/:item_id", get(read_item).put(save_item))
    }

    /// Read an item. Echoes the path id and the optional query string.
    #[utoipa::path(get, path = "/items/{item_id}",
        params(
            ("item_id" = i64, Path, description = "Item id"),
            ("q" = Option<String>, Query, description = "Optional query string")),
        responses(
            (status = 200, description = "Ok", body = ReadItemResponse),
            (status = 422, description = "Validation error", body = HTTPValidationError)))]
    pub(super) async fn read_item(
        ItemPath { item_id }: ItemPath,
        ItemQuery { q }: ItemQuery,
    ) -> Json<ReadItemResponse> {
        Json(ReadItemResponse { item_id, q })
    }

    /// Save item. Nothing is stored; the validated item is echoed under `q`.
    #[utoipa::path(put, path = "/items/{item_id}",
        params(("item_id" = i64, Path, description = "Item id")),
        request_body = Item,
        responses(
            (status = 200, description = "Ok", body = SaveItemResponse),
            (status = 422, description = "Validation error", body = HTTPValidationError)))]
    pub(super) async fn save_item(
        Validated(ItemPath { item_id }, ValidJson(item)): Validated<ItemPath, ValidJson<Item>>,
    ) -> Json<SaveItemResponse> {
        if item.item_id != item_id {
            tracing::debug!("Path id {item_id} differs from body id {}", item.item_id);
        }
        Json(SaveItemResponse { item_id, q: item })
    }
}

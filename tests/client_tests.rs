use items_api::{
    client::{Connector, Error},
    types::{Greeting, Item, ReadItemResponse, SaveItemResponse},
    validation::{ErrorType, Loc},
};
use serde_json::json;

use crate::common::spawn_server;

mod common;

async fn connector() -> (Connector, tokio_util::sync::CancellationToken) {
    let (address, token) = spawn_server().await;
    let connector = Connector::new(&format!("http://{address}/")).unwrap();
    (connector, token)
}

#[tokio::test]
async fn test_root() {
    let (connector, token) = connector().await;
    assert_eq!(connector.root().await.unwrap(), Greeting::default());
    token.cancel();
}

#[tokio::test]
async fn test_read_item() {
    let (connector, token) = connector().await;
    assert_eq!(
        connector.read_item(9, Some("a&b")).await.unwrap(),
        ReadItemResponse { item_id: 9, q: Some("a&b".to_string()) }
    );
    assert_eq!(connector.read_item(9, None).await.unwrap(), ReadItemResponse { item_id: 9, q: None });
    token.cancel();
}

#[tokio::test]
async fn test_save_item() {
    let (connector, token) = connector().await;
    let item = Item { item_id: 2, q: "x".to_string() };
    assert_eq!(
        connector.save_item(1, &item).await.unwrap(),
        SaveItemResponse { item_id: 1, q: item }
    );
    token.cancel();
}

#[tokio::test]
async fn test_openapi_schema() {
    let (connector, token) = connector().await;
    let schema = connector.openapi_schema().await.unwrap();
    assert!(schema["openapi"].as_str().unwrap().starts_with("3."));
    assert!(schema["paths"]["/items/{item_id}"].is_object());
    token.cancel();
}

#[tokio::test]
async fn test_validation_error_is_decoded() {
    let (connector, token) = connector().await;
    let err = connector.save_item(5, &json!({"item_id": 5})).await.unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::Validation { errors }) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].error_type, ErrorType::Missing);
            assert_eq!(errors[0].location, vec![Loc::from("body"), Loc::from("q")]);
        },
        other => panic!("expected validation error, got {other:?}"),
    }
    token.cancel();
}

#[tokio::test]
async fn test_not_found_is_http_error() {
    let (address, token) = spawn_server().await;
    let connector = Connector::new(&format!("http://{address}/missing/")).unwrap();
    let err = connector.root().await.unwrap_err();
    let err = err.downcast_ref::<reqwest::Error>().expect("should be an http error");
    assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
    token.cancel();
}

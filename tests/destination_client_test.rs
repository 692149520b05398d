use anyhow::Result;
use httpmock::prelude::*;
use media_transfer::adapters::MemoryLogSink;
use media_transfer::core::{DestinationClient, MediaUploader};
use media_transfer::domain::model::{AuthMode, DestinationConfig, LogLevel};
use media_transfer::domain::ports::LogSink;
use media_transfer::TransferError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn new_client(config: DestinationConfig) -> (DestinationClient, Arc<MemoryLogSink>) {
    let log = Arc::new(MemoryLogSink::new());
    let client = DestinationClient::new(config, log.clone()).unwrap();
    (client, log)
}

#[tokio::test]
async fn test_upload_sends_json_payload_with_bearer_token() -> Result<()> {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/api/media/1001/upload")
            .header("authorization", "Bearer secret-token")
            .header("accept", "application/json")
            .json_body(json!({
                "Filename": "cat.jpg",
                "Content": "data:image/jpeg;base64,Y2F0",
                "Description": ""
            }));
        then.status(201).json_body(json!({ "id": 1 }));
    });

    let (client, log) = new_client(
        DestinationConfig::new(server.url("/api"), "/media/{categoryId}/upload")
            .with_token(AuthMode::Bearer, "secret-token"),
    );

    let uploaded = client
        .upload_media(
            "1001",
            "cat.jpg",
            "data:image/jpeg;base64,Y2F0",
            "",
            &CancellationToken::new(),
        )
        .await?;

    assert!(uploaded);
    upload.assert();

    let success = log
        .all_logs()
        .into_iter()
        .find(|r| r.level == LogLevel::Success)
        .unwrap();
    assert_eq!(success.context.category_id.as_deref(), Some("1001"));
    assert_eq!(success.context.file_name.as_deref(), Some("cat.jpg"));
    Ok(())
}

#[tokio::test]
async fn test_auth_header_shapes_on_the_wire() -> Result<()> {
    let cases = [
        (AuthMode::OAuth, "authorization", "OAuth tok"),
        (AuthMode::Jwt, "authorization", "JWT tok"),
        (AuthMode::ApiKey, "x-api-key", "tok"),
    ];

    for (mode, header, expected) in cases {
        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(POST).path("/media/7").header(header, expected);
            then.status(200);
        });

        let (client, _) = new_client(
            DestinationConfig::new(server.base_url(), "media").with_token(mode, "tok"),
        );
        assert!(
            client
                .upload_media("7", "a.png", "data:image/png;base64,", "", &CancellationToken::new())
                .await?
        );
        upload.assert();
    }
    Ok(())
}

#[tokio::test]
async fn test_basic_auth_when_no_token_mode() -> Result<()> {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/media/5")
            .header("authorization", "Basic dXNlcjpwYXNz");
        then.status(200);
    });

    let (client, _) = new_client(
        DestinationConfig::new(server.base_url(), "media").with_basic_auth("user", "pass"),
    );
    assert!(
        client
            .upload_media("5", "a.gif", "data:image/gif;base64,", "", &CancellationToken::new())
            .await?
    );
    upload.assert();
    Ok(())
}

#[tokio::test]
async fn test_configured_upload_method() -> Result<()> {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(PUT).path("/media/9");
        then.status(204);
    });

    let mut config =
        DestinationConfig::new(server.base_url(), "media").with_token(AuthMode::Bearer, "t");
    config.upload_method = "put".to_string();
    let (client, _) = new_client(config);

    assert!(
        client
            .upload_media("9", "a.webp", "data:image/webp;base64,", "", &CancellationToken::new())
            .await?
    );
    upload.assert();
    Ok(())
}

#[tokio::test]
async fn test_non_success_status_returns_false_and_logs_body() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/media/1001");
        then.status(422).body("category is archived");
    });

    let (client, log) = new_client(
        DestinationConfig::new(server.base_url(), "media").with_token(AuthMode::Bearer, "t"),
    );

    let uploaded = client
        .upload_media("1001", "a.jpg", "data:image/jpeg;base64,", "", &CancellationToken::new())
        .await?;
    assert!(!uploaded);

    let error = log
        .all_logs()
        .into_iter()
        .find(|r| r.level == LogLevel::Error)
        .unwrap();
    assert!(error.message.contains("422"));
    assert_eq!(
        error.context.error_details.as_deref(),
        Some("category is archived")
    );
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_is_destination_error() {
    let (client, log) = new_client(
        DestinationConfig::new("http://127.0.0.1:1", "media").with_token(AuthMode::Bearer, "t"),
    );

    let err = client
        .upload_media("1", "a.jpg", "data:image/jpeg;base64,", "", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::DestinationConnection { .. }));
    assert!(log.all_logs().iter().any(|r| r.level == LogLevel::Error));

    let err = client.test_connection().await.unwrap_err();
    assert!(matches!(err, TransferError::DestinationConnection { .. }));
}

#[tokio::test]
async fn test_connection_check_status_handling() -> Result<()> {
    let server = MockServer::start();
    let check = server.mock(|when, then| {
        when.method(GET).path("/api/");
        then.status(200);
    });
    let (client, _) = new_client(
        DestinationConfig::new(server.url("/api"), "media").with_token(AuthMode::ApiKey, "k"),
    );
    assert!(client.test_connection().await?);
    check.assert();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(401);
    });
    let (client, log) = new_client(
        DestinationConfig::new(server.base_url(), "media").with_token(AuthMode::ApiKey, "k"),
    );
    assert!(!client.test_connection().await?);
    assert!(log.all_logs().iter().any(|r| r.level == LogLevel::Warning));
    Ok(())
}

#[tokio::test]
async fn test_stop_does_not_abort_request_in_flight() -> Result<()> {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST).path("/media/1");
        then.status(200).delay(Duration::from_millis(500));
    });
    let (client, _) = new_client(
        DestinationConfig::new(server.base_url(), "media").with_token(AuthMode::Bearer, "t"),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let uploaded = client
        .upload_media("1", "a.jpg", "data:image/jpeg;base64,", "", &cancel)
        .await?;
    assert!(uploaded);
    assert!(cancel.is_cancelled());
    upload.assert();
    Ok(())
}

#[tokio::test]
async fn test_already_cancelled_upload_is_not_sent() {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });
    let (client, _) = new_client(
        DestinationConfig::new(server.base_url(), "media").with_token(AuthMode::Bearer, "t"),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client
        .upload_media("1", "a.jpg", "data:image/jpeg;base64,", "", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Cancelled));
    upload.assert_hits(0);
}

#[tokio::test]
async fn test_request_timeout_surfaces_as_connection_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/media/1");
        then.status(200).delay(Duration::from_secs(3));
    });

    let mut config =
        DestinationConfig::new(server.base_url(), "media").with_token(AuthMode::Bearer, "t");
    config.timeout_seconds = Some(1);
    let (client, _) = new_client(config);

    let err = client
        .upload_media("1", "a.jpg", "data:image/jpeg;base64,", "", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::DestinationConnection { .. }));
}

#[tokio::test]
async fn test_reconfigure_switches_target() -> Result<()> {
    let first = MockServer::start();
    let second = MockServer::start();
    let old = first.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });
    let new = second.mock(|when, then| {
        when.method(POST)
            .path("/v2/items/3")
            .header("x-api-key", "fresh");
        then.status(200);
    });

    let (mut client, _) = new_client(
        DestinationConfig::new(first.base_url(), "media").with_token(AuthMode::Bearer, "t"),
    );
    client.configure(
        DestinationConfig::new(second.url("/v2"), "items/{categoryId}")
            .with_token(AuthMode::ApiKey, "fresh"),
    )?;

    assert!(
        client
            .upload_media("3", "a.jpg", "data:image/jpeg;base64,", "", &CancellationToken::new())
            .await?
    );
    new.assert();
    old.assert_hits(0);

    let bad = DestinationConfig::new(second.base_url(), "media").with_token(AuthMode::Bearer, "");
    assert!(matches!(
        client.configure(bad),
        Err(TransferError::Configuration { .. })
    ));
    assert_eq!(client.config().auth_mode, AuthMode::ApiKey);
    Ok(())
}

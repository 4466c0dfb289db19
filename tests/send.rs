#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

mod common;

use botcircuits_client_sdk::error::{Kind, Method, Status, StatusCode};
use botcircuits_client_sdk::session::types::request::Envelope;
use botcircuits_client_sdk::session::{Button, Client, ConnectionStatus, OutboundRequest};
use httpmock::MockServer;
use serde_json::{Value, json};

use crate::common::{API_KEY, APP_ID, SESSION_ID, config};

const PUBLISH: &str = "mutation Publish($data: AWSJSON!, $appId: String!, $sessionId: String!) { sendUserMessage(data: $data, appId: $appId, sessionId: $sessionId) { data appId sessionId } }";

fn client(server: &MockServer) -> anyhow::Result<Client> {
    Ok(Client::with_session_id(
        config(&server.address().to_string()),
        SESSION_ID,
    )?)
}

/// Expected request body; the envelope travels as a JSON string.
fn publish_body(request: &OutboundRequest) -> Value {
    let envelope = Envelope::new(APP_ID, SESSION_ID, request);

    json!({
        "query": PUBLISH,
        "variables": {
            "data": serde_json::to_string(&envelope).unwrap(),
            "appId": APP_ID,
            "sessionId": SESSION_ID
        }
    })
}

#[tokio::test]
async fn text_message_should_post_envelope() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server)?;
    let request = OutboundRequest::text("Hello");

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/graphql")
            .header("Authorization", API_KEY)
            .header("Content-Type", "application/json")
            .json_body(publish_body(&request));
        then.status(StatusCode::OK).json_body(json!({
            "data": {
                "sendUserMessage": { "data": "{}", "appId": APP_ID, "sessionId": SESSION_ID }
            }
        }));
    });

    client.send_message(&request).await?;

    mock.assert();
    Ok(())
}

#[tokio::test]
async fn button_message_should_select_payload() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server)?;

    let button = Button::builder()
        .action_type("postback")
        .title("Say hi")
        .payload("hi")
        .build();
    let request = OutboundRequest::button(&button);
    assert_eq!(
        serde_json::to_value(Envelope::new(APP_ID, SESSION_ID, &request))?,
        json!({
            "action": "executor",
            "appId": APP_ID,
            "sessionId": SESSION_ID,
            "inputText": "hi",
            "requestAttributes": { "selected_button": "hi" }
        })
    );

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/graphql")
            .json_body(publish_body(&request));
        then.status(StatusCode::OK).json_body(json!({ "data": null }));
    });

    client.send_message(&request).await?;

    mock.assert();
    Ok(())
}

#[tokio::test]
async fn empty_request_should_omit_optional_fields() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server)?;

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST)
            .path("/graphql")
            .json_body(publish_body(&OutboundRequest::default()));
        then.status(StatusCode::OK);
    });

    client.send_message(&OutboundRequest::default()).await?;

    mock.assert();
    Ok(())
}

#[tokio::test]
async fn server_error_should_surface_status_and_body() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server)?;

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/graphql");
        then.status(StatusCode::INTERNAL_SERVER_ERROR)
            .body("server error");
    });

    let err = client
        .send_message(&OutboundRequest::text("Hello"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Kind::Status);
    assert_eq!(err.status_code(), Some(StatusCode::INTERNAL_SERVER_ERROR));

    let status = err.downcast_ref::<Status>().unwrap();
    assert_eq!(status.method, Method::POST);
    assert_eq!(status.path, "/graphql");
    assert!(status.message.contains("server error"));
    assert_eq!(
        status.to_string(),
        "HTTP 500 making POST call to /graphql - server error"
    );

    mock.assert();
    Ok(())
}

#[tokio::test]
async fn graphql_errors_should_not_fail_send() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server)?;

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/graphql");
        then.status(StatusCode::OK).json_body(json!({
            "data": null,
            "errors": [{ "message": "Validation error of type FieldUndefined" }]
        }));
    });

    client.send_message(&OutboundRequest::text("Hello")).await?;

    mock.assert();
    Ok(())
}

#[tokio::test]
async fn non_json_success_body_should_be_ignored() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server)?;

    let mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/graphql");
        then.status(StatusCode::OK).body("accepted");
    });

    client.send_message(&OutboundRequest::text("Hello")).await?;

    mock.assert();
    Ok(())
}

#[tokio::test]
async fn unreachable_host_should_be_transport_error() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let host = listener.local_addr()?.to_string();
    drop(listener);

    let client = Client::with_session_id(config(&host), SESSION_ID)?;
    let err = client
        .send_message(&OutboundRequest::text("Hello"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Kind::Transport);
    assert_eq!(err.status_code(), None);
    Ok(())
}

#[tokio::test]
async fn send_should_not_touch_connection_status() -> anyhow::Result<()> {
    let server = MockServer::start();
    let client = client(&server)?;

    server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/graphql");
        then.status(StatusCode::OK).json_body(json!({}));
    });

    client.send_message(&OutboundRequest::text("Hello")).await?;

    assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
    Ok(())
}

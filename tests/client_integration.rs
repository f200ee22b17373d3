// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MobileLink client using wiremock.

use genwatch_lib::client::{DeviceApi, MobileLinkConfig, SessionToken};
use genwatch_lib::error::ClientError;
use genwatch_lib::state::DeviceStatus;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> genwatch_lib::client::MobileLinkClient {
    MobileLinkConfig::new()
        .with_base_url(server.uri())
        .into_client()
        .unwrap()
}

fn token() -> SessionToken {
    SessionToken::new("session=abc123")
}

#[tokio::test]
async fn list_returns_monitored_device_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/Apparatus/list"))
        .and(header("Cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"apparatusId": 12345, "type": 0, "name": "Backup Generator"},
            {"apparatusId": 67890, "type": 2, "name": "Propane Tank"},
            {"apparatusId": 99999, "type": 7, "name": "Thermostat"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let ids = client.list_device_ids(&token()).await.unwrap();

    // The thermostat's apparatus type is not monitored
    assert_eq!(ids, ["12345", "67890"]);
}

#[tokio::test]
async fn list_with_no_content_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/Apparatus/list"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let ids = client.list_device_ids(&token()).await.unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn unauthorized_maps_to_session_expired() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/Apparatus/list"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_device_ids(&token()).await.unwrap_err();

    assert!(matches!(err, ClientError::SessionExpired { status: 401 }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn fetch_builds_a_full_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/Apparatus/details/12345"))
        .and(header("Cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Backup Generator",
            "serialNumber": "G123456",
            "type": 0,
            "apparatusStatus": 2,
            "isConnected": true,
            "maintenanceAlerts": ["M042"],
            "warnings": ["W100"],
            "properties": [
                {"type": 70, "value": "13.2"},
                {"type": 3, "value": 42}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let snapshot = client.fetch_snapshot(&token(), "12345").await.unwrap();

    assert_eq!(snapshot.device_id, "12345");
    assert_eq!(snapshot.display_name, "Backup Generator");
    assert_eq!(snapshot.serial_number.as_deref(), Some("G123456"));
    assert_eq!(snapshot.status, DeviceStatus::Running);
    assert!(snapshot.connected);
    assert_eq!(snapshot.battery_voltage, Some(13.2));
    assert!(snapshot.maintenance_alerts.contains("M042"));
    assert!(snapshot.warnings.contains("W100"));
}

#[tokio::test]
async fn missing_device_maps_to_device_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/Apparatus/details/404404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.fetch_snapshot(&token(), "404404").await.unwrap_err();

    assert!(matches!(err, ClientError::DeviceNotFound(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/Apparatus/details/12345"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.fetch_snapshot(&token(), "12345").await.unwrap_err();

    assert!(matches!(err, ClientError::Upstream { status: 503 }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn malformed_payload_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/Apparatus/details/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.fetch_snapshot(&token(), "12345").await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}

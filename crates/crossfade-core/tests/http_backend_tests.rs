//! Wire-level tests for the HTTP backend.

use std::time::Duration;

use crossfade_core::api::{Backend, Credentials, HttpBackend, TransferRequest};
use crossfade_core::catalog::{Collection, CollectionKind};
use crossfade_core::error::Error;
use crossfade_core::service::ServiceId;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn liked_songs() -> Collection {
    Collection {
        id: "liked".into(),
        name: "Liked Songs".to_string(),
        item_count: 120,
        kind: CollectionKind::Favorites,
        owning_service: "spotify".into(),
    }
}

#[tokio::test]
async fn auth_status_decodes_flags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"spotify": true, "tidal": false, "qobuz": false})),
        )
        .mount(&server)
        .await;

    let status = backend(&server).await.auth_status().await.unwrap();

    assert_eq!(status.get(&ServiceId::from("spotify")), Some(&true));
    assert_eq!(status.get(&ServiceId::from("tidal")), Some(&false));
    assert_eq!(status.len(), 3);
}

#[tokio::test]
async fn playlists_are_tagged_with_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tidal/playlists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "playlists": [
                {"id": "a1", "name": "Focus", "tracks": 12},
                {"id": "fav", "name": "My Collection", "tracks": 80, "type": "liked"}
            ]
        })))
        .mount(&server)
        .await;

    let listing = backend(&server)
        .await
        .list_collections(&"tidal".into())
        .await
        .unwrap();

    assert_eq!(listing.len(), 2);
    assert!(listing.iter().all(|c| c.owning_service.as_str() == "tidal"));
    assert_eq!(listing[1].kind, CollectionKind::Favorites);
}

#[tokio::test]
async fn oauth_start_returns_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/spotify"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "https://accounts.spotify.com/authorize?state=xyz"),
        )
        .mount(&server)
        .await;

    let url = backend(&server)
        .await
        .begin_oauth(&"spotify".into())
        .await
        .unwrap();

    assert_eq!(url, "https://accounts.spotify.com/authorize?state=xyz");
}

#[tokio::test]
async fn credential_login_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/qobuz/login"))
        .and(body_json(json!({"email": "me@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials {
        email: "me@example.com".to_string(),
        password: "pw".to_string(),
    };
    backend(&server)
        .await
        .credential_login(&"qobuz".into(), &credentials)
        .await
        .unwrap();
}

#[tokio::test]
async fn credential_login_failure_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/qobuz/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"success": false, "error": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let credentials = Credentials {
        email: "me@example.com".to_string(),
        password: "wrong".to_string(),
    };
    let err = backend(&server)
        .await
        .credential_login(&"qobuz".into(), &credentials)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Invalid credentials");
}

#[tokio::test]
async fn credential_login_without_message_uses_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/qobuz/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let credentials = Credentials {
        email: "me@example.com".to_string(),
        password: "pw".to_string(),
    };
    let err = backend(&server)
        .await
        .credential_login(&"qobuz".into(), &credentials)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::LoginFailed { ref message, .. } if message == "Login failed"));
}

#[tokio::test]
async fn submit_sends_wire_kind_and_decodes_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transfer"))
        .and(body_json(json!({
            "playlist_id": "liked",
            "playlist_type": "liked",
            "target_service": "tidal"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracks_added": 117,
            "total_tracks": 120,
            "tracks_not_found": ["A - B", "C - D", "E - F"]
        })))
        .mount(&server)
        .await;

    let summary = backend(&server)
        .await
        .submit_transfer(&TransferRequest::new(&liked_songs(), &"tidal".into()))
        .await
        .unwrap();

    assert_eq!(summary.items_transferred, 117);
    assert_eq!(summary.items_total, 120);
    assert_eq!(summary.unmatched.count, 3);
}

#[tokio::test]
async fn submit_rejection_keeps_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transfer"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Tidal session expired"})),
        )
        .mount(&server)
        .await;

    let err = backend(&server)
        .await
        .submit_transfer(&TransferRequest::new(&liked_songs(), &"tidal".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RemoteRejection { status: 400, .. }));
    assert_eq!(err.user_message(), "Tidal session expired");
}

#[tokio::test]
async fn rejection_without_body_names_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/disconnect/tidal"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = backend(&server)
        .await
        .disconnect(&"tidal".into())
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "server returned 503 Service Unavailable");
}

#[tokio::test]
async fn submit_timeout_applies_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transfer"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"tracks_added": 1, "total_tracks": 1}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = backend(&server)
        .await
        .with_submit_timeout(Some(Duration::from_secs(1)))
        .submit_transfer(&TransferRequest::new(&liked_songs(), &"tidal".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(1)));
}

#[tokio::test]
async fn progress_is_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transfer-progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"progress": 104.5})))
        .mount(&server)
        .await;

    let progress = backend(&server).await.transfer_progress().await.unwrap();
    assert!((progress - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn version_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"tag": "v1.4.0", "hash": "9f2c1e7"})),
        )
        .mount(&server)
        .await;

    let version = backend(&server).await.version().await.unwrap();
    assert_eq!(version.tag, "v1.4.0");
    assert_eq!(version.hash, "9f2c1e7");
}

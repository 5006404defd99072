//! AJAX upload integration tests.
//!
//! Run with: `cargo test -p ibc-api --test upload_test`

mod helpers;

use helpers::{
    asset_data, bearer, session_cookie, setup_test_app, setup_test_app_with, upload_body,
    TEST_ACCESS_KEY, UPLOADS_URL,
};
use ibc_api::constants::{CLIENT_CONFIG_PATH, HEALTH_PATH, NONCE_HEADER, UPLOAD_PATH};
use ibc_api::ResponseEnvelope;
use ibc_infra::{NonceService, SESSION_COOKIE, UPLOAD_NONCE_ACTION};
use serde_json::{json, Value};

#[tokio::test]
async fn test_upload_asset() {
    let mut app = setup_test_app().await;
    let mock = app.serve_asset("/files/hero.jpg", b"jpeg-bytes").await;
    let body = upload_body(&app.nonce(), asset_data(&app.dam_url("/files/hero.jpg")));

    let response = app.upload().json(&body).await;

    mock.assert_async().await;
    assert_eq!(response.status_code(), 200);
    let envelope: ResponseEnvelope = response.json();
    assert!(envelope.success, "unexpected failure: {}", envelope.message);
    assert_eq!(envelope.message, "Done");

    let data = envelope.data.expect("attachment data");
    assert_eq!(data["filename"], "hero.jpg");
    assert_eq!(data["alt"], "Spring hero");
    assert_eq!(data["description"], "Spring hero");
    assert_eq!(data["caption"], "Spring hero");
    assert_eq!(data["assetType"], "image");
    assert_eq!(data["filesizeInBytes"], 10);

    let url = data["url"].as_str().unwrap();
    assert!(url.starts_with(UPLOADS_URL));
    let served = app
        .client()
        .get(&format!("/uploads{}", &url[UPLOADS_URL.len()..]))
        .await;
    assert_eq!(served.status_code(), 200);
    assert_eq!(&served.as_bytes()[..], b"jpeg-bytes");

    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_upload_writes_one_log_block() {
    let mut app = setup_test_app().await;
    let _mock = app.serve_asset("/hero.jpg", b"jpeg-bytes").await;
    let body = upload_body(&app.nonce(), asset_data(&app.dam_url("/hero.jpg")));

    app.upload().json(&body).await;

    let log = app.log_contents();
    assert_eq!(log.matches("Process launched: ").count(), 1);
    assert_eq!(log.matches("] Done").count(), 1);
    let uploading = log.find("] Uploading asset...").unwrap();
    let downloading = log.find("] Downloading...").unwrap();
    let downloaded = log.find("] Downloaded").unwrap();
    assert!(uploading < downloading && downloading < downloaded);
}

#[tokio::test]
async fn test_description_used_for_attachment_text() {
    let mut app = setup_test_app().await;
    let _mock = app.serve_asset("/hero.jpg", b"jpeg-bytes").await;
    let mut data = asset_data(&app.dam_url("/hero.jpg"));
    data["description"] = json!("<b>Hero</b> banner <script>alert(1)</script>");

    let response = app
        .upload()
        .json(&upload_body(&app.nonce(), data))
        .await;

    let envelope: ResponseEnvelope = response.json();
    let data = envelope.data.unwrap();
    assert_eq!(data["alt"], "Hero banner");
    assert_eq!(data["description"], "Hero banner");
}

#[tokio::test]
async fn test_resubmission_creates_new_attachment() {
    let mut app = setup_test_app().await;
    let mock = app
        .dam
        .mock("GET", "/hero.jpg")
        .with_status(200)
        .with_body("jpeg-bytes")
        .expect(2)
        .create_async()
        .await;
    let body = upload_body(&app.nonce(), asset_data(&app.dam_url("/hero.jpg")));

    let first: ResponseEnvelope = app.upload().json(&body).await.json();
    let second: ResponseEnvelope = app.upload().json(&body).await.json();

    mock.assert_async().await;
    let first = first.data.unwrap();
    let second = second.data.unwrap();
    assert_ne!(first["id"], second["id"]);
    assert_eq!(second["filename"], "hero-1.jpg");
}

#[tokio::test]
async fn test_legacy_token_sent_as_cookie() {
    let mut app = setup_test_app().await;
    let mock = app
        .dam
        .mock("GET", "/legacy.jpg")
        .match_header("cookie", "_aid=old-session")
        .with_status(200)
        .with_body("jpeg-bytes")
        .create_async()
        .await;
    let mut data = asset_data(&app.dam_url("/legacy.jpg"));
    data["_aid"] = json!("old-session");

    let envelope: ResponseEnvelope = app
        .upload()
        .json(&upload_body(&app.nonce(), data))
        .await
        .json();

    mock.assert_async().await;
    assert!(envelope.success);
}

#[tokio::test]
async fn test_non_numeric_filesize_is_accepted() {
    let mut app = setup_test_app().await;
    let _mock = app.serve_asset("/hero.jpg", b"jpeg-bytes").await;
    let mut data = asset_data(&app.dam_url("/hero.jpg"));
    data["filesize"] = json!("123abc");

    let envelope: ResponseEnvelope = app
        .upload()
        .json(&upload_body(&app.nonce(), data))
        .await
        .json();

    assert!(envelope.success);
}

#[tokio::test]
async fn test_download_not_found() {
    let mut app = setup_test_app().await;
    let _mock = app
        .dam
        .mock("GET", "/gone.jpg")
        .with_status(404)
        .create_async()
        .await;
    let body = upload_body(&app.nonce(), asset_data(&app.dam_url("/gone.jpg")));

    let response = app.upload().json(&body).await;

    assert_eq!(response.status_code(), 200);
    let envelope: ResponseEnvelope = response.json();
    assert_eq!(envelope, ResponseEnvelope::error("Download error: Not Found"));
    assert_eq!(app.staged_files(), 0);
    assert!(app
        .log_contents()
        .contains("] Error: Download error: Not Found"));
}

#[tokio::test]
async fn test_wrong_nonce() {
    let app = setup_test_app().await;
    let body = upload_body("0000000000", asset_data("https://dam.example.com/a.jpg"));

    let envelope: ResponseEnvelope = app.upload().json(&body).await.json();

    assert_eq!(envelope, ResponseEnvelope::error("Wrong nonce"));
    let log = app.log_contents();
    assert!(log.contains("] Error: Wrong nonce"));
    assert!(!log.contains("Downloading..."));
}

#[tokio::test]
async fn test_nonce_from_header() {
    let mut app = setup_test_app().await;
    let _mock = app.serve_asset("/hero.jpg", b"jpeg-bytes").await;
    let body = json!({ "data": asset_data(&app.dam_url("/hero.jpg")) });

    let envelope: ResponseEnvelope = app
        .upload()
        .add_header(NONCE_HEADER, app.nonce())
        .json(&body)
        .await
        .json();

    assert!(envelope.success);
}

#[tokio::test]
async fn test_missing_data() {
    let app = setup_test_app().await;
    let body = json!({ "_ajax_nonce": app.nonce() });

    let envelope: ResponseEnvelope = app.upload().json(&body).await.json();

    assert_eq!(envelope, ResponseEnvelope::error("Missing data in POST"));
}

#[tokio::test]
async fn test_unparsable_body() {
    let app = setup_test_app().await;

    let response = app.upload().text("data=oops").await;

    assert_eq!(response.status_code(), 200);
    let envelope: ResponseEnvelope = response.json();
    assert_eq!(envelope, ResponseEnvelope::error("Wrong nonce"));
}

#[tokio::test]
async fn test_missing_required_field() {
    let app = setup_test_app().await;
    let mut data = asset_data(&app.dam_url("/hero.jpg"));
    data.as_object_mut().unwrap().remove("name");

    let envelope: ResponseEnvelope = app
        .upload()
        .json(&upload_body(&app.nonce(), data))
        .await
        .json();

    assert_eq!(envelope, ResponseEnvelope::error("Field \"name\" is required"));
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_disallowed_file_type() {
    let mut app = setup_test_app().await;
    let _mock = app.serve_asset("/tool.exe", b"MZ").await;
    let mut data = asset_data(&app.dam_url("/tool.exe"));
    data["filename"] = json!("tool.exe");

    let envelope: ResponseEnvelope = app
        .upload()
        .json(&upload_body(&app.nonce(), data))
        .await
        .json();

    assert_eq!(
        envelope.message,
        "Upload error: Sorry, you are not allowed to upload this file type."
    );
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn test_log_disabled_writes_nothing() {
    let mut app = setup_test_app_with(|config| config.log_enabled = false).await;
    let _mock = app.serve_asset("/hero.jpg", b"jpeg-bytes").await;
    let body = upload_body(&app.nonce(), asset_data(&app.dam_url("/hero.jpg")));

    let envelope: ResponseEnvelope = app.upload().json(&body).await.json();

    assert!(envelope.success);
    assert!(!app.state.config.log_file_path().exists());
}

/// Session id from a `Set-Cookie` header value
fn issued_session(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix(&format!("{}=", SESSION_COOKIE)))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_client_config() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(CLIENT_CONFIG_PATH)
        .add_header("authorization", bearer(TEST_ACCESS_KEY))
        .await;

    assert_eq!(response.status_code(), 200);
    let set_cookie = response.header("set-cookie").to_str().unwrap().to_string();
    assert!(set_cookie.contains("; SameSite=Strict"));
    assert!(set_cookie.contains("; HttpOnly"));
    let session = issued_session(&set_cookie);
    assert!(NonceService::is_session_id(&session));

    let config: Value = response.json();
    assert_eq!(config["url"], "https://dam.example.com");
    assert_eq!(config["log"], true);
    let nonce = config["nonce"].as_str().unwrap();
    assert!(app.state.nonces.verify(UPLOAD_NONCE_ACTION, &session, nonce));
}

#[tokio::test]
async fn test_client_config_requires_access_key() {
    let app = setup_test_app().await;

    let anonymous = app.client().get(CLIENT_CONFIG_PATH).await;
    assert_eq!(anonymous.status_code(), 401);
    assert!(anonymous.maybe_header("set-cookie").is_none());
    let body: Value = anonymous.json();
    assert!(body.get("nonce").is_none());

    let wrong = app
        .client()
        .get(CLIENT_CONFIG_PATH)
        .add_header("authorization", bearer("not-the-access-key-but-just-as-long!!"))
        .await;
    assert_eq!(wrong.status_code(), 401);
}

#[tokio::test]
async fn test_client_config_keeps_existing_session() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(CLIENT_CONFIG_PATH)
        .add_header("authorization", bearer(TEST_ACCESS_KEY))
        .add_header("cookie", session_cookie(&app.session))
        .await;

    let set_cookie = response.header("set-cookie").to_str().unwrap().to_string();
    assert_eq!(issued_session(&set_cookie), app.session);
    let config: Value = response.json();
    let nonce = config["nonce"].as_str().unwrap();
    assert!(app
        .state
        .nonces
        .verify(UPLOAD_NONCE_ACTION, &app.session, nonce));
}

#[tokio::test]
async fn test_config_then_upload() {
    let mut app = setup_test_app().await;
    let mock = app.serve_asset("/hero.jpg", b"jpeg-bytes").await;

    let response = app
        .client()
        .get(CLIENT_CONFIG_PATH)
        .add_header("authorization", bearer(TEST_ACCESS_KEY))
        .await;
    let session = issued_session(response.header("set-cookie").to_str().unwrap());
    let config: Value = response.json();
    let nonce = config["nonce"].as_str().unwrap();

    let envelope: ResponseEnvelope = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("cookie", session_cookie(&session))
        .json(&upload_body(nonce, asset_data(&app.dam_url("/hero.jpg"))))
        .await
        .json();

    mock.assert_async().await;
    assert!(envelope.success, "unexpected failure: {}", envelope.message);
}

#[tokio::test]
async fn test_nonce_without_session_cookie_rejected() {
    let mut app = setup_test_app().await;
    let mock = app
        .dam
        .mock("GET", "/hero.jpg")
        .expect(0)
        .create_async()
        .await;
    let body = upload_body(&app.nonce(), asset_data(&app.dam_url("/hero.jpg")));

    // a cross-site form post: the SameSite=Strict cookie is not sent
    let envelope: ResponseEnvelope = app.client().post(UPLOAD_PATH).json(&body).await.json();

    assert_eq!(envelope, ResponseEnvelope::error("Wrong nonce"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_nonce_from_another_session_rejected() {
    let mut app = setup_test_app().await;
    let mock = app
        .dam
        .mock("GET", "/hero.jpg")
        .expect(0)
        .create_async()
        .await;
    let body = upload_body(&app.nonce(), asset_data(&app.dam_url("/hero.jpg")));

    let envelope: ResponseEnvelope = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("cookie", session_cookie(&NonceService::new_session()))
        .json(&body)
        .await
        .json();

    assert_eq!(envelope, ResponseEnvelope::error("Wrong nonce"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_loopback_asset_url_refused() {
    let mut app = setup_test_app_with(|config| {
        config.download_allowed_hosts = None;
        config.download_allow_private = false;
    })
    .await;
    let mock = app
        .dam
        .mock("GET", "/secret.jpg")
        .with_status(200)
        .with_body("internal-bytes")
        .expect(0)
        .create_async()
        .await;
    let body = upload_body(&app.nonce(), asset_data(&app.dam_url("/secret.jpg")));

    let envelope: ResponseEnvelope = app.upload().json(&body).await.json();

    mock.assert_async().await;
    assert!(!envelope.success);
    assert!(
        envelope
            .message
            .contains("Private/internal IP addresses are not allowed"),
        "{}",
        envelope.message
    );
    assert_eq!(app.staged_files(), 0);

    let uploads = app.state.config.uploads_dir.clone();
    let stored: Vec<_> = std::fs::read_dir(&uploads)
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .filter(|name| name != "ibc")
        .collect();
    assert!(stored.is_empty(), "{:?}", stored);
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;

    let response = app.client().get(HEALTH_PATH).await;

    assert_eq!(response.status_code(), 200);
    let health: Value = response.json();
    assert_eq!(health["status"], "healthy");
}

//! Replication client tests against an in-process stub upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};

use signet_keystore::auth_key;
use signet_sync::{FactoryClient, SyncError};
use signet_vault::config::SyncConfig;
use signet_vault::storage::VaultDatabase;

/// Counts keypair requests so each sync returns freshly re-sealed material.
#[derive(Clone, Default)]
struct StubState {
    keypair_requests: Arc<AtomicUsize>,
}

async fn stub_accounts() -> Json<Value> {
    Json(json!({
        "success": true,
        "accounts": [
            {"authority-id": "acme", "assertion": "account-assertion-acme"}
        ]
    }))
}

async fn stub_keypairs(State(state): State<StubState>, Json(body): Json<Value>) -> Json<Value> {
    assert!(body["secret"].is_string(), "request must carry the secret");
    let n = state.keypair_requests.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "success": true,
        "keypairs": [
            {
                "authority-id": "acme",
                "key-id": "kid-1",
                "sealed-key": STANDARD.encode(format!("sealed-{n}")),
                "auth-key-hash": "hash-1"
            }
        ]
    }))
}

async fn stub_models() -> Json<Value> {
    Json(json!({
        "success": true,
        "models": [
            {
                "brand-id": "acme",
                "model": "rpi",
                "api-key": "key-1",
                "authority-id": "acme",
                "key-id": "kid-1",
                "key-active": true
            }
        ]
    }))
}

async fn stub_signinglog(Json(body): Json<Value>) -> Json<Value> {
    if body["serial"] == "SN-FAIL" {
        Json(json!({"success": false, "message": "rejected"}))
    } else {
        Json(json!({"success": true}))
    }
}

async fn stub_testlog() -> Json<Value> {
    Json(json!({"success": true}))
}

/// Start the stub upstream on an ephemeral port; returns its base URL.
async fn start_stub() -> String {
    let app = Router::new()
        .route("/accounts", get(stub_accounts))
        .route("/keypairs", post(stub_keypairs))
        .route("/models", get(stub_models))
        .route("/signinglog", post(stub_signinglog))
        .route("/testlog", post(stub_testlog))
        .with_state(StubState::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn test_client() -> (FactoryClient, VaultDatabase) {
    let base_url = start_stub().await;
    let client = FactoryClient::new(&SyncConfig {
        upstream_url: base_url,
        username: "factory1".into(),
        api_key: "sync-key".into(),
        timeout_secs: 5,
        interval_secs: 1,
    })
    .unwrap();
    let db = VaultDatabase::open_in_memory().await.unwrap();
    (client, db)
}

#[tokio::test]
async fn missing_sync_configuration_is_rejected() {
    let err = FactoryClient::new(&SyncConfig::default()).unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));
}

#[tokio::test]
async fn accounts_replication_is_idempotent() {
    let (client, db) = test_client().await;

    client.accounts(&db).await.unwrap();
    client.accounts(&db).await.unwrap();

    assert_eq!(db.count_accounts().await.unwrap(), 1);
    let account = db.get_account("acme").await.unwrap();
    assert_eq!(account.assertion_text, "account-assertion-acme");
}

#[tokio::test]
async fn signing_keys_preserve_the_first_sync_sealing() {
    let (client, db) = test_client().await;

    client.signing_keys(&db, "factory-secret").await.unwrap();
    // The upstream re-seals on every call; the second sweep must skip the
    // keypair so the material recorded at first sync survives.
    client.signing_keys(&db, "factory-secret").await.unwrap();

    let keypair = db.get_keypair("acme", "kid-1").await.unwrap();
    assert_eq!(keypair.sealed_material, b"sealed-1");
    assert_eq!(keypair.auth_key_hash, "hash-1");

    let setting = db.get_setting(&auth_key("acme", "kid-1")).await.unwrap();
    assert_eq!(setting.data, "hash-1");
}

#[tokio::test]
async fn models_replication_is_idempotent() {
    let (client, db) = test_client().await;

    client.models(&db).await.unwrap();
    client.models(&db).await.unwrap();

    let model = db.find_model("acme", "rpi", "key-1").await.unwrap().unwrap();
    assert_eq!(model.key_id, "kid-1");

    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM models")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 1);
}

#[tokio::test]
async fn signing_log_upload_marks_synced_and_retries_failures() {
    let (client, db) = test_client().await;
    db.create_signing_log("acme", "rpi", "SN1", 1, "fp-1")
        .await
        .unwrap();
    db.create_signing_log("acme", "rpi", "SN-FAIL", 1, "fp-1")
        .await
        .unwrap();

    client.signing_logs(&db).await.unwrap();

    // The rejected entry stays unsynced for the next sweep.
    let unsynced = db.unsynced_signing_logs().await.unwrap();
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].serial, "SN-FAIL");
}

#[tokio::test]
async fn test_logs_are_deleted_after_upload() {
    let (client, db) = test_client().await;
    db.create_test_log("acme", "rpi", "run-1.log", "cGFzcw==")
        .await
        .unwrap();

    client.test_logs(&db).await.unwrap();

    assert!(db.list_test_logs().await.unwrap().is_empty());
}

//! Drives a Step Controller through the real HTTP API.
//!
//! The API router is served on a local socket over the in-memory record
//! store; the controller talks to it through [`RestBackend`].

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use bistro_api::auth::jwt::{generate_access_token, JwtConfig};
use bistro_api::config::ServerConfig;
use bistro_api::router::build_app_router;
use bistro_api::state::AppState;
use bistro_client::{ClientConfig, RestBackend};
use bistro_core::autosave::AutoSaveConfig;
use bistro_core::backend::WizardBackend;
use bistro_core::error::CoreError;
use bistro_core::navigation::WizardPosition;
use bistro_core::roles::ROLE_SALES;
use bistro_core::slices::SliceName;
use bistro_core::status::OnboardingStatus;
use bistro_core::store::{InMemoryRecordStore, RecordStore};
use bistro_core::submit::{NoopNotifier, SubmitGuard};
use bistro_core::types::JsonMap;
use bistro_core::wizard::StepController;
use bistro_events::EventBus;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Server {
    base_url: String,
    store: Arc<InMemoryRecordStore>,
    jwt: JwtConfig,
}

async fn serve() -> Server {
    let store = Arc::new(InMemoryRecordStore::new());
    let dyn_store: Arc<dyn RecordStore> = store.clone();
    let jwt = JwtConfig {
        secret: "bistro-client-test-secret".to_string(),
        access_token_expiry_mins: 15,
    };
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: jwt.clone(),
    };
    let state = AppState {
        store: Arc::clone(&dyn_store),
        config: Arc::new(config.clone()),
        submit_guard: SubmitGuard::new(dyn_store, Arc::new(NoopNotifier)),
        event_bus: Arc::new(EventBus::default()),
    };
    let app = build_app_router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        base_url: format!("http://{addr}"),
        store,
        jwt,
    }
}

fn client(server: &Server, user_id: i64) -> RestBackend {
    let token = generate_access_token(user_id, ROLE_SALES, &server.jwt).unwrap();
    RestBackend::new(&ClientConfig::new(&server.base_url, token)).unwrap()
}

fn fast_autosave() -> AutoSaveConfig {
    AutoSaveConfig {
        debounce: Duration::from_millis(20),
        ..AutoSaveConfig::default()
    }
}

fn map(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap()
}

fn step_data(step: u8) -> JsonMap {
    map(match step {
        1 => json!({ "name": "Bella Napoli", "street": "Via Roma 1", "zipCode": "80100", "city": "Napoli" }),
        2 => json!({ "firstName": "Gina", "lastName": "Russo", "email": "gina@bellanapoli.it", "phone": "+39 081 123" }),
        3 => json!({ "legalName": "Bella Napoli S.r.l.", "taxId": "IT0123456789", "iban": "IT60X0542811101000000123456" }),
        4 => json!({ "hasWifi": true }),
        5 => json!({ "indoorTables": 12 }),
        6 => json!({ "categories": ["Pizza", "Dolci"] }),
        _ => json!({ "signatoryName": "Gina Russo", "signature": "G. Russo", "acceptedTerms": true }),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_wizard_over_http() {
    let server = serve().await;
    let rest = client(&server, 21);
    let record = rest.create().await.unwrap();
    let backend: Arc<dyn WizardBackend> = Arc::new(rest);

    let mut controller =
        StepController::enter(backend.clone(), record.id, WizardPosition::first(), fast_autosave())
            .await
            .unwrap();

    for step in 1..=7 {
        controller.update(step_data(step)).unwrap();
        controller.advance().await.unwrap();
    }
    assert_eq!(controller.position(), WizardPosition::Summary);
    assert_eq!(
        controller.record().slice(SliceName::Menu)["categories"],
        json!(["Pizza", "Dolci"])
    );

    let submitted = controller.submit().await.unwrap();
    assert_eq!(submitted.status, OnboardingStatus::Submitted);

    let stored = server.store.find_by_id(record.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OnboardingStatus::Submitted);
    assert_eq!(stored.furthest_step, WizardPosition::Summary.ordinal());
    assert_eq!(stored.slice(SliceName::RestaurantInfo)["city"], "Napoli");
    assert_eq!(stored.slice(SliceName::Contact)["email"], "gina@bellanapoli.it");

    assert_matches!(
        backend.submit(record.id).await,
        Err(CoreError::AlreadySubmitted { id }) if id == record.id
    );
}

#[tokio::test]
async fn autosave_lands_after_the_debounce() {
    let server = serve().await;
    let rest = client(&server, 22);
    let record = rest.create().await.unwrap();

    let controller = StepController::enter(
        Arc::new(rest),
        record.id,
        WizardPosition::first(),
        fast_autosave(),
    )
    .await
    .unwrap();
    controller.update(map(json!({ "name": "Trattoria" }))).unwrap();
    controller.update(map(json!({ "city": "Roma" }))).unwrap();

    let mut saved = None;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stored = server.store.find_by_id(record.id).await.unwrap().unwrap();
        if stored.slice(SliceName::RestaurantInfo).contains_key("city") {
            saved = Some(stored);
            break;
        }
    }
    let stored = saved.expect("auto-save never reached the server");
    assert_eq!(stored.slice(SliceName::RestaurantInfo)["name"], "Trattoria");
    assert!(stored.slice_version(SliceName::RestaurantInfo).is_some());
}

#[tokio::test]
async fn foreign_record_is_not_found() {
    let server = serve().await;
    let owner = client(&server, 23);
    let record = owner.create().await.unwrap();

    let stranger: Arc<dyn WizardBackend> = Arc::new(client(&server, 24));
    assert_matches!(
        StepController::enter(stranger, record.id, WizardPosition::first(), fast_autosave()).await,
        Err(CoreError::NotFound { .. })
    );
}

#[tokio::test]
async fn unreached_step_is_rejected_by_the_server() {
    let server = serve().await;
    let rest = client(&server, 25);
    let record = rest.create().await.unwrap();

    assert_matches!(
        rest.record_advance(record.id, WizardPosition::Step(4)).await,
        Err(CoreError::StepNotReached { requested, furthest }) if requested == "4" && furthest == "1"
    );
}

#[tokio::test]
async fn bad_token_is_unauthorized() {
    let server = serve().await;
    let rest = RestBackend::new(&ClientConfig::new(&server.base_url, "forged")).unwrap();

    assert_matches!(
        rest.load(uuid::Uuid::now_v7()).await,
        Err(CoreError::Unauthorized(_))
    );
}

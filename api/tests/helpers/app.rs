use api::state::{AppState, HttpSettings, Storage};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::{FixedOffset, NaiveDate};
use db::models::{location, user};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use services::attendance::{AttendanceProtocol, AttendanceTaskHandler, ProtocolSettings};
use services::face::{FaceVerifier, Metric};
use services::notification::NotificationDispatcher;
use services::queue::{QueueSettings, TaskQueue};
use services::storage::LocalObjectStore;
use services::test_utils::{RecordingPushClient, StubEmbedder};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use util::clock::FixedClock;
use util::geo::{GeoPoint, offset_north};

use super::form::Form;

pub const OFFICE: GeoPoint = GeoPoint {
    lat: -8.6705,
    lng: 115.2126,
};

pub const PUBLIC_BASE_URL: &str = "http://localhost:3000";

/// A fully wired application over an in-memory database. Workers do not run in the
/// background; call [`TestApp::drain`] to apply queued tasks.
pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub face: Arc<FaceVerifier>,
    pub queue: TaskQueue,
    pub handler: AttendanceTaskHandler,
    pub clock: FixedClock,
    pub push: Arc<RecordingPushClient>,
    _storage: TempDir,
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

pub async fn make_test_app() -> TestApp {
    let db = setup_test_db().await;
    let storage = TempDir::new().expect("failed to create tempdir");
    let store = Arc::new(LocalObjectStore::new(storage.path(), PUBLIC_BASE_URL, "test-secret"));

    let face = Arc::new(FaceVerifier::new(
        Arc::new(StubEmbedder),
        store.clone(),
        Metric::Cosine,
        0.45,
        Duration::from_secs(2),
    ));
    let clock = FixedClock::at_local(
        monday().and_hms_opt(7, 55, 0).unwrap(),
        FixedOffset::east_opt(8 * 3600).unwrap(),
    );
    let queue = TaskQueue::new(
        db.clone(),
        QueueSettings {
            retry_backoff: Duration::ZERO,
            ..QueueSettings::default()
        },
    );
    let push = Arc::new(RecordingPushClient::new());
    let notifier = NotificationDispatcher::new(db.clone(), push.clone());
    let protocol = Arc::new(AttendanceProtocol::new(
        db.clone(),
        face.clone(),
        queue.clone(),
        Arc::new(clock.clone()),
        ProtocolSettings::default(),
    ));
    let handler = AttendanceTaskHandler::new(db.clone(), notifier.clone());

    let state = AppState::new(
        db.clone(),
        protocol,
        face.clone(),
        Storage::local(store),
        notifier,
        HttpSettings::default(),
    );

    TestApp {
        router: api::app(state),
        db,
        face,
        queue,
        handler,
        clock,
        push,
        _storage: storage,
    }
}

impl TestApp {
    pub async fn raw(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.raw(req).await;
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(&self, uri: &str, form: Form) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, Form::content_type())
                .body(Body::from(form.encode()))
                .unwrap(),
        )
        .await
    }

    /// Runs every claimable task to completion.
    pub async fn drain(&self) -> usize {
        self.queue.drain(&self.handler).await.unwrap()
    }

    pub async fn user(&self, name: &str, role: user::Role) -> user::Model {
        let email = format!("{}@example.com", name.to_lowercase());
        user::Model::create(&self.db, name, &email, role, None).await.unwrap()
    }

    /// A user whose face reference is `StubEmbedder::image_of(name)`.
    pub async fn enrolled_user(&self, name: &str) -> user::Model {
        let u = self.user(name, user::Role::Karyawan).await;
        self.face
            .enroll(u.id, vec![StubEmbedder::image_of(name)])
            .await
            .unwrap();
        u
    }

    pub async fn office(&self) -> location::Model {
        location::Model::create(&self.db, "Kantor Denpasar", OFFICE.lat, OFFICE.lng, Some(100))
            .await
            .unwrap()
    }
}

/// A check-in/check-out form `meters` north of the office, with `face` as the photo.
pub fn attendance_form(user_id: i64, location_id: i64, meters: f64, face: &str) -> Form {
    let p = offset_north(OFFICE, meters);
    Form::new()
        .text("user_id", user_id)
        .text("location_id", location_id)
        .text("lat", p.lat)
        .text("lng", p.lng)
        .file("image", "selfie.jpg", StubEmbedder::image_of(face))
}

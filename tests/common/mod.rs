#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use lions::config::rate_limits::RateLimits;
use lions::config::{AppConfig, StoreBackend};
use lions::domain::verse::Verse;
use lions::infra::memory::MemoryStore;
use lions::AppState;

// "0123456789abcdef0123456789abcdef" (32 bytes)
const TEST_SESSION_KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";
const TEST_ISSUER: &str = "lions";
pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";

// ---------------------------------------------------------------------------
// TestApp: a fresh router over its own in-memory store
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub genesis_1_1: Verse,
    pub genesis_1_2: Verse,
    pub song_1: Vec<Verse>,
    pub john_3_16: Verse,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        http_addr: "127.0.0.1:0".into(),
        store_backend: StoreBackend::Memory,
        database_url: None,
        db_max_connections: 1,
        db_connect_timeout_seconds: 1,
        db_idle_timeout_seconds: 0,
        db_max_lifetime_seconds: 60,
        redis_url: None,
        session_key: TEST_SESSION_KEY,
        session_issuer: TEST_ISSUER.into(),
        admin_token: Some(TEST_ADMIN_TOKEN.into()),
        interpretation_hide_threshold: 10,
        reply_hide_threshold: 5,
        rate_limits: RateLimits::default(),
    }
}

/// Twelve-plus words of harmless prose.
pub fn interpretation_text() -> String {
    "In the beginning God created the heavens and the earth out of nothing at all".to_string()
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store = MemoryStore::new();
        let genesis_1_1 = store
            .insert_verse("Genesis", 1, 1, "In the beginning God created the heaven and the earth.")
            .await;
        let genesis_1_2 = store
            .insert_verse("Genesis", 1, 2, "And the earth was without form, and void.")
            .await;
        let mut song_1 = Vec::new();
        for verse in 1..=3 {
            song_1.push(
                store
                    .insert_verse("Song of Songs", 1, verse, "The song of songs.")
                    .await,
            );
        }
        let john_3_16 = store
            .insert_verse("John", 3, 16, "For God so loved the world.")
            .await;

        let state = AppState::new(Arc::new(store.clone()), &test_config(), None)
            .expect("failed to build AppState");
        let router = lions::http::router(state.clone());

        TestApp {
            router,
            state,
            store,
            genesis_1_1,
            genesis_1_2,
            song_1,
            john_3_16,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::DELETE, path, None, &headers).await
    }

    /// POST with an admin token in the x-admin-token header.
    pub async fn post_admin(&self, path: &str, admin_token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        if let Some(t) = admin_token {
            headers.push(("x-admin-token", t));
        }
        self.request(Method::POST, path, Some(json!({})), &headers)
            .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// A user known only by id, with a token minted under the server's keys.
    pub fn user(&self) -> TestUser {
        let id = Uuid::new_v4();
        let token = self
            .state
            .sessions
            .issue(id, Duration::from_secs(600))
            .expect("issue token failed");
        TestUser { id, token }
    }

    pub async fn create_interpretation(&self, user: &TestUser, verse_id: Uuid, text: &str) -> Uuid {
        let resp = self
            .post_json(
                &format!("/verses/{}/interpretations", verse_id),
                json!({ "text": text }),
                Some(&user.token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.error_message());
        parse_id(&resp.json()["interpretation"]["id"])
    }

    pub async fn create_reply(&self, user: &TestUser, interpretation_id: Uuid) -> Uuid {
        let resp = self
            .post_json(
                &format!("/interpretations/{}/replies", interpretation_id),
                json!({ "text": "Amen to that" }),
                Some(&user.token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.error_message());
        parse_id(&resp.json()["reply"]["id"])
    }

    /// Files `n` reports from distinct users.
    pub async fn flag_times(&self, path: &str, n: usize) -> TestResponse {
        let mut last = None;
        for _ in 0..n {
            let reporter = self.user();
            let resp = self
                .post_json(path, json!({ "reason": "spam" }), Some(&reporter.token))
                .await;
            assert_eq!(resp.status, StatusCode::OK, "{}", resp.error_message());
            last = Some(resp);
        }
        last.expect("flag_times needs n > 0")
    }

    pub async fn interpretation_ids_for(&self, verse_id: Uuid) -> Vec<Uuid> {
        let resp = self
            .get(&format!("/verses/{}/interpretations", verse_id), None)
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.json()["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| parse_id(&item["id"]))
            .collect()
    }

    pub async fn reply_ids_for(&self, interpretation_id: Uuid) -> Vec<Uuid> {
        let resp = self
            .get(&format!("/interpretations/{}/replies", interpretation_id), None)
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.json()["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| parse_id(&item["id"]))
            .collect()
    }
}

pub fn parse_id(value: &Value) -> Uuid {
    Uuid::parse_str(value.as_str().expect("id is not a string")).expect("id is not a uuid")
}

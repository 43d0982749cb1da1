#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use crmserver::accounts::AccountsService;
use crmserver::core::config::{AppConfig, AuthSettings};
use crmserver::core::shared::state::AppState;
use crmserver::core::store::MemoryStore;
use crmserver::main_module::build_router;

pub const OWNER_EMAIL: &str = "owner@example.com";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl Response {
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

fn config() -> AppConfig {
    AppConfig {
        auth: AuthSettings {
            jwt_secret: "integration-test-secret-long-enough-for-hs256".to_string(),
            hash_memory_kib: 1024,
            hash_iterations: 1,
            ..AuthSettings::default()
        },
        ..AppConfig::default()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let state = Arc::new(
            AppState::new(config(), Arc::new(MemoryStore::new())).expect("Failed to build state"),
        );
        AccountsService::new(&state)
            .bootstrap_owner(OWNER_EMAIL, PASSWORD)
            .await
            .expect("Failed to bootstrap owner");
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Response { status, body }
    }

    pub async fn get(&self, path: &str, token: &str) -> Response {
        self.send(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Response {
        self.send(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn token(&self, email: &str) -> String {
        let response = self.login(email, PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.body["access_token"]
            .as_str()
            .expect("token missing")
            .to_string()
    }

    pub async fn owner_token(&self) -> String {
        self.token(OWNER_EMAIL).await
    }

    /// Creates an account through the admin API and returns its id and token.
    pub async fn create_user(
        &self,
        owner_token: &str,
        email: &str,
        role: &str,
        manager_id: Option<Uuid>,
    ) -> (Uuid, String) {
        let response = self
            .post(
                "/api/admin/create-user",
                owner_token,
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "role": role,
                    "manager_id": manager_id,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        let id = id_of(&response.body["account"]);
        (id, self.token(email).await)
    }

    pub async fn create_contact(&self, token: &str, name: &str, owner: Option<Uuid>) -> Uuid {
        let response = self
            .post(
                "/api/contacts",
                token,
                json!({ "name": name, "owning_user_id": owner }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        id_of(&response.body["contact"])
    }

    pub async fn create_origin(&self, owner_token: &str, name: &str) -> Uuid {
        let response = self
            .post("/api/origins/create", owner_token, json!({ "name": name }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        id_of(&response.body["origin"])
    }

    pub async fn create_stage(&self, token: &str, origin_id: Uuid, name: &str) -> Value {
        let response = self
            .post(
                "/api/stages/create",
                token,
                json!({ "origin_id": origin_id, "name": name }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["stage"].clone()
    }
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("id missing")
}

pub fn ids(list: &Value) -> Vec<Uuid> {
    list.as_array()
        .map(|items| items.iter().map(id_of).collect())
        .unwrap_or_default()
}

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chat_api_lib::{
    auth::AuthService,
    config::Config,
    web::{router, AppState},
};
use chat_core::{
    chat::ChatOrchestrator,
    testing::{InMemoryStore, ScriptedTextGenerator},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const GUEST: Uuid = Uuid::from_u128(0xf6de90d5_4490_46e2_82d4_cae4df7a9eaf);
pub const JWT_KEY: &str = "integration-test-signing-key-0123456789";
pub const PASSWORD: &str = "Passw0rd!";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub generator: ScriptedTextGenerator,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The refresh token from the `Set-Cookie` header, if one was set.
    pub fn refresh_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| {
                v.split(';')
                    .next()
                    .and_then(|pair| pair.strip_prefix("refreshToken="))
                    .map(str::to_string)
            })
    }

    pub fn set_cookie_header(&self) -> String {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let mut pairs = vec![
        ("DATABASE_URL".to_string(), "postgres://unused".to_string()),
        ("JWT_KEY".to_string(), JWT_KEY.to_string()),
    ];
    pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Config::from_lookup(|name| {
        pairs
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    })
    .expect("test config")
}

pub fn spawn_app(generator: ScriptedTextGenerator) -> TestApp {
    spawn_app_with_config(generator, test_config(&[]))
}

pub fn spawn_app_with_config(generator: ScriptedTextGenerator, config: Config) -> TestApp {
    let store = Arc::new(InMemoryStore::with_guest(config.guest_user_id));
    let state = Arc::new(AppState {
        auth: AuthService::new(store.clone(), config.jwt.clone()),
        chat: ChatOrchestrator::new(
            store.clone(),
            Arc::new(generator.clone()),
            config.guest_user_id,
        ),
        config: Arc::new(config),
    });
    TestApp {
        router: router(state),
        store,
        generator,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, email: &str, user_name: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": email,
                "userName": user_name,
                "password": PASSWORD,
                "confirmPassword": PASSWORD,
            })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn refresh(&self, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::POST).uri("/api/auth/refresh");
        if let Some(token) = cookie {
            builder = builder.header(header::COOKIE, format!("refreshToken={}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Registers and logs in; returns the access token and the user id.
    pub async fn signed_in(&self, email: &str, user_name: &str) -> (String, Uuid) {
        assert_eq!(self.register(email, user_name).await.status, StatusCode::OK);
        let login = self.login(email, PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK);
        let token = login.body["token"].as_str().unwrap().to_string();
        let profile = self
            .request(Method::GET, "/api/user/profile", Some(&token), None)
            .await;
        let user_id = Uuid::parse_str(profile.body["userId"].as_str().unwrap()).unwrap();
        (token, user_id)
    }

    pub async fn create_session(&self, token: &str, title: &str) -> Uuid {
        let created = self
            .request(
                Method::POST,
                "/api/chat/sessions",
                Some(token),
                Some(json!({ "title": title })),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED);
        Uuid::parse_str(created.body["id"].as_str().unwrap()).unwrap()
    }
}

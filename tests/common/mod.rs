#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use cinema_booking::{
    app,
    auth::TokenDenylist,
    config::Config,
    models::{Movie, ShowRequest, TheatreRequest},
    storage::MemoryStore,
    AppState,
};
use chrono::NaiveDate;
use fake::{
    faker::{internet::en::SafeEmail, name::en::Name},
    Fake,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse";

static EMAIL_SEQ: AtomicUsize = AtomicUsize::new(0);

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub struct Catalog {
    pub theatre_id: i64,
    pub tmdb_id: i64,
    pub show_id: i64,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = Config::defaults().expect("default config");
        config.jwt.bcrypt_cost = 4;
        let state = AppState::new(config, Arc::new(MemoryStore::new()), TokenDenylist::in_memory());
        Self {
            router: app(state.clone()),
            state,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Registers a fresh user and returns `(email, token)`.
    pub async fn register_random(&self) -> (String, String) {
        let name: String = Name().fake();
        let email: String = SafeEmail().fake();
        let email = format!("{}.{}", EMAIL_SEQ.fetch_add(1, Ordering::Relaxed), email);
        let token = self.register(&name, &email).await;
        (email, token)
    }

    pub async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .post("/auth/register", None, json!({ "name": name, "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Returns the whole login response.
    pub async fn login(&self, email: &str) -> Value {
        let (status, body) = self
            .post("/auth/login", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body
    }

    pub async fn admin_token(&self) -> String {
        let (email, _) = self.register_random().await;
        let user = self.state.store.find_user_by_email(&email).await.unwrap().unwrap();
        self.state
            .store
            .set_user_role(user.user_id, cinema_booking::models::Role::Admin)
            .await
            .unwrap();
        self.login(&email).await["token"].as_str().unwrap().to_string()
    }

    /// One theatre, one movie mapping and one show of that movie there.
    pub async fn seed_catalog(&self) -> Catalog {
        let store = &self.state.store;
        let theatre = store
            .create_theatre(TheatreRequest {
                name: "Lumiere".into(),
                city: "Almaty".into(),
                address: Some("Abay 1".into()),
            })
            .await
            .unwrap();
        store
            .upsert_movie(Movie {
                tmdb_id: 550,
                title: "Fight Club".into(),
                poster_path: Some("/poster.jpg".into()),
            })
            .await
            .unwrap();
        let show = store
            .create_show(ShowRequest {
                theatre_id: theatre.theatre_id,
                tmdb_id: 550,
                show_time: NaiveDate::from_ymd_opt(2025, 3, 1)
                    .unwrap()
                    .and_hms_opt(18, 30, 0)
                    .unwrap(),
                ticket_price: 250.0,
            })
            .await
            .unwrap();

        Catalog {
            theatre_id: theatre.theatre_id,
            tmdb_id: 550,
            show_id: show.show_id,
        }
    }
}

pub fn user_id_of(token: &str) -> i64 {
    cinema_booking::client::token_identity(token).unwrap().id
}

pub fn booking_body(user_id: i64, catalog: &Catalog, seats: &[i32]) -> Value {
    json!({
        "user_id": user_id,
        "tmdb_id": catalog.tmdb_id,
        "theatre_id": catalog.theatre_id,
        "show_id": catalog.show_id,
        "selected_seats": seats,
    })
}

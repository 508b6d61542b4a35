use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use super::session::{BookingSession, SessionError};
use crate::auth::Claims;
use crate::models::{
    AuthResponse, BookingCreated, BookingDetails, MessageResponse, SeatAvailability, Show, Theatre,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error status; `message` is taken from the
    /// JSON error body when there is one.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("malformed token: {0}")]
    Token(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Reads the claims of a token without checking its signature, the way a
/// browser reads its own session token. Never use the result for access control.
pub fn token_identity(token: &str) -> Result<Claims, ClientError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ClientError::Token("expected three dot-separated parts".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClientError::Token(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Token(e.to_string()))
}

pub struct BookingClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BookingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let fallback = status.canonical_reason().unwrap_or("request failed").to_string();
        let message = match resp.json::<MessageResponse>().await {
            Ok(body) => body.message,
            Err(_) => fallback,
        };
        Err(ClientError::Api { status: status.as_u16(), message })
    }

    /// Registers and keeps the returned token.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let resp = self
            .request(Method::POST, "/auth/register")
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = Self::decode(resp).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Logs in and keeps the returned token.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let resp = self
            .request(Method::POST, "/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let auth: AuthResponse = Self::decode(resp).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn logout(&mut self) -> Result<MessageResponse, ClientError> {
        if self.token.is_none() {
            return Err(ClientError::NotLoggedIn);
        }
        let resp = self.request(Method::POST, "/auth/logout").send().await?;
        let body = Self::decode(resp).await?;
        self.token = None;
        Ok(body)
    }

    pub async fn theatres(&self) -> Result<Vec<Theatre>, ClientError> {
        let resp = self.request(Method::GET, "/api/theatres").send().await?;
        Self::decode(resp).await
    }

    pub async fn shows(&self, theatre_id: i64, tmdb_id: Option<i64>) -> Result<Vec<Show>, ClientError> {
        let mut req = self.request(Method::GET, &format!("/api/theatres/shows/{theatre_id}"));
        if let Some(tmdb_id) = tmdb_id {
            req = req.query(&[("tmdb_id", tmdb_id)]);
        }
        Self::decode(req.send().await?).await
    }

    pub async fn seats(&self, show_id: i64) -> Result<SeatAvailability, ClientError> {
        let resp = self
            .request(Method::GET, &format!("/api/shows/{show_id}/seats"))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Books the session's seats for the logged-in user.
    pub async fn book(&self, session: &BookingSession) -> Result<BookingCreated, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        let body = session.to_request(token_identity(token)?.id)?;
        let resp = self.request(Method::POST, "/api/book").json(&body).send().await?;
        Self::decode(resp).await
    }

    pub async fn my_bookings(&self) -> Result<Vec<BookingDetails>, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        let user_id = token_identity(token)?.id;
        let resp = self
            .request(Method::GET, &format!("/api/bookings/{user_id}"))
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn cancel(&self, booking_id: i64) -> Result<MessageResponse, ClientError> {
        let resp = self
            .request(Method::DELETE, &format!("/api/book/{booking_id}"))
            .send()
            .await?;
        Self::decode(resp).await
    }
}

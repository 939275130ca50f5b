use crate::server::{ServerState, routes};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use bloglist_common::model::{
    Id,
    auth::AuthToken,
    user::{CreateUser, UserMarker, Username},
};
use bloglist_db::{memory::MemoryStore, store::BlogStore};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// The full router backed by a fresh [`MemoryStore`].
pub(crate) struct TestServer {
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl TestServer {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let router = routes().with_state(ServerState {
            store: store.clone(),
        });

        Self { store, router }
    }

    /// Registers a user and returns their id and a valid bearer token.
    pub async fn create_user(&self, username: &str) -> (Id<UserMarker>, String) {
        let user = self
            .store
            .create_user(&CreateUser {
                username: Username::new(username.to_owned()).unwrap(),
                name: format!("{username} tester"),
            })
            .await
            .unwrap();

        let (token, authentication) = AuthToken::issue(user, None).unwrap();
        self.store.create_auth(&authentication).await.unwrap();

        (user, token.as_token_str())
    }

    /// Sends a request and returns the status with the JSON body, or `Null`
    /// for an empty body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(request.body(body).unwrap()).await
    }

    /// Sends a prepared request, for headers [`Self::request`] cannot set.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }
}

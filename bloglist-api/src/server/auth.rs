use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use bloglist_common::model::{Id, auth::AuthToken, user::UserMarker};
use bloglist_db::store::BlogStore;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The user a request was made by, established from its bearer token.
///
/// Extracting this rejects the request if the token is missing, malformed,
/// unknown or expired.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn BlogStore>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let authentication = Arc::<dyn BlogStore>::from_ref(state)
            .fetch_auth(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if authentication.user != request_token.user_id {
            return Err(ServerError::InvalidToken);
        }
        if authentication.is_expired_at(UtcDateTime::now()) {
            debug!(user = %authentication.user, "Rejecting expired token");
            return Err(ServerError::InvalidToken);
        }

        Ok(Self {
            id: authentication.user,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::server::testing::TestServer;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use bloglist_common::model::auth::{AuthToken, TokenLifetime};
    use bloglist_db::store::BlogStore;
    use serde_json::json;
    use time::{Duration, UtcDateTime};

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let server = TestServer::new();

        let (status, body) = server
            .request(Method::POST, "/api/blogs", None, Some(json!({ "title": "T" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let server = TestServer::new();
        let (user, _) = server.create_user("hellas").await;
        let unknown = AuthToken::generate_random(user).as_token_str();

        let (status, _) = server
            .request(
                Method::POST,
                "/api/blogs",
                Some(&unknown),
                Some(json!({ "title": "T" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_token_is_unauthorized() {
        let server = TestServer::new();

        for token in ["garbage", "not-a-token", "42:AAAA:AAAA"] {
            let (status, body) = server
                .request(
                    Method::POST,
                    "/api/blogs",
                    Some(token),
                    Some(json!({ "title": "T" })),
                )
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token:?}");
            assert_eq!(body["status"], 401);
        }
        assert!(server.store.list_blogs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_bearer_authorization_is_unauthorized() {
        let server = TestServer::new();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/blogs")
            .header(header::AUTHORIZATION, "Basic cm9vdDpzZWtyZXQ=")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "title": "T" }).to_string()))
            .unwrap();
        let (status, body) = server.send(request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let server = TestServer::new();
        let (user, _) = server.create_user("hellas").await;

        let (token, mut authentication) =
            AuthToken::issue(user, TokenLifetime::new(Duration::hours(1))).unwrap();
        authentication.created_at = UtcDateTime::now() - Duration::hours(2);
        server.store.create_auth(&authentication).await.unwrap();

        let (status, _) = server
            .request(
                Method::POST,
                "/api/blogs",
                Some(&token.as_token_str()),
                Some(json!({ "title": "T" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

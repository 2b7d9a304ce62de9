//! Credential attachment and auth-route exemption.

use reqwest::header::{AUTHORIZATION, HeaderValue};

use crate::request::ApiRequest;

/// Default path prefix of the authentication surface.
pub const DEFAULT_AUTH_PREFIX: &str = "/api/auth/";

/// Classification of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteClass {
    /// The request targets login/register/refresh/logout/forgot/reset.
    /// Such requests pass through untouched and their failures are never
    /// intercepted, otherwise a failing refresh would trigger another one.
    pub is_auth_route: bool,
}

/// Decides whether and how a request carries the bearer credential.
#[derive(Debug, Clone)]
pub struct RequestAuthorizer {
    auth_prefix: String,
}

impl RequestAuthorizer {
    /// Create an authorizer that exempts every path containing `auth_prefix`.
    pub fn new(auth_prefix: impl Into<String>) -> Self {
        Self {
            auth_prefix: auth_prefix.into(),
        }
    }

    pub fn auth_prefix(&self) -> &str {
        &self.auth_prefix
    }

    pub fn classify(&self, request: &ApiRequest) -> RouteClass {
        RouteClass {
            is_auth_route: request.url().path().contains(&self.auth_prefix),
        }
    }

    /// Copy of `request` carrying `Authorization: Bearer <token>`.
    ///
    /// With no token (or an empty one) the copy is sent unauthenticated and
    /// any bearer header the caller set is left alone. The original request
    /// is never modified.
    pub fn attach(&self, request: &ApiRequest, token: Option<&str>) -> ApiRequest {
        let mut copy = request.clone();
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    copy.headers.insert(AUTHORIZATION, value);
                }
                Err(_) => {
                    tracing::warn!("Access token is not a valid header value, sending without it");
                }
            }
        }
        copy
    }

    /// Whether `request` carries a bearer credential.
    pub fn has_bearer(request: &ApiRequest) -> bool {
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("Bearer "))
    }
}

impl Default for RequestAuthorizer {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use url::Url;

    fn get(path: &str) -> ApiRequest {
        let url = Url::parse("http://localhost:8080").unwrap().join(path).unwrap();
        ApiRequest::new(Method::GET, url)
    }

    #[test]
    fn test_auth_routes_are_exempt() {
        let authorizer = RequestAuthorizer::default();
        for path in [
            "/api/auth/login",
            "/api/auth/register",
            "/api/auth/refresh",
            "/api/auth/logout",
            "/api/auth/forgot-password",
            "/api/auth/reset-password",
        ] {
            assert!(authorizer.classify(&get(path)).is_auth_route, "{}", path);
        }
    }

    #[test]
    fn test_business_routes_are_not_exempt() {
        let authorizer = RequestAuthorizer::default();
        assert!(!authorizer.classify(&get("/api/expenses")).is_auth_route);
        assert!(!authorizer.classify(&get("/api/dashboard/categories")).is_auth_route);
        // Only the path is considered, not the query.
        assert!(
            !authorizer
                .classify(&get("/api/expenses?q=/api/auth/"))
                .is_auth_route
        );
    }

    #[test]
    fn test_custom_prefix() {
        let authorizer = RequestAuthorizer::new("/v2/session/");
        assert!(authorizer.classify(&get("/v2/session/refresh")).is_auth_route);
        assert!(!authorizer.classify(&get("/api/auth/refresh")).is_auth_route);
    }

    #[test]
    fn test_attach_with_token_copies() {
        let authorizer = RequestAuthorizer::default();
        let original = get("/api/expenses");
        let attached = authorizer.attach(&original, Some("T1"));

        assert!(RequestAuthorizer::has_bearer(&attached));
        assert_eq!(attached.headers().get(AUTHORIZATION).unwrap(), "Bearer T1");
        assert!(!RequestAuthorizer::has_bearer(&original));
    }

    #[test]
    fn test_attach_without_token_is_unauthenticated() {
        let authorizer = RequestAuthorizer::default();
        let original = get("/api/expenses");

        assert!(!RequestAuthorizer::has_bearer(&authorizer.attach(&original, None)));
        assert!(!RequestAuthorizer::has_bearer(&authorizer.attach(&original, Some(""))));
    }

    #[test]
    fn test_attach_replaces_previous_bearer() {
        let authorizer = RequestAuthorizer::default();
        let first = authorizer.attach(&get("/api/expenses"), Some("T1"));
        let second = authorizer.attach(&first, Some("T2"));
        assert_eq!(second.headers().get(AUTHORIZATION).unwrap(), "Bearer T2");
    }

    #[test]
    fn test_non_bearer_authorization_is_not_bearer() {
        let request = get("/api/expenses").header(
            AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert!(!RequestAuthorizer::has_bearer(&request));
    }
}

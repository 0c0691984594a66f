//! Authentication / Authorization primitives.
//!
//! The server acts as an OAuth2/OIDC *resource server*: Keycloak performs
//! interactive login, while this server validates bearer tokens on incoming
//! requests and resolves them to a [`Principal`]. "Has the admin role" is
//! the only authorization predicate the API uses.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::{config::Config, state::AppState};

/// The resolved identity of an authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone)]
pub enum AuthError {
    MissingToken,
    InvalidToken(String),
    Forbidden,
    Misconfigured(String),
    Upstream(String),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MissingToken => "Not authorized to access this route".to_string(),
            Self::InvalidToken(msg) => format!("Invalid bearer token: {msg}"),
            Self::Forbidden => "Access denied. Admin privileges required.".to_string(),
            Self::Misconfigured(msg) => format!("Authentication misconfigured: {msg}"),
            Self::Upstream(msg) => format!("Authentication upstream error: {msg}"),
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        let body = axum::Json(json!({
            "success": false,
            "message": self.message(),
        }));

        let mut response = (status, body).into_response();
        if matches!(self, Self::MissingToken | Self::InvalidToken(_)) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OidcDiscovery {
    pub issuer: Option<String>,
    pub jwks_uri: String,
}

#[derive(Debug, Default)]
struct JwksCache {
    jwks_uri: Option<String>,
    jwks: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

#[derive(Clone)]
pub struct AuthManager {
    config: Arc<Config>,
    http: reqwest::Client,
    jwks_cache: Arc<RwLock<JwksCache>>,
}

impl AuthManager {
    pub fn new(config: Arc<Config>) -> Result<Self, AuthError> {
        let timeout = Duration::from_secs(config.auth.http_timeout_seconds);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Misconfigured(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            jwks_cache: Arc::new(RwLock::new(JwksCache::default())),
        })
    }

    pub fn enabled(&self) -> bool {
        self.config.auth.enabled
    }

    /// Whether the caller may use admin endpoints. With auth disabled the
    /// service trusts its network and every caller is an administrator.
    pub fn is_admin(&self, principal: Option<&Principal>) -> bool {
        if !self.enabled() {
            return true;
        }
        principal.is_some_and(|p| p.has_role(&self.config.auth.admin_role))
    }

    /// Resolve the bearer token in `headers`, if any.
    ///
    /// A missing Authorization header is not an error: public endpoints
    /// accept anonymous callers, and per-route extractors decide whether a
    /// principal is required. A present-but-invalid token always fails.
    pub async fn authenticate_headers(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, AuthError> {
        if !self.enabled() {
            return Ok(None);
        }

        let Some(authz) = headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };

        let authz = authz.to_str().map_err(|_| {
            AuthError::InvalidToken("Authorization header is not valid UTF-8".to_string())
        })?;

        let token = authz
            .strip_prefix("Bearer ")
            .or_else(|| authz.strip_prefix("bearer "))
            .ok_or_else(|| {
                AuthError::InvalidToken("Authorization header must be 'Bearer <token>'".to_string())
            })?;

        let issuer = self
            .config
            .auth
            .issuer_url
            .clone()
            .ok_or_else(|| AuthError::Misconfigured("auth.issuer_url is not set".to_string()))?;
        let audience = self
            .config
            .auth
            .audience
            .clone()
            .ok_or_else(|| AuthError::Misconfigured("auth.audience is not set".to_string()))?;

        let token_data = self
            .decode_and_validate_jwt(token, &issuer, &audience)
            .await?;
        Ok(Some(principal_from_claims(&token_data.claims)))
    }

    async fn decode_and_validate_jwt(
        &self,
        token: &str,
        issuer: &str,
        audience: &str,
    ) -> Result<TokenData<serde_json::Value>, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("Failed to decode JWT header: {e}")))?;

        let kid = header
            .kid
            .clone()
            .ok_or_else(|| AuthError::InvalidToken("JWT header missing 'kid'".to_string()))?;

        // RS256 only. This matches Keycloak's default and avoids algorithm
        // confusion.
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "Unsupported JWT alg '{:?}' (only RS256 is supported)",
                header.alg
            )));
        }

        let jwks = self.get_jwks().await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("No matching JWK for kid '{kid}'")))?;
        let decoding_key = decoding_key_from_jwk(jwk)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = 60;

        decode::<serde_json::Value>(token, &decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(format!("{e}")))
    }

    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        let ttl = Duration::from_secs(self.config.auth.jwks_cache_ttl_seconds);

        {
            let cache = self.jwks_cache.read().await;
            if let (Some(jwks), Some(fetched_at)) = (&cache.jwks, cache.fetched_at) {
                if fetched_at.elapsed() <= ttl {
                    return Ok(jwks.clone());
                }
            }
        }

        let jwks_uri = self.get_jwks_uri().await?;
        let jwks = self.fetch_jwks(&jwks_uri).await?;

        let mut cache = self.jwks_cache.write().await;
        cache.jwks = Some(jwks.clone());
        cache.jwks_uri = Some(jwks_uri);
        cache.fetched_at = Some(Instant::now());
        Ok(jwks)
    }

    async fn get_jwks_uri(&self) -> Result<String, AuthError> {
        if let Some(uri) = self.config.auth.jwks_url.clone() {
            return Ok(uri);
        }

        {
            let cache = self.jwks_cache.read().await;
            if let Some(uri) = cache.jwks_uri.clone() {
                return Ok(uri);
            }
        }

        Ok(self.oidc_discovery().await?.jwks_uri)
    }

    async fn oidc_discovery(&self) -> Result<OidcDiscovery, AuthError> {
        let issuer = self
            .config
            .auth
            .issuer_url
            .clone()
            .ok_or_else(|| AuthError::Misconfigured("auth.issuer_url is not set".to_string()))?;

        let url = format!(
            "{}/.well-known/openid-configuration",
            issuer.trim_end_matches('/')
        );

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("OIDC discovery failed: {e}")))?;
        if !res.status().is_success() {
            return Err(AuthError::Upstream(format!(
                "OIDC discovery returned HTTP {}",
                res.status()
            )));
        }

        res.json::<OidcDiscovery>()
            .await
            .map_err(|e| AuthError::Upstream(format!("OIDC discovery JSON parse failed: {e}")))
    }

    async fn fetch_jwks(&self, jwks_uri: &str) -> Result<JwkSet, AuthError> {
        let res = self
            .http
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("JWKS fetch failed: {e}")))?;
        if !res.status().is_success() {
            return Err(AuthError::Upstream(format!(
                "JWKS fetch returned HTTP {}",
                res.status()
            )));
        }
        res.json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Upstream(format!("JWKS JSON parse failed: {e}")))
    }
}

fn decoding_key_from_jwk(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| AuthError::InvalidToken(format!("Failed to build RSA decoding key: {e}"))),
        _ => Err(AuthError::InvalidToken(
            "Unsupported JWK type (only RSA keys are supported)".to_string(),
        )),
    }
}

/// Build a [`Principal`] from validated token claims.
///
/// Keycloak carries realm roles under `realm_access.roles` and client roles
/// under `resource_access.<client>.roles`; both are honoured.
fn principal_from_claims(claims: &serde_json::Value) -> Principal {
    let subject = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let name = claims
        .get("name")
        .and_then(|v| v.as_str())
        .or_else(|| claims.get("preferred_username").and_then(|v| v.as_str()))
        .map(|s| s.to_string());

    let mut roles: Vec<String> = Vec::new();
    if let Some(arr) = claims
        .pointer("/realm_access/roles")
        .and_then(|v| v.as_array())
    {
        roles.extend(arr.iter().filter_map(|v| v.as_str().map(String::from)));
    }
    if let Some(clients) = claims.get("resource_access").and_then(|v| v.as_object()) {
        for client in clients.values() {
            if let Some(arr) = client.get("roles").and_then(|v| v.as_array()) {
                roles.extend(arr.iter().filter_map(|v| v.as_str().map(String::from)));
            }
        }
    }
    roles.sort();
    roles.dedup();

    Principal {
        subject,
        name,
        roles,
    }
}

/// Middleware attaching a [`Principal`] to the request when a valid bearer
/// token is present, and rejecting invalid tokens. Anonymous requests pass
/// through; per-route extractors enforce stricter requirements.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if !state.auth.enabled() {
        return next.run(req).await;
    }

    if req.method() == axum::http::Method::OPTIONS {
        return next.run(req).await;
    }

    match state.auth.authenticate_headers(req.headers()).await {
        Ok(Some(principal)) => {
            req.extensions_mut().insert::<Principal>(principal);
            next.run(req).await
        }
        Ok(None) => next.run(req).await,
        Err(err) => {
            tracing::debug!(error = ?err, "Rejected bearer token");
            err.into_response()
        }
    }
}

/// Extractor for routes that require any authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthenticatedPrincipal)
            .ok_or_else(|| AuthError::MissingToken.into_response())
    }
}

/// Extractor for routes that accept anonymous callers but use the identity
/// when one is present. Infallible.
#[derive(Debug, Clone)]
pub struct OptionalPrincipal(pub Option<Principal>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalPrincipal(
            parts.extensions.get::<Principal>().cloned(),
        ))
    }
}

/// Extractor gating admin endpoints on the configured admin role.
///
/// Carries `None` when auth is disabled (trusted-network mode).
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Option<Principal>);

impl AdminPrincipal {
    /// Identity recorded as the creator of admin-authored rows.
    pub fn subject(&self) -> String {
        self.0
            .as_ref()
            .map(|p| p.subject.clone())
            .unwrap_or_else(|| "system".to_string())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.auth.enabled() {
            return Ok(AdminPrincipal(None));
        }

        let Some(principal) = parts.extensions.get::<Principal>().cloned() else {
            return Err(AuthError::MissingToken.into_response());
        };

        if !principal.has_role(&state.config.auth.admin_role) {
            return Err(AuthError::Forbidden.into_response());
        }

        Ok(AdminPrincipal(Some(principal)))
    }
}

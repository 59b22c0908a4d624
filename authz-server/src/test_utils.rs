use crate::config::Settings;
use crate::create_app;
use crate::state::AppState;
use axum::Router;
use axum::body::Body;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use log::LevelFilter;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const TEST_ISSUER: &str = "https://issuer.test";
pub(crate) const TEST_AUDIENCE: &str = "customer-profiles-api";

/// An Ed25519 signing key plus the JWK its verifier would publish.
pub(crate) struct TestKey {
    kid: String,
    encoding: EncodingKey,
    pub(crate) jwk: serde_json::Value,
}

impl TestKey {
    pub(crate) fn new(kid: &str, seed: u8) -> Self {
        let signing = Ed25519SigningKey::from_bytes(&[seed; 32]);
        let der = signing.to_pkcs8_der().expect("Failed to encode signing key");
        let encoding = EncodingKey::from_ed_der(der.as_bytes());
        let x = URL_SAFE_NO_PAD.encode(signing.verifying_key().to_bytes());
        let jwk = json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "alg": "EdDSA",
            "kid": kid,
            "x": x,
        });
        Self {
            kid: kid.to_string(),
            encoding,
            jwk,
        }
    }

    pub(crate) fn mint_with(&self, claims: serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        encode(&header, &claims, &self.encoding).expect("Failed to sign token")
    }

    pub(crate) fn mint_with_scope(&self, scope: &str) -> String {
        self.mint_with(json!({
            "iss": TEST_ISSUER,
            "sub": "subject-1",
            "aud": TEST_AUDIENCE,
            "exp": Utc::now().timestamp() + 3600,
            "scope": scope,
        }))
    }

    pub(crate) fn mint_expired(&self, scope: &str) -> String {
        self.mint_with(json!({
            "iss": TEST_ISSUER,
            "sub": "subject-1",
            "aud": TEST_AUDIENCE,
            "exp": Utc::now().timestamp() - 120,
            "scope": scope,
        }))
    }
}

/// Starts a mock authorization server publishing the given keys as a JWKS.
pub(crate) async fn jwks_server(keys: &[&TestKey]) -> MockServer {
    let server = MockServer::start().await;
    let jwks = json!({ "keys": keys.iter().map(|k| k.jwk.clone()).collect::<Vec<_>>() });
    Mock::given(method("GET"))
        .and(path("/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
        .mount(&server)
        .await;
    server
}

/// Builds an application state wired against a mock JWKS server.
pub(crate) async fn auth_state(jwks_mock: &MockServer) -> AppState {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let settings = Settings::for_test_with_mocks(jwks_mock);
    AppState::new(settings).expect("Failed to build test state")
}

/// A captured response: status, headers, and the body both raw and parsed.
pub(crate) struct TestResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: serde_json::Value,
    pub(crate) text: String,
}

/// Sends one request through the router and captures the response.
///
/// `authorization` is the raw header value, so tests can exercise schemes
/// other than `Bearer`.
pub(crate) async fn send_request(
    app: &Router,
    request_method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<serde_json::Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(request_method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(http::header::AUTHORIZATION, value);
    }
    let request = match body {
        Some(payload) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).expect("Response body was not UTF-8");
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    TestResponse {
        status,
        headers,
        body,
        text,
    }
}

/// Test fixture for exercising the complete application with a mocked
/// authorization server.
pub(crate) struct TestFixture {
    pub(crate) app: Router,
    #[allow(dead_code)]
    pub(crate) jwks_mock: MockServer,
    pub(crate) key: TestKey,
}

impl TestFixture {
    /// Creates a new test fixture: a mock JWKS endpoint with one trusted
    /// key, settings pointed at it, and the full application router.
    pub(crate) async fn new() -> Self {
        let key = TestKey::new("key-1", 1);
        let jwks_mock = jwks_server(&[&key]).await;
        let state = auth_state(&jwks_mock).await;
        let app = create_app(state).await;

        Self {
            app,
            jwks_mock,
            key,
        }
    }

    /// Mints a token the fixture's authorization server would have issued.
    pub(crate) fn token(&self, scope: &str) -> String {
        self.key.mint_with_scope(scope)
    }

    /// Sends a request, attaching the token as a bearer credential.
    pub(crate) async fn send(
        &self,
        request_method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        let authorization = token.map(|token| format!("Bearer {token}"));
        send_request(
            &self.app,
            request_method,
            uri,
            authorization.as_deref(),
            body,
        )
        .await
    }
}

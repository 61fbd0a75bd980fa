use crate::cache::memory::InMemoryCache;
use crate::cache::Cache;
use crate::config::AuthHubConfig;
use crate::create_app;
use crate::directory::InMemoryDirectory;
use crate::keys::KeyMaterial;
use crate::models::{Permission, PermissionType, Role, User, UserStatus};
use crate::password;
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;
use uuid::Uuid;

/// One RSA key pair shared by every test in the binary. Generating a
/// 2048-bit key per fixture would dominate the test runtime.
pub fn generate_rsa_pem_pair() -> (String, String) {
    static KEYS: OnceLock<(String, String)> = OnceLock::new();
    KEYS.get_or_init(|| {
        use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

        let private_key =
            rsa::RsaPrivateKey::new(&mut rand::rngs::OsRng, 2048).expect("RSA key generation");
        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .expect("PKCS#8 encoding")
            .to_string();
        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("SPKI encoding");
        (private_pem, public_pem)
    })
    .clone()
}

/// Key material backed by the shared test key pair.
pub fn test_key_material() -> KeyMaterial {
    let (private_pem, public_pem) = generate_rsa_pem_pair();
    let config = AuthHubConfig::for_test(private_pem, public_pem);
    KeyMaterial::load(&config.jwt).expect("test key material")
}

/// Test fixture wiring the full router over an in-memory cache and
/// directory, with helpers for seeding principals and making requests.
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Configuration the fixture was built with
    pub config: Arc<AuthHubConfig>,
    /// Handle to the directory behind the router, for seeding
    pub directory: Arc<InMemoryDirectory>,
}

impl TestFixture {
    pub fn new() -> Self {
        let _ = env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();

        let (private_pem, public_pem) = generate_rsa_pem_pair();
        let config = AuthHubConfig::for_test(private_pem, public_pem);
        let cache = Arc::new(Cache::InMemory(
            InMemoryCache::new(config.cache.ttl as u64, config.cache.memory.capacity)
                .expect("test cache"),
        ));
        let directory = Arc::new(InMemoryDirectory::new());

        let state = AppState::with_parts(config, cache, directory.clone())
            .expect("test application state");
        let config = state.config.clone();
        let app = create_app(state);

        Self {
            app,
            config,
            directory,
        }
    }

    /// Seed an active user with a credential, one role and the given
    /// permission keys attached to that role. Returns the user id.
    pub async fn seed_user(
        &self,
        identifier: &str,
        password: &str,
        role_name: &str,
        permission_keys: &[&str],
    ) -> Uuid {
        let user = User {
            id: Uuid::now_v7(),
            tenant_id: Uuid::now_v7(),
            organization_id: Uuid::now_v7(),
            status: UserStatus::Active,
        };
        let user_id = user.id;
        let hash = password::hash(password).expect("password hash");
        self.directory
            .add_user(user, identifier, &hash)
            .await
            .expect("seed user");

        let role = Role {
            id: Uuid::now_v7(),
            tenant_id: None,
            name: role_name.to_string(),
            is_system: false,
        };
        for key in permission_keys {
            let (resource, action) = key.split_once(':').unwrap_or((*key, "*"));
            let permission = Permission {
                id: Uuid::now_v7(),
                key: key.to_string(),
                resource: resource.to_string(),
                action: action.to_string(),
                kind: PermissionType::Custom,
            };
            self.directory.grant_permission(role.id, permission.id).await;
            self.directory
                .add_permission(permission)
                .await
                .expect("seed permission");
        }
        self.directory.assign_role(user_id, role.id).await;
        self.directory.add_role(role).await.expect("seed role");

        user_id
    }

    /// Creates a request builder with a JSON content type.
    pub fn request_builder(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .header("Content-Type", "application/json")
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn get_with_headers(
        &self,
        uri: impl AsRef<str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = self.request_builder(Method::GET, uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).expect("Failed to build request");
        self.send(request).await
    }

    pub async fn post<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(Method::POST, uri)
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn post_with_headers<T: Serialize>(
        &self,
        uri: impl AsRef<str>,
        body: &T,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let mut builder = self.request_builder(Method::POST, uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn put<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(Method::PUT, uri)
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn delete(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request_builder(Method::DELETE, uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    /// Sends a request through the router and collects the response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        // Empty or non-JSON bodies collapse to an empty object.
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }
}

/// Response from a test request with convenient assertions.
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: http::HeaderMap,
    /// Response body as JSON (empty object when absent or invalid)
    pub json: Value,
}

impl TestResponse {
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response body")
    }
}

use serde::Deserialize;

/// JWT signing configuration.
///
/// Key content is resolved by priority: the inline `private_key` /
/// `public_key` values win when non-empty, otherwise the `*_path`
/// variants are read from disk. Both keys must resolve or startup fails.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Key id stamped into the JWT header and the JWKS document
    #[serde(default = "default_key_id")]
    pub key_id: String,

    /// Inline PEM content of the RSA private key (takes priority)
    #[serde(default)]
    pub private_key: String,

    /// Filesystem path to the RSA private key PEM
    #[serde(default)]
    pub private_key_path: String,

    /// Inline PEM content of the RSA public key (takes priority)
    #[serde(default)]
    pub public_key: String,

    /// Filesystem path to the RSA public key PEM
    #[serde(default)]
    pub public_key_path: String,

    /// Access token validity in seconds (default: 1 hour)
    #[serde(default = "default_access_ttl")]
    pub access_ttl: u64,

    /// Refresh token validity in seconds (default: 7 days)
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl: u64,
}

fn default_key_id() -> String {
    "authhub-rsa".to_string()
}

fn default_access_ttl() -> u64 {
    3600
}

fn default_refresh_ttl() -> u64 {
    604_800
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            key_id: default_key_id(),
            private_key: String::new(),
            private_key_path: String::new(),
            public_key: String::new(),
            public_key_path: String::new(),
            access_ttl: default_access_ttl(),
            refresh_ttl: default_refresh_ttl(),
        }
    }
}

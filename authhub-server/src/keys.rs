use crate::config::JwtConfig;
use crate::errors::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JSON Web Key as served on the JWKS endpoint (RFC 7517, RSA only).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    pub alg: String,
    #[serde(rename = "use")]
    pub use_: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// RSA key pair used to sign and verify tokens.
///
/// Loaded once at startup; a load failure is fatal and never surfaces
/// per-request. The private key signs (RS256), the public key verifies and
/// is additionally published as a JWKS document so the Gateway and other
/// downstream services can verify access tokens statelessly.
pub struct KeyMaterial {
    pub key_id: String,
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    jwks: Jwks,
}

impl KeyMaterial {
    pub fn load(config: &JwtConfig) -> Result<Self, AuthError> {
        let private_pem = resolve_pem(
            &config.private_key,
            &config.private_key_path,
            "private key",
        )?;
        let public_pem = resolve_pem(&config.public_key, &config.public_key_path, "public key")?;

        let encoding = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| AuthError::KeyLoad(format!("unparsable private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::KeyLoad(format!("unparsable public key: {e}")))?;
        let jwks = build_jwks(&public_pem, &config.key_id)?;

        Ok(Self {
            key_id: config.key_id.clone(),
            encoding,
            decoding,
            jwks,
        })
    }

    pub fn jwks(&self) -> &Jwks {
        &self.jwks
    }
}

/// Resolve key content by priority: inline PEM first, then file path.
fn resolve_pem(inline: &str, path: &str, which: &str) -> Result<String, AuthError> {
    if !inline.trim().is_empty() {
        return Ok(inline.to_string());
    }
    if !path.is_empty() {
        return std::fs::read_to_string(path)
            .map_err(|e| AuthError::KeyLoad(format!("cannot read {which} from {path}: {e}")));
    }
    Err(AuthError::KeyLoad(format!(
        "no {which} content or path configured"
    )))
}

/// Project the RSA public key into a single-key JWKS document.
/// Modulus and exponent are big-endian, base64url without padding.
fn build_jwks(public_pem: &str, key_id: &str) -> Result<Jwks, AuthError> {
    let key = RsaPublicKey::from_public_key_pem(public_pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(public_pem))
        .map_err(|e| AuthError::KeyLoad(format!("unparsable public key: {e}")))?;

    let n = URL_SAFE_NO_PAD.encode(key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(key.e().to_bytes_be());

    Ok(Jwks {
        keys: vec![Jwk {
            kty: "RSA".to_string(),
            kid: key_id.to_string(),
            alg: "RS256".to_string(),
            use_: "sig".to_string(),
            n,
            e,
        }],
    })
}

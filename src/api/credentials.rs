//! Service-account credentials
//!
//! Loads credentials from the environment (inline JSON or a file path, with a
//! fallback to the user config directory) and resolves them into a base URL
//! plus a bearer token. Credentials either carry a literal token or a P-256
//! private key (JWK) from which a short-lived ES256 token is self-signed.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use p256::pkcs8::EncodePrivateKey as _;
use serde::{Deserialize, Serialize};

/// Inline JSON credentials.
pub const CREDENTIALS_ENV: &str = "STRATOS_SERVICE_ACCOUNT_CREDENTIALS";
/// Path to a credentials file.
pub const CREDENTIALS_FILE_ENV: &str = "STRATOS_SERVICE_ACCOUNT_CREDENTIALS_FILE";

const BASE_URL_SUFFIX: &str = "/configs/v1";
const EU_BASE_URL: &str = "https://eu.api.stratos.cloud/configs/v1";
const US_BASE_URL: &str = "https://us.api.stratos.cloud/configs/v1";

/// Self-signed tokens are valid for one hour.
const TOKEN_LIFETIME_SECS: i64 = 60 * 60;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentials {
    #[serde(default)]
    app_space_id: String,
    #[serde(default)]
    service_account_id: String,
    #[serde(default)]
    endpoint: String,
    #[serde(default)]
    base_url: String,
    #[serde(default)]
    token: String,
    #[serde(default, rename = "privateKeyJWK")]
    private_key_jwk: Option<EcJwk>,
}

#[derive(Debug, Deserialize)]
struct EcJwk {
    kty: String,
    crv: String,
    #[serde(default)]
    kid: String,
    d: String,
}

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// Resolved connection material for the Config API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub base_url: String,
    pub token: String,
}

impl Credentials {
    /// Load credentials from the environment. Inline JSON wins over a file
    /// path; with neither set, the user config directory is tried last.
    pub fn load() -> Result<Self> {
        if let Ok(raw) = std::env::var(CREDENTIALS_ENV) {
            if !raw.is_empty() {
                return Self::parse(&raw);
            }
        }

        if let Ok(path) = std::env::var(CREDENTIALS_FILE_ENV) {
            if !path.is_empty() {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read credentials file {path}"))?;
                return Self::parse(&raw);
            }
        }

        if let Some(path) = default_credentials_path() {
            if path.exists() {
                let raw = std::fs::read_to_string(&path).with_context(|| {
                    format!("failed to read credentials file {}", path.display())
                })?;
                return Self::parse(&raw);
            }
        }

        bail!("{CREDENTIALS_ENV} or {CREDENTIALS_FILE_ENV} must be set")
    }

    /// Parse service-account credentials JSON into connection material.
    pub fn parse(raw: &str) -> Result<Self> {
        let creds: RawCredentials =
            serde_json::from_str(raw).context("failed to parse credentials JSON")?;

        let base_url = resolve_base_url(&creds);

        // A literal token takes precedence over key-based signing.
        if !creds.token.is_empty() {
            return Ok(Self {
                base_url,
                token: creds.token,
            });
        }

        let Some(jwk) = &creds.private_key_jwk else {
            bail!("credentials carry neither a token nor a privateKeyJWK");
        };

        let subject = if !creds.service_account_id.is_empty() {
            creds.service_account_id.clone()
        } else if !creds.app_space_id.is_empty() {
            creds.app_space_id.clone()
        } else {
            bail!("credentials with a private key must carry serviceAccountId or appSpaceId");
        };

        let token = self_signed_token(jwk, &subject)?;
        Ok(Self { base_url, token })
    }
}

fn default_credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stratos").join("credentials.json"))
}

fn resolve_base_url(creds: &RawCredentials) -> String {
    if !creds.base_url.is_empty() {
        let trimmed = creds.base_url.trim_end_matches('/');
        if trimmed.ends_with(BASE_URL_SUFFIX) {
            return trimmed.to_string();
        }
        return format!("{trimmed}{BASE_URL_SUFFIX}");
    }

    // Fallback: derive the region from the legacy endpoint form.
    if creds.endpoint.contains("us.api.stratos.cloud") {
        return US_BASE_URL.to_string();
    }
    EU_BASE_URL.to_string()
}

/// Sign a short-lived ES256 bearer token with the service-account key.
/// Claims follow the platform convention: issuer and subject are the
/// service-account (or application-space) identifier, with a unique JWT ID.
fn self_signed_token(jwk: &EcJwk, subject: &str) -> Result<String> {
    if jwk.kty != "EC" || jwk.crv != "P-256" {
        bail!(
            "unsupported private key type {}/{}, expected EC/P-256",
            jwk.kty,
            jwk.crv
        );
    }

    let scalar = URL_SAFE_NO_PAD
        .decode(&jwk.d)
        .context("failed to decode JWK 'd' coordinate")?;
    let secret_key =
        p256::SecretKey::from_slice(&scalar).context("JWK does not hold a valid P-256 key")?;
    let der = secret_key
        .to_pkcs8_der()
        .context("failed to encode private key")?;
    let key = EncodingKey::from_ec_der(der.as_bytes());

    let now = Utc::now();
    let claims = Claims {
        iss: subject.to_string(),
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: (now + ChronoDuration::seconds(TOKEN_LIFETIME_SECS)).timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    let mut header = Header::new(Algorithm::ES256);
    if !jwk.kid.is_empty() {
        header.kid = Some(jwk.kid.clone());
    }

    jsonwebtoken::encode(&header, &claims, &key).context("failed to sign bearer token")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // P-256 test key from RFC 7515 appendix A.3.
    fn test_jwk() -> serde_json::Value {
        json!({
            "kty": "EC",
            "crv": "P-256",
            "kid": "test-key-1",
            "d": "jpsQnnGQmL-YBIffH1136cspYG6-0iY7X1fCE9-E9LI",
            "x": "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
            "y": "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0"
        })
    }

    #[test]
    fn test_parse_with_literal_token() {
        let raw = json!({
            "serviceAccountId": "gid:AAAAAAAAAAAAAAAAAAAAAA",
            "baseUrl": "https://custom.stratos.example",
            "token": "literal-token"
        });
        let creds = Credentials::parse(&raw.to_string()).unwrap();
        assert_eq!(creds.token, "literal-token");
        assert_eq!(creds.base_url, "https://custom.stratos.example/configs/v1");
    }

    #[test]
    fn test_base_url_suffix_not_duplicated() {
        let raw = json!({
            "baseUrl": "https://custom.stratos.example/configs/v1/",
            "token": "t"
        });
        let creds = Credentials::parse(&raw.to_string()).unwrap();
        assert_eq!(creds.base_url, "https://custom.stratos.example/configs/v1");
    }

    #[test]
    fn test_endpoint_region_fallback() {
        let raw = json!({"endpoint": "us.api.stratos.cloud:443", "token": "t"});
        let creds = Credentials::parse(&raw.to_string()).unwrap();
        assert_eq!(creds.base_url, US_BASE_URL);

        let raw = json!({"token": "t"});
        let creds = Credentials::parse(&raw.to_string()).unwrap();
        assert_eq!(creds.base_url, EU_BASE_URL);
    }

    #[test]
    fn test_self_signed_token_shape() {
        let raw = json!({
            "serviceAccountId": "gid:U2VydmljZUFjY291bnQxMg",
            "privateKeyJWK": test_jwk()
        });
        let creds = Credentials::parse(&raw.to_string()).unwrap();

        let header = jsonwebtoken::decode_header(&creds.token).unwrap();
        assert_eq!(header.alg, Algorithm::ES256);
        assert_eq!(header.kid.as_deref(), Some("test-key-1"));

        // Inspect claims without verifying the signature.
        let payload = creds.token.split('.').nth(1).unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(payload).unwrap();
        let claims: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(claims["iss"], "gid:U2VydmljZUFjY291bnQxMg");
        assert_eq!(claims["sub"], "gid:U2VydmljZUFjY291bnQxMg");
        let lifetime = claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap();
        assert_eq!(lifetime, TOKEN_LIFETIME_SECS);
        assert!(!claims["jti"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_missing_token_and_key_is_rejected() {
        let err = Credentials::parse(r#"{"serviceAccountId": "gid:x"}"#).unwrap_err();
        assert!(err.to_string().contains("privateKeyJWK"));
    }

    #[test]
    fn test_key_without_subject_is_rejected() {
        let raw = json!({"privateKeyJWK": test_jwk()});
        let err = Credentials::parse(&raw.to_string()).unwrap_err();
        assert!(err.to_string().contains("serviceAccountId or appSpaceId"));
    }
}

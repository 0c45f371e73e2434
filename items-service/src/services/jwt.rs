use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

/// Signing algorithms accepted for access tokens. Anything else is treated
/// as a downgrade attempt.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Why a credential was refused. Callers see a generic 401; the variant is
/// for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Authorization header is not a Bearer credential")]
    MalformedHeader,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token is not valid yet")]
    NotYetValid,

    #[error("Token signature does not match")]
    BadSignature,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

impl TokenError {
    /// True when the request itself was malformed, as opposed to carrying a
    /// well-formed but unacceptable token.
    pub fn is_malformed(&self) -> bool {
        matches!(self, TokenError::MissingHeader | TokenError::MalformedHeader)
    }
}

/// Identity extracted from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user ID)
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Deserialize)]
struct PeekedHeader {
    alg: String,
}

/// Stateless verifier for HMAC-signed access tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &Secret<String>, audience: Option<&str>) -> Result<Self, anyhow::Error> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // exp and nbf are checked to the second
        validation.leeway = 0;
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        tracing::info!(
            audience = audience.unwrap_or("<any>"),
            "Token verifier initialized with HMAC algorithms"
        );

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Verifies a raw `Authorization` header value.
    pub fn verify_header(&self, raw: Option<&str>) -> Result<IdentityClaims, TokenError> {
        let raw = raw.map(str::trim).filter(|v| !v.is_empty());
        let raw = raw.ok_or(TokenError::MissingHeader)?;

        let token = raw
            .strip_prefix(BEARER_PREFIX)
            .map(str::trim)
            .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
            .ok_or(TokenError::MalformedHeader)?;

        self.verify(token)
    }

    /// Verifies a bare token.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        let alg = peek_algorithm(token)?;
        if !HMAC_ALGORITHMS.iter().any(|a| format!("{:?}", a) == alg) {
            return Err(TokenError::UnsupportedAlgorithm(alg));
        }

        let data = decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm(alg.clone()),
                _ => TokenError::Invalid(e.to_string()),
            })?;

        if data.claims.sub.trim().is_empty() {
            return Err(TokenError::Invalid("token has no subject".to_string()));
        }

        Ok(data.claims)
    }
}

/// Reads the `alg` field without trusting anything else in the token.
fn peek_algorithm(token: &str) -> Result<String, TokenError> {
    let header = token
        .split('.')
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| TokenError::Invalid("token has no header".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(header.trim_end_matches('='))
        .map_err(|e| TokenError::Invalid(format!("token header is not base64url: {}", e)))?;
    let header: PeekedHeader = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Invalid(format!("token header is not valid JSON: {}", e)))?;

    Ok(header.alg)
}

//! Credentials and session tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Sessions are stateless
//! tokens: a base64url JSON payload followed by its HMAC-SHA256 signature.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Payload carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(user_id: i64, secret: &[u8], ttl_secs: u64) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp();
    let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    let claims = Claims { sub: user_id, iat: now, exp: now.saturating_add(ttl) };
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| anyhow::anyhow!("invalid token secret: {}", e))?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

pub fn verify_token(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| TokenError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::BadSignature)?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| TokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

    if chrono::Utc::now().timestamp() > claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// Hashes a password into a PHC string (`$argon2id$v=19$...`) with a fresh salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))
}

/// Checks a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

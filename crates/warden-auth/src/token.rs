//! JWT bearer token issuance and verification.
//!
//! Tokens are EdDSA (Ed25519) JWTs. A session token's `jti` is the
//! token id of its session record; impersonation tokens have no session.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Issued by a staff login and backed by a session record.
    Session,
    /// Issued to a staff member acting as a tenant.
    Impersonation,
}

/// JWT claims embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: principal ID, or tenant ID for impersonation tokens.
    pub sub: String,
    /// Admin role, or tenant role for impersonation tokens.
    pub role: String,
    /// Principal token version at issue time.
    pub ver: u64,
    pub kind: TokenKind,
    /// Acting principal ID on impersonation tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub act: Option<String>,
    /// Unique token ID (UUID string).
    pub jti: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    pub iss: String,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Result<DateTime<Utc>, AuthError> {
        DateTime::from_timestamp(self.exp, 0)
            .ok_or_else(|| AuthError::TokenInvalid("exp out of range".into()))
    }
}

/// Claims to sign; `jti`, `iat`, `exp` and `iss` are filled in on issue.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub sub: String,
    pub role: String,
    pub ver: u64,
    pub kind: TokenKind,
    pub act: Option<String>,
    pub lifetime_secs: u64,
}

/// A signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// Sign a new EdDSA token for `grant`.
pub fn issue_token(grant: TokenGrant, config: &AuthConfig) -> Result<IssuedToken, AuthError> {
    let now = Utc::now().timestamp();
    let lifetime = i64::try_from(grant.lifetime_secs)
        .map_err(|_| AuthError::Config("token lifetime out of range".into()))?;
    let claims = TokenClaims {
        sub: grant.sub,
        role: grant.role,
        ver: grant.ver,
        kind: grant.kind,
        act: grant.act,
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + lifetime,
        iss: config.jwt_issuer.clone(),
    };

    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;

    let token = jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))?;

    Ok(IssuedToken { token, claims })
}

/// Verify signature, issuer and expiry, and return the claims.
///
/// Purely stateless; session and token-version checks happen in the
/// authenticator.
pub fn decode_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
    // The session record expires at exactly `exp`.
    validation.leeway = 0;

    jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

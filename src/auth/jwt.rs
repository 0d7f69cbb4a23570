//! Session tokens
//!
//! A login yields an HS256 token whose `sub` is the ledger user id. Bet
//! handlers trust that id for ownership checks, so the token carries nothing
//! else the ledger relies on.

use crate::auth::models::Claims;
use crate::models::User;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// An issued session token and its remaining lifetime in seconds
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_in: usize,
}

pub struct JwtHandler {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl JwtHandler {
    pub fn new(secret: String, expiration_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime: Duration::hours(expiration_hours),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a session for `user` starting at `now`.
    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<SessionToken> {
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .context("Session expiry out of range")?;

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            exp: expires_at.timestamp().max(0) as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign session token")?;

        debug!(user_id = %user.id, "Issued session until {}", expires_at);
        Ok(SessionToken {
            token,
            expires_in: self.lifetime.num_seconds().max(0) as usize,
        })
    }

    /// Verify signature and expiry, returning the session claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(token, &self.decoding, &self.validation)
            .context("Invalid or expired session token")?;
        Ok(decoded.claims)
    }
}

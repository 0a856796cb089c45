//! Bearer-token service.
//!
//! The core only needs an owner id out of the credential; issuance and
//! refresh happen elsewhere. HS256 with a shared secret.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Owner id of the authenticated user.
    pub sub: String,
    pub iss: String,
    pub exp: i64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    pub fn create_token(&self, owner_id: &str) -> Result<String> {
        let claims = Claims {
            sub: owner_id.to_string(),
            iss: self.issuer.clone(),
            exp: (Utc::now() + Duration::hours(24)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).context("Failed to sign token")
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .context("Invalid or expired token")?;
        Ok(data.claims)
    }
}

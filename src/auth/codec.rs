//! Signing and verification of access and refresh credentials.
//!
//! Both kinds are HS256 JWTs signed with the same process-wide secret and
//! distinguished by their `kind` claim. The codec holds no state beyond the key.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::CredentialError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Access,
    Refresh,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::Access => f.write_str("access"),
            CredentialKind::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub kind: CredentialKind,
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
    pub jti: String,  // Keeps same-second credentials distinct
}

/// A freshly signed credential together with the expiry encoded inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Payload of a credential that passed signature and expiry checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub subject_id: Uuid,
    pub kind: CredentialKind,
    pub expires_at: DateTime<Utc>,
}

pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl CredentialCodec {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.refresh_token_ttl_days),
        )
    }

    pub fn ttl(&self, kind: CredentialKind) -> Duration {
        match kind {
            CredentialKind::Access => self.access_ttl,
            CredentialKind::Refresh => self.refresh_ttl,
        }
    }

    pub fn issue(&self, subject_id: Uuid, kind: CredentialKind) -> Result<IssuedCredential, CredentialError> {
        self.issue_at(subject_id, kind, Utc::now())
    }

    /// Mints a credential as if issued at `issued_at`; expiry is `issued_at + ttl(kind)`.
    pub fn issue_at(
        &self,
        subject_id: Uuid,
        kind: CredentialKind,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedCredential, CredentialError> {
        let iat = issued_at.timestamp();
        let exp = issued_at
            .checked_add_signed(self.ttl(kind))
            .ok_or_else(|| CredentialError::Signing(format!("{} expiry out of range", kind)))?
            .timestamp();
        let claims = Claims {
            sub: subject_id.to_string(),
            kind,
            exp,
            iat,
            jti: Uuid::new_v4().to_string(),
        };

        let value = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CredentialError::Signing(e.to_string()))?;

        Ok(IssuedCredential {
            value,
            expires_at: timestamp_to_utc(exp)?,
        })
    }

    pub fn verify(&self, value: &str) -> Result<VerifiedCredential, CredentialError> {
        let data = decode::<Claims>(value, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => CredentialError::Expired,
                _ => CredentialError::Malformed,
            }
        })?;

        let subject_id = Uuid::parse_str(&data.claims.sub).map_err(|_| CredentialError::Malformed)?;

        Ok(VerifiedCredential {
            subject_id,
            kind: data.claims.kind,
            expires_at: timestamp_to_utc(data.claims.exp)?,
        })
    }
}

fn timestamp_to_utc(secs: i64) -> Result<DateTime<Utc>, CredentialError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(CredentialError::Malformed)
}

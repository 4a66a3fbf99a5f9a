// sift-auth-rs/src/token.rs
//
// Session tokens
// HS256 JWTs carrying the account id. Verification returns an Option:
// any invalid, expired, or malformed token is simply no identity.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id as a string.
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// Signs and verifies session tokens with a shared secret.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Verify a token and extract the account id it was issued for.
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Uuid::parse_str(&data.claims.sub).ok(),
            Err(err) => {
                debug!("rejected session token: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("unit-test-secret", 1800)
    }

    #[test]
    fn issued_tokens_verify_to_the_same_account() {
        let signer = signer();
        let user_id = Uuid::new_v4();
        let token = signer.issue(user_id).unwrap();
        assert_eq!(signer.verify(&token), Some(user_id));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let signer = signer();
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            iat: now - 3600,
            exp: now - 120,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();
        assert_eq!(signer.verify(&token), None);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = TokenSigner::new("other-secret", 1800)
            .issue(Uuid::new_v4())
            .unwrap();
        assert_eq!(signer().verify(&token), None);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(signer().verify(""), None);
        assert_eq!(signer().verify("not.a.jwt"), None);
        assert_eq!(signer().verify("a.b"), None);
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: "user-42".to_string(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();
        assert_eq!(signer().verify(&token), None);
    }
}

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use bazaar_types::api::TokenClaims;
use bazaar_types::models::Principal;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("authorization value is not a bearer token")]
    MissingScheme,
    #[error("bearer token is empty")]
    Empty,
    #[error("token rejected: {0}")]
    Invalid(String),
}

/// Issues and verifies HS256 bearer tokens.
///
/// Tokens are stateless: there is no server-side session or revocation list,
/// so a token stays valid until `exp` and logging out only discards it client-side.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            ttl,
        }
    }

    pub fn issue(&self, principal: &Principal) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: principal.id,
            email: principal.email.clone(),
            role: principal.role,
            iat: now.timestamp().max(0) as usize,
            exp: (now + self.ttl).timestamp().max(0) as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Verify a raw token (no scheme prefix).
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        Ok(Principal {
            id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }

    /// Verify an `Authorization` header value of the form `Bearer <token>`.
    pub fn verify_bearer(&self, header_value: &str) -> Result<Principal, TokenError> {
        let token = header_value
            .trim_start()
            .strip_prefix(BEARER_PREFIX)
            .ok_or(TokenError::MissingScheme)?
            .trim();

        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        self.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use bazaar_types::models::Role;
    use uuid::Uuid;

    use super::*;

    fn service() -> TokenService {
        TokenService::new("unit-test-secret", Duration::hours(1))
    }

    fn seller() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "seller@shop.test".into(),
            role: Role::Seller,
        }
    }

    #[test]
    fn issued_token_verifies_to_same_principal() {
        let tokens = service();
        let principal = seller();

        let token = tokens.issue(&principal).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), principal);
        assert_eq!(
            tokens.verify_bearer(&format!("Bearer {token}")).unwrap(),
            principal
        );
    }

    #[test]
    fn role_survives_round_trip() {
        let tokens = service();
        let buyer = Principal {
            role: Role::Buyer,
            ..seller()
        };
        let token = tokens.issue(&buyer).unwrap();
        assert_eq!(tokens.verify(&token).unwrap().role, Role::Buyer);
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let tokens = service();
        assert_eq!(tokens.verify_bearer("garbage"), Err(TokenError::MissingScheme));
        assert_eq!(tokens.verify_bearer("Bearer "), Err(TokenError::Empty));
        assert_eq!(tokens.verify_bearer("Bearer    "), Err(TokenError::Empty));
        assert_eq!(tokens.verify_bearer(""), Err(TokenError::MissingScheme));
        assert!(matches!(
            tokens.verify_bearer("Bearer not.a.jwt"),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(tokens.verify("garbage"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = TokenService::new("some-other-secret", Duration::hours(1));
        let token = other.issue(&seller()).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = TokenService::new("unit-test-secret", Duration::hours(-2));
        let token = expired.issue(&seller()).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid(_))));
    }
}

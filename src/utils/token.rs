// utils/token.rs
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::usermodel::{Actor, UserRole},
};

/// Claims issued by the identity provider and trusted by this service.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<UserRole>,
    pub iat: usize,
    pub exp: usize,
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<Actor, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    Ok(Actor::new(id, decoded.claims.roles))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    /// Issues a token the way the identity provider does.
    pub fn create_token(
        user_id: &str,
        roles: &[UserRole],
        secret: &[u8],
        expires_in_minutes: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        if user_id.is_empty() {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
        }

        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            roles: roles.to_vec(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::minutes(expires_in_minutes)).timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
    }

    #[test]
    fn test_round_trip_carries_roles() {
        let id = Uuid::new_v4();
        let token = create_token(&id.to_string(), &[UserRole::Worker], b"secret", 60).unwrap();

        let actor = decode_token(token, b"secret").unwrap();
        assert_eq!(actor.id, id);
        assert!(actor.has_role(UserRole::Worker));
        assert!(!actor.has_role(UserRole::Employer));
    }

    #[test]
    fn test_wrong_secret_and_expired_token_are_rejected() {
        let id = Uuid::new_v4().to_string();
        let token = create_token(&id, &[UserRole::Employer], b"secret", 60).unwrap();
        assert!(decode_token(token, b"other").is_err());

        let expired = create_token(&id, &[UserRole::Employer], b"secret", -120).unwrap();
        assert!(decode_token(expired, b"secret").is_err());
    }

    #[test]
    fn test_empty_subject_is_refused() {
        assert!(create_token("", &[], b"secret", 60).is_err());
    }
}

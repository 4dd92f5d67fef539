use crate::core::errors::LedgerError;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Traveler ID
    pub exp: usize,
}

pub struct JwtService {
    secret: String,
    ttl: Duration,
}

impl JwtService {
    pub fn new(secret: String, ttl: Duration) -> Self {
        JwtService { secret, ttl }
    }

    pub fn generate_token(&self, traveler_id: &str) -> Result<String, LedgerError> {
        let expiration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| (d + self.ttl).as_secs() as usize)
            .map_err(|e| LedgerError::InternalServerError(format!("Time error: {}", e)))?;

        let claims = Claims {
            sub: traveler_id.to_string(),
            exp: expiration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| LedgerError::InternalServerError(format!("JWT encoding error: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, LedgerError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| LedgerError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_carries_the_traveler_id() {
        let jwt = JwtService::new("secret".to_string(), Duration::from_secs(60));
        let token = jwt.generate_token("traveler-1").unwrap();
        let claims = jwt.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "traveler-1");
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let issuer = JwtService::new("one".to_string(), Duration::from_secs(60));
        let verifier = JwtService::new("two".to_string(), Duration::from_secs(60));
        let token = issuer.generate_token("traveler-1").unwrap();
        assert!(matches!(verifier.validate_token(&token), Err(LedgerError::Unauthorized(_))));
    }
}

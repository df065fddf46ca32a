use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    error::{Error, HtmlError},
    schema::{Id, User},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user_id: Id, email: String, ttl: Duration) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + ttl).timestamp();

        Self {
            user_id,
            email,
            iat,
            exp,
        }
    }

    pub fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
}

impl From<&User> for SessionData {
    fn from(value: &User) -> Self {
        Self { user_id: value.id }
    }
}

/// Signs and verifies session tokens with an HMAC-SHA256 key.
#[derive(Clone)]
pub struct TokenKey {
    key: Hmac<Sha256>,
    ttl: Duration,
}

impl TokenKey {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_| HtmlError::InternalError.new("Invalid token signing key"))?;

        Ok(Self { key, ttl })
    }

    pub fn generate_jwt_session(&self, user: &User) -> Result<String, Error> {
        let claims = JwtSessionData::new(user.id, user.email.to_owned(), self.ttl);

        claims
            .sign_with_key(&self.key)
            .map_err(|_| HtmlError::InternalError.new("Failed to sign session token"))
    }

    pub fn verify_jwt_session(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token.verify_with_key(&self.key).map_err(|e| {
            debug!("Rejected session token: {e}");
            HtmlError::InvalidSession.default()
        })?;

        if session.expires_at() < Utc::now().timestamp() {
            debug!("Rejected expired session token for user {}", session.user_id);
            return Err(HtmlError::InvalidSession.default());
        }

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: String::from("user@example.com"),
            password: String::new(),
            name: String::from("User"),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let key = TokenKey::new(b"secret", Duration::hours(1)).unwrap();
        let token = key.generate_jwt_session(&user()).unwrap();
        let session = key.verify_jwt_session(&token).unwrap();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.email, "user@example.com");
        assert!(session.expires_at() > Utc::now().timestamp());
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let key = TokenKey::new(b"secret", Duration::hours(1)).unwrap();
        let other = TokenKey::new(b"another secret", Duration::hours(1)).unwrap();
        let token = other.generate_jwt_session(&user()).unwrap();

        let error = key.verify_jwt_session(&token).unwrap_err();
        assert_eq!(error.code, 401);
    }

    #[test]
    fn expired_token_is_rejected() {
        let key = TokenKey::new(b"secret", Duration::hours(-1)).unwrap();
        let token = key.generate_jwt_session(&user()).unwrap();

        assert_eq!(key.verify_jwt_session(&token).unwrap_err().code, 401);
    }

    #[test]
    fn garbage_is_rejected() {
        let key = TokenKey::new(b"secret", Duration::hours(1)).unwrap();

        assert!(key.verify_jwt_session("not.a.token").is_err());
    }
}

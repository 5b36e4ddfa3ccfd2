use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::models::{Id, User};
use crate::routes::AppState;

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Tenant,
}

impl Role {
    pub fn for_user(user: &User) -> Self {
        if user.is_owner { Role::Owner } else { Role::Tenant }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<Id> {
        self.sub.parse().ok()
    }
}

/// HS256 signing material derived from the configured secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a session token for a user.
    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: Role::for_user(user),
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Validate a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Extractor yielding validated `Claims`.
pub struct Auth(pub Claims);

impl FromRequest for Auth {
    type Error = ApiError;
    type Future = Ready<Result<Self, ApiError>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            tracing::error!("AppState missing from app data");
            return ready(Err(ApiError::Internal));
        };
        // Delegate to BearerAuth to parse the header.
        if let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() {
            return match state.tokens.verify(bearer.token()) {
                Ok(claims) => ready(Ok(Auth(claims))),
                Err(_) => ready(Err(ApiError::Unauthorized("invalid token".into()))),
            };
        }
        ready(Err(ApiError::Unauthorized("authorization required".into())))
    }
}

/// Salted argon2 hash in PHC string form.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(err) => {
            tracing::error!("failed to parse password hash: {}", err);
            return false;
        }
    };
    Argon2::default().verify_password(password.as_bytes(), &hash).is_ok()
}

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use super::identity::{Identity, UserId};

// Errors returned by bearer-token verification + claim checks.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("token type '{0}' cannot be used for API access")]
    WrongType(String),

    #[error("empty '{0}' claim")]
    EmptyClaim(&'static str),
}

/// Claims minted by the user service for both access and refresh tokens.
///
/// NOTE:
/// - `type` is absent on older tokens; those are treated as access tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub id: UserId,
    pub username: String,
    pub role: String,
    pub exp: u64,

    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
}

/// HS256 verifier sharing its secret with the identity backend.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str, leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;
        // user service tokens carry no audience
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signature + `exp` check, then decode the raw claims.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data =
            jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Decode + reject refresh tokens and meaningless claims.
    ///
    /// This is the entry-point used by the authentication stage.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = self.decode(token)?;

        if let Some(kind) = claims.token_type.as_deref() {
            if kind != "access" {
                return Err(TokenError::WrongType(kind.to_string()));
            }
        }
        if claims.role.trim().is_empty() {
            return Err(TokenError::EmptyClaim("role"));
        }
        if let UserId::Text(id) = &claims.id {
            if id.trim().is_empty() {
                return Err(TokenError::EmptyClaim("id"));
            }
        }

        Ok(Identity {
            id: claims.id,
            username: claims.username,
            role: claims.role,
        })
    }
}

// src/auth.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http, Error, HttpMessage, HttpRequest, HttpResponse,
};
use futures::future::{ok, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Verifies bearer session tokens issued by the identity provider.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// RS256 verification against the provider's PEM public key.
    pub fn rs256(pem: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 5;
        Ok(Self {
            key: DecodingKey::from_rsa_pem(pem.as_bytes())?,
            validation,
        })
    }

    /// HS256 verification with a shared secret, for locally minted tokens.
    pub fn hs256(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, jsonwebtoken::errors::Error> {
        match (&config.clerk_jwt_key, &config.jwt_secret) {
            (Some(pem), _) => Self::rs256(&pem.replace("\\n", "\n")),
            (None, Some(secret)) => Ok(Self::hs256(secret)),
            (None, None) => Err(jsonwebtoken::errors::ErrorKind::InvalidKeyFormat.into()),
        }
    }

    /// Returns the user id (`sub`) of a valid token.
    pub fn verify(&self, token: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims.sub)
    }
}

/// Authenticated user id, stored in request extensions by [`Authentication`].
#[derive(Debug, Clone)]
pub struct UserId(pub String);

/// Returns the caller's user id or 401.
pub fn current_user(req: &HttpRequest) -> Result<String, ApiError> {
    req.extensions()
        .get::<UserId>()
        .map(|user| user.0.clone())
        .ok_or(ApiError::Unauthorized("Unauthorized"))
}

/// Middleware resolving `Authorization: Bearer <token>`. Requests without the
/// header pass through untouched; requests with a bad token get a 401.
#[derive(Clone)]
pub struct Authentication {
    verifier: Arc<TokenVerifier>,
}

impl Authentication {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            verifier: self.verifier.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    verifier: Arc<TokenVerifier>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string());

        if let Some(token) = token {
            match self.verifier.verify(&token) {
                Ok(user_id) => {
                    req.extensions_mut().insert(UserId(user_id));
                }
                Err(e) => {
                    log::debug!("Rejected bearer token: {}", e);
                    let (req_parts, _payload) = req.into_parts();
                    let resp = HttpResponse::Unauthorized()
                        .json(json!({ "message": "Invalid token" }))
                        .map_into_boxed_body();
                    let srv_resp = ServiceResponse::new(req_parts, resp);
                    return Box::pin(async move { Ok(srv_resp) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, sub: &str, valid_for: Duration) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: (Utc::now() + valid_for).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_tokens() {
        let verifier = TokenVerifier::hs256("secret");
        let user = verifier
            .verify(&token("secret", "user_1", Duration::hours(1)))
            .unwrap();
        assert_eq!(user, "user_1");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let verifier = TokenVerifier::hs256("secret");
        assert!(verifier
            .verify(&token("other", "user_1", Duration::hours(1)))
            .is_err());
        assert!(verifier
            .verify(&token("secret", "user_1", Duration::hours(-2)))
            .is_err());
    }

    #[test]
    fn rejects_garbage_pem() {
        assert!(TokenVerifier::rs256("not a key").is_err());
    }
}

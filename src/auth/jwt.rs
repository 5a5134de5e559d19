use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::claims::{Claims, TokenKind},
    config::JwtConfig,
    state::AppState,
};

/// Verification side of the account service's HS256 tokens.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header".to_string(),
            ))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        if claims.kind != TokenKind::Access {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Access token required".to_string(),
            ));
        }

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};

    fn test_jwt() -> JwtConfig {
        JwtConfig {
            secret: "dev-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
        }
    }

    fn sign(cfg: &JwtConfig, user_id: Uuid, kind: TokenKind) -> String {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: (now + Duration::minutes(5)).unix_timestamp() as usize,
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
            kind,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.secret.as_bytes()),
        )
        .expect("sign token")
    }

    async fn extract(cfg: &JwtConfig, header: Option<String>) -> Result<Uuid, StatusCode> {
        let mut builder = Request::builder().uri("/plans");
        if let Some(h) = header {
            builder = builder.header("authorization", h);
        }
        let (mut parts, _) = builder.body(()).expect("request").into_parts();
        let keys = JwtKeys::new(cfg);
        AuthUser::from_request_parts(&mut parts, &keys)
            .await
            .map(|AuthUser(id)| id)
            .map_err(|(status, _)| status)
    }

    #[test]
    fn verify_accepts_matching_issuer_and_audience() {
        let cfg = test_jwt();
        let user_id = Uuid::new_v4();
        let token = sign(&cfg, user_id, TokenKind::Access);
        let claims = JwtKeys::new(&cfg).verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = test_jwt();
        let bad = JwtConfig {
            issuer: "bad-iss".into(),
            audience: "bad-aud".into(),
            ..test_jwt()
        };
        let token = sign(&good, Uuid::new_v4(), TokenKind::Access);
        assert!(JwtKeys::new(&bad).verify(&token).is_err());
    }

    #[tokio::test]
    async fn extractor_returns_subject_of_access_token() {
        let cfg = test_jwt();
        let user_id = Uuid::new_v4();
        let token = sign(&cfg, user_id, TokenKind::Access);
        assert_eq!(extract(&cfg, Some(format!("Bearer {token}"))).await, Ok(user_id));
    }

    #[tokio::test]
    async fn extractor_rejects_missing_header_and_refresh_tokens() {
        let cfg = test_jwt();
        assert_eq!(extract(&cfg, None).await, Err(StatusCode::UNAUTHORIZED));

        let refresh = sign(&cfg, Uuid::new_v4(), TokenKind::Refresh);
        assert_eq!(
            extract(&cfg, Some(format!("Bearer {refresh}"))).await,
            Err(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            extract(&cfg, Some("Basic abc".into())).await,
            Err(StatusCode::UNAUTHORIZED)
        );
    }
}

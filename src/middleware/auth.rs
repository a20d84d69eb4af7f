use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Verified identity attached to every request. The platform's identity
/// provider issues these tokens; this service only validates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    pub department: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> crate::error::Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| crate::error::Error::Unauthorized("Invalid subject claim".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .map(|r| r.eq_ignore_ascii_case("admin"))
            .unwrap_or(false)
    }

    pub fn can_assign(&self) -> bool {
        self.role
            .as_deref()
            .map(|r| ["admin", "manager"].iter().any(|a| r.eq_ignore_ascii_case(a)))
            .unwrap_or(false)
    }
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

fn bearer_token(req: &Request) -> Result<&str, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization"})),
        )
            .into_response());
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"bad_authorization"})),
        )
            .into_response());
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"unsupported_scheme"})),
        )
            .into_response());
    };
    Ok(token)
}

pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    let token = match bearer_token(&req) {
        Ok(t) => t.to_string(),
        Err(resp) => return resp,
    };

    let config = crate::config::get_config();
    match decode_claims(&token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_token"})),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_token(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn decode_roundtrip_preserves_identity() {
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            role: Some("manager".to_string()),
            department: Some("engineering".to_string()),
        };
        let token = make_token(&claims, "secret");

        let decoded = decode_claims(&token, "secret").expect("valid token");
        assert_eq!(decoded.user_id().unwrap(), user_id);
        assert_eq!(decoded.department.as_deref(), Some("engineering"));
        assert!(decoded.can_assign());
        assert!(!decoded.is_admin());
    }

    #[test]
    fn decode_rejects_wrong_secret() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            role: None,
            department: None,
        };
        let token = make_token(&claims, "secret");
        assert!(decode_claims(&token, "other").is_err());
    }

    #[test]
    fn role_checks_are_case_insensitive() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: 0,
            role: Some("Admin".to_string()),
            department: None,
        };
        assert!(claims.is_admin());
        assert!(claims.can_assign());

        let employee = Claims {
            role: Some("employee".to_string()),
            ..claims
        };
        assert!(!employee.is_admin());
        assert!(!employee.can_assign());
    }
}

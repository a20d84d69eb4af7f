use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;

use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn my_certificates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let certificates = state
        .certificate_service
        .list_for_user(claims.user_id()?)
        .await?;
    Ok(Json(certificates).into_response())
}

#[axum::debug_handler]
pub async fn download_certificate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(certificate_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let detail = state
        .certificate_service
        .get_for_download(certificate_id, claims.user_id()?)
        .await?;
    Ok(Json(detail).into_response())
}

#[axum::debug_handler]
pub async fn revoke_certificate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(certificate_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    state
        .certificate_service
        .revoke(certificate_id, claims.user_id()?, claims.is_admin())
        .await?;
    Ok(Json(serde_json::json!({ "revoked": true })).into_response())
}

pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{domain::UserRole, error::AppError, state::AppState};

/// Acting-user context consumed by every protected operation: identity,
/// role and the office the user currently acts on behalf of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
    pub office_id: Option<Uuid>,
}

impl AuthenticatedUser {
    /// Role gate; office-level checks happen per document in the handlers.
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), AppError> {
        let role = UserRole::parse(&self.role).ok_or_else(AppError::unauthorized)?;
        if allowed.contains(&role) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role,
                "role lacks permission for requested operation"
            );
            Err(AppError::forbidden(
                "Su rol no tiene permiso para esta operación.",
            ))
        }
    }

    /// Users without an assigned office cannot receive, derive or close
    /// documents.
    pub fn require_office(&self) -> Result<Uuid, AppError> {
        self.office_id.ok_or_else(|| {
            AppError::bad_request("El usuario no tiene una oficina asignada.")
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
            office_id: claims.office_id,
        })
    }
}

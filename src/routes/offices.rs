use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::domain::{OfficeType, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::{NewOffice, Office};
use crate::schema::offices;
use crate::state::AppState;

#[derive(Serialize)]
pub struct OfficeResponse {
    pub id: Uuid,
    pub name: String,
    pub acronym: String,
    pub office_type: String,
    pub parent_office_id: Option<Uuid>,
}

impl From<Office> for OfficeResponse {
    fn from(office: Office) -> Self {
        Self {
            id: office.id,
            name: office.name,
            acronym: office.acronym,
            office_type: office.office_type,
            parent_office_id: office.parent_office_id,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateOfficeRequest {
    pub name: String,
    pub acronym: String,
    pub office_type: String,
    pub parent_office_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ReparentOfficeRequest {
    pub parent_office_id: Option<Uuid>,
}

pub async fn list_offices(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Vec<OfficeResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<Office> = offices::table.order(offices::name.asc()).load(&mut conn)?;
    Ok(Json(rows.into_iter().map(OfficeResponse::from).collect()))
}

pub async fn create_office(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateOfficeRequest>,
) -> AppResult<(StatusCode, Json<OfficeResponse>)> {
    user.require_role(&[UserRole::SuperAdmin])?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    let acronym = payload.acronym.trim().to_string();
    if acronym.is_empty() {
        return Err(AppError::bad_request("acronym must not be empty"));
    }
    if OfficeType::parse(&payload.office_type).is_none() {
        return Err(AppError::bad_request("unknown office_type"));
    }

    let mut conn = state.db()?;
    let office = conn.transaction::<Office, AppError, _>(|conn| {
        if let Some(parent_id) = payload.parent_office_id {
            let parent_exists: Option<Office> =
                offices::table.find(parent_id).first(conn).optional()?;
            if parent_exists.is_none() {
                return Err(AppError::bad_request("parent office does not exist"));
            }
        }

        let new_office = NewOffice {
            id: Uuid::new_v4(),
            name: name.clone(),
            acronym,
            office_type: payload.office_type,
            parent_office_id: payload.parent_office_id,
        };
        diesel::insert_into(offices::table)
            .values(&new_office)
            .execute(conn)
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => AppError::bad_request("an office with that name already exists"),
                other => AppError::from(other),
            })?;

        Ok(offices::table.find(new_office.id).first(conn)?)
    })?;

    info!(office = %office.name, "office created");
    Ok((StatusCode::CREATED, Json(office.into())))
}

pub async fn reparent_office(
    State(state): State<AppState>,
    Path(office_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<ReparentOfficeRequest>,
) -> AppResult<Json<OfficeResponse>> {
    user.require_role(&[UserRole::SuperAdmin])?;

    let mut conn = state.db()?;
    let office = conn.transaction::<Office, AppError, _>(|conn| {
        let office: Option<Office> = offices::table.find(office_id).first(conn).optional()?;
        let office = office.ok_or_else(AppError::not_found)?;

        if let Some(parent_id) = payload.parent_office_id {
            ensure_no_cycle(conn, office.id, parent_id)?;
        }

        diesel::update(offices::table.find(office.id))
            .set((
                offices::parent_office_id.eq(payload.parent_office_id),
                offices::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

        Ok(offices::table.find(office.id).first(conn)?)
    })?;

    Ok(Json(office.into()))
}

/// Walks the prospective parent chain upward and rejects the write if it
/// ever reaches the office being re-parented. Keeps the tree a strict tree.
fn ensure_no_cycle(
    conn: &mut PgConnection,
    office_id: Uuid,
    new_parent_id: Uuid,
) -> Result<(), AppError> {
    if new_parent_id == office_id {
        return Err(AppError::bad_request("an office cannot be its own parent"));
    }

    let mut cursor = Some(new_parent_id);
    while let Some(current) = cursor {
        let parent: Option<Option<Uuid>> = offices::table
            .find(current)
            .select(offices::parent_office_id)
            .first(conn)
            .optional()?;

        match parent {
            None => return Err(AppError::bad_request("parent office does not exist")),
            Some(next) => {
                if next == Some(office_id) {
                    return Err(AppError::bad_request(
                        "re-parenting would create a cycle in the office tree",
                    ));
                }
                cursor = next;
            }
        }
    }

    Ok(())
}

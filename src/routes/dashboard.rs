//! Read-only analytics over the document table. Eventually-consistent
//! snapshots; no locking, three independent queries.

use axum::extract::{Json, State};
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::domain::{UserRole, PENDING_STATUSES, TERMINAL_STATUSES};
use crate::error::AppResult;
use crate::history;
use crate::models::Document;
use crate::schema::documents;
use crate::state::AppState;

const BOTTLENECK_LIMIT: i64 = 5;

#[derive(Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Serialize)]
pub struct BottleneckDocument {
    pub code: String,
    pub days_open: i64,
    pub office: Option<String>,
}

#[derive(Serialize)]
pub struct OfficeLoad {
    pub office: Option<String>,
    pub count: i64,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub stats: Vec<StatusCount>,
    pub urgent_docs: Vec<BottleneckDocument>,
    pub office_load: Vec<OfficeLoad>,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<DashboardResponse>> {
    user.require_role(&[UserRole::SuperAdmin, UserRole::Gerente])?;

    let mut conn = state.db()?;

    let stats: Vec<StatusCount> = documents::table
        .group_by(documents::current_status)
        .select((documents::current_status, count_star()))
        .load::<(String, i64)>(&mut conn)?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    // Oldest still-pending documents are where the process is stuck.
    let bottlenecks: Vec<Document> = documents::table
        .filter(documents::current_status.eq_any(PENDING_STATUSES))
        .order(documents::created_at.asc())
        .limit(BOTTLENECK_LIMIT)
        .load(&mut conn)?;

    let by_office: Vec<(Uuid, i64)> = documents::table
        .filter(documents::current_status.ne_all(TERMINAL_STATUSES))
        .group_by(documents::current_office_id)
        .select((documents::current_office_id, count_star()))
        .load(&mut conn)?;

    let mut office_ids: Vec<Uuid> = bottlenecks.iter().map(|d| d.current_office_id).collect();
    office_ids.extend(by_office.iter().map(|(id, _)| *id));
    office_ids.sort();
    office_ids.dedup();
    let office_names = history::load_office_names(&mut conn, &office_ids)?;

    let now = Utc::now().naive_utc();
    let urgent_docs = bottlenecks
        .into_iter()
        .map(|doc| BottleneckDocument {
            code: doc.tracking_code,
            days_open: (now - doc.created_at).num_days(),
            office: office_names.get(&doc.current_office_id).cloned(),
        })
        .collect();

    let office_load = by_office
        .into_iter()
        .map(|(office_id, count)| OfficeLoad {
            office: office_names.get(&office_id).cloned(),
            count,
        })
        .collect();

    Ok(Json(DashboardResponse {
        stats,
        urgent_docs,
        office_load,
    }))
}

//! Downtime projects: per-campaign efforts that accrue progress points.
//! Point updates are last-write-wins, same as every other field update.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use steel_db::Database;
use steel_db::models::ProjectRow;
use steel_types::api::{Claims, CreateProjectRequest, ProjectResponse, UpdateProjectRequest};
use steel_types::models::Actor;

use crate::access::{self, AccessLevel};
use crate::auth::AppState;
use crate::campaigns;
use crate::error::ApiError;
use crate::{db_timestamp, parse_uuid, run_blocking, users};

// -- Operations --

pub fn create(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
    name: &str,
    points: i64,
    sheet: Option<&Value>,
) -> Result<ProjectResponse, ApiError> {
    let campaign = campaigns::active_row(db, actor, campaign_id)?;
    if campaigns::level_of(db, &campaign, actor)? < AccessLevel::Gm {
        warn!(
            "project create in campaign {} denied for {}",
            campaign_id, actor.id
        );
        return Err(ApiError::AccessDenied);
    }

    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("project name must not be empty".into()));
    }

    let data = match sheet {
        Some(value) => Some(serde_json::to_string(value).map_err(|e| ApiError::Internal(e.into()))?),
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    db.insert_project(
        &id,
        campaign_id,
        name,
        points,
        data.as_deref(),
        &actor.id.to_string(),
    )?;
    info!(
        "project {} created in campaign {} by {}",
        id, campaign_id, actor.id
    );

    load_response(db, &id)
}

pub fn fetch(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
    id: &str,
) -> Result<ProjectResponse, ApiError> {
    let (row, level) = active_row(db, actor, campaign_id, id)?;
    if level == AccessLevel::None {
        warn!("project {} read denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }
    to_response(row)
}

pub fn list(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
) -> Result<Vec<ProjectResponse>, ApiError> {
    let campaign = campaigns::active_row(db, actor, campaign_id)?;
    if campaigns::level_of(db, &campaign, actor)? == AccessLevel::None {
        warn!(
            "project list for campaign {} denied for {}",
            campaign_id, actor.id
        );
        return Err(ApiError::AccessDenied);
    }

    let rows = db.list_projects(campaign_id)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match to_response(row) {
                Ok(resp) => Some(resp),
                Err(err) => {
                    warn!("skipping unreadable project {}: {}", id, err);
                    None
                }
            }
        })
        .collect())
}

pub fn update(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
    id: &str,
    name: Option<String>,
    points: Option<i64>,
    sheet: Option<&Value>,
) -> Result<ProjectResponse, ApiError> {
    let (row, level) = active_row(db, actor, campaign_id, id)?;
    if level < AccessLevel::Gm {
        warn!("project {} update denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    let name = name.unwrap_or(row.name);
    if name.trim().is_empty() {
        return Err(ApiError::Validation("project name must not be empty".into()));
    }
    let points = points.unwrap_or(row.points);
    let data = match sheet {
        Some(value) => Some(serde_json::to_string(value).map_err(|e| ApiError::Internal(e.into()))?),
        None => row.data,
    };

    db.update_project(id, name.trim(), points, data.as_deref())?;
    info!("project {} updated by {}", id, actor.id);

    load_response(db, id)
}

pub fn remove(db: &Database, actor: &Actor, campaign_id: &str, id: &str) -> Result<(), ApiError> {
    let campaign = campaigns::active_row(db, actor, campaign_id)?;
    let row = db.get_project(id)?.ok_or(ApiError::NotFound)?;
    if row.campaign_id != campaign_id || row.is_deleted {
        return Err(ApiError::NotFound);
    }

    let campaign_level = campaigns::level_of(db, &campaign, actor)?;
    let level = access::encounter_access(&row.created_by, campaign_level, &actor.id.to_string());
    if level < AccessLevel::Gm {
        warn!("project {} delete denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    if !db.soft_delete_project(id)? {
        return Err(ApiError::NotFound);
    }
    info!("project {} deleted by {}", id, actor.id);
    Ok(())
}

fn active_row(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
    id: &str,
) -> Result<(ProjectRow, AccessLevel), ApiError> {
    let campaign = campaigns::active_row(db, actor, campaign_id)?;
    let campaign_level = campaigns::level_of(db, &campaign, actor)?;

    let row = db.get_project(id)?.ok_or(ApiError::NotFound)?;
    if row.campaign_id != campaign_id {
        return Err(ApiError::NotFound);
    }
    if row.is_deleted && !actor.is_admin {
        return Err(ApiError::NotFound);
    }

    let level = access::encounter_access(&row.created_by, campaign_level, &actor.id.to_string());
    Ok((row, level))
}

fn load_response(db: &Database, id: &str) -> Result<ProjectResponse, ApiError> {
    let row = db
        .get_project(id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("project {} missing after write", id)))?;
    to_response(row)
}

fn to_response(row: ProjectRow) -> Result<ProjectResponse, ApiError> {
    let sheet = match row.data.as_deref() {
        Some(raw) => Some(
            serde_json::from_str(raw)
                .map_err(|e| ApiError::Corrupt(format!("project {} blob: {}", row.id, e)))?,
        ),
        None => None,
    };

    Ok(ProjectResponse {
        id: parse_uuid(&row.id, "project id")?,
        campaign_id: parse_uuid(&row.campaign_id, "campaign id")?,
        name: row.name,
        points: row.points,
        sheet,
        created_by: parse_uuid(&row.created_by, "project creator id")?,
        created_at: db_timestamp(&row.created_at, "project created_at"),
        updated_at: db_timestamp(&row.updated_at, "project updated_at"),
    })
}

// -- Handlers --

pub async fn list_projects(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(list(&state.db, &actor, &campaign_id.to_string())?))
    })
    .await
}

pub async fn create_project(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        let project = create(
            &state.db,
            &actor,
            &campaign_id.to_string(),
            &req.name,
            req.points.unwrap_or(0),
            req.sheet.as_ref(),
        )?;
        Ok((StatusCode::CREATED, Json(project)))
    })
    .await
}

pub async fn get_project(
    State(state): State<AppState>,
    Path((campaign_id, id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(fetch(
            &state.db,
            &actor,
            &campaign_id.to_string(),
            &id.to_string(),
        )?))
    })
    .await
}

pub async fn update_project(
    State(state): State<AppState>,
    Path((campaign_id, id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(update(
            &state.db,
            &actor,
            &campaign_id.to_string(),
            &id.to_string(),
            req.name,
            req.points,
            req.sheet.as_ref(),
        )?))
    })
    .await
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path((campaign_id, id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        remove(&state.db, &actor, &campaign_id.to_string(), &id.to_string())?;
        Ok(StatusCode::NO_CONTENT)
    })
    .await
}

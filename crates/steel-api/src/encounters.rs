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
use steel_db::models::EncounterRow;
use steel_types::api::{
    Claims, CreateEncounterRequest, EncounterResponse, UpdateEncounterRequest,
};
use steel_types::models::Actor;
use steel_types::sheet::SheetEnvelope;

use crate::access::{self, AccessLevel};
use crate::auth::AppState;
use crate::campaigns;
use crate::error::ApiError;
use crate::{db_timestamp, parse_uuid, run_blocking, users};

// -- Operations --

/// Players may read encounters but not create them; creation is GM-level.
pub fn create(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
    sheet: Value,
) -> Result<EncounterResponse, ApiError> {
    let campaign = campaigns::active_row(db, actor, campaign_id)?;
    if campaigns::level_of(db, &campaign, actor)? < AccessLevel::Gm {
        warn!(
            "encounter create in campaign {} denied for {}",
            campaign_id, actor.id
        );
        return Err(ApiError::AccessDenied);
    }

    let envelope = SheetEnvelope::from_value(sheet)
        .map_err(|e| ApiError::Validation(format!("invalid encounter: {}", e)))?;

    if db.get_encounter(&envelope.id)?.is_some() {
        return Err(ApiError::Validation(format!(
            "encounter {} already exists",
            envelope.id
        )));
    }

    let data = envelope
        .to_string()
        .map_err(|e| ApiError::Internal(e.into()))?;
    db.insert_encounter(
        &envelope.id,
        campaign_id,
        envelope.name.as_deref(),
        &data,
        &actor.id.to_string(),
    )?;
    info!(
        "encounter {} created in campaign {} by {}",
        envelope.id, campaign_id, actor.id
    );

    load_response(db, &envelope.id)
}

pub fn fetch(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
    id: &str,
) -> Result<EncounterResponse, ApiError> {
    let (row, level) = active_row(db, actor, campaign_id, id)?;
    if level == AccessLevel::None {
        warn!("encounter {} read denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }
    to_response(row)
}

pub fn list(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
) -> Result<Vec<EncounterResponse>, ApiError> {
    let campaign = campaigns::active_row(db, actor, campaign_id)?;
    if campaigns::level_of(db, &campaign, actor)? == AccessLevel::None {
        warn!(
            "encounter list for campaign {} denied for {}",
            campaign_id, actor.id
        );
        return Err(ApiError::AccessDenied);
    }

    let rows = db.list_encounters(campaign_id)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match to_response(row) {
                Ok(resp) => Some(resp),
                Err(err) => {
                    warn!("skipping unreadable encounter {}: {}", id, err);
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
    sheet: Value,
) -> Result<EncounterResponse, ApiError> {
    let (_, level) = active_row(db, actor, campaign_id, id)?;
    if level < AccessLevel::Gm {
        warn!("encounter {} update denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    let envelope = SheetEnvelope::from_value(sheet)
        .map_err(|e| ApiError::Validation(format!("invalid encounter: {}", e)))?;
    if envelope.id != id {
        return Err(ApiError::Validation(format!(
            "sheet id {} does not match encounter {}",
            envelope.id, id
        )));
    }

    let data = envelope
        .to_string()
        .map_err(|e| ApiError::Internal(e.into()))?;
    db.update_encounter_sheet(id, envelope.name.as_deref(), &data)?;
    info!("encounter {} updated by {}", id, actor.id);

    load_response(db, id)
}

pub fn remove(db: &Database, actor: &Actor, campaign_id: &str, id: &str) -> Result<(), ApiError> {
    let campaign = campaigns::active_row(db, actor, campaign_id)?;
    let row = db.get_encounter(id)?.ok_or(ApiError::NotFound)?;
    if row.campaign_id != campaign_id || row.is_deleted {
        return Err(ApiError::NotFound);
    }

    let campaign_level = campaigns::level_of(db, &campaign, actor)?;
    let level = access::encounter_access(&row.created_by, campaign_level, &actor.id.to_string());
    if level < AccessLevel::Gm {
        warn!("encounter {} delete denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    if !db.soft_delete_encounter(id)? {
        return Err(ApiError::NotFound);
    }
    info!("encounter {} deleted by {}", id, actor.id);
    Ok(())
}

fn active_row(
    db: &Database,
    actor: &Actor,
    campaign_id: &str,
    id: &str,
) -> Result<(EncounterRow, AccessLevel), ApiError> {
    let campaign = campaigns::active_row(db, actor, campaign_id)?;
    let campaign_level = campaigns::level_of(db, &campaign, actor)?;

    let row = db.get_encounter(id)?.ok_or(ApiError::NotFound)?;
    if row.campaign_id != campaign_id {
        return Err(ApiError::NotFound);
    }
    if row.is_deleted && !actor.is_admin {
        return Err(ApiError::NotFound);
    }

    let level = access::encounter_access(&row.created_by, campaign_level, &actor.id.to_string());
    Ok((row, level))
}

fn load_response(db: &Database, id: &str) -> Result<EncounterResponse, ApiError> {
    let row = db
        .get_encounter(id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("encounter {} missing after write", id)))?;
    to_response(row)
}

fn to_response(row: EncounterRow) -> Result<EncounterResponse, ApiError> {
    let envelope = SheetEnvelope::from_str(&row.data)
        .map_err(|e| ApiError::Corrupt(format!("encounter {} blob: {}", row.id, e)))?;
    let sheet = envelope
        .to_value()
        .map_err(|e| ApiError::Corrupt(format!("encounter {} blob: {}", row.id, e)))?;

    Ok(EncounterResponse {
        id: row.id.clone(),
        campaign_id: parse_uuid(&row.campaign_id, "campaign id")?,
        name: row.name,
        sheet,
        created_by: parse_uuid(&row.created_by, "encounter creator id")?,
        created_at: db_timestamp(&row.created_at, "encounter created_at"),
        updated_at: db_timestamp(&row.updated_at, "encounter updated_at"),
    })
}

// -- Handlers --

pub async fn list_encounters(
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

pub async fn create_encounter(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEncounterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        let encounter = create(&state.db, &actor, &campaign_id.to_string(), req.sheet)?;
        Ok((StatusCode::CREATED, Json(encounter)))
    })
    .await
}

pub async fn get_encounter(
    State(state): State<AppState>,
    Path((campaign_id, id)): Path<(Uuid, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(fetch(&state.db, &actor, &campaign_id.to_string(), &id)?))
    })
    .await
}

pub async fn update_encounter(
    State(state): State<AppState>,
    Path((campaign_id, id)): Path<(Uuid, String)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateEncounterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(update(
            &state.db,
            &actor,
            &campaign_id.to_string(),
            &id,
            req.sheet,
        )?))
    })
    .await
}

pub async fn delete_encounter(
    State(state): State<AppState>,
    Path((campaign_id, id)): Path<(Uuid, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        remove(&state.db, &actor, &campaign_id.to_string(), &id)?;
        Ok(StatusCode::NO_CONTENT)
    })
    .await
}

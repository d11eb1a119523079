use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::{info, warn};

use steel_db::Database;
use steel_db::models::CharacterRow;
use steel_types::api::{
    AssignCampaignRequest, CharacterResponse, Claims, CreateCharacterRequest,
    ShareCharacterRequest, UpdateCharacterRequest,
};
use steel_types::models::{Actor, CampaignRole};
use steel_types::sheet::SheetEnvelope;

use crate::access::{self, AccessLevel};
use crate::auth::AppState;
use crate::error::ApiError;
use crate::{db_timestamp, parse_uuid, run_blocking, users};

// -- Operations --

pub fn create(db: &Database, actor: &Actor, sheet: Value) -> Result<CharacterResponse, ApiError> {
    let envelope = SheetEnvelope::from_value(sheet)
        .map_err(|e| ApiError::Validation(format!("invalid sheet: {}", e)))?;

    if db.get_character(&envelope.id)?.is_some() {
        return Err(ApiError::Validation(format!(
            "character {} already exists",
            envelope.id
        )));
    }

    let data = envelope
        .to_string()
        .map_err(|e| ApiError::Internal(e.into()))?;
    db.insert_character(
        &envelope.id,
        &actor.id.to_string(),
        envelope.name.as_deref(),
        &data,
    )?;
    info!("character {} created by {}", envelope.id, actor.id);

    load_response(db, &envelope.id)
}

pub fn fetch(db: &Database, actor: &Actor, id: &str) -> Result<CharacterResponse, ApiError> {
    let row = active_row(db, actor, id)?;

    let level = level_for(&row, actor);
    if level == AccessLevel::None {
        warn!("character {} read denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    to_response(row)
}

/// Characters the actor owns or has been handed as GM. Rows with unreadable
/// blobs are skipped, not fatal.
pub fn list(db: &Database, actor: &Actor) -> Result<Vec<CharacterResponse>, ApiError> {
    let rows = db.list_characters_for_user(&actor.id.to_string())?;
    Ok(skip_corrupt(rows))
}

pub fn update(
    db: &Database,
    actor: &Actor,
    id: &str,
    sheet: Value,
) -> Result<CharacterResponse, ApiError> {
    let row = active_row(db, actor, id)?;

    // GM sharing is read-only on characters; only the owner (or admin) writes.
    if level_for(&row, actor) < AccessLevel::Owner {
        warn!("character {} update denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    let envelope = SheetEnvelope::from_value(sheet)
        .map_err(|e| ApiError::Validation(format!("invalid sheet: {}", e)))?;
    if envelope.id != id {
        return Err(ApiError::Validation(format!(
            "sheet id {} does not match character {}",
            envelope.id, id
        )));
    }

    let data = envelope
        .to_string()
        .map_err(|e| ApiError::Internal(e.into()))?;
    db.update_character_sheet(id, envelope.name.as_deref(), &data)?;
    info!("character {} updated by {}", id, actor.id);

    load_response(db, id)
}

pub fn remove(db: &Database, actor: &Actor, id: &str) -> Result<(), ApiError> {
    let row = db.get_character(id)?.ok_or(ApiError::NotFound)?;
    // Deleting an already-deleted row looks exactly like deleting nothing.
    if row.is_deleted {
        return Err(ApiError::NotFound);
    }

    if level_for(&row, actor) < AccessLevel::Owner {
        warn!("character {} delete denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    if !db.soft_delete_character(id)? {
        return Err(ApiError::NotFound);
    }
    info!("character {} deleted by {}", id, actor.id);
    Ok(())
}

/// Set or clear the GM share. Owner only.
pub fn share(
    db: &Database,
    actor: &Actor,
    id: &str,
    gm_email: Option<&str>,
) -> Result<CharacterResponse, ApiError> {
    let row = active_row(db, actor, id)?;

    if level_for(&row, actor) < AccessLevel::Owner {
        warn!("character {} share change denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    let gm_id = match gm_email {
        Some(email) => {
            let user = db
                .get_user_by_email(email)?
                .ok_or_else(|| ApiError::Validation(format!("no user with email {}", email)))?;
            Some(user.id)
        }
        None => None,
    };

    db.set_character_gm(id, gm_id.as_deref())?;
    match &gm_id {
        Some(gm) => info!("character {} shared with {} by {}", id, gm, actor.id),
        None => info!("character {} unshared by {}", id, actor.id),
    }

    load_response(db, id)
}

/// Assign the character to a campaign, or clear the assignment. Permitted
/// for the character's owner, a GM of the target campaign (of the current
/// one when clearing), or admin.
pub fn assign_to_campaign(
    db: &Database,
    actor: &Actor,
    id: &str,
    campaign_id: Option<&str>,
) -> Result<CharacterResponse, ApiError> {
    let row = active_row(db, actor, id)?;
    let actor_id = actor.id.to_string();

    let mut allowed = level_for(&row, actor) >= AccessLevel::Owner;
    if !allowed {
        let deciding = campaign_id.or(row.campaign_id.as_deref());
        if let Some(cid) = deciding {
            if let Some(campaign) = db.get_campaign(cid)? {
                if !campaign.is_deleted {
                    let role = db
                        .member_role(cid, &actor_id)?
                        .and_then(|r| CampaignRole::from_str(&r));
                    allowed = access::campaign_access(
                        &campaign.created_by,
                        role,
                        &actor_id,
                        actor.is_admin,
                    ) >= AccessLevel::Gm;
                }
            }
        }
    }
    if !allowed {
        warn!("character {} campaign change denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    if let Some(cid) = campaign_id {
        let campaign = db.get_campaign(cid)?.ok_or(ApiError::NotFound)?;
        if campaign.is_deleted && !actor.is_admin {
            return Err(ApiError::NotFound);
        }
    }

    db.set_character_campaign(id, campaign_id)?;
    match campaign_id {
        Some(cid) => info!("character {} assigned to campaign {} by {}", id, cid, actor.id),
        None => info!("character {} removed from its campaign by {}", id, actor.id),
    }

    load_response(db, id)
}

fn level_for(row: &CharacterRow, actor: &Actor) -> AccessLevel {
    access::character_access(
        &row.user_id,
        row.gm_user_id.as_deref(),
        &actor.id.to_string(),
        actor.is_admin,
    )
}

/// Fetch a row, hiding soft-deleted ones from non-admin callers.
fn active_row(db: &Database, actor: &Actor, id: &str) -> Result<CharacterRow, ApiError> {
    let row = db.get_character(id)?.ok_or(ApiError::NotFound)?;
    if row.is_deleted && !actor.is_admin {
        return Err(ApiError::NotFound);
    }
    Ok(row)
}

fn load_response(db: &Database, id: &str) -> Result<CharacterResponse, ApiError> {
    let row = db
        .get_character(id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("character {} missing after write", id)))?;
    to_response(row)
}

pub(crate) fn skip_corrupt(rows: Vec<CharacterRow>) -> Vec<CharacterResponse> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match to_response(row) {
                Ok(resp) => Some(resp),
                Err(err) => {
                    warn!("skipping unreadable character {}: {}", id, err);
                    None
                }
            }
        })
        .collect()
}

fn to_response(row: CharacterRow) -> Result<CharacterResponse, ApiError> {
    let envelope = SheetEnvelope::from_str(&row.data)
        .map_err(|e| ApiError::Corrupt(format!("character {} blob: {}", row.id, e)))?;
    let sheet = envelope
        .to_value()
        .map_err(|e| ApiError::Corrupt(format!("character {} blob: {}", row.id, e)))?;

    let gm_user_id = match row.gm_user_id.as_deref() {
        Some(gm) => Some(parse_uuid(gm, "gm user id")?),
        None => None,
    };
    let campaign_id = match row.campaign_id.as_deref() {
        Some(cid) => Some(parse_uuid(cid, "campaign id")?),
        None => None,
    };

    Ok(CharacterResponse {
        id: row.id.clone(),
        owner_id: parse_uuid(&row.user_id, "owner id")?,
        gm_user_id,
        campaign_id,
        name: row.name,
        sheet,
        created_at: db_timestamp(&row.created_at, "character created_at"),
        updated_at: db_timestamp(&row.updated_at, "character updated_at"),
    })
}

// -- Handlers --

pub async fn list_characters(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(list(&state.db, &actor)?))
    })
    .await
}

pub async fn create_character(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCharacterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        let character = create(&state.db, &actor, req.sheet)?;
        Ok((StatusCode::CREATED, Json(character)))
    })
    .await
}

pub async fn get_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(fetch(&state.db, &actor, &id)?))
    })
    .await
}

pub async fn update_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateCharacterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(update(&state.db, &actor, &id, req.sheet)?))
    })
    .await
}

pub async fn delete_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        remove(&state.db, &actor, &id)?;
        Ok(StatusCode::NO_CONTENT)
    })
    .await
}

pub async fn share_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ShareCharacterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(share(&state.db, &actor, &id, req.gm_email.as_deref())?))
    })
    .await
}

pub async fn assign_character_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AssignCampaignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        let campaign_id = req.campaign_id.map(|c| c.to_string());
        Ok(Json(assign_to_campaign(
            &state.db,
            &actor,
            &id,
            campaign_id.as_deref(),
        )?))
    })
    .await
}

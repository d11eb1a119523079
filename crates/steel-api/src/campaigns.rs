use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use steel_db::Database;
use steel_db::models::CampaignRow;
use steel_types::api::{
    AddMemberRequest, CampaignResponse, CharacterResponse, Claims, CreateCampaignRequest,
    MemberResponse, SetMemberRoleRequest, UpdateCampaignRequest,
};
use steel_types::models::{Actor, CampaignRole};

use crate::access::{self, AccessLevel};
use crate::auth::AppState;
use crate::characters::skip_corrupt;
use crate::error::ApiError;
use crate::{db_timestamp, parse_uuid, run_blocking, users};

// -- Operations --

/// Creating a campaign enrolls the creator as GM; there is no other
/// implicit membership.
pub fn create(
    db: &Database,
    actor: &Actor,
    name: &str,
    description: Option<&str>,
) -> Result<CampaignResponse, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("campaign name must not be empty".into()));
    }

    let id = Uuid::new_v4().to_string();
    db.insert_campaign(&id, name, description, &actor.id.to_string())?;
    info!("campaign {} created by {}", id, actor.id);

    load_response(db, &id)
}

pub fn fetch(db: &Database, actor: &Actor, id: &str) -> Result<CampaignResponse, ApiError> {
    let row = active_row(db, actor, id)?;

    if level_of(db, &row, actor)? == AccessLevel::None {
        warn!("campaign {} read denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    to_response(row)
}

pub fn list(db: &Database, actor: &Actor) -> Result<Vec<CampaignResponse>, ApiError> {
    let rows = db.list_campaigns_for_user(&actor.id.to_string())?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match to_response(row) {
                Ok(resp) => Some(resp),
                Err(err) => {
                    warn!("skipping unreadable campaign {}: {}", id, err);
                    None
                }
            }
        })
        .collect())
}

pub fn update(
    db: &Database,
    actor: &Actor,
    id: &str,
    name: Option<String>,
    description: Option<String>,
) -> Result<CampaignResponse, ApiError> {
    let row = active_row(db, actor, id)?;

    if level_of(db, &row, actor)? < AccessLevel::Gm {
        warn!("campaign {} update denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    let name = name.unwrap_or(row.name);
    if name.trim().is_empty() {
        return Err(ApiError::Validation("campaign name must not be empty".into()));
    }
    let description = description.or(row.description);

    db.update_campaign(id, name.trim(), description.as_deref())?;
    info!("campaign {} updated by {}", id, actor.id);

    load_response(db, id)
}

pub fn remove(db: &Database, actor: &Actor, id: &str) -> Result<(), ApiError> {
    let row = db.get_campaign(id)?.ok_or(ApiError::NotFound)?;
    if row.is_deleted {
        return Err(ApiError::NotFound);
    }

    if level_of(db, &row, actor)? < AccessLevel::Gm {
        warn!("campaign {} delete denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    if !db.soft_delete_campaign(id)? {
        return Err(ApiError::NotFound);
    }
    info!("campaign {} deleted by {}", id, actor.id);
    Ok(())
}

pub fn members(db: &Database, actor: &Actor, id: &str) -> Result<Vec<MemberResponse>, ApiError> {
    let row = active_row(db, actor, id)?;

    if level_of(db, &row, actor)? == AccessLevel::None {
        warn!("campaign {} roster read denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    let rows = db.list_members(id)?;
    Ok(rows
        .into_iter()
        .filter_map(|m| {
            let Some(role) = CampaignRole::from_str(&m.role) else {
                warn!("skipping member {} with unknown role '{}'", m.user_id, m.role);
                return None;
            };
            let user_id = match parse_uuid(&m.user_id, "member user id") {
                Ok(uid) => uid,
                Err(err) => {
                    warn!("skipping unreadable member row: {}", err);
                    return None;
                }
            };
            Some(MemberResponse {
                user_id,
                email: m.email,
                display_name: m.display_name,
                role,
                joined_at: db_timestamp(&m.joined_at, "member joined_at"),
            })
        })
        .collect())
}

/// Add a user to the roster by email. GM-level only.
pub fn add_member(
    db: &Database,
    actor: &Actor,
    id: &str,
    email: &str,
    role: CampaignRole,
) -> Result<MemberResponse, ApiError> {
    let row = active_row(db, actor, id)?;

    if level_of(db, &row, actor)? < AccessLevel::Gm {
        warn!("campaign {} member add denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    let user = db
        .get_user_by_email(email)?
        .ok_or_else(|| ApiError::Validation(format!("no user with email {}", email)))?;

    if db.member_role(id, &user.id)?.is_some() {
        return Err(ApiError::Validation(format!(
            "{} is already a member of this campaign",
            email
        )));
    }

    db.add_member(id, &user.id, role.as_str())?;
    info!(
        "campaign {}: {} added as {} by {}",
        id,
        user.id,
        role.as_str(),
        actor.id
    );

    Ok(MemberResponse {
        user_id: parse_uuid(&user.id, "member user id")?,
        email: user.email,
        display_name: user.display_name,
        role,
        joined_at: chrono::Utc::now(),
    })
}

pub fn set_member_role(
    db: &Database,
    actor: &Actor,
    id: &str,
    user_id: &str,
    role: CampaignRole,
) -> Result<(), ApiError> {
    let row = active_row(db, actor, id)?;

    if level_of(db, &row, actor)? < AccessLevel::Gm {
        warn!("campaign {} role change denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    if !db.set_member_role(id, user_id, role.as_str())? {
        return Err(ApiError::NotFound);
    }
    info!(
        "campaign {}: {} set to {} by {}",
        id,
        user_id,
        role.as_str(),
        actor.id
    );
    Ok(())
}

pub fn remove_member(
    db: &Database,
    actor: &Actor,
    id: &str,
    user_id: &str,
) -> Result<(), ApiError> {
    let row = active_row(db, actor, id)?;

    if level_of(db, &row, actor)? < AccessLevel::Gm {
        warn!("campaign {} member removal denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    if !db.remove_member(id, user_id)? {
        return Err(ApiError::NotFound);
    }
    info!("campaign {}: {} removed by {}", id, user_id, actor.id);
    Ok(())
}

/// Characters assigned to the campaign. Membership required; a non-member
/// sees the same denial whether or not the campaign exists.
pub fn characters_in(
    db: &Database,
    actor: &Actor,
    id: &str,
) -> Result<Vec<CharacterResponse>, ApiError> {
    let row = active_row(db, actor, id)?;

    if level_of(db, &row, actor)? == AccessLevel::None {
        warn!("campaign {} character list denied for {}", id, actor.id);
        return Err(ApiError::AccessDenied);
    }

    Ok(skip_corrupt(db.list_characters_in_campaign(id)?))
}

// -- Shared with encounters/projects --

pub(crate) fn active_row(db: &Database, actor: &Actor, id: &str) -> Result<CampaignRow, ApiError> {
    let row = db.get_campaign(id)?.ok_or(ApiError::NotFound)?;
    if row.is_deleted && !actor.is_admin {
        return Err(ApiError::NotFound);
    }
    Ok(row)
}

pub(crate) fn level_of(
    db: &Database,
    row: &CampaignRow,
    actor: &Actor,
) -> Result<AccessLevel, ApiError> {
    let actor_id = actor.id.to_string();
    let role = db
        .member_role(&row.id, &actor_id)?
        .and_then(|r| CampaignRole::from_str(&r));
    Ok(access::campaign_access(
        &row.created_by,
        role,
        &actor_id,
        actor.is_admin,
    ))
}

fn load_response(db: &Database, id: &str) -> Result<CampaignResponse, ApiError> {
    let row = db
        .get_campaign(id)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("campaign {} missing after write", id)))?;
    to_response(row)
}

fn to_response(row: CampaignRow) -> Result<CampaignResponse, ApiError> {
    Ok(CampaignResponse {
        id: parse_uuid(&row.id, "campaign id")?,
        name: row.name,
        description: row.description,
        created_by: parse_uuid(&row.created_by, "campaign creator id")?,
        created_at: db_timestamp(&row.created_at, "campaign created_at"),
        updated_at: db_timestamp(&row.updated_at, "campaign updated_at"),
    })
}

// -- Handlers --

pub async fn list_campaigns(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(list(&state.db, &actor)?))
    })
    .await
}

pub async fn create_campaign(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        let campaign = create(&state.db, &actor, &req.name, req.description.as_deref())?;
        Ok((StatusCode::CREATED, Json(campaign)))
    })
    .await
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(fetch(&state.db, &actor, &id.to_string())?))
    })
    .await
}

pub async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(update(
            &state.db,
            &actor,
            &id.to_string(),
            req.name,
            req.description,
        )?))
    })
    .await
}

pub async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        remove(&state.db, &actor, &id.to_string())?;
        Ok(StatusCode::NO_CONTENT)
    })
    .await
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(members(&state.db, &actor, &id.to_string())?))
    })
    .await
}

pub async fn add_campaign_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        let member = add_member(&state.db, &actor, &id.to_string(), &req.email, req.role)?;
        Ok((StatusCode::CREATED, Json(member)))
    })
    .await
}

pub async fn set_campaign_member_role(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetMemberRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        set_member_role(
            &state.db,
            &actor,
            &id.to_string(),
            &user_id.to_string(),
            req.role,
        )?;
        Ok(StatusCode::NO_CONTENT)
    })
    .await
}

pub async fn remove_campaign_member(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        remove_member(&state.db, &actor, &id.to_string(), &user_id.to_string())?;
        Ok(StatusCode::NO_CONTENT)
    })
    .await
}

pub async fn list_campaign_characters(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = users::resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(characters_in(&state.db, &actor, &id.to_string())?))
    })
    .await
}

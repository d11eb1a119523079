use axum::{Extension, Json, extract::State, response::IntoResponse};
use uuid::Uuid;

use steel_db::Database;
use steel_types::api::{Claims, UserResponse};
use steel_types::models::Actor;

use crate::auth::{AppState, is_admin_email};
use crate::error::ApiError;
use crate::{parse_uuid, run_blocking};

/// Resolve an identity-provider profile to a persistent user record.
/// Creates the record on first sight; refreshes email and display name when
/// the token disagrees with the stored row.
pub fn resolve(db: &Database, claims: &Claims, admin_email: &str) -> Result<Actor, ApiError> {
    let row = db.upsert_user(
        &Uuid::new_v4().to_string(),
        &claims.sub,
        &claims.email,
        claims.name.as_deref(),
    )?;

    let is_admin = is_admin_email(admin_email, &row.email);
    Ok(Actor {
        id: parse_uuid(&row.id, "user id")?,
        email: row.email,
        display_name: row.display_name,
        is_admin,
    })
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let actor = resolve(&state.db, &claims, &state.admin_email)?;
        Ok(Json(UserResponse {
            id: actor.id,
            email: actor.email,
            display_name: actor.display_name,
            is_admin: actor.is_admin,
        }))
    })
    .await
}

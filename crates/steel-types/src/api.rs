use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::CampaignRole;

// -- JWT Claims --

/// Claims carried by the identity provider's bearer token. The server never
/// mints tokens; middleware only verifies the signature and forwards these.
/// Canonical definition lives here in steel-types so the middleware and the
/// user directory agree on the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

// -- Characters --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCharacterRequest {
    pub sheet: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCharacterRequest {
    pub sheet: Value,
}

/// `gm_email: null` clears the share.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareCharacterRequest {
    pub gm_email: Option<String>,
}

/// `campaign_id: null` removes the character from its campaign.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignCampaignRequest {
    pub campaign_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CharacterResponse {
    pub id: String,
    pub owner_id: Uuid,
    pub gm_user_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    pub name: Option<String>,
    pub sheet: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Campaigns --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: CampaignRole,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetMemberRoleRequest {
    pub role: CampaignRole,
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: CampaignRole,
    pub joined_at: DateTime<Utc>,
}

// -- Encounters --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEncounterRequest {
    pub sheet: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEncounterRequest {
    pub sheet: Value,
}

#[derive(Debug, Serialize)]
pub struct EncounterResponse {
    pub id: String,
    pub campaign_id: Uuid,
    pub name: Option<String>,
    pub sheet: Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Projects --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub name: String,
    pub points: Option<i64>,
    pub sheet: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub points: Option<i64>,
    pub sheet: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub points: i64,
    pub sheet: Option<Value>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

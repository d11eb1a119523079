use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A resolved, authenticated actor: the persistent user record behind a
/// verified token, plus the derived admin flag. Admin status is computed
/// from configuration at resolve time and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

/// Role of a campaign member. Stored on the membership row; a campaign's
/// creator holds GM-equivalent access without a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignRole {
    Gm,
    Player,
}

impl CampaignRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignRole::Gm => "gm",
            CampaignRole::Player => "player",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "gm" => Some(CampaignRole::Gm),
            "player" => Some(CampaignRole::Player),
            _ => None,
        }
    }
}

//! Pure access decisions. Each function maps current relationship facts
//! (ownership field, membership role, creator field) plus the admin override
//! to an access level; the store is never touched here.

use steel_types::models::CampaignRole;

/// Ordered: a check for "at least ReadOnly" is a plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    None,
    ReadOnly,
    Gm,
    Owner,
}

/// Characters: the owner has full access, a shared GM may read, nobody else
/// gets anything. Ownership outranks sharing; admin overrides to Owner.
pub fn character_access(
    owner_id: &str,
    gm_user_id: Option<&str>,
    actor_id: &str,
    is_admin: bool,
) -> AccessLevel {
    if is_admin || owner_id == actor_id {
        return AccessLevel::Owner;
    }
    if gm_user_id == Some(actor_id) {
        return AccessLevel::Gm;
    }
    AccessLevel::None
}

/// Campaigns: creator and GM-role member are equals, either grants full
/// access. A player role grants read-only; non-members get nothing.
pub fn campaign_access(
    created_by: &str,
    role: Option<CampaignRole>,
    actor_id: &str,
    is_admin: bool,
) -> AccessLevel {
    if is_admin {
        return AccessLevel::Owner;
    }
    if created_by == actor_id || role == Some(CampaignRole::Gm) {
        return AccessLevel::Gm;
    }
    if role == Some(CampaignRole::Player) {
        return AccessLevel::ReadOnly;
    }
    AccessLevel::None
}

/// Encounters and projects inherit from the campaign: write access for the
/// creator or a campaign GM, read for players, nothing for strangers.
pub fn encounter_access(
    created_by: &str,
    campaign_level: AccessLevel,
    actor_id: &str,
) -> AccessLevel {
    if campaign_level == AccessLevel::Owner {
        return AccessLevel::Owner;
    }
    if created_by == actor_id || campaign_level >= AccessLevel::Gm {
        return AccessLevel::Gm;
    }
    campaign_level
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "user-a";
    const GM: &str = "user-g";
    const OTHER: &str = "user-x";

    #[test]
    fn owner_gets_owner_level() {
        assert_eq!(
            character_access(OWNER, None, OWNER, false),
            AccessLevel::Owner
        );
    }

    #[test]
    fn shared_gm_gets_gm_level() {
        assert_eq!(
            character_access(OWNER, Some(GM), GM, false),
            AccessLevel::Gm
        );
    }

    #[test]
    fn ownership_outranks_sharing() {
        // Sharing a character with its own owner must not demote them.
        assert_eq!(
            character_access(OWNER, Some(OWNER), OWNER, false),
            AccessLevel::Owner
        );
    }

    #[test]
    fn stranger_gets_nothing() {
        assert_eq!(
            character_access(OWNER, Some(GM), OTHER, false),
            AccessLevel::None
        );
    }

    #[test]
    fn unshared_gm_gets_nothing() {
        assert_eq!(character_access(OWNER, None, GM, false), AccessLevel::None);
    }

    #[test]
    fn admin_overrides_to_owner() {
        assert_eq!(
            character_access(OWNER, None, OTHER, true),
            AccessLevel::Owner
        );
        assert_eq!(campaign_access(OWNER, None, OTHER, true), AccessLevel::Owner);
    }

    #[test]
    fn campaign_creator_and_gm_role_are_equals() {
        assert_eq!(campaign_access(OWNER, None, OWNER, false), AccessLevel::Gm);
        assert_eq!(
            campaign_access(OWNER, Some(CampaignRole::Gm), GM, false),
            AccessLevel::Gm
        );
    }

    #[test]
    fn campaign_player_is_read_only() {
        assert_eq!(
            campaign_access(OWNER, Some(CampaignRole::Player), OTHER, false),
            AccessLevel::ReadOnly
        );
    }

    #[test]
    fn campaign_non_member_gets_nothing() {
        assert_eq!(campaign_access(OWNER, None, OTHER, false), AccessLevel::None);
    }

    #[test]
    fn encounter_creator_can_write_even_as_player() {
        assert_eq!(
            encounter_access(GM, AccessLevel::ReadOnly, GM),
            AccessLevel::Gm
        );
    }

    #[test]
    fn encounter_player_is_read_only() {
        assert_eq!(
            encounter_access(OWNER, AccessLevel::ReadOnly, OTHER),
            AccessLevel::ReadOnly
        );
    }

    #[test]
    fn encounter_stranger_gets_nothing() {
        assert_eq!(
            encounter_access(OWNER, AccessLevel::None, OTHER),
            AccessLevel::None
        );
    }

    #[test]
    fn access_levels_are_ordered() {
        assert!(AccessLevel::Owner > AccessLevel::Gm);
        assert!(AccessLevel::Gm > AccessLevel::ReadOnly);
        assert!(AccessLevel::ReadOnly > AccessLevel::None);
    }
}

//! End-to-end scenarios over the operation layer with an in-memory database.
//! Actors are resolved through the user directory exactly as the handlers
//! do; only the HTTP plumbing is skipped.

use serde_json::json;
use uuid::Uuid;

use steel_api::error::ApiError;
use steel_api::{campaigns, characters, encounters, projects, users};
use steel_db::Database;
use steel_types::api::Claims;
use steel_types::models::{Actor, CampaignRole};

const ADMIN_EMAIL: &str = "admin@forgesteel.local";

fn open_db() -> Database {
    Database::open_in_memory().unwrap()
}

fn actor(db: &Database, email: &str) -> Actor {
    let claims = Claims {
        sub: format!("sub|{}", email),
        email: email.to_string(),
        name: None,
        exp: 0,
    };
    users::resolve(db, &claims, ADMIN_EMAIL).unwrap()
}

/// NotFound and AccessDenied are the same outcome from the caller's side.
fn assert_denied<T: std::fmt::Debug>(result: Result<T, ApiError>) {
    match result {
        Err(ApiError::NotFound) | Err(ApiError::AccessDenied) => {}
        other => panic!("expected a denial, got {:?}", other),
    }
}

#[test]
fn campaign_creator_is_enrolled_as_gm() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");

    let campaign = campaigns::create(&db, &alice, "Test", None).unwrap();
    let members = campaigns::members(&db, &alice, &campaign.id.to_string()).unwrap();

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, alice.id);
    assert_eq!(members[0].role, CampaignRole::Gm);
}

#[test]
fn player_can_read_but_not_run_encounters() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");
    let bob = actor(&db, "bob@example.com");

    let campaign = campaigns::create(&db, &alice, "Test", None).unwrap();
    let cid = campaign.id.to_string();
    campaigns::add_member(&db, &alice, &cid, "bob@example.com", CampaignRole::Player).unwrap();

    // Bob can see the campaign's character list (empty so far).
    assert!(campaigns::characters_in(&db, &bob, &cid).unwrap().is_empty());

    // But Bob cannot create an encounter.
    assert_denied(encounters::create(
        &db,
        &bob,
        &cid,
        json!({ "id": "enc-1", "name": "Ambush" }),
    ));

    // The GM can; Bob may then read it but not edit it.
    encounters::create(&db, &alice, &cid, json!({ "id": "enc-1", "name": "Ambush" })).unwrap();
    let seen = encounters::fetch(&db, &bob, &cid, "enc-1").unwrap();
    assert_eq!(seen.name.as_deref(), Some("Ambush"));
    assert_denied(encounters::update(
        &db,
        &bob,
        &cid,
        "enc-1",
        json!({ "id": "enc-1", "name": "Ambush", "round": 2 }),
    ));
}

#[test]
fn gm_share_grants_read_only_until_unshared() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");
    let gm = actor(&db, "gm@example.com");

    characters::create(&db, &alice, json!({ "id": "char-1", "name": "Kaslin" })).unwrap();
    characters::share(&db, &alice, "char-1", Some("gm@example.com")).unwrap();

    // Shared GM reads but cannot write.
    assert_eq!(
        characters::fetch(&db, &gm, "char-1").unwrap().name.as_deref(),
        Some("Kaslin")
    );
    assert_denied(characters::update(
        &db,
        &gm,
        "char-1",
        json!({ "id": "char-1", "name": "Kaslin", "level": 2 }),
    ));

    // The owner can write.
    characters::update(&db, &alice, "char-1", json!({ "id": "char-1", "name": "Kaslin", "level": 2 }))
        .unwrap();

    // After unsharing, the GM loses even read access.
    characters::share(&db, &alice, "char-1", None).unwrap();
    assert_denied(characters::fetch(&db, &gm, "char-1"));
}

#[test]
fn non_members_cannot_probe_campaign_characters() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");
    let mallory = actor(&db, "mallory@example.com");

    let campaign = campaigns::create(&db, &alice, "Secret", None).unwrap();

    // Existing campaign: denied. Nonexistent campaign: the same denial.
    assert_denied(campaigns::characters_in(&db, &mallory, &campaign.id.to_string()));
    assert_denied(campaigns::characters_in(&db, &mallory, &Uuid::new_v4().to_string()));
}

#[test]
fn soft_delete_is_idempotent() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");

    characters::create(&db, &alice, json!({ "id": "char-1", "name": "Kaslin" })).unwrap();
    characters::remove(&db, &alice, "char-1").unwrap();

    // Deleting again looks exactly like deleting a character that never was.
    assert_denied(characters::remove(&db, &alice, "char-1"));
    assert_denied(characters::remove(&db, &alice, "char-9"));

    // Deleted rows are invisible to the owner but retrievable by admin.
    assert_denied(characters::fetch(&db, &alice, "char-1"));
    let admin = actor(&db, ADMIN_EMAIL);
    assert_eq!(
        characters::fetch(&db, &admin, "char-1").unwrap().id,
        "char-1"
    );
}

#[test]
fn character_blob_round_trips() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");

    let blob = json!({
        "id": "char-7",
        "name": "Orden",
        "ancestry": { "id": "a2", "name": "Hakaan", "traits": ["big"] },
        "career": { "id": "c3" },
        "level": 4,
        "notes": null
    });

    characters::create(&db, &alice, blob.clone()).unwrap();
    let fetched = characters::fetch(&db, &alice, "char-7").unwrap();
    assert_eq!(fetched.sheet, blob);
    assert_eq!(fetched.name.as_deref(), Some("Orden"));
    assert_eq!(fetched.owner_id, alice.id);
}

#[test]
fn blob_without_id_is_rejected_before_write() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");

    let result = characters::create(&db, &alice, json!({ "name": "no id" }));
    assert!(matches!(result, Err(ApiError::Validation(_))));
    assert!(characters::list(&db, &alice).unwrap().is_empty());
}

#[test]
fn admin_overrides_every_gate() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");
    let admin = actor(&db, "Admin@ForgeSteel.local");
    assert!(admin.is_admin);

    characters::create(&db, &alice, json!({ "id": "char-1", "name": "Kaslin" })).unwrap();
    let campaign = campaigns::create(&db, &alice, "Closed", None).unwrap();

    // Admin is neither owner, member, nor creator, yet has full access.
    characters::update(&db, &admin, "char-1", json!({ "id": "char-1", "name": "Kaslin Redux" }))
        .unwrap();
    assert_eq!(
        campaigns::fetch(&db, &admin, &campaign.id.to_string())
            .unwrap()
            .name,
        "Closed"
    );
}

#[test]
fn campaign_gm_can_pull_in_a_character() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");
    let gm = actor(&db, "gm@example.com");
    let mallory = actor(&db, "mallory@example.com");

    characters::create(&db, &alice, json!({ "id": "char-1", "name": "Kaslin" })).unwrap();
    let campaign = campaigns::create(&db, &gm, "Table", None).unwrap();
    let cid = campaign.id.to_string();

    // A stranger may not move someone else's character.
    assert_denied(characters::assign_to_campaign(&db, &mallory, "char-1", Some(&cid)));

    // A GM of the target campaign may.
    let assigned = characters::assign_to_campaign(&db, &gm, "char-1", Some(&cid)).unwrap();
    assert_eq!(assigned.campaign_id, Some(campaign.id));

    // The roster now shows the character to members.
    let listed = campaigns::characters_in(&db, &gm, &cid).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "char-1");

    // The owner can always pull their character back out.
    let cleared = characters::assign_to_campaign(&db, &alice, "char-1", None).unwrap();
    assert_eq!(cleared.campaign_id, None);
}

#[test]
fn member_roles_are_mutable_by_gm_only() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");
    let bob = actor(&db, "bob@example.com");

    let campaign = campaigns::create(&db, &alice, "Test", None).unwrap();
    let cid = campaign.id.to_string();
    campaigns::add_member(&db, &alice, &cid, "bob@example.com", CampaignRole::Player).unwrap();

    // A player cannot promote themselves.
    assert_denied(campaigns::set_member_role(
        &db,
        &bob,
        &cid,
        &bob.id.to_string(),
        CampaignRole::Gm,
    ));

    // The GM can; Bob then holds GM access.
    campaigns::set_member_role(&db, &alice, &cid, &bob.id.to_string(), CampaignRole::Gm).unwrap();
    encounters::create(&db, &bob, &cid, json!({ "id": "enc-9" })).unwrap();

    // Removal drops Bob back to nothing.
    campaigns::remove_member(&db, &alice, &cid, &bob.id.to_string()).unwrap();
    assert_denied(campaigns::characters_in(&db, &bob, &cid));
}

#[test]
fn duplicate_membership_is_rejected() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");
    let _bob = actor(&db, "bob@example.com");

    let campaign = campaigns::create(&db, &alice, "Test", None).unwrap();
    let cid = campaign.id.to_string();

    campaigns::add_member(&db, &alice, &cid, "bob@example.com", CampaignRole::Player).unwrap();
    let again = campaigns::add_member(&db, &alice, &cid, "bob@example.com", CampaignRole::Gm);
    assert!(matches!(again, Err(ApiError::Validation(_))));
}

#[test]
fn project_points_accrue_for_gms_and_stay_read_only_for_players() {
    let db = open_db();
    let alice = actor(&db, "alice@example.com");
    let bob = actor(&db, "bob@example.com");

    let campaign = campaigns::create(&db, &alice, "Downtime", None).unwrap();
    let cid = campaign.id.to_string();
    campaigns::add_member(&db, &alice, &cid, "bob@example.com", CampaignRole::Player).unwrap();

    let project = projects::create(&db, &alice, &cid, "Forge a blade", 0, None).unwrap();
    let pid = project.id.to_string();

    let bumped = projects::update(&db, &alice, &cid, &pid, None, Some(15), None).unwrap();
    assert_eq!(bumped.points, 15);

    // Players see progress but cannot change it.
    assert_eq!(projects::fetch(&db, &bob, &cid, &pid).unwrap().points, 15);
    assert_denied(projects::update(&db, &bob, &cid, &pid, None, Some(99), None));
}

#[test]
fn user_directory_resolves_and_refreshes() {
    let db = open_db();

    let first = users::resolve(
        &db,
        &Claims {
            sub: "sub|42".into(),
            email: "old@example.com".into(),
            name: Some("Old Name".into()),
            exp: 0,
        },
        ADMIN_EMAIL,
    )
    .unwrap();

    // Same subject, new profile: the record is refreshed, not duplicated.
    let second = users::resolve(
        &db,
        &Claims {
            sub: "sub|42".into(),
            email: "new@example.com".into(),
            name: Some("New Name".into()),
            exp: 0,
        },
        ADMIN_EMAIL,
    )
    .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.email, "new@example.com");
    assert_eq!(second.display_name.as_deref(), Some("New Name"));
}

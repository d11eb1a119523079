//! Store-level behavior against an in-memory database.

use steel_db::Database;
use uuid::Uuid;

fn open_db() -> Database {
    Database::open_in_memory().unwrap()
}

fn make_user(db: &Database, subject: &str, email: &str) -> String {
    db.upsert_user(&Uuid::new_v4().to_string(), subject, email, None)
        .unwrap()
        .id
}

#[test]
fn upsert_keeps_id_stable_and_refreshes_profile() {
    let db = open_db();

    let first = db
        .upsert_user(&Uuid::new_v4().to_string(), "sub|1", "a@example.com", Some("A"))
        .unwrap();
    let second = db
        .upsert_user(&Uuid::new_v4().to_string(), "sub|1", "b@example.com", None)
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.email, "b@example.com");
    assert_eq!(second.display_name, None);
}

#[test]
fn email_lookup_is_case_insensitive() {
    let db = open_db();
    let id = make_user(&db, "sub|1", "Mixed.Case@Example.com");

    let found = db.get_user_by_email("mixed.case@example.com").unwrap().unwrap();
    assert_eq!(found.id, id);
    assert!(db.get_user_by_email("other@example.com").unwrap().is_none());

    // Id lookup sees the same record.
    assert_eq!(
        db.get_user_by_id(&id).unwrap().unwrap().email,
        "Mixed.Case@Example.com"
    );
}

#[test]
fn soft_delete_flips_once() {
    let db = open_db();
    let owner = make_user(&db, "sub|1", "a@example.com");
    db.insert_character("char-1", &owner, Some("Kaslin"), "{\"id\":\"char-1\"}")
        .unwrap();

    assert!(db.soft_delete_character("char-1").unwrap());
    assert!(!db.soft_delete_character("char-1").unwrap());
    assert!(!db.soft_delete_character("char-9").unwrap());

    // The row survives, flagged.
    let row = db.get_character("char-1").unwrap().unwrap();
    assert!(row.is_deleted);

    // Listings exclude it.
    assert!(db.list_characters_for_user(&owner).unwrap().is_empty());
}

#[test]
fn character_listing_covers_owned_and_gm_shared() {
    let db = open_db();
    let owner = make_user(&db, "sub|1", "a@example.com");
    let gm = make_user(&db, "sub|2", "g@example.com");

    db.insert_character("char-1", &owner, None, "{\"id\":\"char-1\"}")
        .unwrap();
    db.insert_character("char-2", &owner, None, "{\"id\":\"char-2\"}")
        .unwrap();
    db.set_character_gm("char-2", Some(&gm)).unwrap();

    assert_eq!(db.list_characters_for_user(&owner).unwrap().len(), 2);

    let shared = db.list_characters_for_user(&gm).unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].id, "char-2");
}

#[test]
fn campaign_create_enrolls_creator_and_listing_deduplicates() {
    let db = open_db();
    let creator = make_user(&db, "sub|1", "a@example.com");
    let cid = Uuid::new_v4().to_string();

    db.insert_campaign(&cid, "Test", None, &creator).unwrap();

    // Creator appears in the roster and exactly once in their listing even
    // though they match both the creator column and the membership join.
    assert_eq!(db.member_role(&cid, &creator).unwrap().as_deref(), Some("gm"));
    assert_eq!(db.list_campaigns_for_user(&creator).unwrap().len(), 1);
}

#[test]
fn membership_is_unique_per_user() {
    let db = open_db();
    let creator = make_user(&db, "sub|1", "a@example.com");
    let player = make_user(&db, "sub|2", "b@example.com");
    let cid = Uuid::new_v4().to_string();
    db.insert_campaign(&cid, "Test", None, &creator).unwrap();

    db.add_member(&cid, &player, "player").unwrap();
    assert!(db.add_member(&cid, &player, "gm").is_err());

    assert!(db.set_member_role(&cid, &player, "gm").unwrap());
    assert_eq!(db.member_role(&cid, &player).unwrap().as_deref(), Some("gm"));

    assert!(db.remove_member(&cid, &player).unwrap());
    assert!(!db.remove_member(&cid, &player).unwrap());
    assert_eq!(db.member_role(&cid, &player).unwrap(), None);
}

#[test]
fn roster_listing_joins_user_profiles() {
    let db = open_db();
    let creator = make_user(&db, "sub|1", "a@example.com");
    let cid = Uuid::new_v4().to_string();
    db.insert_campaign(&cid, "Test", None, &creator).unwrap();

    let members = db.list_members(&cid).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].email, "a@example.com");
    assert_eq!(members[0].role, "gm");
}

#[test]
fn encounter_listing_is_scoped_and_skips_deleted() {
    let db = open_db();
    let creator = make_user(&db, "sub|1", "a@example.com");
    let cid_a = Uuid::new_v4().to_string();
    let cid_b = Uuid::new_v4().to_string();
    db.insert_campaign(&cid_a, "A", None, &creator).unwrap();
    db.insert_campaign(&cid_b, "B", None, &creator).unwrap();

    db.insert_encounter("enc-1", &cid_a, Some("Ambush"), "{\"id\":\"enc-1\"}", &creator)
        .unwrap();
    db.insert_encounter("enc-2", &cid_b, None, "{\"id\":\"enc-2\"}", &creator)
        .unwrap();

    assert_eq!(db.list_encounters(&cid_a).unwrap().len(), 1);

    assert!(db.soft_delete_encounter("enc-1").unwrap());
    assert!(db.list_encounters(&cid_a).unwrap().is_empty());
    // Still present for admin tooling.
    assert!(db.get_encounter("enc-1").unwrap().unwrap().is_deleted);
}

#[test]
fn project_points_update_in_place() {
    let db = open_db();
    let creator = make_user(&db, "sub|1", "a@example.com");
    let cid = Uuid::new_v4().to_string();
    db.insert_campaign(&cid, "Test", None, &creator).unwrap();

    let pid = Uuid::new_v4().to_string();
    db.insert_project(&pid, &cid, "Forge a blade", 0, None, &creator)
        .unwrap();
    db.update_project(&pid, "Forge a blade", 15, None).unwrap();

    let row = db.get_project(&pid).unwrap().unwrap();
    assert_eq!(row.points, 15);
    assert_eq!(row.name, "Forge a blade");
}

use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};

use crate::Database;
use crate::models::{CampaignRow, CharacterRow, EncounterRow, MemberRow, ProjectRow, UserRow};

impl Database {
    // -- Users --

    /// Find-or-create by identity-provider subject. Refreshes email and
    /// display name when the token disagrees with the stored row.
    pub fn upsert_user(
        &self,
        id: &str,
        subject: &str,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            if let Some(existing) = query_user_by_subject(conn, subject)? {
                if existing.email != email || existing.display_name.as_deref() != display_name {
                    conn.execute(
                        "UPDATE users SET email = ?1, display_name = ?2, updated_at = datetime('now')
                         WHERE id = ?3",
                        params![email, display_name, existing.id],
                    )?;
                }
            } else {
                conn.execute(
                    "INSERT INTO users (id, subject, email, display_name) VALUES (?1, ?2, ?3, ?4)",
                    params![id, subject, email, display_name],
                )?;
            }

            query_user_by_subject(conn, subject)?
                .ok_or_else(|| anyhow!("user row missing after upsert: {}", subject))
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                [id],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE email = ?1 COLLATE NOCASE"),
                [email],
                user_from_row,
            )
            .optional()
        })
    }

    // -- Characters --

    pub fn insert_character(
        &self,
        id: &str,
        user_id: &str,
        name: Option<&str>,
        data: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO characters (id, user_id, name, data) VALUES (?1, ?2, ?3, ?4)",
                params![id, user_id, name, data],
            )?;
            Ok(())
        })
    }

    /// Returns the row whether or not it is soft-deleted; visibility of
    /// deleted rows is an access decision, not a storage one.
    pub fn get_character(&self, id: &str) -> Result<Option<CharacterRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CHARACTER_COLS} FROM characters WHERE id = ?1"),
                [id],
                character_from_row,
            )
            .optional()
        })
    }

    /// Characters the user owns or has been handed as GM.
    pub fn list_characters_for_user(&self, user_id: &str) -> Result<Vec<CharacterRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHARACTER_COLS} FROM characters
                 WHERE (user_id = ?1 OR gm_user_id = ?1) AND is_deleted = 0
                 ORDER BY updated_at DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], character_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_characters_in_campaign(&self, campaign_id: &str) -> Result<Vec<CharacterRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHARACTER_COLS} FROM characters
                 WHERE campaign_id = ?1 AND is_deleted = 0
                 ORDER BY name"
            ))?;
            let rows = stmt
                .query_map([campaign_id], character_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_character_sheet(&self, id: &str, name: Option<&str>, data: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE characters SET name = ?1, data = ?2, updated_at = datetime('now')
                 WHERE id = ?3",
                params![name, data, id],
            )?;
            Ok(())
        })
    }

    pub fn set_character_gm(&self, id: &str, gm_user_id: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE characters SET gm_user_id = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![gm_user_id, id],
            )?;
            Ok(())
        })
    }

    pub fn set_character_campaign(&self, id: &str, campaign_id: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE characters SET campaign_id = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![campaign_id, id],
            )?;
            Ok(())
        })
    }

    /// Returns false when the row was already deleted or never existed, so
    /// a second delete is indistinguishable from deleting nothing.
    pub fn soft_delete_character(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE characters SET is_deleted = 1, updated_at = datetime('now')
                 WHERE id = ?1 AND is_deleted = 0",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Campaigns --

    /// Creates the campaign and enrolls the creator as GM in one transaction.
    pub fn insert_campaign(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
        created_by: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO campaigns (id, name, description, created_by) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, description, created_by],
            )?;
            tx.execute(
                "INSERT INTO campaign_members (campaign_id, user_id, role) VALUES (?1, ?2, 'gm')",
                params![id, created_by],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_campaign(&self, id: &str) -> Result<Option<CampaignRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {CAMPAIGN_COLS} FROM campaigns WHERE id = ?1"),
                [id],
                campaign_from_row,
            )
            .optional()
        })
    }

    /// Campaigns the user created or belongs to.
    pub fn list_campaigns_for_user(&self, user_id: &str) -> Result<Vec<CampaignRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT c.id, c.name, c.description, c.created_by, c.is_deleted,
                        c.created_at, c.updated_at
                 FROM campaigns c
                 LEFT JOIN campaign_members m ON m.campaign_id = c.id
                 WHERE c.is_deleted = 0 AND (c.created_by = ?1 OR m.user_id = ?1)
                 ORDER BY c.created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], campaign_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_campaign(&self, id: &str, name: &str, description: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE campaigns SET name = ?1, description = ?2, updated_at = datetime('now')
                 WHERE id = ?3",
                params![name, description, id],
            )?;
            Ok(())
        })
    }

    pub fn soft_delete_campaign(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET is_deleted = 1, updated_at = datetime('now')
                 WHERE id = ?1 AND is_deleted = 0",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Campaign members --

    pub fn member_role(&self, campaign_id: &str, user_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT role FROM campaign_members WHERE campaign_id = ?1 AND user_id = ?2",
                params![campaign_id, user_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn add_member(&self, campaign_id: &str, user_id: &str, role: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO campaign_members (campaign_id, user_id, role) VALUES (?1, ?2, ?3)",
                params![campaign_id, user_id, role],
            )?;
            Ok(())
        })
    }

    pub fn list_members(&self, campaign_id: &str) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.user_id, u.email, u.display_name, m.role, m.joined_at
                 FROM campaign_members m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.campaign_id = ?1
                 ORDER BY m.joined_at",
            )?;
            let rows = stmt
                .query_map([campaign_id], |row| {
                    Ok(MemberRow {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                        role: row.get(3)?,
                        joined_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_member_role(&self, campaign_id: &str, user_id: &str, role: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE campaign_members SET role = ?1 WHERE campaign_id = ?2 AND user_id = ?3",
                params![role, campaign_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn remove_member(&self, campaign_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM campaign_members WHERE campaign_id = ?1 AND user_id = ?2",
                params![campaign_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Encounters --

    pub fn insert_encounter(
        &self,
        id: &str,
        campaign_id: &str,
        name: Option<&str>,
        data: &str,
        created_by: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO encounters (id, campaign_id, name, data, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, campaign_id, name, data, created_by],
            )?;
            Ok(())
        })
    }

    pub fn get_encounter(&self, id: &str) -> Result<Option<EncounterRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ENCOUNTER_COLS} FROM encounters WHERE id = ?1"),
                [id],
                encounter_from_row,
            )
            .optional()
        })
    }

    pub fn list_encounters(&self, campaign_id: &str) -> Result<Vec<EncounterRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENCOUNTER_COLS} FROM encounters
                 WHERE campaign_id = ?1 AND is_deleted = 0
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([campaign_id], encounter_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_encounter_sheet(&self, id: &str, name: Option<&str>, data: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE encounters SET name = ?1, data = ?2, updated_at = datetime('now')
                 WHERE id = ?3",
                params![name, data, id],
            )?;
            Ok(())
        })
    }

    pub fn soft_delete_encounter(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE encounters SET is_deleted = 1, updated_at = datetime('now')
                 WHERE id = ?1 AND is_deleted = 0",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Projects --

    pub fn insert_project(
        &self,
        id: &str,
        campaign_id: &str,
        name: &str,
        points: i64,
        data: Option<&str>,
        created_by: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO projects (id, campaign_id, name, points, data, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, campaign_id, name, points, data, created_by],
            )?;
            Ok(())
        })
    }

    pub fn get_project(&self, id: &str) -> Result<Option<ProjectRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1"),
                [id],
                project_from_row,
            )
            .optional()
        })
    }

    pub fn list_projects(&self, campaign_id: &str) -> Result<Vec<ProjectRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROJECT_COLS} FROM projects
                 WHERE campaign_id = ?1 AND is_deleted = 0
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([campaign_id], project_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_project(
        &self,
        id: &str,
        name: &str,
        points: i64,
        data: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE projects SET name = ?1, points = ?2, data = ?3, updated_at = datetime('now')
                 WHERE id = ?4",
                params![name, points, data, id],
            )?;
            Ok(())
        })
    }

    pub fn soft_delete_project(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE projects SET is_deleted = 1, updated_at = datetime('now')
                 WHERE id = ?1 AND is_deleted = 0",
                [id],
            )?;
            Ok(changed > 0)
        })
    }
}

const USER_COLS: &str = "id, subject, email, display_name, created_at, updated_at";
const CHARACTER_COLS: &str =
    "id, user_id, gm_user_id, campaign_id, name, data, is_deleted, created_at, updated_at";
const CAMPAIGN_COLS: &str =
    "id, name, description, created_by, is_deleted, created_at, updated_at";
const ENCOUNTER_COLS: &str =
    "id, campaign_id, name, data, created_by, is_deleted, created_at, updated_at";
const PROJECT_COLS: &str =
    "id, campaign_id, name, points, data, created_by, is_deleted, created_at, updated_at";

fn query_user_by_subject(conn: &Connection, subject: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE subject = ?1"),
        [subject],
        user_from_row,
    )
    .optional()
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        subject: row.get(1)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn character_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CharacterRow> {
    Ok(CharacterRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        gm_user_id: row.get(2)?,
        campaign_id: row.get(3)?,
        name: row.get(4)?,
        data: row.get(5)?,
        is_deleted: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn campaign_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CampaignRow> {
    Ok(CampaignRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        is_deleted: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn encounter_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EncounterRow> {
    Ok(EncounterRow {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        name: row.get(2)?,
        data: row.get(3)?,
        created_by: row.get(4)?,
        is_deleted: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        name: row.get(2)?,
        points: row.get(3)?,
        data: row.get(4)?,
        created_by: row.get(5)?,
        is_deleted: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

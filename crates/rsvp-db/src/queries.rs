use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, params};

use rsvp_types::models::{
    AdditionalGuest, EventInput, GuestInput, Role, Rsvp, RsvpInput, RsvpWithGuests, User,
    UserContact, WeddingEvent,
};

use crate::Database;
use crate::models::{
    EVENT_COLUMNS, EventRow, GUEST_COLUMNS, GuestRow, RSVP_COLUMNS, RsvpRow, USER_COLUMNS, UserRow,
    now_timestamp,
};

/// A stored user together with its password hash, for login.
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO users (id, name, email, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(email) DO NOTHING
                 RETURNING {USER_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![id, name, email, password_hash, role.as_str(), now_timestamp()],
                UserRow::from_row,
            )
            .optional()?
            .map(UserRow::into_user)
            .transpose()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(conn, "id", id)?
                .map(UserRow::into_user)
                .transpose()
        })
    }

    pub fn get_credentials_by_email(&self, email: &str) -> Result<Option<Credentials>> {
        self.with_conn(|conn| {
            let Some(row) = query_user(conn, "email", email)? else {
                return Ok(None);
            };
            let password_hash = row.password.clone();
            Ok(Some(Credentials {
                user: row.into_user()?,
                password_hash,
            }))
        })
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name COLLATE NOCASE, id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], UserRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(UserRow::into_user).collect()
        })
    }

    /// Returns `None` when no user has this id.
    pub fn set_user_role(&self, id: &str, role: Role) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("UPDATE users SET role = ?1 WHERE id = ?2 RETURNING {USER_COLUMNS}");
            conn.query_row(&sql, params![role.as_str(), id], UserRow::from_row)
                .optional()?
                .map(UserRow::into_user)
                .transpose()
        })
    }

    // -- Wedding event --

    pub fn get_event(&self) -> Result<Option<WeddingEvent>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM wedding_event WHERE id = 1");
            conn.query_row(&sql, [], EventRow::from_row)
                .optional()?
                .map(EventRow::into_event)
                .transpose()
        })
    }

    /// Insert the event on first call, update it in place afterwards. The
    /// fixed key and single statement keep exactly one row under concurrent
    /// writers; the last writer wins.
    pub fn upsert_event(&self, input: &EventInput) -> Result<WeddingEvent> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO wedding_event
                    (id, title, date, time, location, location_details, program, dresscode,
                     additional_info, created_at, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    date = excluded.date,
                    time = excluded.time,
                    location = excluded.location,
                    location_details = excluded.location_details,
                    program = excluded.program,
                    dresscode = excluded.dresscode,
                    additional_info = excluded.additional_info,
                    updated_at = excluded.updated_at
                 RETURNING {EVENT_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![
                    input.title,
                    input.date.format("%Y-%m-%d").to_string(),
                    input.time,
                    input.location,
                    input.location_details,
                    input.program,
                    input.dresscode,
                    input.additional_info,
                    now_timestamp(),
                ],
                EventRow::from_row,
            )?
            .into_event()
        })
    }

    // -- RSVPs --

    pub fn get_rsvp_by_user(&self, user_id: &str) -> Result<Option<Rsvp>> {
        self.with_conn(|conn| query_rsvp(conn, "user_id", &user_id))
    }

    pub fn get_rsvp(&self, id: i64) -> Result<Option<Rsvp>> {
        self.with_conn(|conn| query_rsvp(conn, "id", &id))
    }

    /// Create-or-overwrite keyed on `user_id`. `id` and `created_at` survive a
    /// resubmission; every other field takes the new value.
    pub fn upsert_rsvp(&self, input: &RsvpInput) -> Result<Rsvp> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO rsvps
                    (user_id, attending, allergies, food_preferences, message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(user_id) DO UPDATE SET
                    attending = excluded.attending,
                    allergies = excluded.allergies,
                    food_preferences = excluded.food_preferences,
                    message = excluded.message,
                    updated_at = excluded.updated_at
                 RETURNING {RSVP_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![
                    input.user_id,
                    input.attending,
                    input.allergies,
                    input.food_preferences,
                    input.message,
                    now_timestamp(),
                ],
                RsvpRow::from_row,
            )?
            .into_rsvp()
        })
    }

    /// Full roster in two reads: RSVPs joined with their user, then every
    /// additional guest grouped by RSVP. An RSVP whose user no longer
    /// resolves gets `user: None`.
    pub fn get_all_rsvps_with_guests(&self) -> Result<Vec<RsvpWithGuests>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.user_id, r.attending, r.allergies, r.food_preferences, r.message,
                        r.created_at, r.updated_at, u.name, u.email
                 FROM rsvps r
                 LEFT JOIN users u ON u.id = r.user_id
                 ORDER BY r.created_at, r.id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    let name: Option<String> = row.get(8)?;
                    let email: Option<String> = row.get(9)?;
                    let contact = match (name, email) {
                        (Some(name), Some(email)) => Some(UserContact { name, email }),
                        _ => None,
                    };
                    Ok((RsvpRow::from_row(row)?, contact))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut guests_by_rsvp: HashMap<i64, Vec<AdditionalGuest>> = HashMap::new();
            for guest in query_guests(conn, None)? {
                guests_by_rsvp.entry(guest.rsvp_id).or_default().push(guest);
            }

            rows.into_iter()
                .map(|(row, user)| -> Result<RsvpWithGuests> {
                    let rsvp = row.into_rsvp()?;
                    let additional_guests = guests_by_rsvp.remove(&rsvp.id).unwrap_or_default();
                    Ok(RsvpWithGuests {
                        rsvp,
                        user,
                        additional_guests,
                    })
                })
                .collect()
        })
    }

    // -- Additional guests --

    pub fn list_guests_by_rsvp(&self, rsvp_id: i64) -> Result<Vec<AdditionalGuest>> {
        self.with_conn(|conn| query_guests(conn, Some(rsvp_id)))
    }

    pub fn get_guest(&self, id: i64) -> Result<Option<AdditionalGuest>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {GUEST_COLUMNS} FROM additional_guests WHERE id = ?1");
            conn.query_row(&sql, [id], GuestRow::from_row)
                .optional()?
                .map(GuestRow::into_guest)
                .transpose()
        })
    }

    /// Returns `None` when the RSVP already has its additional guest.
    pub fn create_guest(&self, rsvp_id: i64, input: &GuestInput) -> Result<Option<AdditionalGuest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO additional_guests
                    (rsvp_id, name, attending, allergies, food_preferences, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(rsvp_id) DO NOTHING
                 RETURNING {GUEST_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![
                    rsvp_id,
                    input.name,
                    input.attending,
                    input.allergies,
                    input.food_preferences,
                    now_timestamp(),
                ],
                GuestRow::from_row,
            )
            .optional()?
            .map(GuestRow::into_guest)
            .transpose()
        })
    }

    /// Returns `None` when no guest has this id.
    pub fn update_guest(&self, id: i64, input: &GuestInput) -> Result<Option<AdditionalGuest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "UPDATE additional_guests
                 SET name = ?1, attending = ?2, allergies = ?3, food_preferences = ?4
                 WHERE id = ?5
                 RETURNING {GUEST_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![
                    input.name,
                    input.attending,
                    input.allergies,
                    input.food_preferences,
                    id
                ],
                GuestRow::from_row,
            )
            .optional()?
            .map(GuestRow::into_guest)
            .transpose()
        })
    }

    /// Deleting an id that does not exist is not an error. Returns whether a
    /// row was removed.
    pub fn delete_guest(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM additional_guests WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let row = conn.query_row(&sql, [value], UserRow::from_row).optional()?;
    Ok(row)
}

fn query_rsvp(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<Rsvp>> {
    let sql = format!("SELECT {RSVP_COLUMNS} FROM rsvps WHERE {column} = ?1");
    conn.query_row(&sql, [value], RsvpRow::from_row)
        .optional()?
        .map(RsvpRow::into_rsvp)
        .transpose()
}

fn query_guests(conn: &Connection, rsvp_id: Option<i64>) -> Result<Vec<AdditionalGuest>> {
    let sql = format!(
        "SELECT {GUEST_COLUMNS} FROM additional_guests
         WHERE ?1 IS NULL OR rsvp_id = ?1
         ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([rsvp_id], GuestRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(GuestRow::into_guest).collect()
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn db_with_users(ids: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for id in ids {
            db.create_user(id, id, &format!("{id}@example.com"), "hash", Role::Guest)
                .unwrap();
        }
        db
    }

    fn event(title: &str) -> EventInput {
        EventInput {
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 6, 26).unwrap(),
            time: Some("15:00".into()),
            location: "Hall".into(),
            location_details: None,
            program: None,
            dresscode: None,
            additional_info: None,
        }
    }

    fn rsvp(user_id: &str, attending: bool, allergies: Option<&str>) -> RsvpInput {
        RsvpInput {
            user_id: user_id.to_string(),
            attending,
            allergies: allergies.map(str::to_string),
            food_preferences: None,
            message: None,
        }
    }

    fn guest(name: &str, attending: bool) -> GuestInput {
        GuestInput {
            name: name.to_string(),
            attending,
            allergies: None,
            food_preferences: None,
        }
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn event_is_absent_until_first_upsert() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_event().unwrap().is_none());
    }

    #[test]
    fn event_upserts_keep_a_single_row() {
        let db = Database::open_in_memory().unwrap();

        let first = db.upsert_event(&event("A")).unwrap();
        assert_eq!(first.id, 1);

        let mut input = event("B");
        input.time = None;
        let second = db.upsert_event(&input).unwrap();
        assert_eq!(second.id, 1);
        assert_eq!(second.title, "B");
        assert_eq!(second.time, None);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);

        for title in ["C", "D", "E"] {
            db.upsert_event(&event(title)).unwrap();
        }
        assert_eq!(count(&db, "wedding_event"), 1);
        assert_eq!(db.get_event().unwrap().unwrap().title, "E");
    }

    #[test]
    fn rsvp_resubmission_overwrites_in_place() {
        let db = db_with_users(&["u1"]);

        let first = db.upsert_rsvp(&rsvp("u1", true, Some("nuts"))).unwrap();
        let mut again = rsvp("u1", false, None);
        again.message = Some("can't make it".into());
        let second = db.upsert_rsvp(&again).unwrap();

        assert_eq!(second.id, first.id);
        assert!(!second.attending);
        assert_eq!(second.allergies, None);
        assert_eq!(second.message.as_deref(), Some("can't make it"));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(count(&db, "rsvps"), 1);

        assert_eq!(db.get_rsvp_by_user("u1").unwrap(), Some(second.clone()));
        assert_eq!(db.get_rsvp(second.id).unwrap(), Some(second));
    }

    #[test]
    fn rsvp_lookup_for_unknown_user_is_none() {
        let db = db_with_users(&[]);
        assert!(db.get_rsvp_by_user("nobody").unwrap().is_none());
    }

    #[test]
    fn rsvp_requires_existing_user() {
        let db = db_with_users(&[]);
        assert!(db.upsert_rsvp(&rsvp("ghost", true, None)).is_err());
    }

    #[test]
    fn one_additional_guest_per_rsvp() {
        let db = db_with_users(&["u1"]);
        let r = db.upsert_rsvp(&rsvp("u1", true, None)).unwrap();

        let created = db.create_guest(r.id, &guest("Bea", true)).unwrap();
        assert!(created.is_some());
        assert!(db.create_guest(r.id, &guest("Cid", true)).unwrap().is_none());

        let listed = db.list_guests_by_rsvp(r.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Bea");
    }

    #[test]
    fn guest_update_and_missing_id() {
        let db = db_with_users(&["u1"]);
        let r = db.upsert_rsvp(&rsvp("u1", true, None)).unwrap();
        let g = db.create_guest(r.id, &guest("Bea", true)).unwrap().unwrap();

        let updated = db.update_guest(g.id, &guest("Beatrice", false)).unwrap().unwrap();
        assert_eq!(updated.id, g.id);
        assert_eq!(updated.name, "Beatrice");
        assert!(!updated.attending);
        assert_eq!(updated.created_at, g.created_at);

        assert!(db.update_guest(999, &guest("Nobody", true)).unwrap().is_none());
    }

    #[test]
    fn guest_delete_is_idempotent() {
        let db = db_with_users(&["u1"]);
        let r = db.upsert_rsvp(&rsvp("u1", true, None)).unwrap();
        let g = db.create_guest(r.id, &guest("Bea", true)).unwrap().unwrap();

        assert!(db.delete_guest(g.id).unwrap());
        assert!(!db.delete_guest(g.id).unwrap());
        assert!(db.get_guest(g.id).unwrap().is_none());

        // The slot is free again.
        assert!(db.create_guest(r.id, &guest("Cid", true)).unwrap().is_some());
    }

    #[test]
    fn roster_joins_users_and_guests() {
        let db = db_with_users(&["u1", "u2"]);
        let r1 = db.upsert_rsvp(&rsvp("u1", true, None)).unwrap();
        db.upsert_rsvp(&rsvp("u2", false, None)).unwrap();
        db.create_guest(r1.id, &guest("Bea", true)).unwrap();

        let roster = db.get_all_rsvps_with_guests().unwrap();
        assert_eq!(roster.len(), 2);

        let first = roster.iter().find(|e| e.rsvp.user_id == "u1").unwrap();
        assert_eq!(first.user.as_ref().unwrap().email, "u1@example.com");
        assert_eq!(first.additional_guests.len(), 1);

        let second = roster.iter().find(|e| e.rsvp.user_id == "u2").unwrap();
        assert!(second.additional_guests.is_empty());
    }

    #[test]
    fn roster_tolerates_missing_user_row() {
        let db = db_with_users(&["u1"]);
        db.upsert_rsvp(&rsvp("u1", true, None)).unwrap();
        db.with_conn(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = OFF; DELETE FROM users WHERE id = 'u1';")?;
            Ok(())
        })
        .unwrap();

        let roster = db.get_all_rsvps_with_guests().unwrap();
        assert_eq!(roster.len(), 1);
        assert!(roster[0].user.is_none());
    }

    #[test]
    fn user_roles_and_credentials() {
        let db = db_with_users(&["u1"]);

        let creds = db.get_credentials_by_email("u1@example.com").unwrap().unwrap();
        assert_eq!(creds.user.id, "u1");
        assert_eq!(creds.password_hash, "hash");
        assert_eq!(creds.user.role, Role::Guest);

        let promoted = db.set_user_role("u1", Role::Admin).unwrap().unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert_eq!(db.get_user_by_id("u1").unwrap().unwrap().role, Role::Admin);

        assert!(db.set_user_role("missing", Role::Admin).unwrap().is_none());
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_email_returns_none() {
        let db = db_with_users(&["u1"]);
        let dup = db
            .create_user("u2", "Other", "u1@example.com", "hash", Role::Guest)
            .unwrap();
        assert!(dup.is_none());
        assert!(db.get_user_by_id("u2").unwrap().is_none());
        assert_eq!(db.list_users().unwrap().len(), 1);
    }
}

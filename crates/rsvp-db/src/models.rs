//! Database row types. These map directly to SQLite rows.
//! Distinct from rsvp-types API models to keep the DB layer independent;
//! conversion happens once, when a row leaves the store.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Row;

use rsvp_types::models::{AdditionalGuest, Role, Rsvp, User, WeddingEvent};

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub date: String,
    pub time: Option<String>,
    pub location: String,
    pub location_details: Option<String>,
    pub program: Option<String>,
    pub dresscode: Option<String>,
    pub additional_info: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct RsvpRow {
    pub id: i64,
    pub user_id: String,
    pub attending: bool,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
    pub message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct GuestRow {
    pub id: i64,
    pub rsvp_id: i64,
    pub name: String,
    pub attending: bool,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
    pub created_at: String,
}

pub(crate) const USER_COLUMNS: &str = "id, name, email, password, role, created_at";
pub(crate) const EVENT_COLUMNS: &str = "id, title, date, time, location, location_details, \
     program, dresscode, additional_info, created_at, updated_at";
pub(crate) const RSVP_COLUMNS: &str =
    "id, user_id, attending, allergies, food_preferences, message, created_at, updated_at";
pub(crate) const GUEST_COLUMNS: &str =
    "id, rsvp_id, name, attending, allergies, food_preferences, created_at";

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    /// Role strings are parsed here and nowhere else.
    pub fn into_user(self) -> Result<User> {
        let role: Role = self
            .role
            .parse()
            .with_context(|| format!("corrupt role on user '{}'", self.id))?;
        Ok(User {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            name: self.name,
            email: self.email,
            role,
        })
    }
}

impl EventRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            date: row.get(2)?,
            time: row.get(3)?,
            location: row.get(4)?,
            location_details: row.get(5)?,
            program: row.get(6)?,
            dresscode: row.get(7)?,
            additional_info: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    pub fn into_event(self) -> Result<WeddingEvent> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .with_context(|| format!("corrupt event date '{}'", self.date))?;
        Ok(WeddingEvent {
            id: self.id,
            title: self.title,
            date,
            time: self.time,
            location: self.location,
            location_details: self.location_details,
            program: self.program,
            dresscode: self.dresscode,
            additional_info: self.additional_info,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

impl RsvpRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            attending: row.get(2)?,
            allergies: row.get(3)?,
            food_preferences: row.get(4)?,
            message: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub fn into_rsvp(self) -> Result<Rsvp> {
        Ok(Rsvp {
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
            user_id: self.user_id,
            attending: self.attending,
            allergies: self.allergies,
            food_preferences: self.food_preferences,
            message: self.message,
        })
    }
}

impl GuestRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            rsvp_id: row.get(1)?,
            name: row.get(2)?,
            attending: row.get(3)?,
            allergies: row.get(4)?,
            food_preferences: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    pub fn into_guest(self) -> Result<AdditionalGuest> {
        Ok(AdditionalGuest {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            rsvp_id: self.rsvp_id,
            name: self.name,
            attending: self.attending,
            allergies: self.allergies,
            food_preferences: self.food_preferences,
        })
    }
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 as written by this crate, and SQLite's own
/// `YYYY-MM-DD HH:MM:SS` for rows written by hand.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", value))
}

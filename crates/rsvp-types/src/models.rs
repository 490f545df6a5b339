use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Access level of a user. Ordered: `Guest < Editor < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    Editor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Guest, Role::Editor, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Self::Guest),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// A user as exposed over the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Name and email joined onto roster entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContact {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeddingEvent {
    pub id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub location: String,
    pub location_details: Option<String>,
    pub program: Option<String>,
    pub dresscode: Option<String>,
    pub additional_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rsvp {
    pub id: i64,
    pub user_id: String,
    pub attending: bool,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalGuest {
    pub id: i64,
    pub rsvp_id: i64,
    pub name: String,
    pub attending: bool,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Roster entry: an RSVP with its additional guests and, when the user row
/// still resolves, the submitting user's contact details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpWithGuests {
    #[serde(flatten)]
    pub rsvp: Rsvp,
    pub user: Option<UserContact>,
    pub additional_guests: Vec<AdditionalGuest>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpStats {
    pub total_responses: u32,
    pub attending: u32,
    pub declined: u32,
    pub additional_guests: u32,
    pub additional_guests_attending: u32,
    pub expected_headcount: u32,
}

impl RsvpStats {
    /// Additional guests only count toward the headcount when the RSVP they
    /// belong to is itself attending.
    pub fn from_roster(roster: &[RsvpWithGuests]) -> Self {
        let mut stats = Self::default();
        for entry in roster {
            stats.total_responses += 1;
            if entry.rsvp.attending {
                stats.attending += 1;
            } else {
                stats.declined += 1;
            }
            for guest in &entry.additional_guests {
                stats.additional_guests += 1;
                if entry.rsvp.attending && guest.attending {
                    stats.additional_guests_attending += 1;
                }
            }
        }
        stats.expected_headcount = stats.attending + stats.additional_guests_attending;
        stats
    }
}

// -- Validated store inputs --

#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub location: String,
    pub location_details: Option<String>,
    pub program: Option<String>,
    pub dresscode: Option<String>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsvpInput {
    pub user_id: String,
    pub attending: bool,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuestInput {
    pub name: String,
    pub attending: bool,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{EventInput, GuestInput, Role, RsvpInput, User};

// -- Session claims --

/// JWT claims. The subject is the user id; name, email and role are looked up
/// from the user row on every request so role changes apply immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Envelope --

/// Uniform response body: `{"success": true, "data": ..}` or
/// `{"success": false, "error": ".."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// -- Validation --

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Trimmed, non-empty text or `None`.
fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, ValidationError> {
        let name = text(self.name).ok_or_else(|| ValidationError::new("Name is required"))?;
        let email = text(self.email)
            .filter(|e| e.contains('@'))
            .ok_or_else(|| ValidationError::new("A valid email is required"))?
            .to_lowercase();
        let password = self.password.unwrap_or_default();
        if password.len() < 8 {
            return Err(ValidationError::new(
                "Password must be at least 8 characters",
            ));
        }
        Ok(Registration {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(self) -> Result<(String, String), ValidationError> {
        match (text(self.email), self.password) {
            (Some(email), Some(password)) if !password.is_empty() => {
                Ok((email.to_lowercase(), password))
            }
            _ => Err(ValidationError::new("Email and password are required")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// -- Wedding event --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertEventRequest {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub location_details: Option<String>,
    pub program: Option<String>,
    pub dresscode: Option<String>,
    pub additional_info: Option<String>,
}

impl UpsertEventRequest {
    pub fn validate(self) -> Result<EventInput, ValidationError> {
        let (Some(title), Some(date), Some(location)) =
            (text(self.title), text(self.date), text(self.location))
        else {
            return Err(ValidationError::new(
                "Title, date, and location are required",
            ));
        };

        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| ValidationError::new("Date must be formatted as YYYY-MM-DD"))?;

        Ok(EventInput {
            title,
            date,
            time: text(self.time),
            location,
            location_details: text(self.location_details),
            program: text(self.program),
            dresscode: text(self.dresscode),
            additional_info: text(self.additional_info),
        })
    }
}

// -- RSVP --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRsvpRequest {
    pub user_id: Option<String>,
    pub attending: Option<bool>,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
    pub message: Option<String>,
}

impl UpsertRsvpRequest {
    pub fn validate(self) -> Result<RsvpInput, ValidationError> {
        let (Some(user_id), Some(attending)) = (text(self.user_id), self.attending) else {
            return Err(ValidationError::new("userId and attending are required"));
        };
        Ok(RsvpInput {
            user_id,
            attending,
            allergies: text(self.allergies),
            food_preferences: text(self.food_preferences),
            message: text(self.message),
        })
    }
}

// -- Additional guests --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestListQuery {
    pub rsvp_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct GuestIdQuery {
    pub id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuestRequest {
    pub rsvp_id: Option<i64>,
    pub name: Option<String>,
    pub attending: Option<bool>,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
}

impl CreateGuestRequest {
    pub fn validate(self) -> Result<(i64, GuestInput), ValidationError> {
        let (Some(rsvp_id), Some(name), Some(attending)) =
            (self.rsvp_id, text(self.name), self.attending)
        else {
            return Err(ValidationError::new(
                "rsvpId, name, and attending are required",
            ));
        };
        Ok((
            rsvp_id,
            GuestInput {
                name,
                attending,
                allergies: text(self.allergies),
                food_preferences: text(self.food_preferences),
            },
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGuestRequest {
    pub name: Option<String>,
    pub attending: Option<bool>,
    pub allergies: Option<String>,
    pub food_preferences: Option<String>,
}

impl UpdateGuestRequest {
    pub fn validate(self) -> Result<GuestInput, ValidationError> {
        let (Some(name), Some(attending)) = (text(self.name), self.attending) else {
            return Err(ValidationError::new("name and attending are required"));
        };
        Ok(GuestInput {
            name,
            attending,
            allergies: text(self.allergies),
            food_preferences: text(self.food_preferences),
        })
    }
}

// -- Roles --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangeRoleRequest {
    pub user_id: Option<String>,
    pub new_role: Option<String>,
}

impl ChangeRoleRequest {
    /// Only `guest` and `admin` are assignable here; editors are provisioned
    /// through configuration.
    pub fn validate(self) -> Result<(String, Role), ValidationError> {
        let (Some(user_id), Some(new_role)) = (text(self.user_id), text(self.new_role)) else {
            return Err(ValidationError::new("userId and newRole are required"));
        };
        match new_role.parse::<Role>() {
            Ok(role @ (Role::Guest | Role::Admin)) => Ok((user_id, role)),
            _ => Err(ValidationError::new("Invalid role")),
        }
    }
}

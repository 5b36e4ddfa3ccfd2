use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use utoipa::ToSchema;

pub type Id = i64;

// ---------------- check flag ----------------

/// Inspection flag of an apartment. Always rendered as integer 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[schema(value_type = i32, example = 1)]
pub struct CheckFlag(bool);

impl CheckFlag {
    pub const CLEAR: CheckFlag = CheckFlag(false);
    pub const NEEDS_CHECK: CheckFlag = CheckFlag(true);

    pub fn new(needs_check: bool) -> Self {
        Self(needs_check)
    }

    pub fn needs_check(self) -> bool {
        self.0
    }

    pub fn as_int(self) -> i32 {
        i32::from(self.0)
    }

    /// Strict status parsing used by the status endpoints: only 0 and 1.
    pub fn from_status(status: i64) -> Option<Self> {
        match status {
            0 => Some(Self(false)),
            1 => Some(Self(true)),
            _ => None,
        }
    }

    /// Decode a raw single-byte column value (ASCII `'0'` / `'1'` or the
    /// bytes 0 / 1).
    pub fn decode_raw(raw: &[u8]) -> Option<Self> {
        match raw {
            [b'0'] | [0] => Some(Self(false)),
            [b'1'] | [1] => Some(Self(true)),
            _ => None,
        }
    }

    /// Lenient decoding of any JSON shape the flag has been stored or sent as.
    pub fn decode_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self(*b)),
            Value::Number(n) => n.as_i64().and_then(Self::from_status),
            Value::String(s) => match s.trim() {
                "0" | "false" => Some(Self(false)),
                "1" | "true" => Some(Self(true)),
                _ => None,
            },
            Value::Array(items) => {
                let bytes: Option<Vec<u8>> = items
                    .iter()
                    .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect();
                bytes.and_then(|b| Self::decode_raw(&b))
            }
            _ => None,
        }
    }
}

impl Serialize for CheckFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_int())
    }
}

impl<'de> Deserialize<'de> for CheckFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        CheckFlag::decode_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid check flag: {value}")))
    }
}

// ---------------- inventory ----------------

/// Parse the stored inventory text. Malformed text is returned as a plain
/// JSON string instead of failing the read.
pub fn parse_inventory(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}

/// Serialise an inventory document for storage. `None` and JSON null are
/// stored as SQL NULL.
pub fn serialize_inventory(inventory: Option<&Value>) -> Option<String> {
    match inventory {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.to_string()),
    }
}

// ---------------- users ----------------

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_owner: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_owner: bool,
}

/// Public view of a user returned by login and `/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub is_owner: bool,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self { id: u.id, email: u.email, username: u.username, is_owner: u.is_owner }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Owner {
    pub id: Id,
    pub username: String,
}

// ---------------- apartments ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Apartment {
    pub id: Id,
    pub address: String,
    pub city: String,
    #[schema(value_type = Object)]
    pub inventory: Value,
    pub to_check: CheckFlag,
    pub owner_id: Id,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApartment {
    pub address: String,
    pub city: String,
    pub inventory: Option<Value>,
    pub to_check: CheckFlag,
    pub owner_id: Id,
}

/// Apartment needing inspection, as seen by a linked tenant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApartmentToCheck {
    pub id: Id,
    pub address: String,
    pub city: String,
    pub to_check: CheckFlag,
    pub owner_username: String,
    pub owner_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: Id,
    pub message_content: String,
    pub created_at: DateTime<Utc>,
    pub sender_username: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHistoryMessage {
    pub apartment_id: Id,
    pub sender_id: Option<Id>,
    pub message_content: String,
}

// ---------------- photos ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PhotoStatus {
    Pending,
    Approved,
    Rejected,
}

impl PhotoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoStatus::Pending => "pending",
            PhotoStatus::Approved => "approved",
            PhotoStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PhotoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown photo status: {0}")]
pub struct UnknownPhotoStatus(pub String);

impl FromStr for PhotoStatus {
    type Err = UnknownPhotoStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PhotoStatus::Pending),
            "approved" => Ok(PhotoStatus::Approved),
            "rejected" => Ok(PhotoStatus::Rejected),
            other => Err(UnknownPhotoStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Photo {
    pub id: Id,
    pub apartment_id: Id,
    pub photo_url: String,
    pub message: Option<String>,
    pub status: PhotoStatus,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub apartment_id: Id,
    pub photo_url: String,
    pub message: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone)]
pub struct PhotoReview {
    pub status: PhotoStatus,
    pub reviewed_by: String,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhotoStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn check_flag_decodes_every_representation() {
        for v in [json!(1), json!(true), json!("1"), json!("true"), json!([49]), json!([1])] {
            assert_eq!(CheckFlag::decode_value(&v), Some(CheckFlag::NEEDS_CHECK), "{v}");
        }
        for v in [json!(0), json!(false), json!("0"), json!([48]), json!([0])] {
            assert_eq!(CheckFlag::decode_value(&v), Some(CheckFlag::CLEAR), "{v}");
        }
        assert_eq!(CheckFlag::decode_value(&json!(2)), None);
        assert_eq!(CheckFlag::decode_value(&json!("yes")), None);
        assert_eq!(CheckFlag::decode_value(&json!([48, 49])), None);
    }

    #[test]
    fn check_flag_serializes_as_integer() {
        assert_eq!(serde_json::to_value(CheckFlag::NEEDS_CHECK).unwrap(), json!(1));
        assert_eq!(serde_json::to_value(CheckFlag::CLEAR).unwrap(), json!(0));
    }

    #[test]
    fn strict_status_rejects_out_of_range() {
        assert_eq!(CheckFlag::from_status(1), Some(CheckFlag::NEEDS_CHECK));
        assert!(CheckFlag::from_status(-1).is_none());
        assert!(CheckFlag::from_status(2).is_none());
    }

    #[test]
    fn inventory_falls_back_to_raw_text() {
        assert_eq!(parse_inventory(Some(r#"{"sofa":"grey"}"#)), json!({"sofa": "grey"}));
        assert_eq!(parse_inventory(Some("sofa, table")), json!("sofa, table"));
        assert_eq!(parse_inventory(None), Value::Null);
    }

    #[test]
    fn inventory_null_is_not_stored() {
        assert_eq!(serialize_inventory(None), None);
        assert_eq!(serialize_inventory(Some(&Value::Null)), None);
        assert_eq!(serialize_inventory(Some(&json!({"bed": 1}))).as_deref(), Some(r#"{"bed":1}"#));
    }

    #[test]
    fn photo_status_round_trips_through_text() {
        assert_eq!("approved".parse::<PhotoStatus>(), Ok(PhotoStatus::Approved));
        assert!("archived".parse::<PhotoStatus>().is_err());
        assert_eq!(PhotoStatus::Rejected.to_string(), "rejected");
    }
}

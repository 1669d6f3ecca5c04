use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::Date;

/// Lifecycle status of an event, as exposed through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
    Active,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Completed => write!(f, "completed"),
            Self::Active => write!(f, "active"),
        }
    }
}

impl FromStr for EventStatus {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "active" => Ok(Self::Active),
            other => Err(crate::error::CoreError::invalid_field(
                "status",
                format!("unknown event status '{other}'"),
            )),
        }
    }
}

/// An event with a bounded number of confirmed attendees.
///
/// `confirmed_count` is the authoritative count of confirmed registrations
/// and is only ever mutated through the registration engine; the invariant
/// `confirmed_count <= capacity` holds at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub location: String,
    pub capacity: u32,
    pub organizer: String,
    pub status: EventStatus,
    #[serde(default)]
    pub waitlist_enabled: bool,
    #[serde(default)]
    pub confirmed_count: u32,
}

impl Event {
    pub fn has_capacity(&self) -> bool {
        self.confirmed_count < self.capacity
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.confirmed_count)
    }
}

/// A registered account that can hold registrations across events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub created_at: Timestamp,
}

/// Admission outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Waitlisted,
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Waitlisted => write!(f, "waitlisted"),
        }
    }
}

impl FromStr for RegistrationStatus {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "waitlisted" => Ok(Self::Waitlisted),
            other => Err(crate::error::CoreError::invalid_field(
                "status",
                format!("unknown registration status '{other}'"),
            )),
        }
    }
}

/// A user's registration for one event. At most one exists per
/// (event, user) pair.
///
/// `waitlist_position` is present exactly when the status is waitlisted. It
/// is a monotonically issued ticket, not a dense rank: positions are never
/// renumbered when earlier entries leave the waitlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub event_id: String,
    pub user_id: String,
    pub status: RegistrationStatus,
    pub registered_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waitlist_position: Option<u64>,
}

impl Registration {
    /// Creates a confirmed registration.
    pub fn confirmed(
        event_id: impl Into<String>,
        user_id: impl Into<String>,
        registered_at: Timestamp,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            user_id: user_id.into(),
            status: RegistrationStatus::Confirmed,
            registered_at,
            waitlist_position: None,
        }
    }

    /// Creates a waitlisted registration holding the given position ticket.
    pub fn waitlisted(
        event_id: impl Into<String>,
        user_id: impl Into<String>,
        registered_at: Timestamp,
        position: u64,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            user_id: user_id.into(),
            status: RegistrationStatus::Waitlisted,
            registered_at,
            waitlist_position: Some(position),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == RegistrationStatus::Confirmed
    }

    pub fn is_waitlisted(&self) -> bool {
        self.status == RegistrationStatus::Waitlisted
    }

    /// Flips a waitlisted registration to confirmed, clearing its position.
    pub fn promote(&mut self) {
        self.status = RegistrationStatus::Confirmed;
        self.waitlist_position = None;
    }
}

/// Serde support for `time::Date` as plain ISO `YYYY-MM-DD` strings.
pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;
    use time::format_description::BorrowedFormatItem;
    use time::macros::format_description;

    const FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = date.format(FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now_utc;
    use serde_json::json;
    use time::macros::date;

    fn sample_event() -> Event {
        Event {
            event_id: "evt-1".to_string(),
            title: "Rust Meetup".to_string(),
            description: Some("Monthly meetup".to_string()),
            date: date!(2025 - 09 - 01),
            location: "Main Hall".to_string(),
            capacity: 2,
            organizer: "Community".to_string(),
            status: EventStatus::Published,
            waitlist_enabled: true,
            confirmed_count: 0,
        }
    }

    #[test]
    fn test_event_status_serialization() {
        assert_eq!(
            serde_json::to_string(&EventStatus::Published).unwrap(),
            "\"published\""
        );
        let status: EventStatus = serde_json::from_str("\"draft\"").unwrap();
        assert_eq!(status, EventStatus::Draft);
    }

    #[test]
    fn test_event_status_from_str() {
        assert_eq!("active".parse::<EventStatus>().unwrap(), EventStatus::Active);
        assert!("nope".parse::<EventStatus>().is_err());
    }

    #[test]
    fn test_event_capacity_helpers() {
        let mut event = sample_event();
        assert!(event.has_capacity());
        assert_eq!(event.remaining_capacity(), 2);

        event.confirmed_count = 2;
        assert!(!event.has_capacity());
        assert_eq!(event.remaining_capacity(), 0);
    }

    #[test]
    fn test_event_serialization_uses_camel_case() {
        let event = sample_event();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["eventId"], "evt-1");
        assert_eq!(json["date"], "2025-09-01");
        assert_eq!(json["waitlistEnabled"], true);
        assert_eq!(json["confirmedCount"], 0);
        assert!(json.get("event_id").is_none());
    }

    #[test]
    fn test_event_deserialization_defaults() {
        let json = json!({
            "eventId": "evt-2",
            "title": "Workshop",
            "date": "2025-10-15",
            "location": "Room 2",
            "capacity": 10,
            "organizer": "Team",
            "status": "draft"
        });

        let event: Event = serde_json::from_value(json).unwrap();
        assert!(!event.waitlist_enabled);
        assert_eq!(event.confirmed_count, 0);
        assert!(event.description.is_none());
        assert_eq!(event.date, date!(2025 - 10 - 15));
    }

    #[test]
    fn test_registration_constructors() {
        let now = now_utc();
        let confirmed = Registration::confirmed("evt-1", "alice", now.clone());
        assert!(confirmed.is_confirmed());
        assert!(confirmed.waitlist_position.is_none());

        let waitlisted = Registration::waitlisted("evt-1", "bob", now, 3);
        assert!(waitlisted.is_waitlisted());
        assert_eq!(waitlisted.waitlist_position, Some(3));
    }

    #[test]
    fn test_registration_promote() {
        let mut reg = Registration::waitlisted("evt-1", "bob", now_utc(), 1);
        reg.promote();
        assert!(reg.is_confirmed());
        assert!(reg.waitlist_position.is_none());
    }

    #[test]
    fn test_registration_serialization() {
        let reg = Registration::waitlisted("evt-1", "bob", now_utc(), 2);
        let json = serde_json::to_value(&reg).unwrap();

        assert_eq!(json["eventId"], "evt-1");
        assert_eq!(json["userId"], "bob");
        assert_eq!(json["status"], "waitlisted");
        assert_eq!(json["waitlistPosition"], 2);
        assert!(json["registeredAt"].is_string());
    }

    #[test]
    fn test_confirmed_registration_omits_position() {
        let reg = Registration::confirmed("evt-1", "alice", now_utc());
        let json = serde_json::to_value(&reg).unwrap();
        assert!(json.get("waitlistPosition").is_none());
    }

    #[test]
    fn test_user_serialization() {
        let user = User {
            user_id: "alice".to_string(),
            name: "Alice".to_string(),
            created_at: now_utc(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userId"], "alice");
        assert_eq!(json["name"], "Alice");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_event_roundtrip() {
        let event = sample_event();
        let json = serde_json::to_value(&event).unwrap();
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(event, back);
    }
}

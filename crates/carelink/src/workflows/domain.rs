use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Account identifier issued by the identity layer. Clients, providers, and admins share the space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Catalog category (e.g. elderly care, child care).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Session identifier assigned by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalSessionId(pub String);

macro_rules! display_inner {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_inner!(UserId, CategoryId, RequestId, ApplicationId, ExternalSessionId);

/// Role asserted by the authentication layer for the acting party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Provider,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Provider => "provider",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" | "user" => Ok(Self::Client),
            "provider" | "caregiver" => Ok(Self::Provider),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Authenticated party performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId(id.into()),
            role,
        }
    }

    pub fn client(id: impl Into<String>) -> Self {
        Self::new(id, Role::Client)
    }

    pub fn provider(id: impl Into<String>) -> Self {
        Self::new(id, Role::Provider)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    /// True when the actor holds `role` and is the account referenced by `owner`.
    pub fn acts_as(&self, role: Role, owner: &UserId) -> bool {
        self.role == role && &self.id == owner
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Booking duration; determines price and the time window a booking occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftType {
    ShortShift,
    LongShift,
    FullDayShift,
}

impl ShiftType {
    pub const fn ordered() -> [Self; 3] {
        [Self::ShortShift, Self::LongShift, Self::FullDayShift]
    }

    pub const fn hours(self) -> i64 {
        match self {
            Self::ShortShift => 3,
            Self::LongShift => 12,
            Self::FullDayShift => 24,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ShortShift => "3 Hours",
            Self::LongShift => "12 Hours",
            Self::FullDayShift => "Full Day",
        }
    }

    pub fn duration(self) -> Duration {
        Duration::hours(self.hours())
    }
}

/// Amount in minor currency units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn from_units(units: u64) -> Self {
        Self(units * 100)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Half-open interval `[start, end)` a booking occupies on the provider's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl BookingWindow {
    /// `None` when the shift would run past the last representable date.
    pub fn new(date: NaiveDate, time: NaiveTime, shift: ShiftType) -> Option<Self> {
        let start = date.and_time(time);
        let end = start.checked_add_signed(shift.duration())?;
        Some(Self { start, end })
    }

    /// Calendar days touched by the window. A shift ending exactly at midnight stays on
    /// the day before.
    pub fn days(&self) -> (NaiveDate, NaiveDate) {
        let first = self.start.date();
        let ends_at_midnight = NaiveTime::from_hms_opt(0, 0, 0) == Some(self.end.time());
        let last = if ends_at_midnight && self.end.date() > first {
            self.end.date().pred_opt().unwrap_or(first)
        } else {
            self.end.date()
        };
        (first, last)
    }

    pub fn shares_day_with(&self, other: &BookingWindow) -> bool {
        let (first, last) = self.days();
        let (other_first, other_last) = other.days();
        first <= other_last && other_first <= last
    }
}

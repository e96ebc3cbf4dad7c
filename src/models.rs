// Domain types shared by the resolver, the stores and the sweeper

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookingError;
use crate::range::DateRange;

pub type ListingId = Uuid;
pub type BookingId = Uuid;
pub type UserId = Uuid;

pub const MAX_LISTING_GUESTS: u32 = 20;

/// Amount of money in integer cents. Pricing never touches floating point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn from_major(units: i64) -> Self {
        Money(units * 100)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    Flexible,
    Moderate,
    Strict,
    SuperStrict,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        CancellationPolicy::Flexible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    Cleaning,
    Service,
    Security,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub kind: FeeKind,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawListing")]
pub struct Listing {
    pub id: ListingId,
    pub host_id: UserId,
    pub nightly_rate: Money,
    pub max_guests: u32,
    pub cancellation_policy: CancellationPolicy,
    pub fees: Vec<Fee>,
    pub is_active: bool,
}

// Wire shape of a listing; checked by `Listing::validate` on the way in
#[derive(Deserialize)]
struct RawListing {
    id: ListingId,
    host_id: UserId,
    nightly_rate: Money,
    max_guests: u32,
    #[serde(default)]
    cancellation_policy: CancellationPolicy,
    #[serde(default)]
    fees: Vec<Fee>,
    is_active: bool,
}

impl TryFrom<RawListing> for Listing {
    type Error = BookingError;

    fn try_from(raw: RawListing) -> Result<Self, Self::Error> {
        let listing = Listing {
            id: raw.id,
            host_id: raw.host_id,
            nightly_rate: raw.nightly_rate,
            max_guests: raw.max_guests,
            cancellation_policy: raw.cancellation_policy,
            fees: raw.fees,
            is_active: raw.is_active,
        };
        listing.validate()?;
        Ok(listing)
    }
}

impl Listing {
    pub fn new(
        host_id: UserId,
        nightly_rate: Money,
        max_guests: u32,
        cancellation_policy: CancellationPolicy,
    ) -> Result<Self, BookingError> {
        let listing = Self {
            id: Uuid::new_v4(),
            host_id,
            nightly_rate,
            max_guests,
            cancellation_policy,
            fees: Vec::new(),
            is_active: true,
        };
        listing.validate()?;
        Ok(listing)
    }

    /// Positive nightly rate, 1..=20 guests, no negative fees.
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.nightly_rate <= Money::ZERO {
            return Err(BookingError::InvalidRequest(format!(
                "nightly rate must be positive, got {}",
                self.nightly_rate
            )));
        }
        if !(1..=MAX_LISTING_GUESTS).contains(&self.max_guests) {
            return Err(BookingError::InvalidRequest(format!(
                "listing must accommodate between 1 and {} guests, got {}",
                MAX_LISTING_GUESTS, self.max_guests
            )));
        }
        if let Some(fee) = self.fees.iter().find(|fee| fee.amount.is_negative()) {
            return Err(BookingError::InvalidRequest(format!(
                "{:?} fee cannot be negative",
                fee.kind
            )));
        }
        Ok(())
    }

    pub fn with_fee(mut self, kind: FeeKind, amount: Money) -> Result<Self, BookingError> {
        if amount.is_negative() {
            return Err(BookingError::InvalidRequest(format!(
                "{:?} fee cannot be negative",
                kind
            )));
        }
        self.fees.push(Fee { kind, amount });
        Ok(self)
    }

    pub fn fee_amounts(&self) -> Vec<Money> {
        self.fees.iter().map(|fee| fee.amount).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Completed,
    Cancelled,
    Declined,
    Expired,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 8] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::CheckedIn,
        BookingStatus::CheckedOut,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Declined,
        BookingStatus::Expired,
    ];

    // Statuses that hold the listing's dates
    pub const ACTIVE: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Declined => "declined",
            BookingStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed
                | BookingStatus::Cancelled
                | BookingStatus::Declined
                | BookingStatus::Expired
        )
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Guest,
    Host,
    System,
}

// Who is asking for a status change. Guests and hosts carry their user id so
// the resolver can check they belong to the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Guest(UserId),
    Host(UserId),
    System,
}

impl Actor {
    pub fn role(&self) -> ActorRole {
        match self {
            Actor::Guest(_) => ActorRole::Guest,
            Actor::Host(_) => ActorRole::Host,
            Actor::System => ActorRole::System,
        }
    }

    pub fn is_party_to(&self, booking: &Booking) -> bool {
        match self {
            Actor::Guest(id) => *id == booking.guest_id,
            Actor::Host(id) => *id == booking.host_id,
            Actor::System => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_by: ActorRole,
    pub reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
    pub refund_percentage: u8,
    pub refund_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub listing_id: ListingId,
    pub guest_id: UserId,
    pub host_id: UserId,
    pub stay: DateRange,
    pub guests: u32,
    pub total_price: Money,
    // Policy of the listing at admission time; refunds use this
    pub cancellation_policy: CancellationPolicy,
    pub status: BookingStatus,
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancellation: Option<Cancellation>,
}

impl Booking {
    pub fn check_in(&self) -> DateTime<Utc> {
        self.stay.start()
    }

    pub fn check_out(&self) -> DateTime<Utc> {
        self.stay.end()
    }
}

// Input of a guest booking request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub listing_id: ListingId,
    pub guest_id: UserId,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guests: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
}

// Conjunctive filter; `None` matches everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFilter {
    pub guest_id: Option<UserId>,
    pub host_id: Option<UserId>,
    pub listing_id: Option<ListingId>,
    pub status_in: Option<Vec<BookingStatus>>,
}

impl BookingFilter {
    pub fn for_guest(guest_id: UserId) -> Self {
        Self {
            guest_id: Some(guest_id),
            ..Default::default()
        }
    }

    pub fn for_host(host_id: UserId) -> Self {
        Self {
            host_id: Some(host_id),
            ..Default::default()
        }
    }

    pub fn with_status_in(mut self, statuses: &[BookingStatus]) -> Self {
        self.status_in = Some(statuses.to_vec());
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.guest_id.map_or(true, |id| booking.guest_id == id)
            && self.host_id.map_or(true, |id| booking.host_id == id)
            && self.listing_id.map_or(true, |id| booking.listing_id == id)
            && self
                .status_in
                .as_ref()
                .map_or(true, |statuses| statuses.contains(&booking.status))
    }
}

// Partial update applied by `BookingStore::update`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub cancellation: Option<Cancellation>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BookingPatch {
    pub fn apply(self, booking: &mut Booking) {
        if let Some(status) = self.status {
            booking.status = status;
        }
        if let Some(cancellation) = self.cancellation {
            booking.cancellation = Some(cancellation);
        }
        if let Some(updated_at) = self.updated_at {
            booking.updated_at = updated_at;
        }
    }
}

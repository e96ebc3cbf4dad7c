// Booking availability and conflict resolution for short-stay listings

pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod memory_store;
pub mod models;
pub mod pricing;
pub mod range;
pub mod resolver;
pub mod store;
pub mod sweeper;

// Re-export key types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ResolverConfig;
pub use error::{BookingError, ConfigError, StoreError};
pub use lifecycle::{LifecycleWindows, TransitionRule, TRANSITIONS};
pub use memory_store::{InMemoryBookingStore, InMemoryListingStore};
pub use models::{
    Actor, ActorRole, Booking, BookingFilter, BookingId, BookingPatch, BookingRequest,
    BookingStatus, Cancellation, CancellationPolicy, Fee, FeeKind, Listing, ListingId, Money,
    UserId,
};
pub use pricing::{compute_total, refund_amount, refund_percentage, PriceBreakdown};
pub use range::DateRange;
pub use resolver::BookingResolver;
pub use store::{BookingStore, ListingStore};
pub use sweeper::{LifecycleSweeper, SweepReport};

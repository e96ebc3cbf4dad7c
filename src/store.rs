// Collaborator contracts the resolver is parameterized with

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Booking, BookingFilter, BookingId, BookingPatch, BookingStatus, Listing, ListingId};
use crate::range::DateRange;

#[async_trait]
pub trait ListingStore: Send + Sync + 'static {
    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    async fn get(&self, id: BookingId) -> Result<Option<Booking>, StoreError>;

    // Bookings of the listing whose stay intersects `range` and whose status is in `status_in`
    async fn find_overlapping(
        &self,
        listing_id: ListingId,
        range: &DateRange,
        status_in: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError>;

    // May reject with `StoreError::Conflict` if the store enforces exclusion itself
    async fn insert(&self, booking: Booking) -> Result<Booking, StoreError>;

    async fn update(&self, id: BookingId, patch: BookingPatch) -> Result<Booking, StoreError>;

    // Unordered; the resolver sorts
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError>;
}

// DashMap-backed stores, used by tests, benches and single-node deployments

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::models::{Booking, BookingFilter, BookingId, BookingPatch, BookingStatus, Listing, ListingId};
use crate::range::DateRange;
use crate::store::{BookingStore, ListingStore};

#[derive(Debug, Default)]
pub struct InMemoryListingStore {
    listings: DashMap<ListingId, Listing>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, listing: Listing) -> ListingId {
        let id = listing.id;
        self.listings.insert(id, listing);
        id
    }

    pub fn set_active(&self, id: ListingId, is_active: bool) -> bool {
        self.listings
            .get_mut(&id)
            .map(|mut listing| listing.is_active = is_active)
            .is_some()
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn get_listing(&self, id: ListingId) -> Result<Option<Listing>, StoreError> {
        Ok(self.listings.get(&id).map(|listing| listing.value().clone()))
    }
}

// Bookings are indexed by id and by listing. A listing's index entry is held
// for the whole of `insert`, so the overlap check and the write are one step.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    bookings: DashMap<BookingId, Booking>,
    by_listing: DashMap<ListingId, Vec<BookingId>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    fn overlapping_in(
        &self,
        ids: &[BookingId],
        range: &DateRange,
        status_in: &[BookingStatus],
    ) -> Vec<Booking> {
        ids.iter()
            .filter_map(|id| self.bookings.get(id))
            .filter(|b| status_in.contains(&b.status) && b.stay.overlaps(range))
            .map(|b| b.value().clone())
            .collect()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn get(&self, id: BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(&id).map(|b| b.value().clone()))
    }

    async fn find_overlapping(
        &self,
        listing_id: ListingId,
        range: &DateRange,
        status_in: &[BookingStatus],
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(match self.by_listing.get(&listing_id) {
            Some(ids) => self.overlapping_in(ids.value(), range, status_in),
            None => Vec::new(),
        })
    }

    async fn insert(&self, booking: Booking) -> Result<Booking, StoreError> {
        if self.bookings.contains_key(&booking.id) {
            return Err(StoreError::Backend(format!(
                "duplicate booking id {}",
                booking.id
            )));
        }

        let mut ids = self.by_listing.entry(booking.listing_id).or_default();

        if booking.status.is_active()
            && !self
                .overlapping_in(ids.value(), &booking.stay, &BookingStatus::ACTIVE)
                .is_empty()
        {
            return Err(StoreError::Conflict(booking.listing_id));
        }

        ids.push(booking.id);
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update(&self, id: BookingId, patch: BookingPatch) -> Result<Booking, StoreError> {
        let mut entry = self
            .bookings
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(entry.value_mut());
        Ok(entry.value().clone())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| filter.matches(b.value()))
            .map(|b| b.value().clone())
            .collect())
    }
}

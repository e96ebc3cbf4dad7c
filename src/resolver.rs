// Availability and conflict resolver: admits booking requests, drives the
// booking state machine and computes refunds on cancellation.

use std::{future::Future, sync::Arc};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::ResolverConfig;
use crate::error::{BookingError, StoreError};
use crate::lifecycle::{self, LifecycleWindows};
use crate::models::{
    Actor, Booking, BookingFilter, BookingId, BookingPatch, BookingRequest, BookingStatus,
    Cancellation, Listing, ListingId,
};
use crate::pricing::{self, PriceBreakdown};
use crate::range::DateRange;
use crate::store::{BookingStore, ListingStore};

pub struct BookingResolver {
    listings: Arc<dyn ListingStore>,
    bookings: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
    windows: LifecycleWindows,
    // One admission lock per listing; listings never contend with each other
    listing_locks: DashMap<ListingId, Arc<Mutex<()>>>,
}

impl BookingResolver {
    pub fn new(
        listings: Arc<dyn ListingStore>,
        bookings: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        config: ResolverConfig,
    ) -> Self {
        let windows = config.windows();
        Self {
            listings,
            bookings,
            clock,
            config,
            windows,
            listing_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn windows(&self) -> &LifecycleWindows {
        &self.windows
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Validate a request against the listing and existing reservations and,
    /// if it passes, persist it as a `pending` booking.
    pub async fn request_booking(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        let now = self.clock.now();
        let stay = DateRange::new(request.check_in, request.check_out)?;

        if stay.start().date_naive() < now.date_naive() {
            return Err(BookingError::InvalidRange(format!(
                "check-in {} is in the past",
                stay.start().date_naive()
            )));
        }
        if request.guests == 0 {
            return Err(BookingError::InvalidRequest(
                "at least one guest is required".to_string(),
            ));
        }
        if let Some(text) = &request.special_requests {
            if text.chars().count() > self.config.max_special_requests_len {
                return Err(BookingError::InvalidRequest(format!(
                    "special requests cannot exceed {} characters",
                    self.config.max_special_requests_len
                )));
            }
        }

        let listing = self.active_listing(request.listing_id).await?;
        check_capacity(&listing, request.guests)?;
        let total_price =
            pricing::compute_total(listing.nightly_rate, &stay, &listing.fee_amounts())?;

        let lock = self.listing_lock(listing.id);
        let _admission = lock.lock().await;

        let conflicts = self
            .store_call(self.bookings.find_overlapping(
                listing.id,
                &stay,
                &BookingStatus::ACTIVE,
            ))
            .await?;
        if let Some(existing) = conflicts.first() {
            warn!(
                listing_id = %listing.id,
                conflicting_booking = %existing.id,
                "Booking request overlaps an active reservation"
            );
            return Err(BookingError::DateConflict {
                listing_id: listing.id,
            });
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            listing_id: listing.id,
            guest_id: request.guest_id,
            host_id: listing.host_id,
            stay,
            guests: request.guests,
            total_price,
            cancellation_policy: listing.cancellation_policy,
            status: BookingStatus::Pending,
            special_requests: request.special_requests,
            created_at: now,
            updated_at: now,
            cancellation: None,
        };

        let booking = self.store_call(self.bookings.insert(booking)).await?;

        info!(
            booking_id = %booking.id,
            listing_id = %booking.listing_id,
            nights = booking.stay.nights(),
            total = %booking.total_price,
            "Booking admitted"
        );
        Ok(booking)
    }

    /// Apply a status change from the transition table.
    pub async fn transition(
        &self,
        booking_id: BookingId,
        actor: Actor,
        target: BookingStatus,
    ) -> Result<Booking, BookingError> {
        if target == BookingStatus::Cancelled {
            let current = self.get_booking(booking_id).await?;
            lifecycle::rule_for(current.status, target)?;
            return self.cancel(booking_id, actor, None).await;
        }

        let listing_id = self.get_booking(booking_id).await?.listing_id;
        let lock = self.listing_lock(listing_id);
        let _guard = lock.lock().await;

        // Re-read under the lock; the status may have moved meanwhile
        let booking = self.get_booking(booking_id).await?;
        let rule = lifecycle::rule_for(booking.status, target)?;
        rule.authorize(&actor, &booking)?;

        let now = self.clock.now();
        if !rule.guard_satisfied(&booking, now, &self.windows) {
            debug!(booking_id = %booking.id, guard = ?rule.guard, "Transition guard not met");
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: target,
            });
        }

        let patch = BookingPatch {
            status: Some(target),
            cancellation: None,
            updated_at: Some(now),
        };
        let updated = self.apply_patch(booking_id, patch).await?;

        info!(
            booking_id = %updated.id,
            from = %booking.status,
            to = %target,
            actor = ?actor.role(),
            "Booking status changed"
        );
        Ok(updated)
    }

    /// Cancel a pending or confirmed booking and record the refund owed under
    /// the booking's cancellation policy.
    pub async fn cancel(
        &self,
        booking_id: BookingId,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        let listing_id = self.get_booking(booking_id).await?.listing_id;
        let lock = self.listing_lock(listing_id);
        let _guard = lock.lock().await;

        let booking = self.get_booking(booking_id).await?;
        if matches!(actor, Actor::System) || !actor.is_party_to(&booking) {
            return Err(BookingError::Unauthorized(format!(
                "only the guest or host of booking {} may cancel it",
                booking.id
            )));
        }

        let now = self.clock.now();
        lifecycle::check_cancellable(&booking, now, &self.windows)?;

        let days_until_check_in = (booking.check_in() - now).num_days();
        let refund_percentage =
            pricing::refund_percentage(booking.cancellation_policy, days_until_check_in);
        let refund_amount = pricing::refund_amount(booking.total_price, refund_percentage);

        let patch = BookingPatch {
            status: Some(BookingStatus::Cancelled),
            cancellation: Some(Cancellation {
                cancelled_by: actor.role(),
                reason,
                cancelled_at: now,
                refund_percentage,
                refund_amount,
            }),
            updated_at: Some(now),
        };
        let updated = self.apply_patch(booking_id, patch).await?;

        info!(
            booking_id = %updated.id,
            cancelled_by = ?actor.role(),
            days_until_check_in,
            refund = %refund_amount,
            "Booking cancelled"
        );
        Ok(updated)
    }

    /// Bookings matching `filter`, newest first.
    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BookingError> {
        let mut bookings = self.store_call(self.bookings.list(filter)).await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    pub async fn get_booking(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.store_call(self.bookings.get(booking_id))
            .await?
            .ok_or_else(|| BookingError::booking_not_found(booking_id))
    }

    // True when no pending or confirmed booking intersects `stay`
    pub async fn check_availability(
        &self,
        listing_id: ListingId,
        stay: &DateRange,
    ) -> Result<bool, BookingError> {
        let listing = self.active_listing(listing_id).await?;
        let conflicts = self
            .store_call(self.bookings.find_overlapping(
                listing.id,
                stay,
                &BookingStatus::ACTIVE,
            ))
            .await?;
        Ok(conflicts.is_empty())
    }

    /// Price preview for a stay, with the same listing checks as admission.
    pub async fn quote(
        &self,
        listing_id: ListingId,
        stay: &DateRange,
        guests: u32,
    ) -> Result<PriceBreakdown, BookingError> {
        let listing = self.active_listing(listing_id).await?;
        check_capacity(&listing, guests)?;
        pricing::price_breakdown(listing.nightly_rate, stay, &listing.fee_amounts())
    }

    async fn active_listing(&self, listing_id: ListingId) -> Result<Listing, BookingError> {
        match self.store_call(self.listings.get_listing(listing_id)).await? {
            Some(listing) if listing.is_active => {
                // Stores may hand back rows that never went through `Listing::new`
                listing.validate()?;
                Ok(listing)
            }
            _ => Err(BookingError::listing_not_found(listing_id)),
        }
    }

    async fn apply_patch(
        &self,
        booking_id: BookingId,
        patch: BookingPatch,
    ) -> Result<Booking, BookingError> {
        self.store_call(self.bookings.update(booking_id, patch))
            .await
            .map_err(|err| match err {
                BookingError::NotFound { .. } => BookingError::booking_not_found(booking_id),
                other => other,
            })
    }

    /// Drop lock entries nobody holds or waits on. Returns how many were removed.
    pub fn prune_idle_locks(&self) -> usize {
        let before = self.listing_locks.len();
        // Idle means only the map references it. Cloning out of the map takes
        // the same shard lock `retain` holds.
        self.listing_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.listing_locks.len())
    }

    fn listing_lock(&self, listing_id: ListingId) -> Arc<Mutex<()>> {
        self.listing_locks
            .entry(listing_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    // Bounds a store call by the configured timeout. The future is dropped on
    // expiry, so an insert that has not completed leaves nothing behind.
    async fn store_call<T, F>(&self, call: F) -> Result<T, BookingError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.storage_timeout(), call).await {
            Ok(result) => result.map_err(BookingError::from),
            Err(_) => {
                warn!(
                    timeout_ms = self.config.storage_timeout_ms,
                    "Store call timed out"
                );
                Err(BookingError::StorageTimeout(self.config.storage_timeout_ms))
            }
        }
    }
}

fn check_capacity(listing: &Listing, guests: u32) -> Result<(), BookingError> {
    if guests > listing.max_guests {
        return Err(BookingError::CapacityExceeded {
            requested: guests,
            max_guests: listing.max_guests,
        });
    }
    Ok(())
}

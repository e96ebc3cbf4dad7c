// Booking status state machine. Every legal transition lives in TRANSITIONS;
// anything not listed there is rejected.

use chrono::{DateTime, Duration, Utc};

use crate::error::BookingError;
use crate::models::{Actor, ActorRole, Booking, BookingStatus};

// Time condition a transition has to meet before it may fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    ExpiryDue,
    AtOrAfterCheckIn,
    AtOrAfterCheckOut,
    ReviewWindowElapsed,
    CancellationWindowOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub actors: &'static [ActorRole],
    pub guard: Guard,
}

const HOST: &[ActorRole] = &[ActorRole::Host];
const SYSTEM: &[ActorRole] = &[ActorRole::System];
const HOST_OR_SYSTEM: &[ActorRole] = &[ActorRole::Host, ActorRole::System];
const GUEST_OR_HOST: &[ActorRole] = &[ActorRole::Guest, ActorRole::Host];

pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: BookingStatus::Pending,
        to: BookingStatus::Confirmed,
        actors: HOST,
        guard: Guard::Always,
    },
    TransitionRule {
        from: BookingStatus::Pending,
        to: BookingStatus::Declined,
        actors: HOST,
        guard: Guard::Always,
    },
    TransitionRule {
        from: BookingStatus::Pending,
        to: BookingStatus::Expired,
        actors: SYSTEM,
        guard: Guard::ExpiryDue,
    },
    TransitionRule {
        from: BookingStatus::Confirmed,
        to: BookingStatus::CheckedIn,
        actors: HOST_OR_SYSTEM,
        guard: Guard::AtOrAfterCheckIn,
    },
    TransitionRule {
        from: BookingStatus::CheckedIn,
        to: BookingStatus::CheckedOut,
        actors: HOST_OR_SYSTEM,
        guard: Guard::AtOrAfterCheckOut,
    },
    TransitionRule {
        from: BookingStatus::CheckedOut,
        to: BookingStatus::Completed,
        actors: SYSTEM,
        guard: Guard::ReviewWindowElapsed,
    },
    TransitionRule {
        from: BookingStatus::Pending,
        to: BookingStatus::Cancelled,
        actors: GUEST_OR_HOST,
        guard: Guard::CancellationWindowOpen,
    },
    TransitionRule {
        from: BookingStatus::Confirmed,
        to: BookingStatus::Cancelled,
        actors: GUEST_OR_HOST,
        guard: Guard::CancellationWindowOpen,
    },
];

// Durations the time guards are measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleWindows {
    pub pending_expiry: Duration,
    pub review_window: Duration,
    pub cancellation_cutoff: Duration,
}

impl Default for LifecycleWindows {
    fn default() -> Self {
        Self {
            pending_expiry: Duration::hours(24),
            review_window: Duration::days(14),
            cancellation_cutoff: Duration::hours(24),
        }
    }
}

pub fn rule_for(
    from: BookingStatus,
    to: BookingStatus,
) -> Result<&'static TransitionRule, BookingError> {
    TRANSITIONS
        .iter()
        .find(|rule| rule.from == from && rule.to == to)
        .ok_or(BookingError::InvalidTransition { from, to })
}

impl TransitionRule {
    pub fn authorize(&self, actor: &Actor, booking: &Booking) -> Result<(), BookingError> {
        if !self.actors.contains(&actor.role()) {
            return Err(BookingError::Unauthorized(format!(
                "{:?} may not move a booking from {} to {}",
                actor.role(),
                self.from,
                self.to
            )));
        }
        if !actor.is_party_to(booking) {
            return Err(BookingError::Unauthorized(format!(
                "{:?} is not a party to booking {}",
                actor.role(),
                booking.id
            )));
        }
        Ok(())
    }

    pub fn guard_satisfied(
        &self,
        booking: &Booking,
        now: DateTime<Utc>,
        windows: &LifecycleWindows,
    ) -> bool {
        // An instant past the representable range is never reached
        let reached = |at: DateTime<Utc>, offset: Duration| {
            at.checked_add_signed(offset).map_or(false, |due| now >= due)
        };
        match self.guard {
            Guard::Always => true,
            Guard::ExpiryDue => reached(booking.created_at, windows.pending_expiry),
            Guard::AtOrAfterCheckIn => now >= booking.check_in(),
            Guard::AtOrAfterCheckOut => now >= booking.check_out(),
            Guard::ReviewWindowElapsed => reached(booking.check_out(), windows.review_window),
            Guard::CancellationWindowOpen => {
                booking.check_in() - now > windows.cancellation_cutoff
            }
        }
    }
}

/// Cancellation is allowed wherever the table has a `-> cancelled` rule whose
/// window guard holds.
pub fn check_cancellable(
    booking: &Booking,
    now: DateTime<Utc>,
    windows: &LifecycleWindows,
) -> Result<(), BookingError> {
    let open = rule_for(booking.status, BookingStatus::Cancelled)
        .map_or(false, |rule| rule.guard_satisfied(booking, now, windows));
    if open {
        Ok(())
    } else {
        Err(BookingError::CancellationWindowClosed {
            hours_until_check_in: (booking.check_in() - now).num_hours(),
        })
    }
}

// The next transition the system would apply on its own, if one is due
pub fn due_system_transition(
    booking: &Booking,
    now: DateTime<Utc>,
    windows: &LifecycleWindows,
) -> Option<BookingStatus> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.from == booking.status && rule.actors.contains(&ActorRole::System))
        .find(|rule| rule.guard_satisfied(booking, now, windows))
        .map(|rule| rule.to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CancellationPolicy, Money};
    use crate::range::DateRange;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn booking(status: BookingStatus) -> Booking {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let check_in = Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap();
        Booking {
            id: Uuid::new_v4(),
            listing_id: Uuid::new_v4(),
            guest_id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            stay: DateRange::new(check_in, check_in + Duration::days(3)).unwrap(),
            guests: 2,
            total_price: Money::from_major(300),
            cancellation_policy: CancellationPolicy::Moderate,
            status,
            special_requests: None,
            created_at: created,
            updated_at: created,
            cancellation: None,
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in BookingStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in BookingStatus::ALL {
                assert_eq!(
                    rule_for(from, to),
                    Err(BookingError::InvalidTransition { from, to })
                );
            }
        }
    }

    #[test]
    fn test_unlisted_transitions_are_rejected() {
        assert!(rule_for(BookingStatus::Pending, BookingStatus::CheckedIn).is_err());
        assert!(rule_for(BookingStatus::Confirmed, BookingStatus::Pending).is_err());
        assert!(rule_for(BookingStatus::CheckedIn, BookingStatus::Cancelled).is_err());
        assert!(rule_for(BookingStatus::Pending, BookingStatus::Pending).is_err());
    }

    #[test]
    fn test_only_the_bookings_host_may_accept() {
        let b = booking(BookingStatus::Pending);
        let rule = rule_for(BookingStatus::Pending, BookingStatus::Confirmed).unwrap();

        assert!(rule.authorize(&Actor::Host(b.host_id), &b).is_ok());
        assert!(matches!(
            rule.authorize(&Actor::Host(Uuid::new_v4()), &b),
            Err(BookingError::Unauthorized(_))
        ));
        assert!(matches!(
            rule.authorize(&Actor::Guest(b.guest_id), &b),
            Err(BookingError::Unauthorized(_))
        ));
        assert!(matches!(
            rule.authorize(&Actor::System, &b),
            Err(BookingError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_system_only_transitions() {
        let b = booking(BookingStatus::Pending);
        let rule = rule_for(BookingStatus::Pending, BookingStatus::Expired).unwrap();
        assert!(rule.authorize(&Actor::System, &b).is_ok());
        assert!(rule.authorize(&Actor::Guest(b.guest_id), &b).is_err());
        assert!(rule.authorize(&Actor::Host(b.host_id), &b).is_err());
    }

    #[test]
    fn test_due_system_transitions() {
        let windows = LifecycleWindows::default();

        let pending = booking(BookingStatus::Pending);
        let early = pending.created_at + Duration::hours(23);
        assert_eq!(due_system_transition(&pending, early, &windows), None);
        let late = pending.created_at + Duration::hours(24);
        assert_eq!(
            due_system_transition(&pending, late, &windows),
            Some(BookingStatus::Expired)
        );

        let confirmed = booking(BookingStatus::Confirmed);
        assert_eq!(
            due_system_transition(&confirmed, confirmed.check_in(), &windows),
            Some(BookingStatus::CheckedIn)
        );

        let checked_in = booking(BookingStatus::CheckedIn);
        assert_eq!(
            due_system_transition(&checked_in, checked_in.check_in(), &windows),
            None
        );

        let checked_out = booking(BookingStatus::CheckedOut);
        let after_review = checked_out.check_out() + Duration::days(14);
        assert_eq!(
            due_system_transition(&checked_out, after_review, &windows),
            Some(BookingStatus::Completed)
        );
    }

    #[test]
    fn test_far_future_windows_are_never_due() {
        let windows = LifecycleWindows {
            review_window: Duration::days(3650),
            ..Default::default()
        };
        let mut checked_out = booking(BookingStatus::CheckedOut);
        checked_out.stay = DateRange::new(
            DateTime::<Utc>::MAX_UTC - Duration::days(10),
            DateTime::<Utc>::MAX_UTC - Duration::days(5),
        )
        .unwrap();

        assert_eq!(
            due_system_transition(&checked_out, DateTime::<Utc>::MAX_UTC, &windows),
            None
        );
    }

    #[test]
    fn test_cancellation_cutoff_is_strict() {
        let windows = LifecycleWindows::default();
        let b = booking(BookingStatus::Confirmed);

        let exactly_24h = b.check_in() - Duration::hours(24);
        assert_eq!(
            check_cancellable(&b, exactly_24h, &windows),
            Err(BookingError::CancellationWindowClosed {
                hours_until_check_in: 24
            })
        );

        let just_before = exactly_24h - Duration::seconds(1);
        assert!(check_cancellable(&b, just_before, &windows).is_ok());

        let completed = booking(BookingStatus::Completed);
        assert!(check_cancellable(&completed, just_before, &windows).is_err());
    }
}

// Applies time-driven transitions (expiry, check-in, check-out, completion)
// on behalf of the system actor.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::error::BookingError;
use crate::lifecycle;
use crate::models::{Actor, Booking, BookingFilter, BookingStatus};
use crate::resolver::BookingResolver;

// Statuses with an outgoing system transition
const SWEPT_STATUSES: [BookingStatus; 4] = [
    BookingStatus::Pending,
    BookingStatus::Confirmed,
    BookingStatus::CheckedIn,
    BookingStatus::CheckedOut,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub checked_in: usize,
    pub checked_out: usize,
    pub completed: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn applied(&self) -> usize {
        self.expired + self.checked_in + self.checked_out + self.completed
    }

    fn record(&mut self, status: BookingStatus) {
        match status {
            BookingStatus::Expired => self.expired += 1,
            BookingStatus::CheckedIn => self.checked_in += 1,
            BookingStatus::CheckedOut => self.checked_out += 1,
            BookingStatus::Completed => self.completed += 1,
            _ => {}
        }
    }
}

pub struct LifecycleSweeper {
    resolver: Arc<BookingResolver>,
}

impl LifecycleSweeper {
    pub fn new(resolver: Arc<BookingResolver>) -> Self {
        Self { resolver }
    }

    /// Run one pass over every booking with a pending system transition.
    /// A booking that is several steps behind is walked forward until
    /// nothing more is due.
    pub async fn sweep_once(&self) -> Result<SweepReport, BookingError> {
        let filter = BookingFilter::default().with_status_in(&SWEPT_STATUSES);
        let candidates = self.resolver.list_bookings(&filter).await?;

        let outcomes = join_all(candidates.into_iter().map(|b| self.advance(b))).await;

        let mut report = SweepReport::default();
        for (applied, failure) in outcomes {
            for status in applied {
                report.record(status);
            }
            if failure {
                report.failed += 1;
            }
        }

        let pruned = self.resolver.prune_idle_locks();
        if pruned > 0 {
            debug!(pruned, "Released idle listing locks");
        }
        Ok(report)
    }

    async fn advance(&self, mut booking: Booking) -> (Vec<BookingStatus>, bool) {
        let mut applied = Vec::new();
        let now = self.resolver.now();

        while let Some(next) =
            lifecycle::due_system_transition(&booking, now, self.resolver.windows())
        {
            match self.resolver.transition(booking.id, Actor::System, next).await {
                Ok(updated) => {
                    applied.push(next);
                    booking = updated;
                }
                // Someone else moved it first
                Err(BookingError::InvalidTransition { .. }) => break,
                Err(err) => {
                    warn!(
                        booking_id = %booking.id,
                        target = %next,
                        error = %err,
                        "System transition failed"
                    );
                    return (applied, true);
                }
            }
        }
        (applied, false)
    }

    /// Sweep on the configured interval until `shutdown` flips to true or its
    /// sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.resolver.config().sweep_interval());
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep_once().await {
                        Ok(report) if report.applied() > 0 || report.failed > 0 => {
                            info!(?report, "Lifecycle sweep finished");
                        }
                        Ok(_) => {}
                        Err(err) => error!("Lifecycle sweep failed: {}", err),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Lifecycle sweeper stopping");
                        break;
                    }
                }
            }
        }
    }
}

use booking_resolver::{
    compute_total, refund_percentage, BookingRequest, BookingResolver, CancellationPolicy,
    DateRange, InMemoryBookingStore, InMemoryListingStore, Listing, Money, ResolverConfig,
    SystemClock,
};
use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{thread_rng, Rng};
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

pub fn pricing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing");
    let start = Utc::now() + Duration::days(30);
    let fees = [Money::from_major(40), Money::from_major(15)];

    for nights in [1i64, 7, 28].iter() {
        let stay = DateRange::new(start, start + Duration::days(*nights)).unwrap();
        group.bench_with_input(BenchmarkId::new("compute_total", nights), &stay, |b, stay| {
            b.iter(|| compute_total(black_box(Money::from_major(120)), stay, &fees))
        });
    }

    group.bench_function("refund_percentage", |b| {
        let mut rng = thread_rng();
        b.iter(|| {
            let days = rng.gen_range(-2..60);
            refund_percentage(black_box(CancellationPolicy::Strict), days)
        })
    });

    group.finish();
}

// Admission against a listing with a growing number of existing bookings
pub fn admission_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("request_booking");

    for existing in [10usize, 100, 1000].iter() {
        let listings = Arc::new(InMemoryListingStore::new());
        let listing = Listing::new(
            Uuid::new_v4(),
            Money::from_major(100),
            4,
            CancellationPolicy::Moderate,
        )
        .unwrap();
        let listing_id = listings.insert(listing);
        let resolver = BookingResolver::new(
            listings,
            Arc::new(InMemoryBookingStore::new()),
            Arc::new(SystemClock),
            ResolverConfig::default(),
        );

        let first = Utc::now() + Duration::days(2);
        let request = |offset: i64| BookingRequest {
            listing_id,
            guest_id: Uuid::new_v4(),
            check_in: first + Duration::days(offset * 2),
            check_out: first + Duration::days(offset * 2 + 1),
            guests: 2,
            special_requests: None,
        };

        rt.block_on(async {
            for i in 0..*existing as i64 {
                resolver.request_booking(request(i)).await.unwrap();
            }
        });

        // Every probe lands on booked dates, so each one runs the full
        // validation and overlap check and is then rejected
        group.bench_with_input(BenchmarkId::from_parameter(existing), existing, |b, &existing| {
            let mut rng = thread_rng();
            b.iter(|| {
                let offset = rng.gen_range(0..existing as i64);
                rt.block_on(resolver.request_booking(request(offset))).unwrap_err()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, pricing_benchmark, admission_benchmark);
criterion_main!(benches);

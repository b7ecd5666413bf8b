use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Business counters exposed on `/metrics`.
#[derive(Clone)]
pub struct Metrics {
    pub spots_created: Arc<AtomicU64>,
    pub spots_deleted: Arc<AtomicU64>,
    pub bookings_created: Arc<AtomicU64>,
    pub bookings_rejected: Arc<AtomicU64>,
    pub reviews_created: Arc<AtomicU64>,
    pub reviews_rejected: Arc<AtomicU64>,
    pub images_uploaded: Arc<AtomicU64>,
    pub signups: Arc<AtomicU64>,
    pub logins: Arc<AtomicU64>,
    pub login_failures: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            spots_created: Arc::new(AtomicU64::new(0)),
            spots_deleted: Arc::new(AtomicU64::new(0)),
            bookings_created: Arc::new(AtomicU64::new(0)),
            bookings_rejected: Arc::new(AtomicU64::new(0)),
            reviews_created: Arc::new(AtomicU64::new(0)),
            reviews_rejected: Arc::new(AtomicU64::new(0)),
            images_uploaded: Arc::new(AtomicU64::new(0)),
            signups: Arc::new(AtomicU64::new(0)),
            logins: Arc::new(AtomicU64::new(0)),
            login_failures: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_spots_created(&self) {
        self.spots_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_spots_deleted(&self) {
        self.spots_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_bookings_created(&self) {
        self.bookings_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_bookings_rejected(&self) {
        self.bookings_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reviews_created(&self) {
        self.reviews_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reviews_rejected(&self) {
        self.reviews_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_images_uploaded(&self) {
        self.images_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_signups(&self) {
        self.signups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins(&self) {
        self.logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_login_failures(&self) {
        self.login_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            spots_created: self.spots_created.load(Ordering::Relaxed),
            spots_deleted: self.spots_deleted.load(Ordering::Relaxed),
            bookings_created: self.bookings_created.load(Ordering::Relaxed),
            bookings_rejected: self.bookings_rejected.load(Ordering::Relaxed),
            reviews_created: self.reviews_created.load(Ordering::Relaxed),
            reviews_rejected: self.reviews_rejected.load(Ordering::Relaxed),
            images_uploaded: self.images_uploaded.load(Ordering::Relaxed),
            signups: self.signups.load(Ordering::Relaxed),
            logins: self.logins.load(Ordering::Relaxed),
            login_failures: self.login_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub spots_created: u64,
    pub spots_deleted: u64,
    pub bookings_created: u64,
    pub bookings_rejected: u64,
    pub reviews_created: u64,
    pub reviews_rejected: u64,
    pub images_uploaded: u64,
    pub signups: u64,
    pub logins: u64,
    pub login_failures: u64,
    pub uptime_seconds: u64,
}

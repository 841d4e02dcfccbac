//! The metric vector carried by facts, aggregates and report rows.

use rust_decimal::Decimal;
use std::ops::{AddAssign, SubAssign};

/// Same-day (or windowed) totals for one group.
///
/// Absent metrics are always zero, never missing: "no events" and
/// "zero events" sum identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metrics {
    pub impressions: u64,
    pub clicks: u64,
    pub payments_qty: u64,
    pub total: Decimal,
}

impl Metrics {
    pub fn is_zero(&self) -> bool {
        *self == Metrics::default()
    }
}

impl AddAssign<&Metrics> for Metrics {
    fn add_assign(&mut self, other: &Metrics) {
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.payments_qty += other.payments_qty;
        self.total += other.total;
    }
}

impl SubAssign<&Metrics> for Metrics {
    fn sub_assign(&mut self, other: &Metrics) {
        self.impressions -= other.impressions;
        self.clicks -= other.clicks;
        self.payments_qty -= other.payments_qty;
        self.total -= other.total;
    }
}

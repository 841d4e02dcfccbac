//! Impression, click and payment event generator.

use crate::gen::Gen;
use crate::generators::*;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Value propositions shown in the ad carousel.
pub const VALUE_PROPS: &[&str] = &[
    "cellphone_recharge",
    "credits_consumer",
    "link_cobranzas",
    "point",
    "prepaid",
    "send_money",
    "transport",
];

/// Carousel slots an impression can occupy.
const POSITIONS: usize = 4;

/// A user with sticky attributes.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    /// Value props this user is mostly shown.
    pub preferred: Vec<&'static str>,
    /// Probability of seeing the carousel on any given day.
    pub activity: f64,
}

/// An impression or a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdEvent {
    pub day: NaiveDate,
    pub user_id: i64,
    pub value_prop: &'static str,
    pub position: i64,
}

/// A payment for a value prop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub pay_date: NaiveDate,
    pub user_id: i64,
    pub value_prop: &'static str,
    pub total: Decimal,
}

/// Everything that happened on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayEvents {
    pub prints: Vec<AdEvent>,
    pub taps: Vec<AdEvent>,
    pub pays: Vec<Payment>,
}

/// Shared user pool that can be cloned across parallel workers.
#[derive(Clone)]
pub struct UserPool {
    users: Arc<Vec<User>>,
}

impl UserPool {
    /// Create a user pool from a seed.
    pub fn new(seed: u64, num_users: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let users = generate_users(&mut rng, num_users);
        Self {
            users: Arc::new(users),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Generate deterministic per-day seeds from a root seed.
pub fn generate_day_seeds(root_seed: u64, num_days: u32) -> Vec<u64> {
    // Offset so these seeds don't overlap with user pool generation
    let mut rng = ChaCha8Rng::seed_from_u64(root_seed.wrapping_add(1000));
    (0..num_days).map(|_| rng.next_u64()).collect()
}

/// Generates a single day's events.
pub struct DayGenerator {
    user_pool: UserPool,
    day_seed: u64,
    date: NaiveDate,
    position: WeightedChoice<i64>,
}

impl DayGenerator {
    pub fn new(user_pool: UserPool, day_seed: u64, date: NaiveDate) -> Result<Self> {
        Ok(Self {
            user_pool,
            day_seed,
            date,
            position: position_gen()?,
        })
    }

    /// Generate all events for this day.
    pub fn generate(&self) -> DayEvents {
        let mut rng = ChaCha8Rng::seed_from_u64(self.day_seed);
        let mut events = DayEvents::default();

        let prints_per_visit = log_normal(3.0, 0.6, 12);
        let click = bool_with_prob(0.15);
        let pay = bool_with_prob(0.30);
        let organic = bool_with_prob(0.02);

        for user in self.user_pool.users() {
            if !bool_with_prob(user.activity).generate(&mut rng) {
                continue;
            }

            let num_prints = prints_per_visit.generate(&mut rng).max(1);
            for _ in 0..num_prints {
                let print = AdEvent {
                    day: self.date,
                    user_id: user.id,
                    value_prop: self.value_prop(&mut rng, user),
                    position: self.position.generate(&mut rng),
                };

                if click.generate(&mut rng) {
                    if pay.generate(&mut rng) {
                        events.pays.push(self.payment(&mut rng, user.id, print.value_prop));
                    }
                    events.taps.push(print.clone());
                }
                events.prints.push(print);
            }

            // Payments made outside the carousel
            if organic.generate(&mut rng) {
                let value_prop = one_of(VALUE_PROPS.to_vec()).generate(&mut rng);
                events.pays.push(self.payment(&mut rng, user.id, value_prop));
            }
        }

        events
    }

    fn value_prop(&self, rng: &mut ChaCha8Rng, user: &User) -> &'static str {
        // 80% follows preference, 20% anything
        if rng.gen_bool(0.80) {
            one_of(user.preferred.clone()).generate(rng)
        } else {
            one_of(VALUE_PROPS.to_vec()).generate(rng)
        }
    }

    fn payment(&self, rng: &mut ChaCha8Rng, user_id: i64, value_prop: &'static str) -> Payment {
        Payment {
            pay_date: self.date,
            user_id,
            value_prop,
            total: amount_gen().generate(rng),
        }
    }
}

/// Generate the user pool.
fn generate_users(rng: &mut ChaCha8Rng, count: usize) -> Vec<User> {
    let num_preferred = uniform(1usize..4);

    (0..count)
        .map(|idx| {
            let n = num_preferred.generate(rng);
            let mut preferred: Vec<&'static str> = Vec::with_capacity(n);
            while preferred.len() < n {
                let value_prop = one_of(VALUE_PROPS.to_vec()).generate(rng);
                if !preferred.contains(&value_prop) {
                    preferred.push(value_prop);
                }
            }
            // Power-law distribution for activity
            let activity = 0.05 + rng.gen::<f64>().powf(2.0) * 0.6;

            User {
                id: idx as i64 + 1,
                preferred,
                activity,
            }
        })
        .collect()
}

/// Payment amount: log-normal in cents, median ~25.00, at least 1.00.
fn amount_gen() -> impl Gen<Decimal> {
    log_normal(2500.0, 0.9, 500_000).map(|cents| Decimal::new(i64::from(cents.max(100)), 2))
}

/// Generator for the carousel slot; earlier slots are shown more often.
fn position_gen() -> Result<WeightedChoice<i64>> {
    let weights = [0.40, 0.30, 0.20, 0.10];
    WeightedChoice::new((0..POSITIONS as i64).zip(weights).collect())
        .map_err(|e| anyhow!("Invalid position weights: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 11, 1).unwrap()
    }

    #[test]
    fn test_user_pool_is_deterministic() {
        let a = UserPool::new(42, 50);
        let b = UserPool::new(42, 50);

        assert_eq!(a.len(), 50);
        for (x, y) in a.users().iter().zip(b.users()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.preferred, y.preferred);
        }
    }

    #[test]
    fn test_day_seeds_differ() {
        let seeds = generate_day_seeds(42, 10);
        assert_eq!(seeds.len(), 10);
        let mut unique = seeds.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_day_is_deterministic() {
        let pool = UserPool::new(7, 200);
        let a = DayGenerator::new(pool.clone(), 99, day()).unwrap().generate();
        let b = DayGenerator::new(pool, 99, day()).unwrap().generate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_clicks_follow_impressions() {
        let pool = UserPool::new(7, 500);
        let events = DayGenerator::new(pool, 3, day()).unwrap().generate();

        assert!(!events.prints.is_empty());
        assert!(events.taps.len() < events.prints.len());
        for tap in &events.taps {
            assert!(events.prints.contains(tap));
        }
        for event in events.prints.iter().chain(&events.taps) {
            assert_eq!(event.day, day());
            assert!((0..POSITIONS as i64).contains(&event.position));
        }
        for pay in &events.pays {
            assert!(pay.total >= Decimal::new(100, 2));
        }
    }
}

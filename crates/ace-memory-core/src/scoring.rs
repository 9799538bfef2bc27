//! Decay-weighted bullet scoring.
//!
//! Time is measured on the store's logical access clock, not the wall clock:
//! a component that was last touched `n` accesses ago has decayed by
//! `(1 - rate)^n`.

use crate::bullet::{Bullet, Component};
use crate::config::DecayRates;

/// Decayed value of one component at `clock`.
pub fn component_score(component: &Component, rate: f64, clock: u64) -> f64 {
    if component.strength == 0.0 {
        return 0.0;
    }
    let elapsed = clock.saturating_sub(component.access_index);
    let retention = (1.0 - rate).clamp(0.0, 1.0);
    component.strength * retention.powf(elapsed as f64)
}

/// Sum of the decayed per-kind components of `bullet` at `clock`.
pub fn score(bullet: &Bullet, clock: u64, rates: &DecayRates) -> f64 {
    bullet
        .components
        .iter()
        .map(|(kind, c)| component_score(c, rates.rate(kind), clock))
        .sum()
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Visitor location and consent state.

use serde::{Deserialize, Serialize};

/// Decimal digits kept on stored coordinates (about 11 m).
pub const COORDINATE_PRECISION: i32 = 4;

/// Movement, in degrees on either axis, that counts as a new location.
pub const MEANINGFUL_CHANGE_DEGREES: f64 = 0.01;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Round both axes to [`COORDINATE_PRECISION`] decimals.
    ///
    /// Idempotent: rounding an already-rounded coordinate returns it unchanged.
    pub fn rounded(self) -> Self {
        Self {
            latitude: round_degrees(self.latitude),
            longitude: round_degrees(self.longitude),
        }
    }

    /// Whether `next` moved more than [`MEANINGFUL_CHANGE_DEGREES`] on either axis.
    ///
    /// Compared in whole units of the stored precision so that a delta of
    /// exactly 0.01 is not mistaken for a larger one by float error.
    pub fn is_meaningful_change(&self, next: &Coordinate) -> bool {
        let scale = 10f64.powi(COORDINATE_PRECISION);
        let threshold = (MEANINGFUL_CHANGE_DEGREES * scale).round();

        let delta = |a: f64, b: f64| ((a * scale).round() - (b * scale).round()).abs();

        delta(self.latitude, next.latitude) > threshold
            || delta(self.longitude, next.longitude) > threshold
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

fn round_degrees(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_PRECISION);
    (value * scale).round() / scale
}

/// Persisted outcome of the one-time location prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentDecision {
    Granted,
    Denied,
}

impl ConsentDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentDecision::Granted => "granted",
            ConsentDecision::Denied => "denied",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "granted" => Some(ConsentDecision::Granted),
            "denied" => Some(ConsentDecision::Denied),
            _ => None,
        }
    }
}

/// Live consent status for this load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    #[default]
    Idle,
    Requesting,
    Granted,
    Denied,
}

impl ConsentStatus {
    /// Granted or denied; consumers wait for this before tracking.
    pub fn is_settled(&self) -> bool {
        matches!(self, ConsentStatus::Granted | ConsentStatus::Denied)
    }
}

impl From<ConsentDecision> for ConsentStatus {
    fn from(decision: ConsentDecision) -> Self {
        match decision {
            ConsentDecision::Granted => ConsentStatus::Granted,
            ConsentDecision::Denied => ConsentStatus::Denied,
        }
    }
}

/// What UI consumers see: status plus the current reference coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LocationSnapshot {
    pub status: ConsentStatus,
    pub location: Option<Coordinate>,
}

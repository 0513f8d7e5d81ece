//! Easing functions
//!
//! Map a linear time fraction `t` in `0.0..=1.0` to a progress fraction,
//! shaped by a rate exponent. The animated value is then
//! `from + progress * (to - from)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tally_core::TallyError;

/// Rate exponent used until the host sets another one
pub const DEFAULT_EASING_RATE: f64 = 3.0;

/// `Easing::EaseOut` samples the ease-in-out curve.
///
/// Counters have always decelerated this way; flip the routing with
/// [`Easing::apply_exact`] to get the dedicated ease-out curve.
pub const EASE_OUT_USES_EASE_IN_OUT: bool = true;

/// Easing curve selector
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    pub const ALL: [Easing; 4] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
    ];

    /// Progress fraction for time fraction `t` with exponent `rate`
    pub fn apply(&self, t: f64, rate: f64) -> f64 {
        match self {
            Easing::Linear => linear(t),
            Easing::EaseIn => ease_in(t, rate),
            Easing::EaseOut if EASE_OUT_USES_EASE_IN_OUT => ease_in_out(t, rate),
            Easing::EaseOut => ease_out(t, rate),
            Easing::EaseInOut => ease_in_out(t, rate),
        }
    }

    /// Like [`Easing::apply`], but `EaseOut` always uses the ease-out formula
    pub fn apply_exact(&self, t: f64, rate: f64) -> f64 {
        match self {
            Easing::EaseOut => ease_out(t, rate),
            other => other.apply(t, rate),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseIn => "ease-in",
            Easing::EaseOut => "ease-out",
            Easing::EaseInOut => "ease-in-out",
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Easing {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "linear" => Ok(Easing::Linear),
            "ease-in" | "easein" => Ok(Easing::EaseIn),
            "ease-out" | "easeout" => Ok(Easing::EaseOut),
            "ease-in-out" | "easeinout" => Ok(Easing::EaseInOut),
            _ => Err(TallyError::InvalidConfig(format!("unknown easing '{s}'"))),
        }
    }
}

#[inline]
pub fn linear(t: f64) -> f64 {
    t
}

#[inline]
pub fn ease_in(t: f64, rate: f64) -> f64 {
    t.powf(rate)
}

#[inline]
pub fn ease_out(t: f64, rate: f64) -> f64 {
    1.0 - (1.0 - t).powf(rate)
}

/// Symmetric ease-in-out
///
/// Even rates flip the sign of the second half, since `(u - 2)^r` is
/// positive there.
pub fn ease_in_out(t: f64, rate: f64) -> f64 {
    let sign = if rate % 2.0 == 0.0 { -1.0 } else { 1.0 };
    let u = t * 2.0;
    if u < 1.0 {
        return 0.5 * u.powf(rate);
    }
    sign * 0.5 * ((u - 2.0).powf(rate) + sign * 2.0)
}

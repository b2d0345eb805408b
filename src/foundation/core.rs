use crate::foundation::error::{GrisailleError, GrisailleResult};

/// Fixed cadence at which source timestamps are captured, in samples per
/// second. Independent of the source's native frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SampleRate {
    /// Samples per second, must be non-zero.
    pub hz: u32,
}

impl SampleRate {
    /// Create a validated sampling rate.
    pub fn new(hz: u32) -> GrisailleResult<Self> {
        if hz == 0 {
            return Err(GrisailleError::validation("SampleRate hz must be > 0"));
        }
        Ok(Self { hz })
    }

    /// Spacing between consecutive sample timestamps in seconds.
    pub fn interval_secs(self) -> f64 {
        1.0 / f64::from(self.hz)
    }
}

/// Drawable surface dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Byte length of a tightly packed RGBA8 buffer of these dimensions.
    pub fn rgba8_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Render target dimensions used when the source's native dimensions are
/// unknown.
pub const FALLBACK_CANVAS: Canvas = Canvas {
    width: 640,
    height: 480,
};

/// Derived sampling schedule for one pipeline run.
///
/// The effective duration is `min(source_duration, cap)`; sample timestamps
/// are `t_i = i / rate` for every `t_i < effective_duration`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplePlan {
    effective_duration_secs: f64,
    rate: SampleRate,
}

impl SamplePlan {
    /// Build a plan for a source of `source_duration_secs`, capped at
    /// `cap_secs`.
    pub fn new(
        source_duration_secs: f64,
        cap_secs: f64,
        rate: SampleRate,
    ) -> GrisailleResult<Self> {
        if !source_duration_secs.is_finite() || source_duration_secs < 0.0 {
            return Err(GrisailleError::validation(
                "source duration must be finite and non-negative",
            ));
        }
        if !cap_secs.is_finite() || cap_secs <= 0.0 {
            return Err(GrisailleError::validation(
                "duration cap must be finite and positive",
            ));
        }
        Ok(Self {
            effective_duration_secs: source_duration_secs.min(cap_secs),
            rate,
        })
    }

    /// Duration actually sampled, in seconds.
    pub fn effective_duration_secs(self) -> f64 {
        self.effective_duration_secs
    }

    /// Sampling rate of this plan.
    pub fn rate(self) -> SampleRate {
        self.rate
    }

    /// Expected number of samples: `ceil(effective_duration * rate)`.
    pub fn total_samples(self) -> u32 {
        (self.effective_duration_secs * f64::from(self.rate.hz)).ceil() as u32
    }

    /// Iterate sample timestamps in seconds, evenly spaced from 0.
    ///
    /// Timestamps are computed as `i / rate` rather than accumulated, so the
    /// schedule carries no floating point drift.
    pub fn timestamps(self) -> Timestamps {
        Timestamps { plan: self, next: 0 }
    }
}

/// Iterator over a [`SamplePlan`]'s timestamps.
#[derive(Clone, Debug)]
pub struct Timestamps {
    plan: SamplePlan,
    next: u64,
}

impl Iterator for Timestamps {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let t = self.next as f64 / f64::from(self.plan.rate.hz);
        if t < self.plan.effective_duration_secs {
            self.next += 1;
            Some(t)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(duration: f64) -> SamplePlan {
        SamplePlan::new(duration, 10.0, SampleRate::new(10).unwrap()).unwrap()
    }

    #[test]
    fn rate_validation_rejects_zero() {
        assert!(SampleRate::new(0).is_err());
        assert_eq!(SampleRate::new(10).unwrap().interval_secs(), 0.1);
    }

    #[test]
    fn plan_validation_catches_bad_values() {
        let rate = SampleRate::new(10).unwrap();
        assert!(SamplePlan::new(-1.0, 10.0, rate).is_err());
        assert!(SamplePlan::new(f64::NAN, 10.0, rate).is_err());
        assert!(SamplePlan::new(1.0, 0.0, rate).is_err());
    }

    #[test]
    fn duration_is_capped() {
        assert_eq!(plan(25.0).effective_duration_secs(), 10.0);
        assert_eq!(plan(3.5).effective_duration_secs(), 3.5);
    }

    #[test]
    fn total_matches_ceil_of_duration_times_rate() {
        assert_eq!(plan(0.35).total_samples(), 4);
        assert_eq!(plan(25.0).total_samples(), 100);
        assert_eq!(plan(10.0).total_samples(), 100);
        assert_eq!(plan(0.0).total_samples(), 0);
    }

    #[test]
    fn timestamps_are_exact_multiples_of_the_interval() {
        let ts: Vec<f64> = plan(0.35).timestamps().collect();
        assert_eq!(ts, vec![0.0, 0.1, 0.2, 0.3]);
        for (i, t) in plan(10.0).timestamps().enumerate() {
            assert_eq!(t, i as f64 / 10.0);
        }
    }

    #[test]
    fn rgba8_len_is_w_h_4() {
        let c = Canvas {
            width: 3,
            height: 2,
        };
        assert_eq!(c.rgba8_len(), 24);
    }
}

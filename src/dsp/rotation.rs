//! Angle to mixing-gain conversion for the XY and Blumlein modes.
//!
//! The host parameter callback records each new angle in an [`AngleWatch`] and
//! bumps its generation. The audio thread owns an [`AngleGainCache`] that only
//! recomputes the trigonometric pair when it sees a new generation, and keeps
//! the previous pair around so the mixer can ramp from it.

use std::sync::atomic::{AtomicU32, Ordering};

/// A pair of mixing gains for the front/back and left/right figure-eights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationGains {
    pub front: f32,
    pub left: f32,
}

/// Which angle mapping a cache applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationKind {
    /// Included angle of the two virtual XY capsules.
    XyAngle,
    /// Rotation of the crossed Blumlein pair away from ±45°.
    BlumleinRotation,
}

impl RotationGains {
    /// Each XY capsule points half the included angle off axis.
    pub fn for_xy_angle(angle_deg: f32) -> Self {
        let half = (angle_deg * 0.5).to_radians();
        Self {
            front: half.cos(),
            left: half.sin(),
        }
    }

    /// The left Blumlein capsule sits at `45° + rotation`.
    pub fn for_blumlein_rotation(rotation_deg: f32) -> Self {
        let phi = (45.0 + rotation_deg).to_radians();
        Self {
            front: phi.sin(),
            left: phi.cos(),
        }
    }

    pub fn for_angle(kind: RotationKind, angle_deg: f32) -> Self {
        match kind {
            RotationKind::XyAngle => Self::for_xy_angle(angle_deg),
            RotationKind::BlumleinRotation => Self::for_blumlein_rotation(angle_deg),
        }
    }
}

/// Change notification for one angle parameter, shared between the parameter
/// callback and the audio thread.
#[derive(Debug)]
pub struct AngleWatch {
    angle_bits: AtomicU32,
    generation: AtomicU32,
}

impl AngleWatch {
    pub fn new(angle_deg: f32) -> Self {
        Self {
            angle_bits: AtomicU32::new(angle_deg.to_bits()),
            generation: AtomicU32::new(0),
        }
    }

    pub fn notify(&self, angle_deg: f32) {
        self.angle_bits.store(angle_deg.to_bits(), Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn angle(&self) -> f32 {
        f32::from_bits(self.angle_bits.load(Ordering::Relaxed))
    }
}

/// Generation-keyed cache of previous/current rotation gains.
#[derive(Clone, Copy, Debug)]
pub struct AngleGainCache {
    kind: RotationKind,
    seen_generation: u32,
    previous: RotationGains,
    current: RotationGains,
}

impl AngleGainCache {
    pub fn new(kind: RotationKind, watch: &AngleWatch) -> Self {
        let gains = RotationGains::for_angle(kind, watch.angle());
        Self {
            kind,
            seen_generation: watch.generation(),
            previous: gains,
            current: gains,
        }
    }

    /// Jump straight to the watched angle with no ramp. Used on prepare and
    /// after a state restore.
    pub fn reseed(&mut self, watch: &AngleWatch) {
        *self = Self::new(self.kind, watch);
    }

    /// Pick up a pending change. Returns `true` when the pair was recomputed.
    pub fn refresh(&mut self, watch: &AngleWatch) -> bool {
        let generation = watch.generation();
        if generation == self.seen_generation {
            return false;
        }
        self.seen_generation = generation;
        self.previous = self.current;
        self.current = RotationGains::for_angle(self.kind, watch.angle());
        true
    }

    /// Call once the block that ramped to `current` has been rendered.
    pub fn settle(&mut self) {
        self.previous = self.current;
    }

    pub fn previous(&self) -> RotationGains {
        self.previous
    }

    pub fn current(&self) -> RotationGains {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xy_angle_mapping() {
        let g = RotationGains::for_xy_angle(90.0);
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!((g.front - expected).abs() < 1e-6);
        assert!((g.left - expected).abs() < 1e-6);

        let g = RotationGains::for_xy_angle(0.0);
        assert!((g.front - 1.0).abs() < 1e-6);
        assert!(g.left.abs() < 1e-6);

        let g = RotationGains::for_xy_angle(180.0);
        assert!(g.front.abs() < 1e-6);
        assert!((g.left - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_blumlein_offset() {
        let g = RotationGains::for_blumlein_rotation(0.0);
        assert!((g.front - g.left).abs() < 1e-6);

        // Rotating by +45° puts the left capsule side-on.
        let g = RotationGains::for_blumlein_rotation(45.0);
        assert!((g.front - 1.0).abs() < 1e-6);
        assert!(g.left.abs() < 1e-6);
    }

    #[test]
    fn test_cache_only_recomputes_on_new_generation() {
        let watch = AngleWatch::new(90.0);
        let mut cache = AngleGainCache::new(RotationKind::XyAngle, &watch);
        let initial = cache.current();

        assert!(!cache.refresh(&watch));
        assert_eq!(cache.previous(), initial);

        watch.notify(60.0);
        assert!(cache.refresh(&watch));
        assert_eq!(cache.previous(), initial);
        assert_eq!(cache.current(), RotationGains::for_xy_angle(60.0));

        // Same generation: no recompute, previous still held until settle.
        assert!(!cache.refresh(&watch));
        assert_eq!(cache.previous(), initial);

        cache.settle();
        assert_eq!(cache.previous(), cache.current());
    }

    #[test]
    fn test_reseed_skips_ramp() {
        let watch = AngleWatch::new(90.0);
        let mut cache = AngleGainCache::new(RotationKind::BlumleinRotation, &watch);
        watch.notify(-20.0);
        cache.reseed(&watch);

        assert_eq!(cache.previous(), cache.current());
        assert_eq!(cache.current(), RotationGains::for_blumlein_rotation(-20.0));
        assert!(!cache.refresh(&watch));
    }
}

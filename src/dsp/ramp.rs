//! Block gain ramps.
//!
//! Every parameter-driven scaling in the signal path goes through here. A ramp
//! starts at the gain applied in the previous block and lands exactly on the
//! current gain at the last sample of the region, so consecutive blocks join
//! without steps.

/// Linear gain trajectory across one buffer region.
#[derive(Clone, Copy, Debug)]
pub struct GainRamp {
    previous: f32,
    current: f32,
    last_index: f32,
}

impl GainRamp {
    pub fn new(previous: f32, current: f32, len: usize) -> Self {
        Self {
            previous,
            current,
            last_index: len.saturating_sub(1) as f32,
        }
    }

    /// Flat ramps must multiply by exactly `current`, not by an interpolated
    /// value that could drift by an ulp.
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.previous == self.current
    }

    #[inline]
    pub fn gain_at(&self, index: usize) -> f32 {
        if self.is_flat() || self.last_index <= 0.0 {
            return self.current;
        }
        let t = index as f32 / self.last_index;
        self.previous * (1.0 - t) + self.current * t
    }
}

/// Multiplies `buf` in place, ramping from `previous` to `current`.
#[inline]
pub fn apply_gain_ramp(buf: &mut [f32], previous: f32, current: f32) {
    let ramp = GainRamp::new(previous, current, buf.len());
    if ramp.is_flat() {
        for s in buf.iter_mut() {
            *s *= current;
        }
        return;
    }
    for (i, s) in buf.iter_mut().enumerate() {
        *s *= ramp.gain_at(i);
    }
}

/// Accumulates `src` into `dst`, scaling with a ramp from `previous` to
/// `current`.
#[inline]
pub fn add_with_ramp(dst: &mut [f32], src: &[f32], previous: f32, current: f32) {
    let ramp = GainRamp::new(previous, current, dst.len().min(src.len()));
    if ramp.is_flat() {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d += s * current;
        }
        return;
    }
    for (i, (d, &s)) in dst.iter_mut().zip(src).enumerate() {
        *d += s * ramp.gain_at(i);
    }
}

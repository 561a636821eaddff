//! Stereo mode mixer.
//!
//! One render handler per [`StereoMode`]. The engine dispatches once per block
//! on the corrected mode; handlers never see a mode that is invalid for the
//! current channel count.
//!
//! Every parameter scaling uses the block ramp (`previous` level to `current`
//! level) so automation and layer switches never step.

use crate::dsp::ramp::{add_with_ramp, apply_gain_ramp};
use crate::dsp::rotation::RotationGains;
use nih_plug::prelude::Enum;
use serde::{Deserialize, Serialize};

// =============================================================================
// STEREO MODES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[repr(usize)]
pub enum StereoMode {
    #[default]
    #[serde(rename = "Pseudo MS")]
    #[name = "Pseudo MS"]
    PseudoMs,
    #[serde(rename = "Pseudo Stereo")]
    #[name = "Pseudo Stereo"]
    PseudoStereo,
    #[serde(rename = "True MS")]
    #[name = "True MS"]
    TrueMs,
    #[serde(rename = "True Stereo")]
    #[name = "True Stereo"]
    TrueStereo,
    #[serde(rename = "Blumlein")]
    #[name = "Blumlein"]
    Blumlein,
}

impl StereoMode {
    pub const COUNT: usize = 5;

    pub const ALL: [StereoMode; Self::COUNT] = [
        StereoMode::PseudoMs,
        StereoMode::PseudoStereo,
        StereoMode::TrueMs,
        StereoMode::TrueStereo,
        StereoMode::Blumlein,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn from_ordinal(ordinal: usize) -> Self {
        Self::ALL[ordinal.min(Self::COUNT - 1)]
    }

    pub fn name(&self) -> &'static str {
        match self {
            StereoMode::PseudoMs => "Pseudo MS",
            StereoMode::PseudoStereo => "Pseudo Stereo",
            StereoMode::TrueMs => "True MS",
            StereoMode::TrueStereo => "True Stereo",
            StereoMode::Blumlein => "Blumlein",
        }
    }

    /// Ordinal range of the modes a given input channel count can feed.
    pub fn valid_range(num_inputs: usize) -> Option<(usize, usize)> {
        match num_inputs {
            2 => Some((0, 1)),
            4 => Some((2, 4)),
            _ => None,
        }
    }

    pub fn is_valid_for(self, num_inputs: usize) -> bool {
        Self::valid_range(num_inputs)
            .map(|(lo, hi)| (lo..=hi).contains(&self.ordinal()))
            .unwrap_or(false)
    }

    /// Clamp to the nearest mode valid for `num_inputs`. Unsupported channel
    /// counts leave the mode untouched since nothing gets processed anyway.
    pub fn corrected_for(self, num_inputs: usize) -> Self {
        match Self::valid_range(num_inputs) {
            Some((lo, hi)) => Self::from_ordinal(self.ordinal().clamp(lo, hi)),
            None => self,
        }
    }
}

// =============================================================================
// MIX INPUTS
// =============================================================================

/// Decomposed components for one block. The front/back pair is empty for
/// 2-channel input.
#[derive(Clone, Copy)]
pub struct Components<'a> {
    pub omni_lr: &'a [f32],
    pub eight_lr: &'a [f32],
    pub omni_fb: &'a [f32],
    pub eight_fb: &'a [f32],
}

/// Linear mixing levels applied in one block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixLevels {
    pub mid_gain: f32,
    pub side_gain: f32,
    pub pseudo_pattern: f32,
    pub mid_pattern: f32,
    pub xy_pattern: f32,
    pub xy: RotationGains,
    pub blumlein: RotationGains,
}

/// Block-sized work buffers for the handlers that need intermediates.
pub struct MixScratch {
    work_a: Vec<f32>,
    work_b: Vec<f32>,
}

impl MixScratch {
    pub fn new(capacity: usize) -> Self {
        Self {
            work_a: vec![0.0; capacity],
            work_b: vec![0.0; capacity],
        }
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Render `mode` into `out_l` / `out_r`, ramping every level from `prev` to
/// `cur`. Output slices must have the block length.
pub fn render(
    mode: StereoMode,
    c: &Components,
    prev: &MixLevels,
    cur: &MixLevels,
    scratch: &mut MixScratch,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    out_l.fill(0.0);
    out_r.fill(0.0);
    match mode {
        StereoMode::PseudoMs => render_pseudo_ms(c, prev, cur, out_l, out_r),
        StereoMode::PseudoStereo => render_pseudo_stereo(c, prev, cur, out_l, out_r),
        StereoMode::TrueMs => render_true_ms(c, prev, cur, scratch, out_l, out_r),
        StereoMode::TrueStereo => render_true_stereo(c, prev, cur, scratch, out_l, out_r),
        StereoMode::Blumlein => render_blumlein(c, prev, cur, out_l, out_r),
    }
}

fn render_pseudo_ms(
    c: &Components,
    prev: &MixLevels,
    cur: &MixLevels,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    add_with_ramp(out_l, c.omni_lr, prev.mid_gain, cur.mid_gain);
    add_with_ramp(out_l, c.eight_lr, prev.side_gain, cur.side_gain);

    add_with_ramp(out_r, c.omni_lr, prev.mid_gain, cur.mid_gain);
    add_with_ramp(out_r, c.eight_lr, -prev.side_gain, -cur.side_gain);
}

fn render_pseudo_stereo(
    c: &Components,
    prev: &MixLevels,
    cur: &MixLevels,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    let (p0, p1) = (prev.pseudo_pattern, cur.pseudo_pattern);

    add_with_ramp(out_l, c.omni_lr, 1.0 - p0, 1.0 - p1);
    add_with_ramp(out_l, c.eight_lr, p0, p1);

    add_with_ramp(out_r, c.omni_lr, 1.0 - p0, 1.0 - p1);
    add_with_ramp(out_r, c.eight_lr, -p0, -p1);
}

fn render_true_ms(
    c: &Components,
    prev: &MixLevels,
    cur: &MixLevels,
    scratch: &mut MixScratch,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    let n = out_l.len();
    let (p0, p1) = (prev.mid_pattern, cur.mid_pattern);

    let mid = &mut scratch.work_a[..n];
    mid.fill(0.0);
    add_with_ramp(mid, c.omni_fb, 1.0 - p0, 1.0 - p1);
    add_with_ramp(mid, c.eight_fb, p0, p1);
    apply_gain_ramp(mid, prev.mid_gain, cur.mid_gain);

    out_l.copy_from_slice(mid);
    out_r.copy_from_slice(mid);
    add_with_ramp(out_l, c.eight_lr, prev.side_gain, cur.side_gain);
    add_with_ramp(out_r, c.eight_lr, -prev.side_gain, -cur.side_gain);
}

fn render_true_stereo(
    c: &Components,
    prev: &MixLevels,
    cur: &MixLevels,
    scratch: &mut MixScratch,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    let n = out_l.len();
    let (g0, g1) = (prev.xy, cur.xy);
    let (p0, p1) = (prev.xy_pattern, cur.xy_pattern);

    // Virtual capsules at ±angle/2: front/back eight shared, left/right eight
    // mirrored.
    let rot_l = &mut scratch.work_a[..n];
    rot_l.fill(0.0);
    add_with_ramp(rot_l, c.eight_fb, g0.front, g1.front);
    add_with_ramp(rot_l, c.eight_lr, g0.left, g1.left);

    let rot_r = &mut scratch.work_b[..n];
    rot_r.fill(0.0);
    add_with_ramp(rot_r, c.eight_fb, g0.front, g1.front);
    add_with_ramp(rot_r, c.eight_lr, -g0.left, -g1.left);

    add_with_ramp(out_l, c.omni_fb, 1.0 - p0, 1.0 - p1);
    add_with_ramp(out_l, &scratch.work_a[..n], p0, p1);

    add_with_ramp(out_r, c.omni_fb, 1.0 - p0, 1.0 - p1);
    add_with_ramp(out_r, &scratch.work_b[..n], p0, p1);
}

fn render_blumlein(
    c: &Components,
    prev: &MixLevels,
    cur: &MixLevels,
    out_l: &mut [f32],
    out_r: &mut [f32],
) {
    let (g0, g1) = (prev.blumlein, cur.blumlein);

    add_with_ramp(out_l, c.eight_fb, g0.left, g1.left);
    add_with_ramp(out_l, c.eight_lr, g0.front, g1.front);

    add_with_ramp(out_r, c.eight_fb, g0.front, g1.front);
    add_with_ramp(out_r, c.eight_lr, -g0.left, -g1.left);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unity_levels() -> MixLevels {
        MixLevels {
            mid_gain: 1.0,
            side_gain: 1.0,
            pseudo_pattern: 0.5,
            mid_pattern: 0.5,
            xy_pattern: 0.5,
            xy: RotationGains::for_xy_angle(90.0),
            blumlein: RotationGains::for_blumlein_rotation(0.0),
        }
    }

    struct Fixture {
        omni_lr: Vec<f32>,
        eight_lr: Vec<f32>,
        omni_fb: Vec<f32>,
        eight_fb: Vec<f32>,
    }

    impl Fixture {
        fn constant(l: f32, r: f32, f: f32, b: f32, n: usize) -> Self {
            Self {
                omni_lr: vec![l + r; n],
                eight_lr: vec![l - r; n],
                omni_fb: vec![f + b; n],
                eight_fb: vec![f - b; n],
            }
        }

        fn components(&self) -> Components<'_> {
            Components {
                omni_lr: &self.omni_lr,
                eight_lr: &self.eight_lr,
                omni_fb: &self.omni_fb,
                eight_fb: &self.eight_fb,
            }
        }
    }

    fn run(mode: StereoMode, fx: &Fixture, levels: &MixLevels) -> (Vec<f32>, Vec<f32>) {
        let n = fx.omni_lr.len();
        let mut scratch = MixScratch::new(n);
        let mut l = vec![0.0; n];
        let mut r = vec![0.0; n];
        render(mode, &fx.components(), levels, levels, &mut scratch, &mut l, &mut r);
        (l, r)
    }

    #[test]
    fn test_mode_correction() {
        assert_eq!(StereoMode::TrueMs.corrected_for(2), StereoMode::PseudoStereo);
        assert_eq!(StereoMode::Blumlein.corrected_for(2), StereoMode::PseudoStereo);
        assert_eq!(StereoMode::PseudoMs.corrected_for(4), StereoMode::TrueMs);
        assert_eq!(StereoMode::PseudoStereo.corrected_for(4), StereoMode::TrueMs);
        assert_eq!(StereoMode::TrueStereo.corrected_for(4), StereoMode::TrueStereo);
        assert_eq!(StereoMode::Blumlein.corrected_for(3), StereoMode::Blumlein);

        for mode in StereoMode::ALL {
            assert!(mode.corrected_for(2).is_valid_for(2));
            assert!(mode.corrected_for(4).is_valid_for(4));
        }
    }

    #[test]
    fn test_pseudo_ms_side_only_input() {
        // L=1, R=-1 -> omni 0, eight 2
        let fx = Fixture::constant(1.0, -1.0, 0.0, 0.0, 16);
        let mut levels = unity_levels();
        levels.side_gain = 0.5;
        let (l, r) = run(StereoMode::PseudoMs, &fx, &levels);
        for i in 0..16 {
            assert!((l[i] - 1.0).abs() < 1e-6);
            assert!((r[i] + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_pseudo_stereo_half_pattern_passes_capsules() {
        let fx = Fixture::constant(0.3, -0.1, 0.0, 0.0, 8);
        let (l, r) = run(StereoMode::PseudoStereo, &fx, &unity_levels());
        for i in 0..8 {
            assert!((l[i] - 0.3).abs() < 1e-6);
            assert!((r[i] + 0.1).abs() < 1e-6);
        }
    }

    #[test]
    fn test_true_ms_formula() {
        let (lc, rc, fc, bc) = (0.2f32, 0.1f32, 0.5f32, 0.3f32);
        let fx = Fixture::constant(lc, rc, fc, bc, 8);
        let mut levels = unity_levels();
        levels.mid_pattern = 0.25;
        levels.mid_gain = 0.5;
        levels.side_gain = 2.0;
        let (l, r) = run(StereoMode::TrueMs, &fx, &levels);

        let mid = ((fc + bc) * 0.75 + (fc - bc) * 0.25) * 0.5;
        let side = (lc - rc) * 2.0;
        assert!((l[3] - (mid + side)).abs() < 1e-6);
        assert!((r[3] - (mid - side)).abs() < 1e-6);
    }

    #[test]
    fn test_true_stereo_formula() {
        let (lc, rc, fc, bc) = (0.4f32, -0.2f32, 0.6f32, 0.1f32);
        let fx = Fixture::constant(lc, rc, fc, bc, 8);
        let mut levels = unity_levels();
        levels.xy = RotationGains::for_xy_angle(120.0);
        levels.xy_pattern = 0.6;
        let (l, r) = run(StereoMode::TrueStereo, &fx, &levels);

        let g = levels.xy;
        let omni = (fc + bc) * 0.4;
        let rot_l = (fc - bc) * g.front + (lc - rc) * g.left;
        let rot_r = (fc - bc) * g.front - (lc - rc) * g.left;
        assert!((l[5] - (omni + rot_l * 0.6)).abs() < 1e-6);
        assert!((r[5] - (omni + rot_r * 0.6)).abs() < 1e-6);
    }

    #[test]
    fn test_blumlein_formula() {
        let (lc, rc, fc, bc) = (0.4f32, -0.2f32, 0.6f32, 0.1f32);
        let fx = Fixture::constant(lc, rc, fc, bc, 8);
        let mut levels = unity_levels();
        levels.blumlein = RotationGains::for_blumlein_rotation(15.0);
        let (l, r) = run(StereoMode::Blumlein, &fx, &levels);

        let g = levels.blumlein;
        let ef = fc - bc;
        let elr = lc - rc;
        assert!((l[0] - (ef * g.left + elr * g.front)).abs() < 1e-6);
        assert!((r[0] - (ef * g.front - elr * g.left)).abs() < 1e-6);
    }

    #[test]
    fn test_level_change_is_ramped() {
        let fx = Fixture::constant(0.5, 0.5, 0.0, 0.0, 64);
        let prev = unity_levels();
        let mut cur = prev;
        cur.mid_gain = 0.0;

        let mut scratch = MixScratch::new(64);
        let mut l = vec![0.0; 64];
        let mut r = vec![0.0; 64];
        render(
            StereoMode::PseudoMs,
            &fx.components(),
            &prev,
            &cur,
            &mut scratch,
            &mut l,
            &mut r,
        );

        // omni = 1.0, ramped from mid 1.0 to 0.0
        assert!((l[0] - 1.0).abs() < 1e-6);
        assert!(l[63].abs() < 1e-6);
        let max_step = l.windows(2).map(|w| (w[1] - w[0]).abs()).fold(0.0f32, f32::max);
        assert!(max_step < 1.0 / 60.0);
    }
}

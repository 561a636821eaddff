//! Plain-value copy of every plugin parameter.
//!
//! `process` reads the host atomics once per block into a [`ParamSnapshot`];
//! the layer store keeps two of them; the controller diffs them to decide
//! which host writes are needed.

use crate::changes::{BoolParamId, FloatParamId, ParamChange};
use crate::dsp::mixer::StereoMode;
use serde::{Deserialize, Serialize};

// Parameter ranges, shared by the host parameter definitions and any code
// that clamps on its own.
pub const MS_GAIN_MIN_DB: f32 = -32.0;
pub const MS_GAIN_MAX_DB: f32 = 3.0;
pub const PATTERN_MAX: f32 = 0.75;
pub const XY_ANGLE_MAX: f32 = 180.0;
pub const BLUMLEIN_ROTATION_MAX: f32 = 45.0;
pub const OUTPUT_GAIN_MIN_DB: f32 = -24.0;
pub const OUTPUT_GAIN_MAX_DB: f32 = 12.0;
pub const COMPENSATION_MAX_DB: f32 = crate::dsp::auto_level::MAX_COMPENSATION_DB;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamSnapshot {
    pub stereo_mode: StereoMode,
    pub mid_gain_db: f32,
    pub side_gain_db: f32,
    pub pseudo_pattern: f32,
    pub mid_pattern: f32,
    pub xy_pattern: f32,
    pub xy_angle: f32,
    pub blumlein_rotation: f32,
    pub output_gain_db: f32,
    /// Indexed by [`StereoMode::ordinal`].
    pub compensation_db: [f32; StereoMode::COUNT],
    pub channel_swap: bool,
    pub auto_level: bool,
    pub ms_link: bool,
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self {
            stereo_mode: StereoMode::PseudoMs,
            mid_gain_db: 0.0,
            side_gain_db: 0.0,
            pseudo_pattern: 0.5,
            mid_pattern: 0.5,
            xy_pattern: 0.5,
            xy_angle: 90.0,
            blumlein_rotation: 0.0,
            output_gain_db: 0.0,
            compensation_db: [0.0; StereoMode::COUNT],
            channel_swap: false,
            auto_level: false,
            ms_link: false,
        }
    }
}

impl ParamSnapshot {
    pub fn float(&self, id: FloatParamId) -> f32 {
        match id {
            FloatParamId::MidGain => self.mid_gain_db,
            FloatParamId::SideGain => self.side_gain_db,
            FloatParamId::PseudoPattern => self.pseudo_pattern,
            FloatParamId::MidPattern => self.mid_pattern,
            FloatParamId::XyPattern => self.xy_pattern,
            FloatParamId::XyAngle => self.xy_angle,
            FloatParamId::BlumleinRotation => self.blumlein_rotation,
            FloatParamId::OutputGain => self.output_gain_db,
            FloatParamId::Compensation(mode) => self.compensation_db[mode.ordinal()],
        }
    }

    pub fn set_float(&mut self, id: FloatParamId, value: f32) {
        let slot = match id {
            FloatParamId::MidGain => &mut self.mid_gain_db,
            FloatParamId::SideGain => &mut self.side_gain_db,
            FloatParamId::PseudoPattern => &mut self.pseudo_pattern,
            FloatParamId::MidPattern => &mut self.mid_pattern,
            FloatParamId::XyPattern => &mut self.xy_pattern,
            FloatParamId::XyAngle => &mut self.xy_angle,
            FloatParamId::BlumleinRotation => &mut self.blumlein_rotation,
            FloatParamId::OutputGain => &mut self.output_gain_db,
            FloatParamId::Compensation(mode) => &mut self.compensation_db[mode.ordinal()],
        };
        *slot = value;
    }

    pub fn flag(&self, id: BoolParamId) -> bool {
        match id {
            BoolParamId::ChannelSwap => self.channel_swap,
            BoolParamId::AutoLevel => self.auto_level,
            BoolParamId::MsLink => self.ms_link,
        }
    }

    pub fn set_flag(&mut self, id: BoolParamId, value: bool) {
        match id {
            BoolParamId::ChannelSwap => self.channel_swap = value,
            BoolParamId::AutoLevel => self.auto_level = value,
            BoolParamId::MsLink => self.ms_link = value,
        }
    }

    pub fn apply(&mut self, change: ParamChange) {
        match change {
            ParamChange::Float(id, v) => self.set_float(id, v),
            ParamChange::Bool(id, v) => self.set_flag(id, v),
            ParamChange::Mode(mode) => self.stereo_mode = mode,
        }
    }

    pub fn compensation_for(&self, mode: StereoMode) -> f32 {
        self.compensation_db[mode.ordinal()]
    }

    /// The writes that turn `self` into `target`. Floats compare bitwise so a
    /// restored value always lands exactly.
    pub fn changes_to(&self, target: &ParamSnapshot) -> Vec<ParamChange> {
        let mut out = Vec::new();
        if self.stereo_mode != target.stereo_mode {
            out.push(ParamChange::Mode(target.stereo_mode));
        }
        for id in FloatParamId::ALL {
            let to = target.float(id);
            if self.float(id).to_bits() != to.to_bits() {
                out.push(ParamChange::Float(id, to));
            }
        }
        for id in BoolParamId::ALL {
            let to = target.flag(id);
            if self.flag(id) != to {
                out.push(ParamChange::Bool(id, to));
            }
        }
        out
    }

    pub fn with_mode_corrected(mut self, num_inputs: usize) -> Self {
        self.stereo_mode = self.stereo_mode.corrected_for(num_inputs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_snapshots_need_no_writes() {
        let a = ParamSnapshot::default();
        assert!(a.changes_to(&a).is_empty());
    }

    #[test]
    fn test_changes_apply_to_target() {
        let from = ParamSnapshot::default();
        let mut to = ParamSnapshot::default();
        to.stereo_mode = StereoMode::PseudoStereo;
        to.side_gain_db = -6.0;
        to.compensation_db[StereoMode::Blumlein.ordinal()] = 2.5;
        to.channel_swap = true;

        let changes = from.changes_to(&to);
        assert_eq!(changes.len(), 4);
        assert_eq!(changes[0], ParamChange::Mode(StereoMode::PseudoStereo));

        let mut applied = from;
        for c in changes {
            applied.apply(c);
        }
        assert_eq!(applied, to);
    }

    #[test]
    fn test_mode_correction() {
        let s = ParamSnapshot::default().with_mode_corrected(4);
        assert_eq!(s.stereo_mode, StereoMode::TrueMs);
    }

    #[test]
    fn test_json_round_trip_fills_missing_fields() {
        let json = r#"{"stereo_mode":"Blumlein","xy_angle":120.0}"#;
        let s: ParamSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.stereo_mode, StereoMode::Blumlein);
        assert_eq!(s.xy_angle, 120.0);
        assert_eq!(s.xy_pattern, 0.5);
    }
}

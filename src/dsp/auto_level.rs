//! Auto-level compensator.
//!
//! While armed, the compensator averages input level against output level
//! (with the overall gain divided out) over a fixed window of blocks and then
//! reports the gain that would make the two match. It does not touch the host:
//! the caller decides how the committed value reaches the parameter.

/// Committed compensation is clamped to the compensation parameter range.
pub const MAX_COMPENSATION_DB: f32 = 24.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Measuring,
    /// A value was committed; waiting for the armed flag to drop.
    AwaitingDisarm,
}

pub struct AutoLevel {
    phase: Phase,
    epsilon: f32,
    window_seconds: f32,
    target_blocks: u32,
    blocks: u32,
    sum_in: f32,
    sum_out: f32,
    run: u32,
}

impl AutoLevel {
    pub fn new(window_seconds: f32, epsilon: f32) -> Self {
        Self {
            phase: Phase::Idle,
            epsilon,
            window_seconds,
            target_blocks: 1,
            blocks: 0,
            sum_in: epsilon,
            sum_out: epsilon,
            run: 0,
        }
    }

    /// Window length in blocks for the negotiated stream format.
    pub fn configure(&mut self, sample_rate: f32, max_block: usize) {
        let blocks = (self.window_seconds * sample_rate / max_block.max(1) as f32).ceil();
        self.target_blocks = if blocks.is_finite() && blocks >= 1.0 {
            blocks as u32
        } else {
            1
        };
        self.reset();
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.clear_sums();
    }

    fn clear_sums(&mut self) {
        self.blocks = 0;
        self.sum_in = self.epsilon;
        self.sum_out = self.epsilon;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target_blocks(&self) -> u32 {
        self.target_blocks
    }

    /// Counts measurements started. Survives `reset`.
    pub fn run(&self) -> u32 {
        self.run
    }

    pub fn is_measuring(&self) -> bool {
        self.phase == Phase::Measuring
    }

    /// Feed one block. `in_rms` and `out_rms` are the mean RMS over input and
    /// output channels; `overall_gain` is the linear gain applied after the
    /// mixer. Returns the compensation in dB when the window completes.
    pub fn observe(
        &mut self,
        armed: bool,
        in_rms: f32,
        out_rms: f32,
        overall_gain: f32,
    ) -> Option<f32> {
        match (self.phase, armed) {
            (Phase::Idle, false) => return None,
            (Phase::Idle, true) => {
                self.clear_sums();
                self.run = self.run.wrapping_add(1);
                self.phase = Phase::Measuring;
            }
            (Phase::Measuring, false) => {
                // Disarmed mid-window: abort.
                self.reset();
                return None;
            }
            (Phase::Measuring, true) => {}
            (Phase::AwaitingDisarm, true) => return None,
            (Phase::AwaitingDisarm, false) => {
                self.reset();
                return None;
            }
        }

        let gain = if overall_gain > 0.0 { overall_gain } else { 1.0 };
        self.sum_in += in_rms;
        self.sum_out += out_rms / gain;
        self.blocks += 1;

        if self.blocks < self.target_blocks {
            return None;
        }

        let db = (20.0 * (self.sum_in / self.sum_out).log10())
            .clamp(-MAX_COMPENSATION_DB, MAX_COMPENSATION_DB);
        self.clear_sums();
        self.phase = Phase::AwaitingDisarm;
        Some(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measured(window_seconds: f32, sr: f32, block: usize) -> AutoLevel {
        let mut al = AutoLevel::new(window_seconds, 1e-6);
        al.configure(sr, block);
        al
    }

    #[test]
    fn test_window_length() {
        assert_eq!(measured(2.0, 48000.0, 512).target_blocks(), 188);
        assert_eq!(measured(0.001, 48000.0, 512).target_blocks(), 1);
    }

    #[test]
    fn test_idle_when_unarmed() {
        let mut al = measured(1.0, 1000.0, 100);
        for _ in 0..50 {
            assert_eq!(al.observe(false, 1.0, 0.5, 1.0), None);
        }
        assert_eq!(al.phase(), Phase::Idle);
    }

    #[test]
    fn test_commit_matches_level_ratio() {
        let mut al = measured(1.0, 1000.0, 100);
        let (x, y) = (0.5f32, 0.25f32);
        let mut committed = None;
        for i in 0..10 {
            let r = al.observe(true, x, y, 1.0);
            if i < 9 {
                assert_eq!(r, None);
            } else {
                committed = r;
            }
        }
        let db = committed.unwrap();
        assert!((db - 20.0 * (x / y).log10()).abs() < 1e-3);
        assert_eq!(al.phase(), Phase::AwaitingDisarm);
    }

    #[test]
    fn test_overall_gain_is_divided_out() {
        let mut al = measured(0.1, 1000.0, 100);
        // Output already 6 dB hot from the overall gain: that part must not
        // count against the mixer.
        let db = al.observe(true, 0.5, 1.0, 2.0).unwrap();
        assert!(db.abs() < 1e-3);
    }

    #[test]
    fn test_commit_is_clamped() {
        let mut al = measured(0.1, 1000.0, 100);
        let db = al.observe(true, 1.0, 1e-4, 1.0).unwrap();
        assert_eq!(db, MAX_COMPENSATION_DB);
    }

    #[test]
    fn test_silence_does_not_divide_by_zero() {
        let mut al = measured(0.1, 1000.0, 100);
        let db = al.observe(true, 0.0, 0.0, 1.0).unwrap();
        assert!(db.is_finite());
        assert!(db.abs() < 1e-3);
    }

    #[test]
    fn test_disarm_aborts_window() {
        let mut al = measured(1.0, 1000.0, 100);
        for _ in 0..5 {
            al.observe(true, 1.0, 0.1, 1.0);
        }
        al.observe(false, 1.0, 0.1, 1.0);
        assert_eq!(al.phase(), Phase::Idle);

        // A fresh window starts from scratch.
        for _ in 0..9 {
            assert_eq!(al.observe(true, 0.5, 0.5, 1.0), None);
        }
        let db = al.observe(true, 0.5, 0.5, 1.0).unwrap();
        assert!(db.abs() < 1e-3);
    }

    #[test]
    fn test_waits_for_disarm_before_rearming() {
        let mut al = measured(0.1, 1000.0, 100);
        assert!(al.observe(true, 1.0, 0.5, 1.0).is_some());
        for _ in 0..20 {
            assert_eq!(al.observe(true, 1.0, 0.5, 1.0), None);
        }
        al.observe(false, 0.0, 0.0, 1.0);
        assert_eq!(al.phase(), Phase::Idle);
        assert!(al.observe(true, 1.0, 0.5, 1.0).is_some());
    }

    #[test]
    fn test_run_counts_started_measurements() {
        let mut al = measured(1.0, 1000.0, 100);
        assert_eq!(al.run(), 0);
        al.observe(true, 1.0, 1.0, 1.0);
        al.observe(true, 1.0, 1.0, 1.0);
        assert_eq!(al.run(), 1);

        al.observe(false, 1.0, 1.0, 1.0);
        al.reset();
        al.observe(true, 1.0, 1.0, 1.0);
        assert_eq!(al.run(), 2);
    }
}

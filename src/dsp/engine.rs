//! Per-block stereo rendering.
//!
//! [`StereoEngine`] owns every buffer the signal path needs, sized in
//! [`StereoEngine::prepare`]. `process` never allocates, locks or calls the
//! host: parameter writes it needs (mode correction, auto-level commit) go out
//! through the change queue.

use std::sync::Arc;

use crate::changes::{ChangeSender, DeferredChange};
use crate::config::EngineConfig;
use crate::dsp::auto_level::AutoLevel;
use crate::dsp::decompose::AxisComponents;
use crate::dsp::mixer::{self, Components, MixLevels, MixScratch, StereoMode};
use crate::dsp::ramp::{add_with_ramp, apply_gain_ramp};
use crate::dsp::rotation::{AngleGainCache, AngleWatch, RotationKind};
use crate::dsp::utils::{db_to_gain, frame_rms};
use crate::meters::Meters;
use crate::snapshot::{ParamSnapshot, PATTERN_MAX};
use crate::sc_log;

/// A committed auto-level value that the host parameter has not caught up
/// with yet.
#[derive(Clone, Copy, Debug, PartialEq)]
struct CompensationOverride {
    mode: StereoMode,
    value: f32,
    param_at_commit: f32,
}

pub struct StereoEngine {
    meters: Arc<Meters>,
    xy_watch: Arc<AngleWatch>,
    blumlein_watch: Arc<AngleWatch>,
    changes: ChangeSender,

    max_block: usize,
    num_inputs: usize,
    prepared: bool,

    lr: AxisComponents,
    fb: AxisComponents,
    scratch: MixScratch,
    fade_l: Vec<f32>,
    fade_r: Vec<f32>,

    xy_gains: AngleGainCache,
    blumlein_gains: AngleGainCache,

    // Values applied in the previous block, the start point of every ramp.
    prev_levels: MixLevels,
    prev_overall_gain: f32,
    prev_mode: StereoMode,
    last_requested_mode: Option<StereoMode>,

    auto_level: AutoLevel,
    comp_override: Option<CompensationOverride>,
}

impl StereoEngine {
    pub fn new(
        config: EngineConfig,
        meters: Arc<Meters>,
        xy_watch: Arc<AngleWatch>,
        blumlein_watch: Arc<AngleWatch>,
        changes: ChangeSender,
    ) -> Self {
        let xy_gains = AngleGainCache::new(RotationKind::XyAngle, &xy_watch);
        let blumlein_gains = AngleGainCache::new(RotationKind::BlumleinRotation, &blumlein_watch);
        let prev_levels = mix_levels(&ParamSnapshot::default(), &xy_gains, &blumlein_gains);

        Self {
            auto_level: AutoLevel::new(config.auto_level_seconds, config.rms_epsilon),
            meters,
            xy_watch,
            blumlein_watch,
            changes,
            max_block: 0,
            num_inputs: 0,
            prepared: false,
            lr: AxisComponents::new(0),
            fb: AxisComponents::new(0),
            scratch: MixScratch::new(0),
            fade_l: Vec::new(),
            fade_r: Vec::new(),
            xy_gains,
            blumlein_gains,
            prev_levels,
            prev_overall_gain: 1.0,
            prev_mode: StereoMode::PseudoMs,
            last_requested_mode: None,
            comp_override: None,
        }
    }

    /// Size every buffer for `max_block` and seed the "previous" values from
    /// `params` so the first block does not ramp in from defaults. Allocates.
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        max_block: usize,
        num_inputs: usize,
        params: &ParamSnapshot,
    ) {
        self.max_block = max_block;
        self.num_inputs = num_inputs;

        self.lr = AxisComponents::new(max_block);
        self.fb = AxisComponents::new(max_block);
        self.scratch = MixScratch::new(max_block);
        self.fade_l = vec![0.0; max_block];
        self.fade_r = vec![0.0; max_block];

        self.xy_gains.reseed(&self.xy_watch);
        self.blumlein_gains.reseed(&self.blumlein_watch);

        self.auto_level.configure(sample_rate, max_block);
        self.comp_override = None;

        self.meters.set_input_channels(num_inputs);
        self.meters.clear_inputs_from(0);
        self.meters.set_calibrating(false);
        self.meters.set_calibration_run(self.auto_level.run());

        let mode = params.stereo_mode.corrected_for(num_inputs);
        self.queue_mode_correction(params.stereo_mode, mode);
        self.last_requested_mode = Some(params.stereo_mode);

        self.prev_mode = mode;
        self.prev_levels = mix_levels(params, &self.xy_gains, &self.blumlein_gains);
        self.prev_overall_gain = self.overall_gain(mode, params);

        self.prepared = max_block > 0;
        sc_log!(
            "prepare: sr={} max_block={} inputs={} mode={}",
            sample_rate,
            max_block,
            num_inputs,
            mode.name()
        );
    }

    /// Clear transient state without touching the prepared buffers.
    pub fn reset(&mut self) {
        self.auto_level.reset();
        self.meters.set_calibrating(false);
        for ch in 0..crate::meters::OUTPUT_CHANNELS {
            self.meters.set_output_rms(ch, 0.0);
        }
        self.meters.clear_inputs_from(0);
    }

    /// Compensation currently applied for `mode`, including a pending
    /// auto-level commit the host has not reflected yet.
    pub fn effective_compensation_db(&self, mode: StereoMode, params: &ParamSnapshot) -> f32 {
        match self.comp_override {
            Some(ov) if ov.mode == mode => ov.value,
            _ => params.compensation_for(mode),
        }
    }

    fn overall_gain(&self, mode: StereoMode, params: &ParamSnapshot) -> f32 {
        db_to_gain(params.output_gain_db + self.effective_compensation_db(mode, params))
    }

    /// Drop the override once the host parameter moves off the value it had
    /// when the commit happened.
    fn expire_override(&mut self, params: &ParamSnapshot) {
        if let Some(ov) = self.comp_override {
            let now = params.compensation_for(ov.mode);
            if now.to_bits() != ov.param_at_commit.to_bits() {
                self.comp_override = None;
            }
        }
    }

    fn defer(&mut self, change: DeferredChange) {
        if !self.changes.send(change) {
            sc_log!("change queue full, {} dropped", self.changes.dropped());
        }
    }

    fn queue_mode_correction(&mut self, requested: StereoMode, corrected: StereoMode) {
        if requested != corrected {
            self.defer(DeferredChange::Mode {
                from: requested,
                to: corrected,
            });
            sc_log!(
                "mode {} not valid for {} inputs, correcting to {}",
                requested.name(),
                self.num_inputs,
                corrected.name()
            );
        }
    }

    /// Render one block in place. Channels 0/1 are L/R, 2/3 are F/B for
    /// 4-channel input. Unsupported layouts are left untouched.
    pub fn process(&mut self, buffer: &mut [&mut [f32]], params: &ParamSnapshot) {
        let num_channels = buffer.len();
        if !self.prepared || !(num_channels == 2 || num_channels == 4) {
            return;
        }
        let n = buffer[0].len();
        if n == 0 || n > self.max_block || buffer.iter().any(|ch| ch.len() != n) {
            return;
        }

        if num_channels != self.num_inputs {
            self.num_inputs = num_channels;
            self.meters.set_input_channels(num_channels);
            self.meters.clear_inputs_from(num_channels);
            self.last_requested_mode = None;
            // The previous mode may read channels that no longer exist.
            self.prev_mode = self.prev_mode.corrected_for(num_channels);
        }

        let mode = params.stereo_mode.corrected_for(num_channels);
        if self.last_requested_mode != Some(params.stereo_mode) {
            self.last_requested_mode = Some(params.stereo_mode);
            self.queue_mode_correction(params.stereo_mode, mode);
        }

        // Input metering and decomposition. The buffer is free to overwrite
        // after this.
        let mut in_sum = 0.0;
        for (ch, samples) in buffer.iter().enumerate() {
            let rms = frame_rms(samples);
            self.meters.set_input_rms(ch, rms);
            in_sum += rms;
        }
        let in_mean = in_sum / num_channels as f32;

        self.lr.compute(&*buffer[0], &*buffer[1]);
        if num_channels == 4 {
            self.fb.compute(&*buffer[2], &*buffer[3]);
        }

        self.xy_gains.refresh(&self.xy_watch);
        self.blumlein_gains.refresh(&self.blumlein_watch);
        let cur_levels = mix_levels(params, &self.xy_gains, &self.blumlein_gains);
        let mut prev_levels = self.prev_levels;
        prev_levels.xy = self.xy_gains.previous();
        prev_levels.blumlein = self.blumlein_gains.previous();

        let components = if num_channels == 4 {
            Components {
                omni_lr: self.lr.omni(),
                eight_lr: self.lr.eight(),
                omni_fb: self.fb.omni(),
                eight_fb: self.fb.eight(),
            }
        } else {
            Components {
                omni_lr: self.lr.omni(),
                eight_lr: self.lr.eight(),
                omni_fb: &[],
                eight_fb: &[],
            }
        };

        let (front, rest) = buffer.split_at_mut(1);
        let out_l: &mut [f32] = &mut *front[0];
        let out_r: &mut [f32] = &mut *rest[0];

        mixer::render(
            mode,
            &components,
            &prev_levels,
            &cur_levels,
            &mut self.scratch,
            out_l,
            out_r,
        );

        if mode != self.prev_mode {
            // Old mode at its last levels, faded out under the new one.
            let fade_l = &mut self.fade_l[..n];
            let fade_r = &mut self.fade_r[..n];
            mixer::render(
                self.prev_mode,
                &components,
                &prev_levels,
                &prev_levels,
                &mut self.scratch,
                fade_l,
                fade_r,
            );
            apply_gain_ramp(out_l, 0.0, 1.0);
            apply_gain_ramp(out_r, 0.0, 1.0);
            add_with_ramp(out_l, fade_l, 1.0, 0.0);
            add_with_ramp(out_r, fade_r, 1.0, 0.0);
            sc_log!("mode {} -> {}", self.prev_mode.name(), mode.name());
        }

        self.expire_override(params);
        let overall_gain = self.overall_gain(mode, params);
        apply_gain_ramp(out_l, self.prev_overall_gain, overall_gain);
        apply_gain_ramp(out_r, self.prev_overall_gain, overall_gain);

        if params.channel_swap {
            out_l.swap_with_slice(out_r);
        }

        let out_rms_l = frame_rms(out_l);
        let out_rms_r = frame_rms(out_r);

        for ch in buffer.iter_mut().skip(2) {
            ch.fill(0.0);
        }

        self.meters.set_output_rms(0, out_rms_l);
        self.meters.set_output_rms(1, out_rms_r);
        let out_mean = 0.5 * (out_rms_l + out_rms_r);

        let committed = self
            .auto_level
            .observe(params.auto_level, in_mean, out_mean, overall_gain);
        // Published before the commit is queued so the controller never pops
        // a disarm for a run it has not seen yet.
        self.meters.set_calibration_run(self.auto_level.run());
        self.meters.set_calibrating(self.auto_level.is_measuring());
        if let Some(db) = committed {
            self.commit_compensation(mode, db, params);
        }

        self.prev_levels = cur_levels;
        self.prev_overall_gain = overall_gain;
        self.prev_mode = mode;
        self.xy_gains.settle();
        self.blumlein_gains.settle();
    }

    fn commit_compensation(&mut self, mode: StereoMode, db: f32, params: &ParamSnapshot) {
        let param_at_commit = params.compensation_for(mode);
        self.comp_override = Some(CompensationOverride {
            mode,
            value: db,
            param_at_commit,
        });
        self.defer(DeferredChange::Compensation {
            mode,
            from: param_at_commit,
            to: db,
        });
        self.defer(DeferredChange::Disarm {
            run: self.auto_level.run(),
        });
        sc_log!("auto-level: {} compensation {:.2} dB", mode.name(), db);
    }
}

fn mix_levels(
    params: &ParamSnapshot,
    xy: &AngleGainCache,
    blumlein: &AngleGainCache,
) -> MixLevels {
    MixLevels {
        mid_gain: db_to_gain(params.mid_gain_db),
        side_gain: db_to_gain(params.side_gain_db),
        pseudo_pattern: params.pseudo_pattern.clamp(0.0, PATTERN_MAX),
        mid_pattern: params.mid_pattern.clamp(0.0, PATTERN_MAX),
        xy_pattern: params.xy_pattern.clamp(0.0, PATTERN_MAX),
        xy: xy.current(),
        blumlein: blumlein.current(),
    }
}

mod changes;
mod config;
mod control;
mod debug;
pub mod dsp;
mod layers;
mod meters;
mod snapshot;
mod ui;

use crate::changes::{change_queue, BoolParamId, FloatParamId, ParamChange, ParameterSink};
use crate::config::EngineConfig;
use crate::control::{Controller, RestoreEpoch};
use crate::dsp::{AngleWatch, StereoEngine, StereoMode};
use crate::layers::LayerStore;
use crate::meters::Meters;
use crate::snapshot::*;
use assert_no_alloc::permit_alloc;
use nih_plug::prelude::*;
use nih_plug_vizia::{create_vizia_editor, ViziaState, ViziaTheming};
use std::sync::{Arc, Mutex, RwLock};
use ui::build_ui;

const DEFAULT_SAMPLE_RATE: f32 = 48000.0;
const DEFAULT_MAX_BLOCK: usize = 1024;

// =============================================================================
// PARAMETERS
// =============================================================================

#[derive(Params)]
pub struct StereoParams {
    /// A/B layer snapshots. The live values below always belong to the active
    /// layer.
    #[persist = "layers"]
    pub layers: Arc<RwLock<LayerStore>>,

    #[id = "stereo_mode"]
    pub stereo_mode: EnumParam<StereoMode>,

    #[id = "mid_gain"]
    pub mid_gain: FloatParam,

    #[id = "side_gain"]
    pub side_gain: FloatParam,

    #[id = "pseudo_pattern"]
    pub pseudo_pattern: FloatParam,

    #[id = "mid_pattern"]
    pub mid_pattern: FloatParam,

    #[id = "xy_pattern"]
    pub xy_pattern: FloatParam,

    #[id = "xy_angle"]
    pub xy_angle: FloatParam,

    #[id = "blumlein_rotation"]
    pub blumlein_rotation: FloatParam,

    #[id = "output_gain"]
    pub output_gain: FloatParam,

    #[id = "comp_pseudo_ms"]
    pub comp_pseudo_ms: FloatParam,

    #[id = "comp_pseudo_stereo"]
    pub comp_pseudo_stereo: FloatParam,

    #[id = "comp_true_ms"]
    pub comp_true_ms: FloatParam,

    #[id = "comp_true_stereo"]
    pub comp_true_stereo: FloatParam,

    #[id = "comp_blumlein"]
    pub comp_blumlein: FloatParam,

    #[id = "channel_swap"]
    pub channel_swap: BoolParam,

    #[id = "auto_level"]
    pub auto_level: BoolParam,

    #[id = "ms_link"]
    pub ms_link: BoolParam,
}

fn format_db(v: f32) -> String {
    format!("{:.1} dB", v)
}

fn format_degrees(v: f32) -> String {
    format!("{:.1}°", v)
}

fn format_pattern(v: f32) -> String {
    format!("{:.2}", v)
}

fn gain_param(name: &'static str, min: f32, max: f32) -> FloatParam {
    FloatParam::new(name, 0.0, FloatRange::Linear { min, max })
        .with_value_to_string(Arc::new(format_db))
}

fn pattern_param(name: &'static str) -> FloatParam {
    FloatParam::new(
        name,
        0.5,
        FloatRange::Linear {
            min: 0.0,
            max: PATTERN_MAX,
        },
    )
    .with_value_to_string(Arc::new(format_pattern))
}

fn compensation_param(mode: StereoMode) -> FloatParam {
    let name = match mode {
        StereoMode::PseudoMs => "Compensation (Pseudo MS)",
        StereoMode::PseudoStereo => "Compensation (Pseudo Stereo)",
        StereoMode::TrueMs => "Compensation (True MS)",
        StereoMode::TrueStereo => "Compensation (True Stereo)",
        StereoMode::Blumlein => "Compensation (Blumlein)",
    };
    gain_param(name, -COMPENSATION_MAX_DB, COMPENSATION_MAX_DB)
}

impl StereoParams {
    /// The angle parameters report every change to their watch so the audio
    /// thread only recomputes trig gains when needed.
    pub fn new(xy_watch: Arc<AngleWatch>, blumlein_watch: Arc<AngleWatch>) -> Self {
        Self {
            layers: Arc::new(RwLock::new(LayerStore::default())),

            stereo_mode: EnumParam::new("Stereo Mode", StereoMode::PseudoMs),

            mid_gain: gain_param("Mid Gain", MS_GAIN_MIN_DB, MS_GAIN_MAX_DB),
            side_gain: gain_param("Side Gain", MS_GAIN_MIN_DB, MS_GAIN_MAX_DB),

            pseudo_pattern: pattern_param("Pseudo Stereo Pattern"),
            mid_pattern: pattern_param("Mid Pattern"),
            xy_pattern: pattern_param("XY Pattern"),

            xy_angle: FloatParam::new(
                "XY Angle",
                90.0,
                FloatRange::Linear {
                    min: 0.0,
                    max: XY_ANGLE_MAX,
                },
            )
            .with_value_to_string(Arc::new(format_degrees))
            .with_callback(Arc::new(move |v| xy_watch.notify(v))),

            blumlein_rotation: FloatParam::new(
                "Blumlein Rotation",
                0.0,
                FloatRange::Linear {
                    min: -BLUMLEIN_ROTATION_MAX,
                    max: BLUMLEIN_ROTATION_MAX,
                },
            )
            .with_value_to_string(Arc::new(format_degrees))
            .with_callback(Arc::new(move |v| blumlein_watch.notify(v))),

            output_gain: gain_param("Output Gain", OUTPUT_GAIN_MIN_DB, OUTPUT_GAIN_MAX_DB),

            comp_pseudo_ms: compensation_param(StereoMode::PseudoMs),
            comp_pseudo_stereo: compensation_param(StereoMode::PseudoStereo),
            comp_true_ms: compensation_param(StereoMode::TrueMs),
            comp_true_stereo: compensation_param(StereoMode::TrueStereo),
            comp_blumlein: compensation_param(StereoMode::Blumlein),

            channel_swap: BoolParam::new("Channel Swap", false),
            auto_level: BoolParam::new("Calculate Compensation", false),
            ms_link: BoolParam::new("Link M/S Gains", false),
        }
    }

    pub fn float_param(&self, id: FloatParamId) -> &FloatParam {
        match id {
            FloatParamId::MidGain => &self.mid_gain,
            FloatParamId::SideGain => &self.side_gain,
            FloatParamId::PseudoPattern => &self.pseudo_pattern,
            FloatParamId::MidPattern => &self.mid_pattern,
            FloatParamId::XyPattern => &self.xy_pattern,
            FloatParamId::XyAngle => &self.xy_angle,
            FloatParamId::BlumleinRotation => &self.blumlein_rotation,
            FloatParamId::OutputGain => &self.output_gain,
            FloatParamId::Compensation(mode) => self.compensation_param(mode),
        }
    }

    pub fn bool_param(&self, id: BoolParamId) -> &BoolParam {
        match id {
            BoolParamId::ChannelSwap => &self.channel_swap,
            BoolParamId::AutoLevel => &self.auto_level,
            BoolParamId::MsLink => &self.ms_link,
        }
    }

    pub fn compensation_param(&self, mode: StereoMode) -> &FloatParam {
        match mode {
            StereoMode::PseudoMs => &self.comp_pseudo_ms,
            StereoMode::PseudoStereo => &self.comp_pseudo_stereo,
            StereoMode::TrueMs => &self.comp_true_ms,
            StereoMode::TrueStereo => &self.comp_true_stereo,
            StereoMode::Blumlein => &self.comp_blumlein,
        }
    }

    /// Read every host value once. Cheap enough for every block.
    pub fn snapshot(&self) -> ParamSnapshot {
        let mut compensation_db = [0.0; StereoMode::COUNT];
        for mode in StereoMode::ALL {
            compensation_db[mode.ordinal()] = self.compensation_param(mode).value();
        }
        ParamSnapshot {
            stereo_mode: self.stereo_mode.value(),
            mid_gain_db: self.mid_gain.value(),
            side_gain_db: self.side_gain.value(),
            pseudo_pattern: self.pseudo_pattern.value(),
            mid_pattern: self.mid_pattern.value(),
            xy_pattern: self.xy_pattern.value(),
            xy_angle: self.xy_angle.value(),
            blumlein_rotation: self.blumlein_rotation.value(),
            output_gain_db: self.output_gain.value(),
            compensation_db,
            channel_swap: self.channel_swap.value(),
            auto_level: self.auto_level.value(),
            ms_link: self.ms_link.value(),
        }
    }
}

/// Host-notifying writes through nih_plug's `ParamSetter`. Editor thread only.
pub struct HostParamSink<'a> {
    params: &'a StereoParams,
    setter: &'a ParamSetter<'a>,
}

impl<'a> HostParamSink<'a> {
    pub fn new(params: &'a StereoParams, setter: &'a ParamSetter<'a>) -> Self {
        Self { params, setter }
    }
}

impl ParameterSink for HostParamSink<'_> {
    fn apply(&mut self, change: ParamChange) {
        match change {
            ParamChange::Float(id, value) => {
                let param = self.params.float_param(id);
                self.setter.begin_set_parameter(param);
                self.setter.set_parameter(param, value);
                self.setter.end_set_parameter(param);
            }
            ParamChange::Bool(id, value) => {
                let param = self.params.bool_param(id);
                self.setter.begin_set_parameter(param);
                self.setter.set_parameter(param, value);
                self.setter.end_set_parameter(param);
            }
            ParamChange::Mode(mode) => {
                let param = &self.params.stereo_mode;
                self.setter.begin_set_parameter(param);
                self.setter.set_parameter(param, mode);
                self.setter.end_set_parameter(param);
            }
        }
    }
}

// -----------------------------------------------------------------------------
// PLUGIN STRUCT
// -----------------------------------------------------------------------------
pub struct StereoCreator {
    params: Arc<StereoParams>,
    editor_state: Arc<ViziaState>,
    meters: Arc<Meters>,
    xy_watch: Arc<AngleWatch>,
    blumlein_watch: Arc<AngleWatch>,
    engine: StereoEngine,
    controller: Arc<Mutex<Controller>>,
    restores: Arc<RestoreEpoch>,
}

impl Default for StereoCreator {
    fn default() -> Self {
        let config = EngineConfig::load();
        let xy_watch = Arc::new(AngleWatch::new(90.0));
        let blumlein_watch = Arc::new(AngleWatch::new(0.0));
        let params = Arc::new(StereoParams::new(
            xy_watch.clone(),
            blumlein_watch.clone(),
        ));
        let meters = Arc::new(Meters::new());

        let (tx, rx) = change_queue(config.change_queue_capacity);
        let engine = StereoEngine::new(
            config,
            meters.clone(),
            xy_watch.clone(),
            blumlein_watch.clone(),
            tx,
        );
        let restores = Arc::new(RestoreEpoch::default());
        let controller = Arc::new(Mutex::new(Controller::new(
            rx,
            params.layers.clone(),
            meters.clone(),
            restores.clone(),
        )));

        Self {
            params,
            editor_state: ViziaState::new(|| (640, 420)),
            meters,
            xy_watch,
            blumlein_watch,
            engine,
            controller,
            restores,
        }
    }
}

impl Plugin for StereoCreator {
    const NAME: &'static str = "StereoCreator";
    const VENDOR: &'static str = "Andrzej Marczewski";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(4),
            main_output_channels: NonZeroU32::new(4),
            ..AudioIOLayout::const_default()
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn editor(&mut self, _async_executor: AsyncExecutor<Self>) -> Option<Box<dyn Editor>> {
        let params = self.params.clone();
        let meters = self.meters.clone();
        let controller = self.controller.clone();
        create_vizia_editor(
            self.editor_state.clone(),
            ViziaTheming::default(),
            move |cx, gui_context| {
                build_ui(
                    cx,
                    params.clone(),
                    meters.clone(),
                    controller.clone(),
                    gui_context,
                );
            },
        )
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        crate::debug::init();

        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let num_inputs = audio_io_layout
                .main_input_channels
                .map(|c| c.get() as usize)
                .unwrap_or(0);
            let sample_rate = if buffer_config.sample_rate > 0.0 {
                buffer_config.sample_rate
            } else {
                DEFAULT_SAMPLE_RATE
            };
            let max_block = match buffer_config.max_buffer_size as usize {
                0 => DEFAULT_MAX_BLOCK,
                n => n,
            };

            // Restored state may not have gone through the parameter
            // callbacks, so seed the trig caches from the current values.
            let snapshot = self.params.snapshot();
            self.xy_watch.notify(snapshot.xy_angle);
            self.blumlein_watch.notify(snapshot.blumlein_rotation);
            // nih_plug re-initializes after every state load.
            self.restores.bump();

            permit_alloc(|| {
                self.engine
                    .prepare(sample_rate, max_block, num_inputs, &snapshot)
            });
            log::info!(
                "initialized: {} inputs, {} Hz, max block {}",
                num_inputs,
                sample_rate,
                max_block
            );
        }))
        .is_ok()
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let snapshot = self.params.snapshot();
            self.engine.process(buffer.as_slice(), &snapshot);
            ProcessStatus::Normal
        }))
        .unwrap_or(ProcessStatus::Normal)
    }

    fn reset(&mut self) {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.engine.reset();
        }))
        .unwrap_or(());
    }
}

impl ClapPlugin for StereoCreator {
    const CLAP_ID: &'static str = "com.andrzej.stereocreator";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("Stereo imaging from dual-capsule microphone recordings");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Utility,
    ];
}

impl Vst3Plugin for StereoCreator {
    const VST3_CLASS_ID: [u8; 16] = *b"StereoCreatorAB1";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Fx,
        Vst3SubCategory::Spatial,
        Vst3SubCategory::Stereo,
    ];
}

nih_export_clap!(StereoCreator);
nih_export_vst3!(StereoCreator);

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> StereoParams {
        StereoParams::new(Arc::new(AngleWatch::new(90.0)), Arc::new(AngleWatch::new(0.0)))
    }

    #[test]
    fn test_defaults_match_snapshot_defaults() {
        assert_eq!(params().snapshot(), ParamSnapshot::default());
    }

    #[test]
    fn test_every_float_id_maps_to_a_distinct_param() {
        let p = params();
        let names: Vec<String> = FloatParamId::ALL
            .iter()
            .map(|&id| p.float_param(id).name().to_string())
            .collect();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_compensation_range() {
        let p = params();
        for mode in StereoMode::ALL {
            let param = p.compensation_param(mode);
            assert_eq!(param.preview_plain(0.0), -COMPENSATION_MAX_DB);
            assert_eq!(param.preview_plain(1.0), COMPENSATION_MAX_DB);
        }
    }
}

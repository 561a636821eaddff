//! Editor-thread control logic.
//!
//! Everything that writes host parameters lives here: forwarding deferred
//! writes from the audio thread, the mid/side pan-law link and A/B layer
//! switching. All of it runs from the editor's timer or button callbacks,
//! never from `process`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::changes::{ChangeReceiver, FloatParamId, ParamChange, ParameterSink};
use crate::dsp::pan_law::{linked_mid_gain_db, linked_side_gain_db};
use crate::layers::{Layer, LayerStore};
use crate::meters::Meters;
use crate::snapshot::ParamSnapshot;

/// Bumped by the plugin whenever the host hands it restored state. The
/// controller takes the next poll's values as the new baseline instead of
/// reading them as edits.
#[derive(Default)]
pub struct RestoreEpoch(AtomicU32);

impl RestoreEpoch {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::Release);
    }

    pub fn current(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }
}

/// Tracks the mid/side gains between polls so a link write is not mistaken
/// for a user edit on the next poll.
#[derive(Debug, Clone, Copy, Default)]
struct MsLink {
    last_mid: f32,
    last_side: f32,
    written: Option<(FloatParamId, f32)>,
    primed: bool,
}

impl MsLink {
    fn sync(&mut self, view: &ParamSnapshot) {
        self.last_mid = view.mid_gain_db;
        self.last_side = view.side_gain_db;
        self.written = None;
        self.primed = true;
    }

    /// Forget the baseline. The next `follow` only re-syncs.
    fn unprime(&mut self) {
        self.primed = false;
        self.written = None;
    }

    /// The write, if any, that keeps the pair on the pan law.
    fn follow(&mut self, view: &ParamSnapshot) -> Option<ParamChange> {
        if !view.ms_link || !self.primed {
            self.sync(view);
            return None;
        }

        let mid_moved = view.mid_gain_db.to_bits() != self.last_mid.to_bits();
        let side_moved = view.side_gain_db.to_bits() != self.last_side.to_bits();
        let ours = |id: FloatParamId, value: f32| {
            self.written
                .map(|(wid, wv)| wid == id && wv.to_bits() == value.to_bits())
                .unwrap_or(false)
        };

        let change = match (mid_moved, side_moved) {
            (false, true) if !ours(FloatParamId::SideGain, view.side_gain_db) => {
                let mid = linked_mid_gain_db(view.side_gain_db);
                (mid.to_bits() != view.mid_gain_db.to_bits())
                    .then_some(ParamChange::Float(FloatParamId::MidGain, mid))
            }
            (true, false) if !ours(FloatParamId::MidGain, view.mid_gain_db) => {
                let side = linked_side_gain_db(view.mid_gain_db);
                (side.to_bits() != view.side_gain_db.to_bits())
                    .then_some(ParamChange::Float(FloatParamId::SideGain, side))
            }
            _ => None,
        };

        self.sync(view);
        if let Some(ParamChange::Float(id, value)) = change {
            match id {
                FloatParamId::MidGain => self.last_mid = value,
                _ => self.last_side = value,
            }
            self.written = Some((id, value));
        }
        change
    }
}

pub struct Controller {
    changes: ChangeReceiver,
    layers: Arc<RwLock<LayerStore>>,
    meters: Arc<Meters>,
    restores: Arc<RestoreEpoch>,
    seen_restore: u32,
    ms_link: MsLink,
}

impl Controller {
    pub fn new(
        changes: ChangeReceiver,
        layers: Arc<RwLock<LayerStore>>,
        meters: Arc<Meters>,
        restores: Arc<RestoreEpoch>,
    ) -> Self {
        Self {
            changes,
            layers,
            meters,
            seen_restore: restores.current(),
            restores,
            ms_link: MsLink::default(),
        }
    }

    pub fn active_layer(&self) -> Layer {
        self.layers
            .read()
            .map(|store| store.active())
            .unwrap_or_default()
    }

    /// Periodic editor-thread work. `live` is the host parameter state at the
    /// time of the call.
    pub fn poll(&mut self, live: &ParamSnapshot, sink: &mut dyn ParameterSink) {
        let restore = self.restores.current();
        if restore != self.seen_restore {
            self.seen_restore = restore;
            self.ms_link.unprime();
        }

        let mut view = *live;
        let run = self.meters.calibration_run();
        while let Some(deferred) = self.changes.recv() {
            match deferred.resolve(&view, run) {
                Some(change) => {
                    sink.apply(change);
                    view.apply(change);
                }
                None => log::debug!("skipping stale {:?}", deferred),
            }
        }

        if let Some(change) = self.ms_link.follow(&view) {
            sink.apply(change);
            view.apply(change);
        }

        if let Ok(mut store) = self.layers.write() {
            store.capture_active(&view);
        }

        crate::debug::drain();
    }

    /// Make `target` the active layer and push its values to the host.
    /// `num_inputs` is the negotiated input channel count (0 if unknown).
    pub fn switch_layer(
        &mut self,
        target: Layer,
        live: &ParamSnapshot,
        num_inputs: usize,
        sink: &mut dyn ParameterSink,
    ) {
        let restored = match self.layers.write() {
            Ok(mut store) => store.switch_to(target, live),
            Err(_) => return,
        };
        let restored = restored.with_mode_corrected(num_inputs);

        for change in live.changes_to(&restored) {
            sink.apply(change);
        }
        self.ms_link.sync(&restored);
        log::debug!("switched to layer {}", target.name());
    }

    pub fn toggle_layer(
        &mut self,
        live: &ParamSnapshot,
        num_inputs: usize,
        sink: &mut dyn ParameterSink,
    ) {
        let target = self.active_layer().other();
        self.switch_layer(target, live, num_inputs, sink);
    }
}

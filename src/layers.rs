//! A/B comparison layers.
//!
//! Two full parameter snapshots, one of them active. The live host parameters
//! always belong to the active layer; switching saves them into the layer
//! being left and hands back the snapshot of the layer entered.

use crate::snapshot::ParamSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Layer {
    #[default]
    A,
    B,
}

impl Layer {
    pub fn other(self) -> Self {
        match self {
            Layer::A => Layer::B,
            Layer::B => Layer::A,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::A => "A",
            Layer::B => "B",
        }
    }
}

/// Persisted with the plugin state as a serde field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerStore {
    active: Layer,
    a: ParamSnapshot,
    b: ParamSnapshot,
}

impl LayerStore {
    pub fn active(&self) -> Layer {
        self.active
    }

    pub fn slot(&self, layer: Layer) -> &ParamSnapshot {
        match layer {
            Layer::A => &self.a,
            Layer::B => &self.b,
        }
    }

    fn slot_mut(&mut self, layer: Layer) -> &mut ParamSnapshot {
        match layer {
            Layer::A => &mut self.a,
            Layer::B => &mut self.b,
        }
    }

    /// Record the live values as the active layer's state.
    pub fn capture_active(&mut self, live: &ParamSnapshot) {
        *self.slot_mut(self.active) = *live;
    }

    /// Save `live` into the active slot, activate `target` and return what
    /// should become live. Switching to the active layer returns `live`.
    pub fn switch_to(&mut self, target: Layer, live: &ParamSnapshot) -> ParamSnapshot {
        self.capture_active(live);
        self.active = target;
        *self.slot(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::mixer::StereoMode;

    fn tweaked() -> ParamSnapshot {
        let mut s = ParamSnapshot::default();
        s.stereo_mode = StereoMode::PseudoStereo;
        s.pseudo_pattern = 0.2;
        s.output_gain_db = -3.0;
        s
    }

    #[test]
    fn test_both_layers_start_at_defaults() {
        let store = LayerStore::default();
        assert_eq!(store.active(), Layer::A);
        assert_eq!(*store.slot(Layer::A), ParamSnapshot::default());
        assert_eq!(*store.slot(Layer::B), ParamSnapshot::default());
    }

    #[test]
    fn test_switch_saves_and_restores() {
        let mut store = LayerStore::default();
        let edited_a = tweaked();

        let entered_b = store.switch_to(Layer::B, &edited_a);
        assert_eq!(entered_b, ParamSnapshot::default());
        assert_eq!(*store.slot(Layer::A), edited_a);

        let mut edited_b = entered_b;
        edited_b.channel_swap = true;
        let back_in_a = store.switch_to(Layer::A, &edited_b);
        assert_eq!(back_in_a, edited_a);
        assert_eq!(*store.slot(Layer::B), edited_b);
    }

    #[test]
    fn test_round_trip_without_edits_is_identity() {
        let mut store = LayerStore::default();
        let live = tweaked();
        let b = store.switch_to(Layer::B, &live);
        let a = store.switch_to(Layer::A, &b);
        assert_eq!(a, live);
    }

    #[test]
    fn test_switch_to_active_layer_keeps_live() {
        let mut store = LayerStore::default();
        let live = tweaked();
        assert_eq!(store.switch_to(Layer::A, &live), live);
        assert_eq!(store.active(), Layer::A);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut store = LayerStore::default();
        store.switch_to(Layer::B, &tweaked());
        let json = serde_json::to_string(&store).unwrap();
        let restored: LayerStore = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, store);
    }
}

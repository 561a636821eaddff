use crate::layers::Layer;
use crate::StereoParams;
use nih_plug_vizia::vizia::prelude::*;
use std::sync::Arc;

#[derive(Lens, Clone)]
pub struct EditorData {
    pub params: Arc<StereoParams>,
    pub active_layer: Layer,
    pub calibrating: bool,
}

impl Data for Layer {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

pub enum EditorEvent {
    /// Periodic refresh from the controller timer.
    Refresh { active_layer: Layer, calibrating: bool },
    LayerChanged(Layer),
}

impl Model for EditorData {
    fn event(&mut self, cx: &mut EventContext, event: &mut Event) {
        event.map(|editor_event, _| match editor_event {
            EditorEvent::Refresh {
                active_layer,
                calibrating,
            } => {
                self.active_layer = *active_layer;
                self.calibrating = *calibrating;
                cx.needs_redraw();
            }
            EditorEvent::LayerChanged(layer) => self.active_layer = *layer,
        });
    }
}

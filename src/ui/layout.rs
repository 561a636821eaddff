//! Editor layout
//!
//! - Header: title, A/B layer buttons, auto-level calibration
//! - Body: parameter rows and level meters
//!
//! The editor also owns the controller timer: every tick forwards deferred
//! audio-thread writes to the host, runs the mid/side link and keeps the
//! active layer snapshot current.

use crate::control::Controller;
use crate::layers::Layer;
use crate::meters::{Meters, MAX_INPUT_CHANNELS, OUTPUT_CHANNELS};
use crate::ui::components::{create_button, create_param_toggle, create_slider, create_toggle_button};
use crate::ui::meters::{LevelMeter, MeterSource};
use crate::ui::state::{EditorData, EditorEvent};
use crate::{HostParamSink, StereoParams};
use nih_plug::prelude::{GuiContext, ParamSetter};
use nih_plug_vizia::vizia::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const STYLE: &str = include_str!("../ui.css");
const POLL_INTERVAL_MS: u64 = 50;

fn poll_controller(
    params: &StereoParams,
    controller: &Mutex<Controller>,
    gui: &Arc<dyn GuiContext>,
) -> Option<Layer> {
    let setter = ParamSetter::new(gui.as_ref());
    let mut sink = HostParamSink::new(params, &setter);
    let live = params.snapshot();
    let mut ctl = controller.lock().ok()?;
    ctl.poll(&live, &mut sink);
    Some(ctl.active_layer())
}

fn switch_layer(
    params: &StereoParams,
    controller: &Mutex<Controller>,
    gui: &Arc<dyn GuiContext>,
    meters: &Meters,
    target: Layer,
) {
    let setter = ParamSetter::new(gui.as_ref());
    let mut sink = HostParamSink::new(params, &setter);
    let live = params.snapshot();
    if let Ok(mut ctl) = controller.lock() {
        ctl.switch_layer(target, &live, meters.input_channels(), &mut sink);
    }
}

fn toggle_calibration(params: &StereoParams, gui: &Arc<dyn GuiContext>) {
    let setter = ParamSetter::new(gui.as_ref());
    let armed = params.auto_level.value();
    setter.begin_set_parameter(&params.auto_level);
    setter.set_parameter(&params.auto_level, !armed);
    setter.end_set_parameter(&params.auto_level);
}

pub fn build_header<'a>(
    cx: &'a mut Context,
    params: Arc<StereoParams>,
    meters: Arc<Meters>,
    controller: Arc<Mutex<Controller>>,
    gui: Arc<dyn GuiContext>,
) -> Handle<'a, HStack> {
    HStack::new(cx, move |cx| {
        VStack::new(cx, |cx| {
            Label::new(cx, "StereoCreator").class("header-title");
            Label::new(cx, "Dual-capsule stereo imaging").class("header-sub");
        })
        .class("header-title-stack");

        Element::new(cx).class("fill-width");

        let params_l = params.clone();
        let meters_l = meters.clone();
        let controller_l = controller.clone();
        let gui_l = gui.clone();
        Binding::new(cx, EditorData::active_layer, move |cx, lens| {
            let active = lens.get(cx);
            let params_local = params_l.clone();
            let meters_local = meters_l.clone();
            let controller_local = controller_l.clone();
            let gui_local = gui_l.clone();

            HStack::new(cx, move |cx| {
                for layer in [Layer::A, Layer::B] {
                    let p = params_local.clone();
                    let m = meters_local.clone();
                    let c = controller_local.clone();
                    let g = gui_local.clone();
                    create_toggle_button(cx, layer.name(), active == layer, move |ex| {
                        switch_layer(&p, &c, &g, &m, layer);
                        ex.emit(EditorEvent::LayerChanged(layer));
                    });
                }
            })
            .class("layer-group");
        });

        let params_c = params.clone();
        let gui_c = gui.clone();
        create_button(cx, "Calibrate", "calibrate-button", move |_| {
            toggle_calibration(&params_c, &gui_c)
        });
        Label::new(
            cx,
            EditorData::calibrating.map(|on| if *on { "Measuring" } else { "" }),
        )
        .class("calibrate-status");
    })
    .class("header")
}

pub fn build_controls(cx: &mut Context) -> Handle<'_, VStack> {
    VStack::new(cx, |cx| {
        create_slider(cx, "Mode", |p| &p.stereo_mode);
        create_slider(cx, "Mid Gain", |p| &p.mid_gain);
        create_slider(cx, "Side Gain", |p| &p.side_gain);
        create_slider(cx, "Pseudo Pattern", |p| &p.pseudo_pattern);
        create_slider(cx, "Mid Pattern", |p| &p.mid_pattern);
        create_slider(cx, "XY Pattern", |p| &p.xy_pattern);
        create_slider(cx, "XY Angle", |p| &p.xy_angle);
        create_slider(cx, "Blumlein Rot.", |p| &p.blumlein_rotation);
        create_slider(cx, "Output", |p| &p.output_gain);

        HStack::new(cx, |cx| {
            create_param_toggle(cx, "Swap L/R", |p| &p.channel_swap);
            create_param_toggle(cx, "Link M/S", |p| &p.ms_link);
        })
        .class("toggle-row");
    })
    .class("controls")
}

pub fn build_compensation(cx: &mut Context) -> Handle<'_, VStack> {
    VStack::new(cx, |cx| {
        Label::new(cx, "Compensation").class("section-title");
        create_slider(cx, "Pseudo MS", |p| &p.comp_pseudo_ms);
        create_slider(cx, "Pseudo Stereo", |p| &p.comp_pseudo_stereo);
        create_slider(cx, "True MS", |p| &p.comp_true_ms);
        create_slider(cx, "True Stereo", |p| &p.comp_true_stereo);
        create_slider(cx, "Blumlein", |p| &p.comp_blumlein);
    })
    .class("compensation")
}

pub fn build_levels(cx: &mut Context, meters: Arc<Meters>) -> Handle<'_, HStack> {
    HStack::new(cx, move |cx| {
        for ch in 0..MAX_INPUT_CHANNELS {
            LevelMeter::new(cx, meters.clone(), MeterSource::Input(ch)).class("meter-in");
        }
        Element::new(cx).class("meter-gap");
        for ch in 0..OUTPUT_CHANNELS {
            LevelMeter::new(cx, meters.clone(), MeterSource::Output(ch)).class("meter-out");
        }
    })
    .class("levels")
}

pub fn build_ui(
    cx: &mut Context,
    params: Arc<StereoParams>,
    meters: Arc<Meters>,
    controller: Arc<Mutex<Controller>>,
    gui_context: Arc<dyn GuiContext>,
) {
    if let Err(e) = cx.add_stylesheet(STYLE) {
        log::warn!("editor stylesheet failed to load: {:?}", e);
    }

    {
        let params = params.clone();
        let meters = meters.clone();
        let controller = controller.clone();
        let gui = gui_context.clone();
        let timer = cx.add_timer(
            Duration::from_millis(POLL_INTERVAL_MS),
            None,
            move |cx, action| {
                if let TimerAction::Tick(_) = action {
                    if let Some(active_layer) = poll_controller(&params, &controller, &gui) {
                        cx.emit(EditorEvent::Refresh {
                            active_layer,
                            calibrating: meters.is_calibrating(),
                        });
                    }
                }
            },
        );
        cx.start_timer(timer);
    }

    let active_layer = controller
        .lock()
        .map(|ctl| ctl.active_layer())
        .unwrap_or_default();

    EditorData {
        params: params.clone(),
        active_layer,
        calibrating: meters.is_calibrating(),
    }
    .build(cx);

    VStack::new(cx, move |cx| {
        build_header(
            cx,
            params.clone(),
            meters.clone(),
            controller.clone(),
            gui_context.clone(),
        );

        HStack::new(cx, move |cx| {
            build_controls(cx);
            build_compensation(cx);
            build_levels(cx, meters.clone());
        })
        .class("body");
    })
    .class("app-root");
}

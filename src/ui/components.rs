//! Reusable editor builders. Styling lives in `ui.css`.

use crate::ui::state::EditorData;
use crate::StereoParams;
use nih_plug::params::Param;
use nih_plug::prelude::BoolParam;
use nih_plug_vizia::vizia::prelude::*;
use nih_plug_vizia::widgets::*;
use std::sync::Arc;

// BUTTON HELPERS
pub fn create_button<'a>(
    cx: &'a mut Context,
    label: &'static str,
    class: &'static str,
    callback: impl Fn(&mut EventContext) + 'static,
) -> Handle<'a, Button> {
    Button::new(cx, callback, |cx| Label::new(cx, label)).class(class)
}

pub fn create_toggle_button<'a>(
    cx: &'a mut Context,
    label: &'static str,
    is_active: bool,
    callback: impl Fn(&mut EventContext) + 'static,
) -> Handle<'a, Button> {
    Button::new(cx, callback, |cx| Label::new(cx, label)).class(if is_active {
        "layer-button-active"
    } else {
        "layer-button"
    })
}

// PARAMETER ROWS
pub fn create_slider<'a, P>(
    cx: &'a mut Context,
    label: &'static str,
    map: impl Fn(&Arc<StereoParams>) -> &P + Copy + 'static,
) -> Handle<'a, HStack>
where
    P: Param + 'static,
{
    HStack::new(cx, move |cx| {
        Label::new(cx, label).class("slider-label").text_wrap(false);
        ParamSlider::new(cx, EditorData::params, move |p| map(p)).class("param-slider");
    })
    .class("slider-row")
}

pub fn create_param_toggle<'a>(
    cx: &'a mut Context,
    label: &'static str,
    map: impl Fn(&Arc<StereoParams>) -> &BoolParam + Copy + 'static,
) -> Handle<'a, ParamButton> {
    ParamButton::new(cx, EditorData::params, move |p| map(p))
        .with_label(label)
        .class("param-toggle")
}

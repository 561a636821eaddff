//! RMS level meter widget. Values come from `crate::meters`.

use crate::dsp::utils::gain_to_db;
use crate::meters::Meters;
use nih_plug_vizia::vizia::prelude::*;
use nih_plug_vizia::vizia::vg;
use std::sync::Arc;

const METER_FLOOR_DB: f32 = -60.0;

#[derive(Clone, Copy)]
pub enum MeterSource {
    Input(usize),
    Output(usize),
}

pub struct LevelMeter {
    meters: Arc<Meters>,
    source: MeterSource,
}

impl LevelMeter {
    pub fn new(cx: &mut Context, meters: Arc<Meters>, source: MeterSource) -> Handle<'_, Self> {
        Self { meters, source }.build(cx, |_| {})
    }
}

impl View for LevelMeter {
    fn element(&self) -> Option<&'static str> {
        Some("level-meter")
    }

    fn draw(&self, cx: &mut DrawContext, canvas: &mut Canvas) {
        let b = cx.bounds();

        let rms = match self.source {
            MeterSource::Input(ch) => self.meters.get_input_rms(ch),
            MeterSource::Output(ch) => self.meters.get_output_rms(ch),
        };
        let norm = ((gain_to_db(rms) - METER_FLOOR_DB) / -METER_FLOOR_DB).clamp(0.0, 1.0);

        let mut bg = vg::Path::new();
        bg.rect(b.x, b.y, b.w, b.h);
        canvas.fill_path(&bg, &vg::Paint::color(vg::Color::rgb(15, 23, 42)));
        canvas.stroke_path(
            &bg,
            &vg::Paint::color(vg::Color::rgb(51, 65, 85)).with_line_width(1.0),
        );

        if norm > 0.001 {
            let fh = b.h * norm;
            let mut f = vg::Path::new();
            f.rect(b.x + 1.0, b.y + (b.h - fh), b.w - 2.0, fh);
            canvas.fill_path(&f, &vg::Paint::color(vg::Color::rgb(34, 197, 94)));
        }
    }
}

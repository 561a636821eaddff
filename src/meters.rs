//! Lock-free level metering shared between the audio thread and the editor.
//!
//! Values are f32 bit-cast into atomics so either side can read or write
//! without locking.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub const MAX_INPUT_CHANNELS: usize = 4;
pub const OUTPUT_CHANNELS: usize = 2;

/// Per-block RMS for inputs and outputs plus the negotiated stream shape.
#[derive(Default)]
pub struct Meters {
    input_rms: [AtomicU32; MAX_INPUT_CHANNELS],
    output_rms: [AtomicU32; OUTPUT_CHANNELS],
    input_channels: AtomicU32,
    calibrating: AtomicBool,
    calibration_run: AtomicU32,
}

impl Meters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_rms(&self, channel: usize, val: f32) {
        if let Some(slot) = self.input_rms.get(channel) {
            slot.store(val.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn set_output_rms(&self, channel: usize, val: f32) {
        if let Some(slot) = self.output_rms.get(channel) {
            slot.store(val.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn get_input_rms(&self, channel: usize) -> f32 {
        self.input_rms
            .get(channel)
            .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }

    pub fn get_output_rms(&self, channel: usize) -> f32 {
        self.output_rms
            .get(channel)
            .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }

    /// Zero the input slots not fed by the current layout.
    pub fn clear_inputs_from(&self, channel: usize) {
        for slot in self.input_rms.iter().skip(channel) {
            slot.store(0.0f32.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn set_input_channels(&self, count: usize) {
        self.input_channels.store(count as u32, Ordering::Relaxed);
    }

    /// Zero until the first `prepare`.
    pub fn input_channels(&self) -> usize {
        self.input_channels.load(Ordering::Relaxed) as usize
    }

    pub fn set_calibrating(&self, on: bool) {
        self.calibrating.store(on, Ordering::Relaxed);
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating.load(Ordering::Relaxed)
    }

    /// Latest auto-level measurement started by the engine.
    pub fn set_calibration_run(&self, run: u32) {
        self.calibration_run.store(run, Ordering::Release);
    }

    pub fn calibration_run(&self) -> u32 {
        self.calibration_run.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_channel_is_ignored() {
        let m = Meters::new();
        m.set_input_rms(7, 1.0);
        assert_eq!(m.get_input_rms(7), 0.0);
        m.set_output_rms(1, 0.25);
        assert_eq!(m.get_output_rms(1), 0.25);
    }

    #[test]
    fn test_clear_unused_inputs() {
        let m = Meters::new();
        for ch in 0..MAX_INPUT_CHANNELS {
            m.set_input_rms(ch, 0.5);
        }
        m.clear_inputs_from(2);
        assert_eq!(m.get_input_rms(1), 0.5);
        assert_eq!(m.get_input_rms(2), 0.0);
        assert_eq!(m.get_input_rms(3), 0.0);
    }
}

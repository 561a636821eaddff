//! Deferred host parameter writes.
//!
//! The audio thread cannot notify the host from `process`, so it pushes
//! [`DeferredChange`]s onto a fixed-size SPSC ring. The controller pops them on
//! the editor thread, checks each one against the live host values and hands
//! the survivors to a [`ParameterSink`] as [`ParamChange`]s.
//!
//! Nothing drains the ring while the editor is closed, so an entry can sit
//! there for a long time. Every entry carries the host value it was computed
//! from and is dropped if the host has moved on since.

use crate::dsp::mixer::StereoMode;
use crate::snapshot::ParamSnapshot;
use ringbuf::{Consumer, Producer, RingBuffer};

/// Continuous parameters addressable by a host write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatParamId {
    MidGain,
    SideGain,
    PseudoPattern,
    MidPattern,
    XyPattern,
    XyAngle,
    BlumleinRotation,
    OutputGain,
    Compensation(StereoMode),
}

impl FloatParamId {
    pub const ALL: [FloatParamId; 13] = [
        FloatParamId::MidGain,
        FloatParamId::SideGain,
        FloatParamId::PseudoPattern,
        FloatParamId::MidPattern,
        FloatParamId::XyPattern,
        FloatParamId::XyAngle,
        FloatParamId::BlumleinRotation,
        FloatParamId::OutputGain,
        FloatParamId::Compensation(StereoMode::PseudoMs),
        FloatParamId::Compensation(StereoMode::PseudoStereo),
        FloatParamId::Compensation(StereoMode::TrueMs),
        FloatParamId::Compensation(StereoMode::TrueStereo),
        FloatParamId::Compensation(StereoMode::Blumlein),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolParamId {
    ChannelSwap,
    AutoLevel,
    MsLink,
}

impl BoolParamId {
    pub const ALL: [BoolParamId; 3] = [
        BoolParamId::ChannelSwap,
        BoolParamId::AutoLevel,
        BoolParamId::MsLink,
    ];
}

/// One host-notifying parameter write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    Float(FloatParamId, f32),
    Bool(BoolParamId, bool),
    Mode(StereoMode),
}

/// Something that can write parameters and tell the host about it.
pub trait ParameterSink {
    fn apply(&mut self, change: ParamChange);
}

/// A write requested by the audio thread, guarded by the host value it was
/// computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredChange {
    /// `from` cannot run on the current input layout.
    Mode { from: StereoMode, to: StereoMode },
    /// Auto-level result for `mode`, measured while the parameter read `from`.
    Compensation {
        mode: StereoMode,
        from: f32,
        to: f32,
    },
    /// Drop the armed flag once measurement `run` has committed.
    Disarm { run: u32 },
}

impl DeferredChange {
    /// The host write this still stands for, or `None` if it went stale.
    /// `current_run` is the auto-level measurement the engine last started.
    pub fn resolve(self, view: &ParamSnapshot, current_run: u32) -> Option<ParamChange> {
        match self {
            DeferredChange::Mode { from, to } => {
                (view.stereo_mode == from && from != to).then_some(ParamChange::Mode(to))
            }
            DeferredChange::Compensation { mode, from, to } => {
                let now = view.compensation_for(mode);
                (now.to_bits() == from.to_bits())
                    .then_some(ParamChange::Float(FloatParamId::Compensation(mode), to))
            }
            DeferredChange::Disarm { run } => (view.auto_level && run == current_run)
                .then_some(ParamChange::Bool(BoolParamId::AutoLevel, false)),
        }
    }
}

/// Audio-thread end of the change queue.
pub struct ChangeSender {
    producer: Producer<DeferredChange>,
    dropped: u32,
}

impl ChangeSender {
    /// Never blocks or allocates. A full queue drops the change.
    pub fn send(&mut self, change: DeferredChange) -> bool {
        if self.producer.push(change).is_ok() {
            true
        } else {
            self.dropped = self.dropped.wrapping_add(1);
            false
        }
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Editor-thread end of the change queue.
pub struct ChangeReceiver {
    consumer: Consumer<DeferredChange>,
}

impl ChangeReceiver {
    pub fn recv(&mut self) -> Option<DeferredChange> {
        self.consumer.pop()
    }
}

pub fn change_queue(capacity: usize) -> (ChangeSender, ChangeReceiver) {
    let (producer, consumer) = RingBuffer::<DeferredChange>::new(capacity.max(1)).split();
    (
        ChangeSender {
            producer,
            dropped: 0,
        },
        ChangeReceiver { consumer },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let (mut tx, mut rx) = change_queue(8);
        let first = DeferredChange::Mode {
            from: StereoMode::PseudoMs,
            to: StereoMode::TrueMs,
        };
        tx.send(first);
        tx.send(DeferredChange::Disarm { run: 3 });

        assert_eq!(rx.recv(), Some(first));
        assert_eq!(rx.recv(), Some(DeferredChange::Disarm { run: 3 }));
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let (mut tx, mut rx) = change_queue(2);
        assert!(tx.send(DeferredChange::Disarm { run: 1 }));
        assert!(tx.send(DeferredChange::Disarm { run: 2 }));
        assert!(!tx.send(DeferredChange::Disarm { run: 3 }));
        assert_eq!(tx.dropped(), 1);

        assert_eq!(rx.recv(), Some(DeferredChange::Disarm { run: 1 }));
        assert!(tx.send(DeferredChange::Disarm { run: 4 }));
    }

    #[test]
    fn test_mode_correction_needs_the_mode_it_corrects() {
        let fix = DeferredChange::Mode {
            from: StereoMode::Blumlein,
            to: StereoMode::PseudoStereo,
        };
        let mut view = ParamSnapshot::default();
        assert_eq!(fix.resolve(&view, 0), None);

        view.stereo_mode = StereoMode::Blumlein;
        assert_eq!(
            fix.resolve(&view, 0),
            Some(ParamChange::Mode(StereoMode::PseudoStereo))
        );
    }

    #[test]
    fn test_compensation_yields_to_a_user_edit() {
        let commit = DeferredChange::Compensation {
            mode: StereoMode::TrueMs,
            from: 0.0,
            to: -4.5,
        };
        let mut view = ParamSnapshot::default();
        assert_eq!(
            commit.resolve(&view, 0),
            Some(ParamChange::Float(
                FloatParamId::Compensation(StereoMode::TrueMs),
                -4.5
            ))
        );

        view.compensation_db[StereoMode::TrueMs.ordinal()] = 2.0;
        assert_eq!(commit.resolve(&view, 0), None);
    }

    #[test]
    fn test_disarm_only_for_the_committed_run() {
        let disarm = DeferredChange::Disarm { run: 4 };
        let mut view = ParamSnapshot::default();
        // Already off: nothing to write.
        assert_eq!(disarm.resolve(&view, 4), None);

        view.auto_level = true;
        assert_eq!(
            disarm.resolve(&view, 4),
            Some(ParamChange::Bool(BoolParamId::AutoLevel, false))
        );
        // Re-armed since the commit.
        assert_eq!(disarm.resolve(&view, 5), None);
    }
}

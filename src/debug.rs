//! Feature-gated logging that is safe to call from the audio thread.
//!
//! `sc_log!` formats into a fixed-size entry and pushes it onto a lock-free
//! ring. The editor thread drains the ring into the `log` facade. Without the
//! `debug` feature the macro compiles to nothing.

use std::fmt;

#[cfg(feature = "debug")]
pub mod logger {
    use std::cell::UnsafeCell;
    use std::fmt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::OnceLock;

    const LOG_CAP: usize = 128;
    const LOG_MSG_MAX: usize = 256;

    #[derive(Copy, Clone)]
    struct LogEntry {
        len: u16,
        bytes: [u8; LOG_MSG_MAX],
    }

    impl Default for LogEntry {
        fn default() -> Self {
            Self {
                len: 0,
                bytes: [0; LOG_MSG_MAX],
            }
        }
    }

    /// Single producer (audio thread), single consumer (editor thread).
    struct LogRing {
        head: AtomicUsize,
        tail: AtomicUsize,
        buf: Box<[UnsafeCell<LogEntry>]>,
    }

    unsafe impl Sync for LogRing {}

    impl LogRing {
        fn new() -> Self {
            let buf: Vec<UnsafeCell<LogEntry>> = (0..LOG_CAP)
                .map(|_| UnsafeCell::new(LogEntry::default()))
                .collect();
            Self {
                head: AtomicUsize::new(0),
                tail: AtomicUsize::new(0),
                buf: buf.into_boxed_slice(),
            }
        }

        fn push(&self, entry: LogEntry) {
            let cap = self.buf.len();
            let head = self.head.load(Ordering::Relaxed);
            let next = (head + 1) % cap;
            if next == self.tail.load(Ordering::Acquire) {
                // Full: drop the message.
                return;
            }
            unsafe {
                *self.buf[head].get() = entry;
            }
            self.head.store(next, Ordering::Release);
        }

        fn pop(&self) -> Option<LogEntry> {
            let cap = self.buf.len();
            let tail = self.tail.load(Ordering::Relaxed);
            if tail == self.head.load(Ordering::Acquire) {
                return None;
            }
            let entry = unsafe { *self.buf[tail].get() };
            self.tail.store((tail + 1) % cap, Ordering::Release);
            Some(entry)
        }
    }

    static LOGGER: OnceLock<LogRing> = OnceLock::new();
    static LOG_ENABLED: AtomicBool = AtomicBool::new(false);

    /// Allocates the ring. Call from `initialize`, never from `process`.
    pub fn init_logger() {
        let _ = LOGGER.get_or_init(LogRing::new);
        LOG_ENABLED.store(true, Ordering::Relaxed);
    }

    struct FixedBuf {
        entry: LogEntry,
    }

    impl fmt::Write for FixedBuf {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let len = self.entry.len as usize;
            let avail = LOG_MSG_MAX - len;
            let n = s.len().min(avail);
            self.entry.bytes[len..len + n].copy_from_slice(&s.as_bytes()[..n]);
            self.entry.len = (len + n) as u16;
            Ok(())
        }
    }

    pub fn log_args(args: fmt::Arguments) {
        if !LOG_ENABLED.load(Ordering::Relaxed) {
            return;
        }
        let Some(logger) = LOGGER.get() else {
            return;
        };

        let mut buf = FixedBuf {
            entry: LogEntry::default(),
        };
        let _ = fmt::write(&mut buf, args);
        logger.push(buf.entry);
    }

    pub fn drain_to_log() {
        let Some(logger) = LOGGER.get() else {
            return;
        };
        while let Some(entry) = logger.pop() {
            let len = entry.len as usize;
            if len == 0 {
                continue;
            }
            // Truncation may have split a code point.
            let msg = String::from_utf8_lossy(&entry.bytes[..len]);
            log::info!("{}", msg);
        }
    }
}

#[cfg(feature = "debug")]
pub(crate) fn sc_log_inner(args: fmt::Arguments) {
    logger::log_args(args);
}

#[cfg(not(feature = "debug"))]
pub(crate) fn sc_log_inner(_args: fmt::Arguments) {}

#[cfg(feature = "debug")]
pub fn init() {
    logger::init_logger();
}

#[cfg(not(feature = "debug"))]
pub fn init() {}

/// Forward queued audio-thread messages to `log`. Editor thread only.
#[cfg(feature = "debug")]
pub fn drain() {
    logger::drain_to_log();
}

#[cfg(not(feature = "debug"))]
pub fn drain() {}

#[macro_export]
macro_rules! sc_log {
    ($($arg:tt)*) => {
        $crate::debug::sc_log_inner(format_args!($($arg)*))
    };
}

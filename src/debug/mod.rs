//! Debug output and logging

use core::fmt;

/// Debug writer (routes through the console transmit path)
pub struct DebugWriter;

impl fmt::Write for DebugWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            crate::components::console::put_char(byte);
        }
        Ok(())
    }
}

/// Print macro for kernel
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = write!($crate::debug::DebugWriter, $($arg)*);
    });
}

/// Print with newline macro for kernel
#[macro_export]
macro_rules! kprintln {
    () => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = writeln!($crate::debug::DebugWriter, $($arg)*);
    });
}

/// Error-level log line. Enabled by any `log-*` feature.
#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        #[cfg(any(
            feature = "log-error",
            feature = "log-warn",
            feature = "log-info",
            feature = "log-debug"
        ))]
        $crate::kprintln!("[ERROR] {}", format_args!($($arg)*));
    }};
}

/// Warning-level log line.
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        #[cfg(any(feature = "log-warn", feature = "log-info", feature = "log-debug"))]
        $crate::kprintln!("[WARN] {}", format_args!($($arg)*));
    }};
}

/// Info-level log line.
#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        #[cfg(any(feature = "log-info", feature = "log-debug"))]
        $crate::kprintln!("[INFO] {}", format_args!($($arg)*));
    }};
}

/// Debug-level log line (off by default).
#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "log-debug")]
        $crate::kprintln!("[DEBUG] {}", format_args!($($arg)*));
    }};
}

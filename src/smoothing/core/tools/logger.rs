use tklog::{LEVEL, LOG};

/// Console logging at `level`. Integrators that configure tklog themselves skip this.
pub fn init_logger(level: LEVEL) {
    LOG.set_console(true).set_level(level);
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        {
            use tklog::info;
            info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        {
            use tklog::error;
            error!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        {
            use tklog::warn;
            warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        {
            use tklog::debug;
            debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        {
            use tklog::trace;
            trace!($($arg)*);
        }
    };
}

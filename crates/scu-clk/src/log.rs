//! Logging shims.
//!
//! Firmware builds log through `defmt`, host builds through `tracing`; with
//! neither feature the macros compile to nothing (arguments are still
//! evaluated by reference so call sites do not trip unused-variable lints).
//!
//! Only `{}` placeholders with primitive or `&str` arguments are used, which
//! both backends accept.

macro_rules! log_event {
    ($level:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        defmt::$level!($fmt $(, $arg)*);
        #[cfg(all(feature = "tracing", not(feature = "defmt")))]
        tracing::$level!($fmt $(, $arg)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        {
            let _ = ($(&$arg,)*);
        }
    }};
}

macro_rules! trace {
    ($($t:tt)*) => { log_event!(trace, $($t)*) };
}

macro_rules! debug {
    ($($t:tt)*) => { log_event!(debug, $($t)*) };
}

macro_rules! warn {
    ($($t:tt)*) => { log_event!(warn, $($t)*) };
}

macro_rules! error {
    ($($t:tt)*) => { log_event!(error, $($t)*) };
}

//! Contract-violation assertions.
//!
//! Calling a stream operation in the wrong state leaves the client in an
//! inconsistent state it cannot recover from, so these abort the current
//! task instead of returning an error.

/// Logs a contract violation and panics.
macro_rules! hard_fail {
    ($($arg:tt)+) => {{
        let message = format!($($arg)+);
        tracing::error!(%message, "contract violation");
        panic!("{}", message)
    }};
}

/// Calls [`hard_fail!`] unless `cond` holds.
macro_rules! hard_assert {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            hard_fail!($($arg)+);
        }
    };
}

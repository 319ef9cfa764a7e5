use std::fmt::Display;

use log::error;

/// Log the error and carry on without the value.
pub trait LogFailure {
    type Output;
    fn log_failure(self, msg: &str) -> Option<Self::Output>;
    fn log_failure_fmt(self, f: impl FnOnce() -> String) -> Option<Self::Output>;
}

impl<T, E> LogFailure for Result<T, E>
where
    E: Display,
{
    type Output = T;
    fn log_failure(self, msg: &str) -> Option<Self::Output> {
        match self {
            Err(e) => {
                error!("{msg}: {e:#}");
                None
            }
            Ok(v) => Some(v),
        }
    }
    fn log_failure_fmt(self, f: impl FnOnce() -> String) -> Option<Self::Output> {
        match self {
            Err(e) => {
                let msg = f();
                error!("{msg}: {e:#}");
                None
            }
            Ok(v) => Some(v),
        }
    }
}

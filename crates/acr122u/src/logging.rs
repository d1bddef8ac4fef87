//! Injected log sink and reader flag formatting

use std::fmt;

use pcsc::State;
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;

use crate::config::{LogLevel, LogOutput};

/// Build the subscriber a context logs through
///
/// Returns `None` for [`LogOutput::Inherit`], in which case records go to
/// whatever subscriber is current on the calling thread.
pub(crate) fn dispatch(level: LogLevel, output: LogOutput) -> Option<Dispatch> {
    let builder = tracing_subscriber::fmt().with_max_level(LevelFilter::from(level));

    match output {
        LogOutput::Inherit => None,
        LogOutput::Console => Some(Dispatch::new(
            builder.with_writer(std::io::stderr).finish(),
        )),
        LogOutput::Json => Some(Dispatch::new(
            builder.json().with_writer(std::io::stderr).finish(),
        )),
        LogOutput::Writer(writer) => Some(Dispatch::new(
            builder.with_ansi(false).with_writer(writer).finish(),
        )),
    }
}

/// Run `f` with `dispatch` as the thread's default subscriber
pub(crate) fn in_scope<T>(dispatch: Option<&Dispatch>, f: impl FnOnce() -> T) -> T {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}

const FLAG_NAMES: [(State, &str); 11] = [
    (State::IGNORE, "Ignore"),
    (State::CHANGED, "Changed"),
    (State::UNKNOWN, "Unknown"),
    (State::UNAVAILABLE, "Unavailable"),
    (State::EMPTY, "Empty"),
    (State::PRESENT, "Present"),
    (State::ATRMATCH, "AtrMatch"),
    (State::EXCLUSIVE, "Exclusive"),
    (State::INUSE, "InUse"),
    (State::MUTE, "Mute"),
    (State::UNPOWERED, "Unpowered"),
];

/// Human readable rendering of reader state flags, e.g. `Present & Changed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFlags(pub State);

impl fmt::Display for StateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("Unaware");
        }

        let mut first = true;
        for (flag, name) in FLAG_NAMES {
            if self.0.contains(flag) {
                if !first {
                    f.write_str(" & ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

//! Translation of engine faults into [`ConfigError`].
//!
//! The parser, the emitter and file access report failures as [`Fault`]s.
//! A [`Translator`] wraps each load/save boundary call: it starts in
//! [`TranslatorState::Normal`], moves to [`TranslatorState::Faulted`] when the
//! wrapped operation returns a fault or panics, and always resolves to a
//! `Result`. Nothing escapes the boundary untranslated.

use std::{
    any::Any,
    fmt, io,
    panic::{self, AssertUnwindSafe},
};

use crate::error::ConfigError;

/// Failure raised inside the engine, before classification.
#[derive(Debug)]
pub(crate) enum Fault {
    /// Malformed input at a known location.
    Parse {
        file: String,
        line: usize,
        message: String,
    },
    Io(io::Error),
    /// Anything else; the message is kept verbatim.
    Engine(String),
}

impl From<io::Error> for Fault {
    fn from(err: io::Error) -> Self {
        Fault::Io(err)
    }
}

impl From<fmt::Error> for Fault {
    fn from(err: fmt::Error) -> Self {
        Fault::Engine(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TranslatorState {
    Normal,
    Faulted,
}

pub(crate) struct Translator {
    operation: &'static str,
    state: TranslatorState,
}

impl Translator {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            state: TranslatorState::Normal,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> TranslatorState {
        self.state
    }

    /// Runs `op`, classifying any fault or panic it produces.
    pub fn run<T>(&mut self, op: impl FnOnce() -> Result<T, Fault>) -> Result<T, ConfigError> {
        self.state = TranslatorState::Normal;
        let fault = match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(fault)) => fault,
            Err(payload) => Fault::Engine(panic_message(payload.as_ref())),
        };
        self.state = TranslatorState::Faulted;
        debug!("{} entered {:?} on {fault:?}", self.operation, self.state);
        let err = classify(fault);
        warn!("{} failed: {err}", self.operation);
        Err(err)
    }
}

fn classify(fault: Fault) -> ConfigError {
    match fault {
        Fault::Parse {
            file,
            line,
            message,
        } => ConfigError::ParseError {
            file,
            line,
            message,
        },
        Fault::Io(err) => ConfigError::IoError {
            message: err.to_string(),
        },
        Fault::Engine(message) => ConfigError::NativeError { message },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "engine panicked".to_string()
    }
}

//! Floating-point error handling modes
//!
//! Numeric kernels report IEEE events (division by zero, overflow, underflow,
//! invalid operations) through [`report`]. What happens next depends on the
//! mode currently installed for that event: nothing, a logged warning, or an
//! error returned to the node.
//!
//! Settings are held per thread. Nodes that need a different mode for one
//! computation install it with [`ErrStateGuard`], which puts the previous
//! settings back when dropped, including on early return and unwinding.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::FloatingPointError;

/// Reaction to a floating-point event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    Ignore,
    Warn,
    Raise,
}

impl ErrorMode {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorMode::Ignore => "ignore",
            ErrorMode::Warn => "warn",
            ErrorMode::Raise => "raise",
        }
    }

    /// Option list shown in node parameter widgets
    pub fn options() -> Vec<String> {
        vec!["ignore".into(), "warn".into(), "raise".into()]
    }
}

impl FromStr for ErrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(ErrorMode::Ignore),
            "warn" => Ok(ErrorMode::Warn),
            "raise" => Ok(ErrorMode::Raise),
            other => Err(format!("unknown error mode '{}'", other)),
        }
    }
}

/// Class of floating-point event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatEvent {
    DivideByZero,
    Overflow,
    Underflow,
    Invalid,
}

impl fmt::Display for FloatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FloatEvent::DivideByZero => "divide by zero",
            FloatEvent::Overflow => "overflow",
            FloatEvent::Underflow => "underflow",
            FloatEvent::Invalid => "invalid value",
        };
        f.write_str(name)
    }
}

/// One mode per event class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatErrorSettings {
    pub divide: ErrorMode,
    pub over: ErrorMode,
    pub under: ErrorMode,
    pub invalid: ErrorMode,
}

impl Default for FloatErrorSettings {
    fn default() -> Self {
        Self {
            divide: ErrorMode::Warn,
            over: ErrorMode::Warn,
            under: ErrorMode::Ignore,
            invalid: ErrorMode::Warn,
        }
    }
}

impl FloatErrorSettings {
    /// Same mode for every event
    pub fn all(mode: ErrorMode) -> Self {
        Self {
            divide: mode,
            over: mode,
            under: mode,
            invalid: mode,
        }
    }

    pub fn with_divide(mut self, mode: ErrorMode) -> Self {
        self.divide = mode;
        self
    }

    pub fn with_over(mut self, mode: ErrorMode) -> Self {
        self.over = mode;
        self
    }

    pub fn with_under(mut self, mode: ErrorMode) -> Self {
        self.under = mode;
        self
    }

    pub fn with_invalid(mut self, mode: ErrorMode) -> Self {
        self.invalid = mode;
        self
    }

    pub fn mode_for(&self, event: FloatEvent) -> ErrorMode {
        match event {
            FloatEvent::DivideByZero => self.divide,
            FloatEvent::Overflow => self.over,
            FloatEvent::Underflow => self.under,
            FloatEvent::Invalid => self.invalid,
        }
    }
}

thread_local! {
    static SETTINGS: Cell<FloatErrorSettings> = Cell::new(FloatErrorSettings::default());
}

/// Settings currently in effect on this thread
pub fn current() -> FloatErrorSettings {
    SETTINGS.with(|s| s.get())
}

/// Install new settings and return the ones they replace
pub fn replace(settings: FloatErrorSettings) -> FloatErrorSettings {
    SETTINGS.with(|s| s.replace(settings))
}

/// Scoped override of the floating-point settings.
///
/// Not `Send`: the settings it restores belong to the creating thread.
#[must_use = "settings are restored as soon as the guard is dropped"]
pub struct ErrStateGuard {
    previous: FloatErrorSettings,
    _not_send: PhantomData<*const ()>,
}

impl ErrStateGuard {
    pub fn new(settings: FloatErrorSettings) -> Self {
        Self {
            previous: replace(settings),
            _not_send: PhantomData,
        }
    }

    /// Override only the modes touched by `apply`, keeping the rest
    pub fn modify(apply: impl FnOnce(FloatErrorSettings) -> FloatErrorSettings) -> Self {
        Self::new(apply(current()))
    }

    /// Settings that will be restored on drop
    pub fn previous(&self) -> FloatErrorSettings {
        self.previous
    }
}

impl Drop for ErrStateGuard {
    fn drop(&mut self) {
        replace(self.previous);
    }
}

/// Run `f` with `settings` installed, restoring the old ones afterwards
pub fn with_settings<T>(settings: FloatErrorSettings, f: impl FnOnce() -> T) -> T {
    let _guard = ErrStateGuard::new(settings);
    f()
}

/// Apply the current mode for `event` occurring in `count` elements
pub fn report(event: FloatEvent, count: usize) -> Result<(), FloatingPointError> {
    if count == 0 {
        return Ok(());
    }
    match current().mode_for(event) {
        ErrorMode::Ignore => Ok(()),
        ErrorMode::Warn => {
            warn!("RuntimeWarning: {} encountered in {} element(s)", event, count);
            Ok(())
        }
        ErrorMode::Raise => Err(FloatingPointError { event, count }),
    }
}

/// Tally of events seen while evaluating a kernel
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventCounts {
    pub divide: usize,
    pub over: usize,
    pub under: usize,
    pub invalid: usize,
}

impl EventCounts {
    /// Classify one binary result against its operands.
    ///
    /// A NaN or infinite result from finite operands is an invalid value,
    /// an overflow, or (for division) a division by zero.
    pub fn observe_binary(&mut self, a: f64, b: f64, result: f64, division: bool) {
        if !(a.is_finite() && b.is_finite()) {
            return;
        }
        if result.is_nan() {
            self.invalid += 1;
        } else if result.is_infinite() {
            if division && b == 0.0 {
                self.divide += 1;
            } else {
                self.over += 1;
            }
        } else if result != 0.0 && result.abs() < f64::MIN_POSITIVE && a.abs() >= f64::MIN_POSITIVE {
            self.under += 1;
        }
    }

    /// Classify one unary result against its operand
    pub fn observe_unary(&mut self, x: f64, result: f64) {
        if !x.is_finite() {
            return;
        }
        if result.is_nan() {
            self.invalid += 1;
        } else if result.is_infinite() {
            self.over += 1;
        }
    }

    /// Report every non-zero tally in a fixed order, failing on the first raise
    pub fn report(&self) -> Result<(), FloatingPointError> {
        report(FloatEvent::DivideByZero, self.divide)?;
        report(FloatEvent::Overflow, self.over)?;
        report(FloatEvent::Underflow, self.under)?;
        report(FloatEvent::Invalid, self.invalid)
    }
}

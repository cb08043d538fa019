//! Typed expectations evaluated one at a time.
//!
//! Each check is dispatched explicitly by its [`Check`] variant and recorded
//! in the [`AssertionEngine`] whether it passes or not. A mismatch comes back
//! as [`HarnessError::AssertionFailed`]; the runner turns that into a failed
//! case without aborting the group.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use serde::Serialize;

use crate::err_msg;
use crate::errors::{ErrorType, HarnessError};
use crate::value::Value;

/// The kinds of expectation a test body can make.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Check {
    /// Actual equals the given value.
    Equal(Value),
    /// Actual is `null`.
    Null,
    /// Actual is anything but `undefined`.
    Defined,
    /// A procedure raised a failure.
    Throws,
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Check::Equal(expected) => write!(f, "to equal {}", expected),
            Check::Null => write!(f, "to be null"),
            Check::Defined => write!(f, "to be defined"),
            Check::Throws => write!(f, "to throw"),
        }
    }
}

/// One evaluated expectation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionRecord {
    pub check: Check,
    pub passed: bool,
}

/// Evaluates expectations and keeps a log of every outcome.
#[derive(Debug, Default)]
pub struct AssertionEngine {
    records: Vec<AssertionRecord>,
}

impl AssertionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates a value check. `Check::Throws` needs a procedure, so it is
    /// rejected here; use [`AssertionEngine::assert_throws`].
    pub fn evaluate(&mut self, check: Check, actual: &Value) -> Result<(), HarnessError> {
        let verdict = match &check {
            Check::Equal(expected) if actual == expected => Ok(()),
            Check::Equal(expected) => Err(HarnessError::mismatch(
                format!("expected {} {}", actual, check),
                expected,
                actual,
            )),
            Check::Null if actual.is_null() => Ok(()),
            Check::Null => Err(HarnessError::mismatch(
                format!("expected {} {}", actual, check),
                Value::Null,
                actual,
            )),
            Check::Defined if actual.is_defined() => Ok(()),
            Check::Defined => Err(err_msg!(AssertionFailed, "expected {} {}", actual, check)),
            Check::Throws => {
                return Err(err_msg!(
                    Internal,
                    "throw checks take a procedure, not a value"
                ))
            }
        };
        self.record(check, verdict.is_ok());
        verdict
    }

    pub fn assert_equal(&mut self, actual: &Value, expected: &Value) -> Result<(), HarnessError> {
        self.evaluate(Check::Equal(expected.clone()), actual)
    }

    pub fn assert_null(&mut self, actual: &Value) -> Result<(), HarnessError> {
        self.evaluate(Check::Null, actual)
    }

    pub fn assert_defined(&mut self, actual: &Value) -> Result<(), HarnessError> {
        self.evaluate(Check::Defined, actual)
    }

    /// Passes if `procedure` returns `Err` or panics, and reports which kind
    /// of failure was raised. Fails with "no failure raised" otherwise.
    pub fn assert_throws<T, F>(&mut self, procedure: F) -> Result<ErrorType, HarnessError>
    where
        F: FnOnce() -> Result<T, HarnessError>,
    {
        let raised = match catch_quietly(procedure) {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => Some(err.error_type()),
            Err(_) => Some(ErrorType::UnhandledFailure),
        };
        self.record(Check::Throws, raised.is_some());
        raised.ok_or_else(|| err_msg!(AssertionFailed, "expected procedure to throw, but no failure raised"))
    }

    pub fn records(&self) -> &[AssertionRecord] {
        &self.records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn failures(&self) -> usize {
        self.records.iter().filter(|r| !r.passed).count()
    }

    fn record(&mut self, check: Check, passed: bool) {
        self.records.push(AssertionRecord { check, passed });
    }
}

thread_local! {
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Runs `f`, turning a panic into `Err` without the default hook printing it.
///
/// The hook is wrapped once per process and only stays silent on the thread
/// currently inside this call; other threads keep the previous behavior.
pub(crate) fn catch_quietly<R, F>(f: F) -> std::thread::Result<R>
where
    F: FnOnce() -> R,
{
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !QUIET_PANICS.with(Cell::get) {
                previous(info);
            }
        }));
    });
    let outer = QUIET_PANICS.with(|q| q.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    QUIET_PANICS.with(|q| q.set(outer));
    result
}

pub(crate) fn panics_are_quiet() -> bool {
    QUIET_PANICS.with(Cell::get)
}

/// Best-effort text for a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "test body panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_records_both_outcomes() {
        let mut engine = AssertionEngine::new();
        assert!(engine.assert_equal(&Value::Number(1.0), &Value::Number(1.0)).is_ok());
        let err = engine
            .assert_equal(&Value::Number(1.0), &Value::Number(2.0))
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::AssertionFailed);
        assert_eq!(engine.count(), 2);
        assert_eq!(engine.failures(), 1);
    }

    #[test]
    fn null_check_distinguishes_undefined() {
        let mut engine = AssertionEngine::new();
        assert!(engine.assert_null(&Value::Null).is_ok());
        let err = engine.assert_null(&Value::Undefined).unwrap_err();
        assert!(err.to_string().contains("to be null"), "{}", err);
    }

    #[test]
    fn defined_check() {
        let mut engine = AssertionEngine::new();
        assert!(engine.assert_defined(&Value::Null).is_ok());
        assert!(engine.assert_defined(&Value::Undefined).is_err());
    }

    #[test]
    fn throws_reports_raised_kind() {
        let mut engine = AssertionEngine::new();
        let kind = engine
            .assert_throws(|| -> Result<(), HarnessError> { Err(err_msg!(InvalidArgument, "bad")) })
            .unwrap();
        assert_eq!(kind, ErrorType::InvalidArgument);
    }

    #[test]
    fn throws_treats_panic_as_failure_signal() {
        let mut engine = AssertionEngine::new();
        let kind = engine
            .assert_throws(|| -> Result<(), HarnessError> { panic!("boom") })
            .unwrap();
        assert_eq!(kind, ErrorType::UnhandledFailure);
    }

    #[test]
    fn throws_fails_when_nothing_raised() {
        let mut engine = AssertionEngine::new();
        let err = engine.assert_throws(|| Ok::<_, HarnessError>(42)).unwrap_err();
        assert!(err.to_string().contains("no failure raised"));
        assert_eq!(engine.records()[0], AssertionRecord { check: Check::Throws, passed: false });
    }

    #[test]
    fn throw_check_is_not_a_value_check() {
        let mut engine = AssertionEngine::new();
        let err = engine.evaluate(Check::Throws, &Value::Null).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Internal);
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn quiet_catch_is_scoped_to_the_call() {
        assert!(!panics_are_quiet());
        let inside = catch_quietly(panics_are_quiet).unwrap();
        assert!(inside);
        let caught = catch_quietly::<(), _>(|| panic!("silenced"));
        assert!(caught.is_err());
        assert!(!panics_are_quiet());
    }

    #[test]
    fn panic_message_extracts_strings() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(payload.as_ref()), "test body panicked");
    }
}

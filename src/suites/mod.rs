//! Built-in conformance groups shipped with the harness.

use crate::errors::HarnessError;
use crate::runner::TestGroup;

pub mod weak_ref;

/// Every built-in group, in the order the CLI runs them.
pub fn builtin() -> Result<Vec<TestGroup>, HarnessError> {
    Ok(vec![weak_ref::group()?])
}

//! Groups of named cases, executed strictly in registration order.
//!
//! ```rust
//! use weakspec::runner::{describe, SpecRunner};
//!
//! let group = describe("WeakRef", |g| {
//!     g.it("clear drops the target", |ctx| {
//!         let obj = ctx.allocate();
//!         let weak = ctx.weak_ref(&obj.value())?;
//!         weak.clear();
//!         ctx.expect_null(&weak.get())
//!     })?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let report = SpecRunner::new().run(group);
//! assert!(!report.has_failures());
//! ```

use log::{debug, info};
use serde::Serialize;

use crate::assertions::{catch_quietly, panic_message, AssertionEngine};
use crate::err_msg;
use crate::errors::{ErrorType, HarnessError};
use crate::heap::{CollectionStats, Strong};
use crate::realm::Realm;
use crate::value::Value;
use crate::weak::WeakHandle;

// ============================================================================
// TEST CONTEXT
// ============================================================================

/// Everything a case body can touch: the shared realm and its own assertion log.
pub struct TestContext {
    realm: Realm,
    assertions: AssertionEngine,
}

impl TestContext {
    pub fn new(realm: Realm) -> Self {
        Self {
            realm,
            assertions: AssertionEngine::new(),
        }
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn allocate(&self) -> Strong {
        self.realm.heap().allocate()
    }

    pub fn weak_ref(&self, target: &Value) -> Result<WeakHandle, HarnessError> {
        WeakHandle::create(self.realm.heap(), Some(target))
    }

    pub fn gc(&self) -> CollectionStats {
        self.realm.gc()
    }

    pub fn expect_equal(&mut self, actual: &Value, expected: &Value) -> Result<(), HarnessError> {
        self.assertions.assert_equal(actual, expected)
    }

    pub fn expect_null(&mut self, actual: &Value) -> Result<(), HarnessError> {
        self.assertions.assert_null(actual)
    }

    pub fn expect_defined(&mut self, actual: &Value) -> Result<(), HarnessError> {
        self.assertions.assert_defined(actual)
    }

    pub fn expect_throws<T, F>(&mut self, procedure: F) -> Result<ErrorType, HarnessError>
    where
        F: FnOnce() -> Result<T, HarnessError>,
    {
        self.assertions.assert_throws(procedure)
    }

    pub fn assertions(&self) -> &AssertionEngine {
        &self.assertions
    }
}

// ============================================================================
// REGISTRATION
// ============================================================================

pub type TestBody = Box<dyn FnOnce(&mut TestContext) -> Result<(), HarnessError>>;

/// A named, one-shot test body.
pub struct TestCase {
    pub name: String,
    body: TestBody,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// An ordered, named sequence of cases. Insertion order is execution order.
#[derive(Debug)]
pub struct TestGroup {
    pub name: String,
    cases: Vec<TestCase>,
}

impl TestGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Registers a case. Names must be unique within the group.
    pub fn it<F>(&mut self, name: &str, body: F) -> Result<&mut Self, HarnessError>
    where
        F: FnOnce(&mut TestContext) -> Result<(), HarnessError> + 'static,
    {
        if self.cases.iter().any(|c| c.name == name) {
            return Err(err_msg!(
                InvalidArgument,
                "duplicate test case '{}' in group '{}'",
                name,
                self.name
            ));
        }
        self.cases.push(TestCase {
            name: name.to_string(),
            body: Box::new(body),
        });
        Ok(self)
    }

    pub fn case_names(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Builds a group by handing it to `build`.
pub fn describe<F>(name: &str, build: F) -> Result<TestGroup, HarnessError>
where
    F: FnOnce(&mut TestGroup) -> Result<(), HarnessError>,
{
    let mut group = TestGroup::new(name);
    build(&mut group)?;
    Ok(group)
}

// ============================================================================
// RESULTS
// ============================================================================

/// Lifecycle of a single case. `Passed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaseState {
    Pending,
    Running,
    Passed,
    Failed,
}

impl CaseState {
    /// Moves to `next` if the lifecycle allows it.
    pub fn transition(self, next: CaseState) -> Result<CaseState, HarnessError> {
        match (self, next) {
            (CaseState::Pending, CaseState::Running)
            | (CaseState::Running, CaseState::Passed)
            | (CaseState::Running, CaseState::Failed) => Ok(next),
            _ => Err(err_msg!(
                Internal,
                "illegal case transition {:?} -> {:?}",
                self,
                next
            )),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CaseState::Passed | CaseState::Failed)
    }
}

/// Outcome of one executed case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<ErrorType>,
    pub assertions: usize,
}

/// Results of one group, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub group: String,
    pub results: Vec<CaseResult>,
}

impl GroupReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

// ============================================================================
// RUNNER
// ============================================================================

/// Runs groups case by case against one shared realm.
#[derive(Debug, Default)]
pub struct SpecRunner {
    realm: Realm,
}

impl SpecRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_realm(realm: Realm) -> Self {
        Self { realm }
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn run(&self, group: TestGroup) -> GroupReport {
        info!("running group '{}' ({} cases)", group.name, group.len());
        let results = group
            .cases
            .into_iter()
            .map(|case| self.run_case(case))
            .collect();
        GroupReport {
            group: group.name,
            results,
        }
    }

    pub fn run_all(&self, groups: Vec<TestGroup>) -> Vec<GroupReport> {
        groups.into_iter().map(|g| self.run(g)).collect()
    }

    fn run_case(&self, case: TestCase) -> CaseResult {
        let TestCase { name, body } = case;
        let mut ctx = TestContext::new(self.realm.clone());

        let outcome = CaseState::Pending
            .transition(CaseState::Running)
            .and_then(|state| {
                debug!("case '{}': {:?}", name, state);
                let verdict = match catch_quietly(|| body(&mut ctx)) {
                    Ok(result) => result,
                    Err(payload) => Err(err_msg!(
                        UnhandledFailure,
                        "{}",
                        panic_message(payload.as_ref())
                    )),
                };
                let next = if verdict.is_ok() {
                    CaseState::Passed
                } else {
                    CaseState::Failed
                };
                state.transition(next)?;
                verdict
            });

        let assertions = ctx.assertions().count();
        match outcome {
            Ok(()) => {
                debug!("case '{}': Passed", name);
                CaseResult {
                    case_name: name,
                    passed: true,
                    failure_reason: None,
                    failure_kind: None,
                    assertions,
                }
            }
            Err(err) => {
                debug!("case '{}': Failed ({})", name, err);
                CaseResult {
                    case_name: name,
                    passed: false,
                    failure_reason: Some(err.to_string()),
                    failure_kind: Some(err.error_type()),
                    assertions,
                }
            }
        }
    }
}

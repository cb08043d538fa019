//! `WeakRef` conformance: construction validation, null after collection,
//! explicit clearing.

use crate::errors::{ErrorType, HarnessError};
use crate::realm::WEAK_REF;
use crate::runner::{describe, TestGroup};
use crate::value::Value;

pub fn group() -> Result<TestGroup, HarnessError> {
    describe(WEAK_REF, |g| {
        g.it("should exist", |ctx| {
            let ctor = ctx.realm().global(WEAK_REF);
            ctx.expect_defined(&ctor)
        })?;

        g.it("get should work", |ctx| {
            let obj = ctx.allocate();
            let weak = ctx.realm().construct_weak_ref(&[obj.value()])?;

            drop(obj);
            ctx.gc();

            ctx.expect_equal(&weak.get(), &Value::Null)
        })?;

        g.it("deref should work", |ctx| {
            let obj = ctx.allocate();
            let weak = ctx.realm().construct_weak_ref(&[obj.value()])?;

            drop(obj);
            ctx.gc();

            ctx.expect_equal(&weak.deref(), &Value::Null)
        })?;

        g.it("should throw when constructed with zero parameters", |ctx| {
            let realm = ctx.realm().clone();
            expect_invalid_argument(ctx.expect_throws(|| realm.construct_weak_ref(&[]))?)
        })?;

        g.it("should throw when constructed with primitive parameters", |ctx| {
            let realm = ctx.realm().clone();
            for primitive in [Value::Null, Value::Undefined, Value::Number(0.0)] {
                let kind = ctx.expect_throws(|| realm.construct_weak_ref(&[primitive]))?;
                expect_invalid_argument(kind)?;
            }
            Ok(())
        })?;

        g.it("should be clearable", |ctx| {
            let obj = ctx.allocate();
            let weak = ctx.realm().construct_weak_ref(&[obj.value()])?;

            weak.clear();

            ctx.expect_null(&weak.get())
        })?;

        Ok(())
    })
}

fn expect_invalid_argument(kind: ErrorType) -> Result<(), HarnessError> {
    if kind == ErrorType::InvalidArgument {
        return Ok(());
    }
    Err(HarnessError::mismatch(
        "constructor raised the wrong kind of failure",
        ErrorType::InvalidArgument,
        kind,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::SpecRunner;

    #[test]
    fn all_cases_pass_in_declaration_order() {
        let report = SpecRunner::new().run(group().unwrap());
        assert_eq!(report.group, "WeakRef");
        assert_eq!(report.total(), 6);
        for result in &report.results {
            assert!(result.passed, "{}: {:?}", result.case_name, result.failure_reason);
        }
        assert_eq!(report.results[0].case_name, "should exist");
        assert_eq!(report.results[5].case_name, "should be clearable");
        assert_eq!(report.results[4].assertions, 3);
    }
}

//! Test assertions for execution records.

use crate::errors::ExecutionError;
use crate::execution::ExecutionRecord;

/// Asserts that the run finished without failure or skip.
pub fn assert_record_succeeded(record: &ExecutionRecord) {
    assert!(
        record.is_finished() && !record.failed() && !record.skipped(),
        "Expected a successful run, got failed={} skipped={} error={:?}",
        record.failed(),
        record.skipped(),
        record.error()
    );
}

/// Asserts that the run failed.
pub fn assert_record_failed(record: &ExecutionRecord) {
    assert!(
        record.failed(),
        "Expected a failed run, got error={:?}",
        record.error()
    );
}

/// Asserts that the run was skipped.
pub fn assert_record_skipped(record: &ExecutionRecord) {
    assert!(
        record.skipped() && !record.failed(),
        "Expected a skipped run, got failed={} error={:?}",
        record.failed(),
        record.error()
    );
}

/// Asserts that the run's reported error displays as `expected`.
pub fn assert_run_error(result: &Result<(), ExecutionError>, expected: &str) {
    match result {
        Err(err) => assert_eq!(
            err.to_string(),
            expected,
            "Expected run error '{}', got '{}'",
            expected,
            err
        ),
        Ok(()) => panic!("Expected run error '{expected}', got success"),
    }
}

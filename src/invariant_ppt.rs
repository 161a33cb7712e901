//! Invariant ledger: records which graph-generation invariants were checked,
//! so contract tests can confirm the checks actually ran.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::{Mutex, PoisonError};

/// Grouping covered every unlinked input exactly once.
pub const UNLINKED_PARTITION: u32 = 1;
/// The inserter produced exactly one origin per group.
pub const ONE_ORIGIN_PER_GROUP: u32 = 2;
/// Origins came back in unlinked-input order.
pub const ORIGIN_ORDER_PRESERVED: u32 = 3;
/// The frozen graph has a topological order covering every node.
pub const GRAPH_ACYCLIC: u32 = 4;
/// Every input of the frozen graph has exactly one origin.
pub const SINGLE_ORIGIN_PER_INPUT: u32 = 5;
/// A malformed tree was rejected with an error.
pub const BUILD_REJECTS_INVALID: u32 = 6;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = match context {
            Some(ctx) => format!("Invariant {id} failed: {message} (context: {ctx})"),
            None => format!("Invariant {id} failed: {message}"),
        };
        panic!("{full_message}");
    }
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id);
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub fn assert_invariant(_id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        panic!("Invariant failed: {message}");
    }
}

#[cfg(feature = "ppt")]
/// Panics unless every invariant in `required_invariants` has been asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let missing: Vec<u32> = {
        let log = INVARIANT_LOG.lock().unwrap_or_else(PoisonError::into_inner);
        required_invariants
            .iter()
            .copied()
            .filter(|inv| !log.contains(inv))
            .collect()
    };
    if !missing.is_empty() {
        panic!("Contract test '{test_name}' failed: invariants not enforced: {missing:?}");
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when the `ppt` feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Forget every recorded invariant.
pub fn clear_invariant_log() {
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when the `ppt` feature is disabled.
pub fn clear_invariant_log() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_invariant_is_recorded() {
        assert_invariant(GRAPH_ACYCLIC, true, "recorded", Some("unit"));
        contract_test("recorded", &[GRAPH_ACYCLIC]);
    }

    #[test]
    #[should_panic(expected = "Invariant")]
    fn failing_invariant_panics() {
        assert_invariant(UNLINKED_PARTITION, false, "Partition broken", None);
    }

    #[cfg(feature = "ppt")]
    #[test]
    #[should_panic(expected = "not enforced")]
    fn contract_reports_missing() {
        contract_test("missing", &[u32::MAX]);
    }
}

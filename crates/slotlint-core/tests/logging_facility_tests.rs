#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::LayoutBuilder;
use slotlint_core::errors::{ExError, ExErrorKind, LayoutError};
use slotlint_core::logging_facility::test_capture::init_test_capture;
use slotlint_core::slotlint_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use slotlint_core::slotlint_core_types::ComparisonContext;
use slotlint_core::{log_op_end, log_op_error, log_op_start};
use slotlint_core::{ComparatorOptions, StorageLayoutComparator};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let start_events = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    assert_eq!(start_events, 1, "Should have captured one start event");
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42u64);

    let events = capture.events();
    let end_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .expect("Should have an end event");
    assert_eq!(end_event.field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = LayoutError::InvariantViolation {
        type_label: "uint256[?]".to_string(),
        reason: "array type without length".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10u64);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have an error event");
    assert_eq!(error_event.field("err.code"), Some("ERR_INVARIANT_VIOLATION"));
    assert_eq!(error_event.level, tracing::Level::ERROR);
}

#[test]
fn test_log_macros_with_multiple_fields() {
    let capture = init_test_capture();
    let op_name = "test_log_macros_fields_unique_4";

    log_op_start!(op_name, subject = "Vault", original_len = 3usize);

    let events = capture.events();
    let start_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name))
        .expect("Should have start event");
    assert_eq!(start_event.field("subject"), Some("Vault"));
    assert_eq!(start_event.field("original_len"), Some("3"));
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_assert_event_exists_fails_for_unknown_op() {
    let capture = init_test_capture();
    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}

#[test]
fn test_error_conversion_matches_logged_code() {
    let capture = init_test_capture();
    let op_name = "test_error_conversion_unique_5";

    let err = LayoutError::MalformedTypeId {
        type_id: "t_mapping(".to_string(),
        reason: "unbalanced parentheses".to_string(),
    };
    log_op_error!(op_name, err.clone(), duration_ms = 1u64);

    let ex_err: ExError = err.into();
    assert_eq!(ex_err.kind(), ExErrorKind::MalformedTypeId);

    let events = capture.events_for(op_name, None);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("err.code"), Some(ex_err.code()));
}

#[test]
fn test_comparison_session_has_one_start_and_one_end() {
    let capture = init_test_capture();
    let context = ComparisonContext::new().with_subject("Vault");
    let session_id = context.session_id.as_str().to_string();

    let original = LayoutBuilder::new("Vault").var("a", "t_uint256", 0, 0).build();
    let updated = LayoutBuilder::new("Vault")
        .var("a", "t_uint256", 0, 0)
        .var("b", "t_bool", 1, 0)
        .build();

    let mut comparator =
        StorageLayoutComparator::new(ComparatorOptions::default()).with_context(context);
    comparator.compare_layouts(&original, &updated).unwrap();

    let events = capture.events_for("compare_layouts", Some(&session_id));
    let starts = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .count();
    let ends: Vec<_> = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .collect();

    assert_eq!(starts, 1);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].field("unsafe_ops"), Some("0"));
    assert!(events
        .iter()
        .all(|e| e.event.as_deref() != Some(EVENT_END_ERROR)));
}

#[test]
fn test_sessions_are_logged_independently() {
    let capture = init_test_capture();
    let layout = LayoutBuilder::new("V").var("a", "t_uint256", 0, 0).build();

    let first = ComparisonContext::new();
    let second = ComparisonContext::new();
    let first_id = first.session_id.as_str().to_string();
    let second_id = second.session_id.as_str().to_string();
    assert_ne!(first_id, second_id);

    StorageLayoutComparator::default()
        .with_context(first)
        .compare_layouts(&layout, &layout)
        .unwrap();
    StorageLayoutComparator::default()
        .with_context(second)
        .compare_layouts(&layout, &layout)
        .unwrap();

    assert_eq!(capture.events_for("compare_layouts", Some(&first_id)).len(), 2);
    assert_eq!(capture.events_for("compare_layouts", Some(&second_id)).len(), 2);
}

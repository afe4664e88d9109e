// Unit tests for transcript reconciliation
//
// Finals are append-only commits; partials are wholesale redrafts of the
// uncommitted tail; stale partials covering committed audio are discarded.

use scriven::TranscriptState;

#[test]
fn test_finals_concatenate_in_order_space_separated() {
    let mut state = TranscriptState::new();

    state.apply_final("Patient presents", 1000);
    state.apply_final("with acute knee pain.", 2000);
    state.apply_final("Prescribed rest.", 3000);

    assert_eq!(
        state.final_text(),
        "Patient presents with acute knee pain. Prescribed rest."
    );
}

#[test]
fn test_partials_never_mutate_final_text() {
    let mut state = TranscriptState::new();

    state.apply_final("Hello there.", 1000);
    state.apply_partial("and then", 1500);
    state.apply_partial("and then some", 1800);

    assert_eq!(state.final_text(), "Hello there.");
    assert_eq!(state.partial_text(), "and then some");
}

#[test]
fn test_each_partial_replaces_the_previous() {
    let mut state = TranscriptState::new();

    state.apply_partial("hel", 300);
    state.apply_partial("hello", 600);

    // Never appended to each other
    assert_eq!(state.partial_text(), "hello");
    assert_eq!(state.combined_text(), "hello");
}

#[test]
fn test_final_clears_partial() {
    let mut state = TranscriptState::new();

    state.apply_partial("hello the", 900);
    state.apply_final("Hello there.", 1200);

    assert_eq!(state.partial_text(), "");
    assert_eq!(state.combined_text(), "Hello there.");
}

#[test]
fn test_combined_is_final_plus_separator_plus_partial() {
    let mut state = TranscriptState::new();

    assert_eq!(state.combined_text(), "");

    state.apply_partial("hi", 300);
    assert_eq!(state.combined_text(), "hi");

    state.apply_final("Hi.", 500);
    assert_eq!(state.combined_text(), "Hi.");

    state.apply_partial("how are", 900);
    assert_eq!(state.combined_text(), "Hi. how are");
}

#[test]
fn test_partial_final_partial_scenario() {
    let mut state = TranscriptState::new();

    state.apply_partial("hel", 300);
    state.apply_partial("hello", 600);
    state.apply_partial("hello the", 900);
    state.apply_final("Hello there.", 1200);
    state.apply_partial("how", 1600);

    assert_eq!(state.combined_text(), "Hello there. how");
    assert_eq!(state.final_text(), "Hello there.");
}

#[test]
fn test_stale_partial_after_final_is_discarded() {
    let mut state = TranscriptState::new();

    state.apply_partial("hello the", 900);
    state.apply_final("Hello there.", 1200);

    // Out-of-order delivery: this partial covers audio already committed
    assert!(!state.apply_partial("hello ther", 1100));
    assert_eq!(state.partial_text(), "");
    assert_eq!(state.combined_text(), "Hello there.");

    // A partial past the boundary is accepted
    assert!(state.apply_partial("how", 1600));
    assert_eq!(state.combined_text(), "Hello there. how");
}

#[test]
fn test_no_double_space_when_final_ends_with_whitespace() {
    let mut state = TranscriptState::new();

    state.apply_final("Hello there. ", 1000);
    state.apply_final("General Kenobi.", 2000);

    assert_eq!(state.final_text(), "Hello there. General Kenobi.");

    state.apply_partial("you are", 2500);
    assert_eq!(state.combined_text(), "Hello there. General Kenobi. you are");
}

#[test]
fn test_empty_final_still_clears_partial() {
    let mut state = TranscriptState::new();

    state.apply_partial("uh", 400);
    state.apply_final("", 600);

    assert_eq!(state.final_text(), "");
    assert_eq!(state.partial_text(), "");
}

#[test]
fn test_snapshot_matches_accessors() {
    let mut state = TranscriptState::new();
    state.apply_final("One.", 500);
    state.apply_partial("two", 800);

    let snapshot = state.snapshot();
    assert_eq!(snapshot.final_text, "One.");
    assert_eq!(snapshot.partial_text, "two");
    assert_eq!(snapshot.combined_text, "One. two");
}

// Unit tests for the recording state machine
//
// The transition table is authoritative: unlisted transitions are rejected
// without changing state, and observers see every accepted transition in
// order.

use scriven::{RecordingState, StateMachine};
use std::sync::{Arc, Mutex};

use RecordingState::*;

#[test]
fn test_happy_path_is_legal() {
    let mut machine = StateMachine::new();
    assert_eq!(machine.current(), Idle);

    machine.transition(Listening).unwrap();
    machine.transition(Recognizing).unwrap();
    machine.transition(Processing).unwrap();
    machine.transition(Done).unwrap();

    assert_eq!(machine.current(), Done);
    assert!(machine.ended_at().is_some());
}

#[test]
fn test_double_start_is_rejected_without_state_change() {
    let mut machine = StateMachine::new();
    machine.transition(Listening).unwrap();

    let err = machine.transition(Listening).unwrap_err();
    assert_eq!(err.from, Listening);
    assert_eq!(err.to, Listening);
    assert_eq!(machine.current(), Listening);
}

#[test]
fn test_error_edges() {
    let mut machine = StateMachine::new();
    machine.transition(Listening).unwrap();
    machine.transition(Error).unwrap();
    assert_eq!(machine.current(), Error);

    let mut machine = StateMachine::new();
    machine.transition(Listening).unwrap();
    machine.transition(Recognizing).unwrap();
    machine.transition(Error).unwrap();

    let mut machine = StateMachine::new();
    machine.transition(Listening).unwrap();
    machine.transition(Processing).unwrap();
    machine.transition(Error).unwrap();
}

#[test]
fn test_stop_before_first_fragment_is_legal() {
    let mut machine = StateMachine::new();
    machine.transition(Listening).unwrap();
    machine.transition(Processing).unwrap();
    machine.transition(Done).unwrap();
}

#[test]
fn test_unlisted_transitions_are_rejected() {
    let mut machine = StateMachine::new();
    assert!(machine.transition(Recognizing).is_err());
    assert!(machine.transition(Processing).is_err());
    assert!(machine.transition(Done).is_err());
    assert!(machine.transition(Error).is_err());
    assert_eq!(machine.current(), Idle);

    let mut machine = StateMachine::new();
    machine.transition(Listening).unwrap();
    machine.transition(Recognizing).unwrap();
    machine.transition(Processing).unwrap();
    machine.transition(Done).unwrap();

    // Terminal states only leave via reset
    assert!(machine.transition(Listening).is_err());
    assert!(machine.transition(Processing).is_err());
    assert_eq!(machine.current(), Done);
}

#[test]
fn test_reset_returns_to_idle_from_any_state() {
    for target in [Listening, Recognizing, Processing] {
        let mut machine = StateMachine::new();
        machine.transition(Listening).unwrap();
        if target != Listening {
            machine.transition(Recognizing).unwrap();
        }
        if target == Processing {
            machine.transition(Processing).unwrap();
        }
        machine.reset();
        assert_eq!(machine.current(), Idle);
        assert!(machine.ended_at().is_none());
    }
}

#[test]
fn test_observers_see_every_transition_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut machine = StateMachine::new();

    let log = Arc::clone(&seen);
    machine.observe(move |from, to| {
        log.lock().unwrap().push((from, to));
    });

    machine.transition(Listening).unwrap();
    machine.transition(Recognizing).unwrap();
    // Rejected: must not be reported
    let _ = machine.transition(Listening);
    machine.transition(Processing).unwrap();
    machine.transition(Done).unwrap();

    let transitions = seen.lock().unwrap().clone();
    assert_eq!(
        transitions,
        vec![
            (Idle, Listening),
            (Listening, Recognizing),
            (Recognizing, Processing),
            (Processing, Done),
        ]
    );
}

#[test]
fn test_ended_at_is_latched_once() {
    let mut machine = StateMachine::new();
    machine.transition(Listening).unwrap();
    machine.transition(Error).unwrap();

    let first = machine.ended_at().unwrap();
    // A rejected transition out of a terminal state must not touch it
    let _ = machine.transition(Done);
    assert_eq!(machine.ended_at().unwrap(), first);
}

use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;

#[test]
fn test_transfer_error_carries_code_and_message() {
    // Couldn't resolve host
    let err = NetError::transfer(6);
    assert_eq!(err.code(), Some(6));
    assert!(err.is_transfer());
    assert!(err.to_string().starts_with("Transfer error 6: "));
}

#[test]
fn test_scheduler_error_carries_code_and_message() {
    let err = NetError::scheduler(2);
    assert_eq!(err.code(), Some(2));
    assert!(err.is_scheduler());
    assert!(!err.is_transfer());
}

#[test]
fn test_validation_errors_have_no_code() {
    assert_eq!(NetError::InteriorNul.code(), None);
    assert_eq!(NetError::ReservedOption(10_001).code(), None);
    assert_eq!(
        NetError::ReservedOption(10_001).to_string(),
        "Option 10001 is managed by the handle"
    );
}

#[test]
fn test_load_state_default() {
    let state = LoadState::default();
    assert_eq!(state, LoadState::Created);
    assert!(!state.has_transferred());
    assert!(LoadState::Failed.has_transferred());
}

//! Global subscriber installation, isolated in its own test binary

use detector_lib::observability::init_tracing;

#[test]
fn test_init_tracing_only_once() {
    // Whichever call wins, a second install must fail
    let _ = init_tracing(false);
    assert!(init_tracing(true).is_err());
}

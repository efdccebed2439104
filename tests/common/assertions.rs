//! Custom assertion macros
//!
//! Shorter failure output for the patterns the suites repeat.

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a string contains a substring
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        assert!(
            $haystack.contains($needle),
            "Expected '{}' to contain '{}'",
            $haystack,
            $needle
        );
    };
}

/// Assert that a broadcast receiver has nothing queued
#[macro_export]
macro_rules! assert_no_event {
    ($receiver:expr) => {
        match $receiver.try_recv() {
            Err(_) => {}
            Ok(event) => panic!("Expected no event, got {:?}", event),
        }
    };
}

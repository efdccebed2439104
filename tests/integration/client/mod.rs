//! Client session tests

mod session_test;

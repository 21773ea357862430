//! Test module organization.
//!
//! This module organizes all integration tests for the orchestration core.



/// Exit event dispatcher and handler tests.
mod dispatcher_tests;




/// Statistics sampling and derived metric tests.
mod stats_tests;

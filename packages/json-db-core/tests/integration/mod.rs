//! Integration test suite.
//!
//! 1. End-to-end scenarios through the database handle
//! 2. Persistence across close and reopen

pub mod end_to_end_tests;
pub mod helpers;
pub mod persistence_tests;

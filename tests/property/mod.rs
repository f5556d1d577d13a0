//! Property-based tests for output naming and seed assignment

mod seed_assignment;

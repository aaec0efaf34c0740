//! Integration test crate for LKFlow.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every lkflow library crate to verify they work together.

#[cfg(test)]
mod flow;

#[cfg(test)]
mod pipeline;

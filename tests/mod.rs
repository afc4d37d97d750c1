//! Test suite for Roomline
//!
//! This module organizes all tests

pub mod common;
pub mod integration;

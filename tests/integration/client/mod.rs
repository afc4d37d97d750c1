//! Client library tests

mod refresh_test;

//! Test suite for Chathub
//!
//! This module organizes all tests

pub mod common;

//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the remote comment API and run
//! real scans against a temporary SQLite database.

mod common;
mod scan_tests;
mod source_tests;

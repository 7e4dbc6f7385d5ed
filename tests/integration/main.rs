//! Integration tests for scrape-guard

mod batch_tests;
mod config_tests;
mod fetch_tests;
mod support;

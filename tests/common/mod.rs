#![allow(dead_code)]

pub use ldapwatch_test_utils::fixtures;
pub use ldapwatch_test_utils::{init_tracing, with_timeout};

use std::time::Duration;

/// Poll `cond` every few milliseconds until it holds.
pub async fn eventually<F: Fn() -> bool>(cond: F) {
    while !cond() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod plugins;

use brickpipe::pipe::Pipe;
use std::future::Future;
use std::time::Duration;
use tokio::task::LocalSet;

/// Upper bound for any single wait in a test
pub fn test_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Run a pipe scenario on a local task set.
pub async fn run_local<F: Future>(future: F) -> F::Output {
    LocalSet::new().run_until(future).await
}

/// Wait for the pipe to settle, failing the test instead of hanging.
pub async fn settle(pipe: &Pipe) {
    tokio::time::timeout(test_timeout(), pipe.wait_until_idle())
        .await
        .expect("pipe did not settle in time")
        .expect("pipe settled with an error");
}

/// Let spawned local tasks run up to their next suspension point.
pub async fn yield_to_tasks() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

/// Every bucket rendered as text.
pub fn bucket_texts(pipe: &Pipe) -> Vec<String> {
    pipe.buckets().iter().map(|c| c.to_string()).collect()
}

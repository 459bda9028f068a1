use crate::client::get_json;
use crate::{Error, Result};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::debug;

/// Run every future with at most `max_concurrent` in flight at once.
///
/// Output order matches input order; a failing item never aborts the rest.
pub async fn run_bounded<T, Fut>(tasks: Vec<Fut>, max_concurrent: usize) -> Vec<T>
where
    Fut: Future<Output = T>,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    join_all(tasks.into_iter().map(|task| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            // The semaphore is never closed, so acquire only fails on shutdown races
            let _permit = semaphore.acquire_owned().await.ok();
            task.await
        }
    }))
    .await
}

/// Issue many independent GETs concurrently and collect one result per request.
///
/// Each request gets its own `per_request_timeout`; failures are captured as
/// per-item errors.
pub async fn fetch_all(
    requests: Vec<reqwest::RequestBuilder>,
    max_concurrent: usize,
    per_request_timeout: Duration,
) -> Vec<Result<serde_json::Value>> {
    debug!(
        "Fetching {} requests with concurrency {}",
        requests.len(),
        max_concurrent
    );

    let tasks = requests.into_iter().map(|request| async move {
        match timeout(
            per_request_timeout,
            get_json(request, "batch", per_request_timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                timeout: per_request_timeout,
            }),
        }
    });

    run_bounded(tasks.collect(), max_concurrent).await
}

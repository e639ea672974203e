//! Deadline race for remote calls
//!
//! The call is spawned onto the runtime and the caller waits on its join
//! handle. When the deadline wins, the handle is dropped: the call keeps
//! running detached and whatever it eventually produces is discarded.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::warn;

use crate::error::{GenGuardError, Result};

/// Race `call` against an optional deadline
///
/// With `None` the call is awaited until it resolves. A call that resolves
/// before the deadline passes its own result (success or failure) through
/// unchanged; otherwise the result is [`GenGuardError::Timeout`].
pub async fn race<F, T>(call: F, deadline: Option<Duration>) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(call);

    let Some(limit) = deadline else {
        return flatten(handle.await);
    };

    match tokio::time::timeout(limit, handle).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            warn!(deadline_ms = limit.as_millis() as u64, "Remote call exceeded deadline, abandoning it");
            Err(GenGuardError::timeout_after(limit))
        }
    }
}

fn flatten<T>(joined: std::result::Result<Result<T>, JoinError>) -> Result<T> {
    joined
        .map_err(|e| GenGuardError::internal(format!("Remote call task failed: {}", e)))
        .and_then(|result| result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fast_call_wins() {
        let result = race(async { Ok::<_, GenGuardError>("done") }, Some(Duration::from_secs(1))).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_before_deadline_passes_through() {
        let result: Result<()> = race(
            async { Err(GenGuardError::rate_limit("busy")) },
            Some(Duration::from_secs(1)),
        )
        .await;

        assert!(matches!(result, Err(GenGuardError::RateLimit(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out_and_keeps_running() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let result = race(
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            },
            Some(Duration::from_secs(1)),
        )
        .await;

        assert!(matches!(result, Err(GenGuardError::Timeout(_))));
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(finished.load(Ordering::SeqCst), "abandoned call should still complete");
    }

    #[test]
    fn test_no_deadline_waits_for_completion() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let result = runtime.block_on(race(
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, GenGuardError>(7)
            },
            None,
        ));

        assert_eq!(result.unwrap(), 7);
    }
}

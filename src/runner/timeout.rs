use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{QueryError, Result};

/// Runs `fut` under an optional deadline. On expiry the future is dropped,
/// which cancels the in-flight query at the handle, and `Timeout` is returned.
pub async fn with_deadline<T, F>(budget: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match budget {
        Some(budget) => match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Query exceeded its {:?} budget and was cancelled", budget);
                Err(QueryError::Timeout(budget))
            }
        },
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_expires() {
        let result: Result<()> = with_deadline(Some(Duration::from_millis(20)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(QueryError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_no_budget_passes_through() {
        let result = with_deadline(None, async { Ok(7) }).await.unwrap();
        assert_eq!(result, 7);
    }
}

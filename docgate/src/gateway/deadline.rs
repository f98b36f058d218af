use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use std::future::Future;
use std::time::Duration;

/// Runs `future` to completion or until `deadline` elapses, whichever comes
/// first.
///
/// On expiry the future is dropped, which cancels the in-flight store call,
/// and a `Timeout` error naming `operation` and the deadline is returned. The
/// deadline is never renewed and the call is never retried.
pub async fn with_deadline<F, T>(
    operation: &'static str,
    deadline: Duration,
    future: F,
) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => {
            log::error!("{} did not complete within {:?}", operation, deadline);
            Err(GatewayError::new(
                &format!("{} did not complete within {:?}", operation, deadline),
                ErrorKind::Timeout,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_result_in_time() {
        let value = with_deadline("find_one", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn passes_through_error_in_time() {
        let err = with_deadline::<_, ()>("insert_one", Duration::from_secs(1), async {
            Err(GatewayError::new("dup", ErrorKind::DuplicateKey))
        })
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), &ErrorKind::DuplicateKey);
    }

    #[tokio::test]
    async fn expires_slow_future() {
        let err = with_deadline("delete_many", Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1u64)
        })
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), &ErrorKind::Timeout);
        assert!(err.is_timeout());
        assert!(err.message().contains("delete_many"));
    }
}

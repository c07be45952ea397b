use crate::error::EthereumClientError;
use std::future::Future;
use std::time::Duration;

/// Runs `f` up to `max_retries + 1` times, sleeping `base_delay * 2^attempt` between attempts
/// (capped to prevent overly long delays). Non-recoverable errors short-circuit immediately;
/// after the final attempt the original error is surfaced.
pub(crate) async fn retry<F, Fut, T>(
    mut f: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, EthereumClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EthereumClientError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(res) => return Ok(res),
            Err(err) if !err.is_recoverable() => return Err(err),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err);
                }
                let delay = base_delay * 2_u32.pow(attempt.min(6));
                attempt += 1;
                tracing::info!("The endpoint has returned an error: {err}, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

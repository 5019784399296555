use crate::domain::image::errors::PipelineError;
use std::{future::Future, time::Duration};
use tokio::time::timeout;
use tracing::warn;

/// Awaits `fut`, failing with [`PipelineError::Timeout`] once `deadline` elapses.
pub async fn with_deadline<T, E, F>(
    deadline: Duration,
    operation: &str,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<PipelineError>,
{
    match timeout(deadline, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            warn!(operation, ?deadline, "Operation timed out");
            Err(PipelineError::Timeout {
                operation: operation.to_string(),
            })
        }
    }
}

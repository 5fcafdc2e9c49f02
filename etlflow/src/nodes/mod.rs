//! Node executors, one per pipeline stage.
//!
//! Each executor reads the pipeline state, performs its single
//! responsibility - invoking a tool adapter or the oracle - and merges the
//! result back. Executors never decide transitions; they report success or
//! a [`NodeError`] and the orchestrator routes from there.

mod analyze;
mod extract;
mod load;
mod plan;
mod transform;
mod validate;
mod verify;

pub use analyze::AnalyzeNode;
pub use extract::ExtractNode;
pub use load::LoadNode;
pub use plan::PlanNode;
pub use transform::TransformNode;
pub use validate::ValidateNode;
pub use verify::VerifyNode;

use crate::errors::NodeError;
use std::future::Future;
use std::time::Duration;

/// Bounds an adapter call with a timeout.
///
/// A timeout is indistinguishable from any other adapter failure for the
/// calling node: `on_timeout` folds it into that node's error category.
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    fut: F,
    on_timeout: impl FnOnce(Duration) -> NodeError,
) -> Result<T, NodeError>
where
    F: Future<Output = Result<T, NodeError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result: Result<(), NodeError> = bounded(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
            |d| NodeError::Load(format!("timed out after {:.1}s", d.as_secs_f64())),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.category(), "LoadError");
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_bounded_passes_results_through() {
        let ok: Result<u32, NodeError> = bounded(
            Duration::from_secs(1),
            async { Ok(7) },
            |_| NodeError::Load("timeout".into()),
        )
        .await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<u32, NodeError> = bounded(
            Duration::from_secs(1),
            async { Err(NodeError::Oracle("down".into())) },
            |_| NodeError::Load("timeout".into()),
        )
        .await;
        assert_eq!(err.unwrap_err().category(), "OracleError");
    }
}

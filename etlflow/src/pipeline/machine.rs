//! The pipeline state machine: nodes and their transition edges.

use crate::core::Stage;

/// A node of the pipeline state machine.
///
/// The happy path is a straight line from `Extract` to `Success`. Failures
/// in post-plan nodes carry recovery context and route through
/// `ErrorHandler`; failures before a plan exists are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// Pull the dataset from the source.
    Extract,
    /// Profile the dataset and interpret its schema.
    Analyze,
    /// Obtain the transformation plan.
    Plan,
    /// Apply the plan to the dataset.
    Transform,
    /// Synthesize and evaluate validation rules.
    Validate,
    /// Hand the dataset to the sink.
    Load,
    /// Confirm post-load invariants.
    Verify,
    /// Oracle-guided recovery, bounded by the retry budget.
    ErrorHandler,
    /// Terminal: the run completed.
    Success,
    /// Terminal: the run did not complete.
    Failed,
}

impl Node {
    /// The next node on the happy path.
    ///
    /// `ErrorHandler` resolves its successor itself (back to `Transform` or
    /// to `Failed`), and terminal nodes have no successor.
    #[must_use]
    pub fn on_success(self) -> Self {
        match self {
            Self::Extract => Self::Analyze,
            Self::Analyze => Self::Plan,
            Self::Plan => Self::Transform,
            Self::Transform => Self::Validate,
            Self::Validate => Self::Load,
            Self::Load => Self::Verify,
            Self::Verify => Self::Success,
            Self::ErrorHandler | Self::Success | Self::Failed => self,
        }
    }

    /// Whether a failure in this node carries recovery context.
    ///
    /// Extraction, analysis, and planning failures happen before any
    /// destructive operation; there is nothing to recover, so they are
    /// fatal.
    #[must_use]
    pub fn recovers_failures(self) -> bool {
        matches!(
            self,
            Self::Transform | Self::Validate | Self::Load | Self::Verify
        )
    }

    /// Whether the node is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// The log stage this node reports under.
    #[must_use]
    pub fn stage(self) -> Stage {
        match self {
            Self::Extract => Stage::Extract,
            Self::Analyze => Stage::Analyze,
            Self::Plan => Stage::Plan,
            Self::Transform => Stage::Transform,
            Self::Validate => Stage::Validate,
            Self::Load => Stage::Load,
            Self::Verify | Self::Success | Self::Failed => Stage::Verify,
            Self::ErrorHandler => Stage::Recovery,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Extract => "extract",
            Self::Analyze => "analyze",
            Self::Plan => "plan",
            Self::Transform => "transform",
            Self::Validate => "validate",
            Self::Load => "load",
            Self::Verify => "verify",
            Self::ErrorHandler => "error_handler",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_walks_to_success() {
        let mut node = Node::Extract;
        let mut visited = vec![node];
        while !node.is_terminal() {
            node = node.on_success();
            visited.push(node);
        }

        assert_eq!(
            visited,
            vec![
                Node::Extract,
                Node::Analyze,
                Node::Plan,
                Node::Transform,
                Node::Validate,
                Node::Load,
                Node::Verify,
                Node::Success,
            ]
        );
    }

    #[test]
    fn test_recovery_classification() {
        assert!(!Node::Extract.recovers_failures());
        assert!(!Node::Analyze.recovers_failures());
        assert!(!Node::Plan.recovers_failures());
        assert!(Node::Transform.recovers_failures());
        assert!(Node::Validate.recovers_failures());
        assert!(Node::Load.recovers_failures());
        assert!(Node::Verify.recovers_failures());
    }

    #[test]
    fn test_terminal_nodes_stay_put() {
        assert_eq!(Node::Success.on_success(), Node::Success);
        assert_eq!(Node::Failed.on_success(), Node::Failed);
        assert!(Node::Success.is_terminal());
    }
}

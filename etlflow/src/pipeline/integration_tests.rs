//! End-to-end tests driving full runs through the orchestrator.

#[cfg(test)]
mod tests {
    use crate::core::{FinalStatus, PredicateKind, StepStatus, ValidationRule};
    use crate::pipeline::{Orchestrator, RunConfig, RunRequest};
    use crate::testing::{fixtures, FailingSource, FlakySink, ScriptedOracle, StallingOracle};
    use crate::tools::{JsonRecordsSource, LoadTool, MemorySink};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn orchestrator_for(
        oracle: Arc<ScriptedOracle>,
        records: &Value,
        sink: Arc<dyn LoadTool>,
    ) -> Orchestrator {
        let source = JsonRecordsSource::new().with_table("trips", records).unwrap();
        Orchestrator::new(oracle, Arc::new(source), sink)
    }

    fn request() -> RunRequest {
        RunRequest::new("trips", "trips_clean", "clean the taxi data for analysis")
    }

    #[tokio::test]
    async fn scenario_a_cleanup_run_loads_all_but_removed_rows() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_plan(Ok(fixtures::cleanup_plan()));
        oracle.push_rules(Ok(fixtures::positivity_rules()));
        let sink = Arc::new(MemorySink::new());
        let orchestrator = orchestrator_for(oracle.clone(), &fixtures::taxi_records(), sink.clone());

        let report = orchestrator.run(request()).await.unwrap();

        assert_eq!(report.final_status, FinalStatus::Success);
        assert_eq!(report.retry_count, 0);
        // One null filled, one negative row removed from the original four.
        assert_eq!(report.rows_loaded, Some(3));
        assert!(report.error_summary.is_none());

        let messages: Vec<_> = report
            .execution_log
            .records()
            .iter()
            .map(|r| r.message.clone())
            .collect();
        assert!(messages.iter().any(|m| m.contains("filled 1 null")));
        assert!(messages.iter().any(|m| m.contains("removed 1 row")));
        assert!(messages.iter().any(|m| m.contains("all 3 validation rules passed")));
        assert_eq!(sink.table("trips_clean").unwrap().row_count(), 3);
    }

    #[tokio::test]
    async fn scenario_b_transform_failure_recovers_through_the_oracle() {
        let oracle = Arc::new(ScriptedOracle::new());
        // The initial plan trips over the non-numeric RatecodeID value.
        oracle.push_plan(Ok(fixtures::plan_of(&[(
            "remove_negative",
            "RatecodeID",
            &[],
        )])));
        // Recovery coerces the column first, then fills the hole it leaves.
        oracle.push_recovery_json(&json!([
            {"action": "convert_numeric", "column": "RatecodeID"},
            {"action": "fill_null", "column": "RatecodeID", "strategy": "mode"},
            {"action": "remove_negative", "column": "RatecodeID"}
        ]));
        oracle.push_rules(Ok(vec![ValidationRule::new(
            PredicateKind::NotNull,
            Some("RatecodeID"),
        )]));
        let sink = Arc::new(MemorySink::new());
        let orchestrator =
            orchestrator_for(oracle.clone(), &fixtures::ratecode_records(), sink.clone());

        let report = orchestrator.run(request()).await.unwrap();

        assert_eq!(report.final_status, FinalStatus::Success);
        assert_eq!(report.retry_count, 1);
        assert_eq!(report.rows_loaded, Some(3));
        assert_eq!(oracle.calls("recover"), 1);
        // Analysis ran once: recovery re-enters at Transform, not Extract.
        assert_eq!(oracle.calls("analyze"), 1);

        let messages: Vec<_> = report
            .execution_log
            .records()
            .iter()
            .map(|r| r.message.clone())
            .collect();
        assert!(messages.iter().any(|m| m.contains("TransformationError")));
        assert!(messages.iter().any(|m| m.contains("recovery plan")));
    }

    #[tokio::test]
    async fn scenario_c_disallowed_plan_fails_without_consuming_retries() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_plan_json(&json!([
            {"action": "fill_null", "column": "passenger_count", "strategy": "median"},
            {"action": "exec_arbitrary_code", "column": "passenger_count"}
        ]));
        let orchestrator = orchestrator_for(
            oracle.clone(),
            &fixtures::taxi_records(),
            Arc::new(MemorySink::new()),
        );

        let report = orchestrator.run(request()).await.unwrap();

        assert_eq!(report.final_status, FinalStatus::Failed);
        assert_eq!(report.retry_count, 0);
        assert_eq!(oracle.calls("recover"), 0);
        assert!(report.error_summary.unwrap().contains("PlanningError"));
        assert!(report.rows_loaded.is_none());
    }

    #[tokio::test]
    async fn scenario_d_repeated_failures_exhaust_the_retry_budget() {
        let oracle = Arc::new(ScriptedOracle::new());
        let failing = || fixtures::plan_of(&[("remove_negative", "RatecodeID", &[])]);
        oracle.push_plan(Ok(failing()));
        oracle.push_recovery(Ok(failing()));
        oracle.push_recovery(Ok(failing()));
        let orchestrator = orchestrator_for(
            oracle.clone(),
            &fixtures::ratecode_records(),
            Arc::new(MemorySink::new()),
        );

        let report = orchestrator
            .run(request().with_max_retries(2))
            .await
            .unwrap();

        assert_eq!(report.final_status, FinalStatus::Failed);
        assert_eq!(report.retry_count, 2);

        let transform_failures = report
            .execution_log
            .records()
            .iter()
            .filter(|r| r.message.contains("TransformationError"))
            .count();
        assert_eq!(transform_failures, 3);

        let recoveries = report
            .execution_log
            .records()
            .iter()
            .filter(|r| r.message.contains("recovery plan"))
            .count();
        assert_eq!(recoveries, 2);

        assert!(report
            .execution_log
            .records()
            .iter()
            .any(|r| r.message.contains("retry budget exhausted")));
    }

    #[tokio::test]
    async fn scenario_e_renamed_columns_need_no_node_changes() {
        let records = json!([
            {"num_passengers": 2, "fare_amount": 8.0},
            {"num_passengers": null, "fare_amount": 4.5},
            {"num_passengers": -1, "fare_amount": 3.0}
        ]);
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_plan(Ok(fixtures::plan_of(&[
            (
                "fill_null",
                "num_passengers",
                &[("strategy", json!("median"))],
            ),
            ("remove_negative", "num_passengers", &[]),
        ])));
        oracle.push_rules(Ok(vec![
            ValidationRule::new(PredicateKind::NotNull, Some("num_passengers")),
            ValidationRule::new(PredicateKind::Positive, Some("num_passengers")),
        ]));
        let orchestrator = orchestrator_for(oracle, &records, Arc::new(MemorySink::new()));

        let report = orchestrator.run(request()).await.unwrap();

        assert_eq!(report.final_status, FinalStatus::Success);
        assert_eq!(report.rows_loaded, Some(2));
    }

    #[tokio::test]
    async fn runs_always_terminate_with_a_terminal_status() {
        // Success case, failure case, and a default empty plan all resolve.
        for (scripted_plan, expect_success) in [(true, true), (false, true)] {
            let oracle = Arc::new(ScriptedOracle::new());
            if scripted_plan {
                oracle.push_plan(Ok(fixtures::cleanup_plan()));
            }
            let orchestrator = orchestrator_for(
                oracle,
                &fixtures::taxi_records(),
                Arc::new(MemorySink::new()),
            );

            let report = orchestrator.run(request()).await.unwrap();
            assert!(report.final_status.is_terminal());
            assert_eq!(
                report.final_status == FinalStatus::Success,
                expect_success
            );
        }
    }

    #[tokio::test]
    async fn transient_load_failure_recovers_and_replays_idempotently() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_plan(Ok(fixtures::cleanup_plan()));
        // Re-entry at Transform replays the recovery plan over the already
        // transformed dataset; the cleanup plan is a no-op the second time.
        oracle.push_recovery(Ok(fixtures::cleanup_plan()));
        let sink = Arc::new(FlakySink::new(1));
        let orchestrator =
            orchestrator_for(oracle.clone(), &fixtures::taxi_records(), sink);

        let report = orchestrator.run(request()).await.unwrap();

        assert_eq!(report.final_status, FinalStatus::Success);
        assert_eq!(report.retry_count, 1);
        assert_eq!(report.rows_loaded, Some(3));
        assert_eq!(oracle.calls("analyze"), 1);
        assert!(report
            .execution_log
            .records()
            .iter()
            .any(|r| r.message.contains("LoadError")));
    }

    #[tokio::test]
    async fn extraction_failure_is_fatal() {
        let orchestrator = Orchestrator::new(
            Arc::new(ScriptedOracle::new()),
            Arc::new(FailingSource::new("source file not found")),
            Arc::new(MemorySink::new()),
        );

        let report = orchestrator.run(request()).await.unwrap();

        assert_eq!(report.final_status, FinalStatus::Failed);
        assert_eq!(report.retry_count, 0);
        assert!(report.error_summary.unwrap().contains("ExtractionError"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_oracle_times_out_and_fails_the_run() {
        let oracle = Arc::new(StallingOracle::new(std::time::Duration::from_secs(600)));
        let source = JsonRecordsSource::new()
            .with_table("trips", &fixtures::taxi_records())
            .unwrap();
        let orchestrator = Orchestrator::with_config(
            oracle,
            Arc::new(source),
            Arc::new(MemorySink::new()),
            RunConfig::new().with_step_timeout(1.0),
        );

        let report = orchestrator.run(request()).await.unwrap();

        // The stall hits Analyze, which is fatal pre-plan.
        assert_eq!(report.final_status, FinalStatus::Failed);
        assert_eq!(report.retry_count, 0);
        assert!(report.error_summary.unwrap().contains("AnalysisError"));
    }

    #[tokio::test]
    async fn the_log_only_ever_grows() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_plan(Ok(fixtures::plan_of(&[(
            "remove_negative",
            "RatecodeID",
            &[],
        )])));
        oracle.push_recovery_json(&json!([
            {"action": "convert_numeric", "column": "RatecodeID"}
        ]));
        let orchestrator = orchestrator_for(
            oracle,
            &fixtures::ratecode_records(),
            Arc::new(MemorySink::new()),
        );

        let report = orchestrator.run(request()).await.unwrap();

        // Every attempt left its records behind: the first failed transform,
        // the recovery, and the replayed transform all appear in order.
        let records = report.execution_log.records();
        assert!(records.len() >= 5);
        let first_failure = records
            .iter()
            .position(|r| r.status == StepStatus::Failure)
            .unwrap();
        assert!(records[first_failure + 1..]
            .iter()
            .any(|r| r.message.contains("recovery plan")));
    }
}

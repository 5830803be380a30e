//! Generic pipeline execution framework.
//!
//! Provides a table-driven pipeline executor that runs stages of tasks in
//! order.

use super::metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
use super::stage::Stage;
use super::task::BoxedTask;
use burnbox_shared::errors::BurnboxResult;
use std::time::Instant;

pub struct ExecutionPlan<Ctx> {
    stages: Vec<Stage<BoxedTask<Ctx>>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(stages: Vec<Stage<BoxedTask<Ctx>>>) -> Self {
        Self { stages }
    }

    pub fn stages(self) -> Vec<Stage<BoxedTask<Ctx>>> {
        self.stages
    }

    /// Stage and task names in execution order, without running anything.
    pub fn describe(&self) -> Vec<(&'static str, Vec<String>)> {
        self.stages
            .iter()
            .map(|stage| {
                (
                    stage.name,
                    stage.tasks.iter().map(|t| t.name().to_string()).collect(),
                )
            })
            .collect()
    }
}

pub struct Pipeline<Ctx> {
    stages: Vec<Stage<BoxedTask<Ctx>>>,
}

impl<Ctx> Pipeline<Ctx> {
    pub fn new(stages: Vec<Stage<BoxedTask<Ctx>>>) -> Self {
        Self { stages }
    }
}

pub struct PipelineBuilder;

impl PipelineBuilder {
    pub fn from_plan<Ctx>(plan: ExecutionPlan<Ctx>) -> Pipeline<Ctx> {
        Pipeline::new(plan.stages())
    }
}

/// Pipeline executor framework.
///
/// This provides the generic infrastructure for executing a table-driven pipeline.
/// The actual task execution logic is provided by task implementations.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute a pipeline.
    ///
    /// Iterates through stages and runs their tasks one at a time. The first
    /// failing task aborts the whole pipeline.
    ///
    /// Generic over:
    /// - `Ctx`: Shared pipeline context (use interior mutability for writes)
    pub async fn execute<Ctx>(pipeline: Pipeline<Ctx>, ctx: Ctx) -> BurnboxResult<PipelineMetrics>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        let mut stage_metrics = Vec::new();

        for (index, stage) in pipeline.stages.into_iter().enumerate() {
            let stage_name = stage.name;
            let stage_start = Instant::now();
            tracing::info!(stage = stage_name, tasks = stage.tasks.len(), "Stage started");

            let mut task_metrics = Vec::new();
            for task in stage.tasks {
                let name = task.name().to_string();
                let task_start = Instant::now();
                task.run(ctx.clone()).await?;
                let duration_ms = task_start.elapsed().as_millis();
                tracing::info!(task = %name, duration_ms, "Task completed");
                task_metrics.push(TaskMetrics { name, duration_ms });
            }

            let duration_ms = stage_start.elapsed().as_millis();
            tracing::info!(stage = stage_name, duration_ms, "Stage completed");

            stage_metrics.push(StageMetrics {
                index,
                name: stage_name.to_string(),
                duration_ms,
                tasks: task_metrics,
            });
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            stages: stage_metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineTask;
    use async_trait::async_trait;
    use burnbox_shared::errors::BurnboxError;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Record(&'static str);

    #[async_trait]
    impl PipelineTask<Log> for Record {
        async fn run(self: Box<Self>, ctx: Log) -> BurnboxResult<()> {
            ctx.lock().unwrap().push(self.0.to_string());
            Ok(())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    struct Fail;

    #[async_trait]
    impl PipelineTask<Log> for Fail {
        async fn run(self: Box<Self>, _ctx: Log) -> BurnboxResult<()> {
            Err(BurnboxError::Internal("boom".into()))
        }

        fn name(&self) -> &str {
            "fail"
        }
    }

    #[tokio::test]
    async fn test_runs_tasks_in_plan_order() {
        let log: Log = Arc::default();
        let plan = ExecutionPlan::new(vec![
            Stage::new("first", vec![Box::new(Record("a")) as BoxedTask<Log>, Box::new(Record("b"))]),
            Stage::new("second", vec![Box::new(Record("c")) as BoxedTask<Log>]),
        ]);

        let metrics = PipelineExecutor::execute(PipelineBuilder::from_plan(plan), log.clone())
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(metrics.task_names(), vec!["a", "b", "c"]);
        assert_eq!(metrics.stages[1].name, "second");
        assert!(metrics.task_duration_ms("b").is_some());
        assert!(metrics.task_duration_ms("missing").is_none());
    }

    #[tokio::test]
    async fn test_failure_stops_later_tasks() {
        let log: Log = Arc::default();
        let plan = ExecutionPlan::new(vec![
            Stage::new("first", vec![Box::new(Record("a")) as BoxedTask<Log>, Box::new(Fail)]),
            Stage::new("second", vec![Box::new(Record("never")) as BoxedTask<Log>]),
        ]);

        let result = PipelineExecutor::execute(PipelineBuilder::from_plan(plan), log.clone()).await;

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_describe_lists_task_names() {
        let plan: ExecutionPlan<Log> = ExecutionPlan::new(vec![Stage::new(
            "only",
            vec![Box::new(Record("x")) as BoxedTask<Log>],
        )]);
        assert_eq!(plan.describe(), vec![("only", vec!["x".to_string()])]);
    }
}

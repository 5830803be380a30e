//! Table-driven sequential pipeline.
//!
//! ## Architecture
//!
//! ```text
//! Pipeline → Stages → Tasks
//!
//! - Pipeline: Runs every stage in order
//! - Stage: Named group of tasks, run one after another
//! - Task: Atomic unit of work sharing a context with the others
//! ```
//!
//! Each task only starts after the previous one returned `Ok`; the first error
//! stops the pipeline and is returned to the caller unchanged.
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{ExecutionPlan, PipelineBuilder, PipelineExecutor, Stage};
//!
//! let plan = ExecutionPlan::new(vec![
//!     Stage::new("toolchain", vec![Box::new(RustToolchainTask), Box::new(CacheToolTask)]),
//!     Stage::new("workspace", vec![Box::new(MaterializeTask)]),
//! ]);
//!
//! let pipeline = PipelineBuilder::from_plan(plan);
//! let metrics = PipelineExecutor::execute(pipeline, ctx).await?;
//! println!("pipeline took {}ms", metrics.total_duration_ms);
//! ```

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod stage;
mod task;

pub use metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
pub use pipeline::{ExecutionPlan, Pipeline, PipelineBuilder, PipelineExecutor};
pub use stage::Stage;
pub use task::{BoxedTask, PipelineTask};

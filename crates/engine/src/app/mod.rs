mod input;
mod loop_runner;
mod metrics;
mod scene;

pub use input::{
    InputAction, InputScriptError, InputSnapshot, InputSource, InputStep, ScriptedInput,
};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, LoopOutcome};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use scene::{EntityId, EntityIdAllocator, Scene, SceneCommand, Vec2};

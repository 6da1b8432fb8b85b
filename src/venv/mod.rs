//! Virtual environment lifecycle and runtime directory layout.

pub mod layout;
pub mod lifecycle;

pub use layout::{create_layout, logs_dir, scratch_dir, RUNTIME_DIRS, SCRATCH_DIR};
pub use lifecycle::{
    default_context, EnvState, LifecycleContext, LifecycleManager, LifecycleState,
    RuntimeEnvironment, VENV_DIR,
};

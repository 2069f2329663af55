//! Tool bridge: advertises tool schemas to the model and delegates execution.

mod args;
mod bridge;
mod catalog;
mod error;
mod executor;
mod hooks;
mod types;

pub mod prelude {
    pub use crate::{
        FnToolExecutor, ToolBridge, ToolBridgeHooks, ToolCatalog, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolExecutionResult, ToolExecutor, ToolFuture, ToolInvocation,
    };
}

pub use args::{check_required, parse_json_object, parse_json_value, required_string};
pub use bridge::{DEFAULT_TOOL_TIMEOUT, ToolBridge};
pub use catalog::ToolCatalog;
pub use error::{ToolError, ToolErrorKind};
#[cfg(feature = "http-executor")]
pub use executor::HttpToolExecutor;
pub use executor::{FnToolExecutor, ToolExecutor, ToolFuture, UnconfiguredToolExecutor};
pub use hooks::{NoopToolBridgeHooks, ToolBridgeHooks};
pub use types::{ToolExecutionContext, ToolExecutionResult, ToolInvocation};

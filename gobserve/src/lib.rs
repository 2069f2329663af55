//! Observability hooks for provider calls and tool dispatch.
//!
//! ```rust
//! use gobserve::{MetricsObservabilityHooks, SafeProviderHooks, TracingObservabilityHooks};
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _metrics = MetricsObservabilityHooks;
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{FanoutProviderHooks, FanoutToolHooks, SafeProviderHooks, SafeToolHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        FanoutProviderHooks, FanoutToolHooks, MetricsObservabilityHooks, SafeProviderHooks,
        SafeToolHooks, TracingObservabilityHooks,
    };
}

#[cfg(test)]
mod tests;

//! Subscriber setup for hosts that embed the memory engine.
//!
//! Without `RUST_LOG`, only the memory crates log, at the requested level.
//! Host crates stay quiet unless `RUST_LOG` names them.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crate targets whose `memory.*` events the default filter admits.
pub const MEMORY_TARGETS: [&str; 2] = ["ace_memory_core", "ace_memory_state"];

/// Default `EnvFilter` directive: every memory target at `level`.
pub fn default_directive(level: Level) -> String {
    MEMORY_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// `RUST_LOG` when set and valid, otherwise [`default_directive`].
pub fn memory_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)))
}

/// Install the global subscriber. Only the first call in a process takes
/// effect.
///
/// The target is kept in every line so memory events can be told apart
/// from the host's own.
pub fn init_tracing(json: bool, level: Level) {
    let registry = tracing_subscriber::registry().with(memory_filter(level));
    let installed = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    if installed.is_err() {
        tracing::debug!(event = "memory.tracing_already_installed");
    }
}

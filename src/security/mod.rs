//! Security context propagation.
//!
//! There is no ambient (thread-local / task-local) state. Each request gets
//! an explicit [`Scope`] that is passed to every filter, and a
//! [`SecurityContextHolderStrategy`] decides which slot a scope resolves to.

pub mod context;
pub mod holder;
pub mod scope;

pub use context::SecurityContext;
pub use holder::{
    GlobalSecurityContextHolderStrategy, InheritableSecurityContextHolderStrategy,
    PerRequestSecurityContextHolderStrategy, SecurityContextHolder,
    SecurityContextHolderStrategy, SecurityError, StrategyMode,
};
pub use scope::Scope;

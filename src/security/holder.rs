use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::security::context::SecurityContext;
use crate::security::scope::Scope;
use crate::services::auth::AuthError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("only non-nil security contexts are permitted")]
    NilContext,

    #[error("unknown security context strategy: {0}")]
    UnknownStrategy(String),
}

impl From<SecurityError> for AuthError {
    fn from(e: SecurityError) -> Self {
        AuthError::Configuration(e.to_string())
    }
}

/// Decides which slot a [`Scope`] resolves to.
///
/// `get_context` attaches an empty context the first time a scope without
/// one asks, so every later call in that scope sees the same instance.
pub trait SecurityContextHolderStrategy: Send + Sync {
    fn get_context(&self, scope: &Scope) -> Arc<SecurityContext>;

    fn set_context(
        &self,
        scope: &Scope,
        context: Option<Arc<SecurityContext>>,
    ) -> Result<(), SecurityError>;

    fn clear_context(&self, scope: &Scope);

    fn create_empty_context(&self) -> Arc<SecurityContext> {
        Arc::new(SecurityContext::new())
    }
}

/// Context lives in the scope's own slot. Child scopes start empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerRequestSecurityContextHolderStrategy;

impl SecurityContextHolderStrategy for PerRequestSecurityContextHolderStrategy {
    fn get_context(&self, scope: &Scope) -> Arc<SecurityContext> {
        scope
            .slot()
            .lock()
            .get_or_insert_with(|| self.create_empty_context())
            .clone()
    }

    fn set_context(
        &self,
        scope: &Scope,
        context: Option<Arc<SecurityContext>>,
    ) -> Result<(), SecurityError> {
        let context = context.ok_or(SecurityError::NilContext)?;
        *scope.slot().lock() = Some(context);
        Ok(())
    }

    fn clear_context(&self, scope: &Scope) {
        scope.slot().lock().take();
    }
}

/// Like per-request, but a scope without its own context adopts the nearest
/// ancestor's. Setting or clearing only touches the scope itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct InheritableSecurityContextHolderStrategy;

impl InheritableSecurityContextHolderStrategy {
    fn inherited(scope: &Scope) -> Option<Arc<SecurityContext>> {
        let mut cursor = scope.parent();
        while let Some(parent) = cursor {
            if let Some(context) = parent.slot().lock().as_ref() {
                return Some(context.clone());
            }
            cursor = parent.parent();
        }
        None
    }
}

impl SecurityContextHolderStrategy for InheritableSecurityContextHolderStrategy {
    fn get_context(&self, scope: &Scope) -> Arc<SecurityContext> {
        // lock order is always child then parent
        let mut slot = scope.slot().lock();
        if let Some(context) = slot.as_ref() {
            return context.clone();
        }
        let context = Self::inherited(scope).unwrap_or_else(|| self.create_empty_context());
        *slot = Some(context.clone());
        context
    }

    fn set_context(
        &self,
        scope: &Scope,
        context: Option<Arc<SecurityContext>>,
    ) -> Result<(), SecurityError> {
        let context = context.ok_or(SecurityError::NilContext)?;
        *scope.slot().lock() = Some(context);
        Ok(())
    }

    fn clear_context(&self, scope: &Scope) {
        scope.slot().lock().take();
    }
}

/// One context for the whole process; the scope argument is ignored.
///
/// Every concurrent request reads and overwrites the same slot, so this is
/// only usable for single-tenant tools and tests.
#[derive(Debug, Default)]
pub struct GlobalSecurityContextHolderStrategy {
    context: Mutex<Option<Arc<SecurityContext>>>,
}

impl GlobalSecurityContextHolderStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecurityContextHolderStrategy for GlobalSecurityContextHolderStrategy {
    fn get_context(&self, _scope: &Scope) -> Arc<SecurityContext> {
        self.context
            .lock()
            .get_or_insert_with(|| self.create_empty_context())
            .clone()
    }

    fn set_context(
        &self,
        _scope: &Scope,
        context: Option<Arc<SecurityContext>>,
    ) -> Result<(), SecurityError> {
        let context = context.ok_or(SecurityError::NilContext)?;
        *self.context.lock() = Some(context);
        Ok(())
    }

    fn clear_context(&self, _scope: &Scope) {
        self.context.lock().take();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyMode {
    #[default]
    PerRequest,
    Inheritable,
    Global,
}

impl FromStr for StrategyMode {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_request" | "mode_threadlocal" => Ok(Self::PerRequest),
            "inheritable" | "mode_inheritablethreadlocal" => Ok(Self::Inheritable),
            "global" | "mode_global" => Ok(Self::Global),
            _ => Err(SecurityError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for StrategyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PerRequest => "per_request",
            Self::Inheritable => "inheritable",
            Self::Global => "global",
        };
        f.write_str(name)
    }
}

/// Cheap, cloneable handle to the configured strategy.
#[derive(Clone)]
pub struct SecurityContextHolder {
    strategy: Arc<dyn SecurityContextHolderStrategy>,
}

impl fmt::Debug for SecurityContextHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityContextHolder").finish_non_exhaustive()
    }
}

impl Default for SecurityContextHolder {
    fn default() -> Self {
        Self::new(StrategyMode::default())
    }
}

impl SecurityContextHolder {
    pub fn new(mode: StrategyMode) -> Self {
        let strategy: Arc<dyn SecurityContextHolderStrategy> = match mode {
            StrategyMode::PerRequest => Arc::new(PerRequestSecurityContextHolderStrategy),
            StrategyMode::Inheritable => Arc::new(InheritableSecurityContextHolderStrategy),
            StrategyMode::Global => Arc::new(GlobalSecurityContextHolderStrategy::new()),
        };
        Self { strategy }
    }

    pub fn with_strategy(strategy: Arc<dyn SecurityContextHolderStrategy>) -> Self {
        Self { strategy }
    }

    pub fn get_context(&self, scope: &Scope) -> Arc<SecurityContext> {
        self.strategy.get_context(scope)
    }

    pub fn set_context(
        &self,
        scope: &Scope,
        context: Option<Arc<SecurityContext>>,
    ) -> Result<(), SecurityError> {
        self.strategy.set_context(scope, context)
    }

    pub fn clear_context(&self, scope: &Scope) {
        self.strategy.clear_context(scope)
    }

    pub fn create_empty_context(&self) -> Arc<SecurityContext> {
        self.strategy.create_empty_context()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::services::auth::{AuthenticationToken, TokenKind};

    fn alice() -> AuthenticationToken {
        AuthenticationToken::authenticated(TokenKind::Bearer, "alice", None, BTreeSet::new())
    }

    fn signed_in(holder: &SecurityContextHolder, scope: &Scope) {
        let context = holder.create_empty_context();
        context.set_authentication(Some(alice()));
        holder.set_context(scope, Some(context)).unwrap();
    }

    #[test]
    fn get_context_attaches_one_context_per_scope() {
        let holder = SecurityContextHolder::new(StrategyMode::PerRequest);
        let scope = Scope::new();

        let first = holder.get_context(&scope);
        let second = holder.get_context(&scope);
        assert!(Arc::ptr_eq(&first, &second));

        // writes through one handle are visible through the other
        first.set_authentication(Some(alice()));
        assert!(second.is_authenticated());
    }

    #[test]
    fn per_request_scopes_are_isolated() {
        let holder = SecurityContextHolder::new(StrategyMode::PerRequest);
        let (a, b) = (Scope::new(), Scope::new());
        signed_in(&holder, &a);

        assert!(holder.get_context(&a).is_authenticated());
        assert!(!holder.get_context(&b).is_authenticated());
        assert!(!holder.get_context(&a.child()).is_authenticated());
    }

    #[test]
    fn inheritable_children_see_the_parent_context() {
        let holder = SecurityContextHolder::new(StrategyMode::Inheritable);
        let parent = Scope::new();
        signed_in(&holder, &parent);

        let grandchild = parent.child().child();
        assert_eq!(
            holder
                .get_context(&grandchild)
                .authentication()
                .map(|a| a.principal().to_string())
                .as_deref(),
            Some("alice")
        );

        // clearing the child leaves the parent alone
        holder.clear_context(&grandchild);
        assert!(holder.get_context(&parent).is_authenticated());
    }

    #[test]
    fn inheritable_without_ancestor_context_starts_empty() {
        let holder = SecurityContextHolder::new(StrategyMode::Inheritable);
        let child = Scope::new().child();

        assert!(holder.get_context(&child).authentication().is_none());
    }

    #[test]
    fn global_context_is_shared_by_every_scope() {
        let holder = SecurityContextHolder::new(StrategyMode::Global);
        signed_in(&holder, &Scope::new());

        assert!(holder.get_context(&Scope::new()).is_authenticated());

        holder.clear_context(&Scope::new());
        assert!(!holder.get_context(&Scope::new()).is_authenticated());
    }

    #[test]
    fn nil_context_is_rejected_by_every_strategy() {
        for mode in [
            StrategyMode::PerRequest,
            StrategyMode::Inheritable,
            StrategyMode::Global,
        ] {
            let holder = SecurityContextHolder::new(mode);
            assert_eq!(
                holder.set_context(&Scope::new(), None),
                Err(SecurityError::NilContext),
                "{mode}"
            );
        }
    }

    #[test]
    fn clear_then_get_yields_a_fresh_context() {
        let holder = SecurityContextHolder::new(StrategyMode::PerRequest);
        let scope = Scope::new();
        signed_in(&holder, &scope);
        let before = holder.get_context(&scope);

        holder.clear_context(&scope);
        let after = holder.get_context(&scope);

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.authentication().is_none());
    }

    #[test]
    fn strategy_names_parse_with_aliases() {
        assert_eq!("per_request".parse(), Ok(StrategyMode::PerRequest));
        assert_eq!("MODE_THREADLOCAL".parse(), Ok(StrategyMode::PerRequest));
        assert_eq!(
            "MODE_INHERITABLETHREADLOCAL".parse(),
            Ok(StrategyMode::Inheritable)
        );
        assert_eq!("global".parse(), Ok(StrategyMode::Global));
        assert!("thread".parse::<StrategyMode>().is_err());
    }
}

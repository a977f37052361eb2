use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use regex::Regex;
use tracing::{debug, trace};

use crate::filter::authorization::AuthorizationFilter;
use crate::filter::{Filter, FilterResponse};
use crate::security::{Scope, SecurityContextHolder};
use crate::services::auth::AuthError;

/// Cursor over the filters that have not run yet.
pub struct FilterChain<'a> {
    filters: &'a [Arc<dyn Filter>],
    completed: &'a mut bool,
}

impl<'a> FilterChain<'a> {
    pub(crate) fn new(filters: &'a [Arc<dyn Filter>], completed: &'a mut bool) -> Self {
        Self { filters, completed }
    }

    /// Hand the request to the next filter. Past the last one this marks the
    /// chain as completed.
    pub async fn do_filter(
        self,
        scope: &Scope,
        req: &mut Request<Body>,
        res: &mut FilterResponse,
    ) -> Result<(), AuthError> {
        match self.filters.split_first() {
            Some((next, rest)) => {
                next.do_filter(scope, req, res, FilterChain::new(rest, self.completed))
                    .await
            }
            None => {
                *self.completed = true;
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub enum FilterOutcome {
    /// Every filter passed the request on.
    Proceed,
    /// A filter answered the request itself.
    Respond(Response),
    /// A filter stopped without continuing or responding.
    Halted,
}

/// Ordered filters ending in an [`AuthorizationFilter`], plus a list of path
/// regexes that bypass the whole chain.
pub struct FilterChainProxy {
    filters: Vec<Arc<dyn Filter>>,
    skip_paths: Vec<Regex>,
    holder: SecurityContextHolder,
}

impl fmt::Debug for FilterChainProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChainProxy")
            .field("filters", &self.filters.len())
            .field(
                "skip_paths",
                &self.skip_paths.iter().map(Regex::as_str).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl FilterChainProxy {
    pub fn new(mut filters: Vec<Arc<dyn Filter>>, holder: SecurityContextHolder) -> Self {
        filters.push(Arc::new(AuthorizationFilter::new(holder.clone())));
        Self {
            filters,
            skip_paths: Vec::new(),
            holder,
        }
    }

    pub fn add_skip_path(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.skip_paths.push(Regex::new(pattern)?);
        Ok(())
    }

    pub fn with_skip_paths<I, S>(mut self, patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.add_skip_path(pattern.as_ref())?;
        }
        Ok(self)
    }

    pub fn is_skipped(&self, path: &str) -> bool {
        self.skip_paths.iter().any(|re| re.is_match(path))
    }

    pub fn holder(&self) -> &SecurityContextHolder {
        &self.holder
    }

    pub async fn do_filter(
        &self,
        scope: &Scope,
        req: &mut Request<Body>,
    ) -> Result<FilterOutcome, AuthError> {
        if self.is_skipped(req.uri().path()) {
            trace!(path = %req.uri().path(), "security filter chain skipped");
            return Ok(FilterOutcome::Proceed);
        }

        let mut completed = false;
        let mut res = FilterResponse::new();
        FilterChain::new(&self.filters, &mut completed)
            .do_filter(scope, req, &mut res)
            .await?;

        Ok(match res.take() {
            Some(response) => FilterOutcome::Respond(response),
            None if completed => FilterOutcome::Proceed,
            None => {
                debug!(path = %req.uri().path(), "filter chain halted without a response");
                FilterOutcome::Halted
            }
        })
    }
}

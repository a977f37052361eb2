use axum::http::{Method, Request};
use globset::{GlobBuilder, GlobMatcher};

/// Ant-style path matcher: `?` is one character, `*` is anything within one
/// path segment and `**` spans segments. Optionally restricted to one method.
#[derive(Clone, Debug)]
pub struct AntPathRequestMatcher {
    pattern: String,
    method: Option<Method>,
    matcher: Option<GlobMatcher>,
}

impl AntPathRequestMatcher {
    pub fn new(pattern: &str) -> Result<Self, globset::Error> {
        Self::with_options(pattern, None, true)
    }

    pub fn with_options(
        pattern: &str,
        method: Option<Method>,
        case_sensitive: bool,
    ) -> Result<Self, globset::Error> {
        // "/**" and "**" match every path, including "/"
        let matcher = if pattern == "/**" || pattern == "**" {
            None
        } else {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(!case_sensitive)
                .build()?;
            Some(glob.compile_matcher())
        };

        Ok(Self {
            pattern: pattern.to_string(),
            method,
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        if let Some(method) = &self.method {
            if req.method() != method {
                return false;
            }
        }
        match &self.matcher {
            Some(matcher) => matcher.is_match(req.uri().path()),
            None => true,
        }
    }
}

//! URL pattern configuration and compilation.
//!
//! Supports four pattern kinds:
//! - exact: `/cart/status`
//! - glob: `/cart/*` (one segment) and `/api/**` (any depth)
//! - templated path: `/users/:id/orders/:orderId`
//! - regex: `{ regex: "^/api/v\\d+/items$" }`
//!
//! Patterns starting with `/` are matched against the request path only; absolute
//! patterns (`https://api.example.com/cart`) are matched against origin and path.
//! Query strings never take part in URL matching.

use crate::context::HttpRequestContext;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// URL pattern as declared on a mock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UrlPatternRaw", into = "UrlPatternRaw")]
pub enum UrlPattern {
    Exact(String),
    Glob(String),
    Template(String),
    Regex(String),
}

/// Wire format: either a bare string (classified on parse) or `{ regex: "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum UrlPatternRaw {
    Regex { regex: String },
    Plain(String),
}

impl From<UrlPatternRaw> for UrlPattern {
    fn from(raw: UrlPatternRaw) -> Self {
        match raw {
            UrlPatternRaw::Regex { regex } => UrlPattern::Regex(regex),
            UrlPatternRaw::Plain(s) => UrlPattern::parse(&s),
        }
    }
}

impl From<UrlPattern> for UrlPatternRaw {
    fn from(pattern: UrlPattern) -> Self {
        match pattern {
            UrlPattern::Regex(regex) => UrlPatternRaw::Regex { regex },
            UrlPattern::Exact(s) | UrlPattern::Glob(s) | UrlPattern::Template(s) => {
                UrlPatternRaw::Plain(s)
            }
        }
    }
}

impl UrlPattern {
    /// Classify a plain string pattern.
    pub fn parse(pattern: &str) -> Self {
        let has_param = path_segments(pattern).any(|seg| seg.starts_with(':') && seg.len() > 1);
        if has_param {
            UrlPattern::Template(pattern.to_string())
        } else if pattern.contains('*') {
            UrlPattern::Glob(pattern.to_string())
        } else {
            UrlPattern::Exact(pattern.to_string())
        }
    }

    /// The pattern text as written.
    pub fn as_str(&self) -> &str {
        match self {
            UrlPattern::Exact(s)
            | UrlPattern::Glob(s)
            | UrlPattern::Template(s)
            | UrlPattern::Regex(s) => s,
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(s: &str) -> Self {
        UrlPattern::parse(s)
    }
}

/// Path segments after the origin, if any.
fn path_segments(pattern: &str) -> impl Iterator<Item = &str> {
    let path = match pattern.find("://") {
        Some(scheme_end) => {
            let rest = &pattern[scheme_end + 3..];
            rest.find('/').map_or("", |slash| &rest[slash..])
        }
        None => pattern,
    };
    path.split('/')
}

/// Compiled URL matcher for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub enum CompiledUrlMatcher {
    Exact(String),
    Regex(Arc<Regex>),
}

/// Compiled URL pattern including the match target.
#[derive(Debug, Clone)]
pub struct CompiledUrlPattern {
    pub matcher: CompiledUrlMatcher,
    /// Match against origin + path instead of path only
    pub absolute: bool,
}

impl CompiledUrlPattern {
    /// Compile a UrlPattern configuration.
    pub fn compile(pattern: &UrlPattern) -> Result<Self, regex::Error> {
        let absolute = !pattern.as_str().starts_with('/');
        let matcher = match pattern {
            UrlPattern::Exact(s) => CompiledUrlMatcher::Exact(s.clone()),
            UrlPattern::Glob(s) | UrlPattern::Template(s) => {
                CompiledUrlMatcher::Regex(Arc::new(Regex::new(&wildcard_to_regex(s))?))
            }
            UrlPattern::Regex(s) => {
                return Ok(CompiledUrlPattern {
                    matcher: CompiledUrlMatcher::Regex(Arc::new(Regex::new(s)?)),
                    absolute: true,
                })
            }
        };
        Ok(CompiledUrlPattern { matcher, absolute })
    }

    /// Check if the request URL matches this pattern.
    pub fn matches(&self, ctx: &HttpRequestContext) -> bool {
        let target = if self.absolute {
            ctx.url_without_query()
        } else {
            ctx.path()
        };
        match &self.matcher {
            CompiledUrlMatcher::Exact(expected) => target == expected,
            CompiledUrlMatcher::Regex(regex) => regex.is_match(target),
        }
    }
}

/// Translate glob (`*`, `**`) and template (`:name`) syntax into an anchored regex.
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    out.push('^');

    let segments: Vec<&str> = pattern.split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        if segment.len() > 1 && segment.starts_with(':') && !segment.contains('*') {
            out.push_str("[^/]+");
            continue;
        }
        let mut rest = *segment;
        while let Some(star) = rest.find('*') {
            out.push_str(&regex::escape(&rest[..star]));
            if rest[star..].starts_with("**") {
                out.push_str(".*");
                rest = &rest[star + 2..];
            } else {
                out.push_str("[^/]*");
                rest = &rest[star + 1..];
            }
        }
        out.push_str(&regex::escape(rest));
    }

    out.push('$');
    out
}

//! Request matching for mock candidates.
//!
//! # Module Structure
//!
//! - `url` - URL pattern classification and compilation (exact, glob, template, regex)
//! - `criteria` - Body/header/query match criteria and specificity
//! - `path_extractor` - Safe extraction of request fields by path expression

mod criteria;
mod path_extractor;
mod url;

pub use criteria::MatchCriteria;
pub use path_extractor::{extract_from_path, is_safe_segment, PathRoot, DENYLISTED_KEYS};
pub use url::{CompiledUrlMatcher, CompiledUrlPattern, UrlPattern};

/// Check if a request method satisfies a mock's declared method.
///
/// Methods compare case-insensitively; `*` and `ANY` match every method.
pub fn method_matches(declared: &str, actual: &str) -> bool {
    declared == "*" || declared.eq_ignore_ascii_case("any") || declared.eq_ignore_ascii_case(actual)
}

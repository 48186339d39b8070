//! Paths exempted from the redirect.
//!
//! Entries ending in `/*` exempt a whole first-level folder (`/js/*` covers
//! `/js/app.js`). Every other entry must match the request path exactly.
//! Wildcards deeper than the first segment are not supported: `/js/lib/*` is
//! stored as the prefix `/js/lib/` but a request path only ever yields a
//! one-segment prefix, so it never matches.

use std::collections::HashSet;

/// The exclusion list, classified once at construction time.
///
/// A `None` set means no entry of that kind was configured and the check is
/// skipped outright.
#[derive(Clone, Debug, Default)]
pub struct Exclusions {
    absolute: Option<HashSet<String>>,
    partial: Option<HashSet<String>>,
}

impl Exclusions {
    /// Splits raw entries into exact paths and first-segment prefixes.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut absolute = HashSet::new();
        let mut partial = HashSet::new();

        for entry in entries {
            let entry = entry.as_ref();
            match entry.strip_suffix('*') {
                Some(prefix) if prefix.ends_with('/') => {
                    partial.insert(prefix.to_owned());
                }
                _ => {
                    absolute.insert(entry.to_owned());
                }
            }
        }

        Self {
            absolute: (!absolute.is_empty()).then_some(absolute),
            partial: (!partial.is_empty()).then_some(partial),
        }
    }

    /// Exact paths, if any were configured.
    pub fn absolute(&self) -> Option<&HashSet<String>> {
        self.absolute.as_ref()
    }

    /// First-segment prefixes (each ending in `/`), if any were configured.
    pub fn partial(&self) -> Option<&HashSet<String>> {
        self.partial.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.absolute.is_none() && self.partial.is_none()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matches_absolute(path) || self.matches_partial(path)
    }

    pub(crate) fn matches_absolute(&self, path: &str) -> bool {
        self.absolute.as_ref().is_some_and(|set| set.contains(path))
    }

    pub(crate) fn matches_partial(&self, path: &str) -> bool {
        let Some(set) = &self.partial else {
            return false;
        };
        let start = first_segment(path);
        !start.is_empty() && set.contains(start)
    }
}

/// Returns `path` up to and including the first `/` after index 0, or `""`.
///
/// `/js/app.js` → `/js/`, `/` → `""`, `/favicon.ico` → `""`.
pub(crate) fn first_segment(path: &str) -> &str {
    path.char_indices()
        .skip(1)
        .find(|&(_, c)| c == '/')
        .map_or("", |(i, _)| &path[..=i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_by_wildcard_suffix() {
        let ex = Exclusions::new(["/js/*", "/favicon.ico", "/css/*", "/robots.txt"]);

        let partial = ex.partial().unwrap();
        assert_eq!(partial.len(), 2);
        assert!(partial.contains("/js/"));
        assert!(partial.contains("/css/"));

        let absolute = ex.absolute().unwrap();
        assert_eq!(absolute.len(), 2);
        assert!(absolute.contains("/favicon.ico"));
        assert!(absolute.contains("/robots.txt"));
    }

    #[test]
    fn empty_partitions_disable_their_check() {
        assert!(Exclusions::new(Vec::<String>::new()).is_empty());

        let only_partial = Exclusions::new(["/js/*"]);
        assert!(only_partial.absolute().is_none());
        assert!(only_partial.partial().is_some());

        let only_absolute = Exclusions::new(["/favicon.ico"]);
        assert!(only_absolute.partial().is_none());
        assert!(only_absolute.absolute().is_some());
    }

    #[test]
    fn star_without_slash_is_an_exact_path() {
        let ex = Exclusions::new(["/js*"]);
        assert!(ex.partial().is_none());
        assert!(ex.absolute().unwrap().contains("/js*"));
        assert!(!ex.matches("/js/app.js"));
    }

    #[test]
    fn first_segment_cases() {
        assert_eq!(first_segment("/js/app.js"), "/js/");
        assert_eq!(first_segment("/js/"), "/js/");
        assert_eq!(first_segment("/js/lib/x.js"), "/js/");
        assert_eq!(first_segment("/"), "");
        assert_eq!(first_segment("/index.html"), "");
        assert_eq!(first_segment(""), "");
        assert_eq!(first_segment("//x"), "//");
        assert_eq!(first_segment("/é/x"), "/é/");
    }

    #[test]
    fn partial_match_only_considers_first_segment() {
        let ex = Exclusions::new(["/js/*", "/js/lib/*"]);
        assert!(ex.matches("/js/app.js"));
        assert!(ex.matches("/js/lib/x.js"));
        assert!(!ex.matches("/js"));
        assert!(!ex.matches("/jsx/app.js"));

        let deep = Exclusions::new(["/js/lib/*"]);
        assert!(!deep.matches("/js/lib/x.js"));
    }

    #[test]
    fn absolute_match_is_exact_and_case_sensitive() {
        let ex = Exclusions::new(["/favicon.ico"]);
        assert!(ex.matches("/favicon.ico"));
        assert!(!ex.matches("/FAVICON.ICO"));
        assert!(!ex.matches("/favicon.ico/"));
    }
}

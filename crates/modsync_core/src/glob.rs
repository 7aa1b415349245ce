//! Glob patterns for exclusions and routes.
//!
//! Supported syntax:
//! - literal segments, compared case-insensitively
//! - `*` and `?` inside a segment (never crossing a `/`)
//! - `**` as a whole segment, matching zero or more segments
//!
//! Candidate paths are normalized to `/` separators before matching.

use crate::error::{CoreError, CoreResult};
use crate::path::normalize;
use regex::Regex;

/// How a compiled [`Glob`] tests candidate paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlobMode {
    /// The whole path must match the pattern.
    #[default]
    Full,
    /// The path must be a directory that a deeper matching path could
    /// live under, i.e. some non-empty extension of it matches.
    Prefix,
}

#[derive(Debug, Clone)]
enum Segment {
    AnyDepth,
    Literal(String),
    Wildcard(Regex),
}

impl Segment {
    fn parse(pattern: &str, segment: &str) -> CoreResult<Self> {
        if segment == "**" {
            return Ok(Segment::AnyDepth);
        }
        if segment.contains("**") {
            return Err(CoreError::InvalidGlob {
                pattern: pattern.to_string(),
                message: "'**' must be a whole path segment".into(),
            });
        }
        if !segment.contains(['*', '?']) {
            return Ok(Segment::Literal(segment.to_lowercase()));
        }

        let mut source = String::from("(?i)^");
        for ch in segment.chars() {
            match ch {
                '*' => source.push_str("[^/]*"),
                '?' => source.push_str("[^/]"),
                other => source.push_str(&regex::escape(&other.to_string())),
            }
        }
        source.push('$');

        Regex::new(&source)
            .map(Segment::Wildcard)
            .map_err(|e| CoreError::InvalidGlob {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Segment::AnyDepth => true,
            Segment::Literal(literal) => literal == &name.to_lowercase(),
            Segment::Wildcard(regex) => regex.is_match(name),
        }
    }
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    segments: Vec<Segment>,
    mode: GlobMode,
}

impl Glob {
    /// Compiles a full-match pattern.
    pub fn new(pattern: &str) -> CoreResult<Self> {
        Self::compile(pattern, GlobMode::Full)
    }

    /// Compiles a pattern in the given mode.
    pub fn compile(pattern: &str, mode: GlobMode) -> CoreResult<Self> {
        let normalized = normalize(pattern);
        let segments = normalized
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| Segment::parse(pattern, s))
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            mode,
        })
    }

    /// Returns the same pattern with a different mode.
    pub fn with_mode(&self, mode: GlobMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Returns the source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the match mode.
    pub fn mode(&self) -> GlobMode {
        self.mode
    }

    /// Tests a path using this glob's mode.
    pub fn test(&self, path: &str) -> bool {
        self.matches(path, self.mode)
    }

    /// Tests a path using an explicit mode.
    pub fn matches(&self, path: &str, mode: GlobMode) -> bool {
        let normalized = normalize(path);
        let parts: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        match_segments(&self.segments, &parts, mode == GlobMode::Prefix)
    }
}

fn match_segments(pattern: &[Segment], path: &[&str], prefix: bool) -> bool {
    if path.is_empty() {
        return if prefix {
            !pattern.is_empty()
        } else {
            pattern.iter().all(|s| matches!(s, Segment::AnyDepth))
        };
    }

    match pattern.split_first() {
        None => false,
        Some((Segment::AnyDepth, rest)) => {
            match_segments(rest, path, prefix) || match_segments(pattern, &path[1..], prefix)
        }
        Some((segment, rest)) => segment.matches(path[0]) && match_segments(rest, &path[1..], prefix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn full(pattern: &str) -> Glob {
        Glob::new(pattern).unwrap()
    }

    fn prefix(pattern: &str) -> Glob {
        Glob::compile(pattern, GlobMode::Prefix).unwrap()
    }

    #[test]
    fn literal_segments() {
        let glob = full("BepInEx/plugins/SAIN.dll");
        assert!(glob.test("BepInEx/plugins/SAIN.dll"));
        assert!(glob.test(r"bepinex\plugins\sain.dll"));
        assert!(!glob.test("BepInEx/plugins"));
        assert!(!glob.test("BepInEx/plugins/SAIN.dll/extra"));
    }

    #[test]
    fn star_stays_within_segment() {
        let glob = full("plugins/*.dll");
        assert!(glob.test("plugins/SAIN.dll"));
        assert!(glob.test("plugins/.dll"));
        assert!(!glob.test("plugins/SAIN/SAIN.dll"));
        assert!(!glob.test("plugins/SAIN.txt"));
    }

    #[test]
    fn question_mark() {
        let glob = full("v?.txt");
        assert!(glob.test("v1.txt"));
        assert!(!glob.test("v10.txt"));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let glob = full("**/*.nosync");
        assert!(glob.test("a.nosync"));
        assert!(glob.test("plugins/SAIN/a.nosync"));
        assert!(!glob.test("plugins/a.nosync.txt"));

        let glob = full("user/cache/**");
        assert!(glob.test("user/cache"));
        assert!(glob.test("user/cache/a/b/c"));
        assert!(!glob.test("user/cached"));

        let glob = full("a/**/b");
        assert!(glob.test("a/b"));
        assert!(glob.test("a/x/y/b"));
        assert!(!glob.test("a/x/y/c"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let glob = full("mods/(beta)+[1].dll");
        assert!(glob.test("mods/(beta)+[1].dll"));
        let glob = full("mods/*.d+l");
        assert!(glob.test("mods/x.d+l"));
        assert!(!glob.test("mods/x.ddl"));
    }

    #[test]
    fn prefix_mode_matches_ancestors() {
        let glob = prefix("BepInEx/plugins/*/config.json");
        assert!(glob.test("BepInEx"));
        assert!(glob.test("BepInEx/plugins"));
        assert!(glob.test("BepInEx/plugins/SAIN"));
        assert!(!glob.test("BepInEx/plugins/SAIN/config.json"));
        assert!(!glob.test("BepInEx/patchers"));
        assert!(!glob.test("user"));
    }

    #[test]
    fn prefix_mode_with_double_star() {
        let glob = prefix("**/*.nosync");
        assert!(glob.test("anything"));
        assert!(glob.test("a/b/c"));

        let glob = prefix("user/cache/**");
        assert!(glob.test("user"));
        assert!(glob.test("user/cache"));
        assert!(glob.test("user/cache/deep"));
        assert!(!glob.test("user/mods"));
    }

    #[test]
    fn route_patterns() {
        let glob = full("/modsync/fetch/**");
        assert!(glob.test("/modsync/fetch/BepInEx%2Fplugins%2FSAIN.dll"));
        assert!(!glob.test("/modsync/hashes"));
    }

    #[test]
    fn invalid_double_star() {
        assert!(matches!(
            Glob::new("plugins/a**b"),
            Err(CoreError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn mode_switch() {
        let glob = full("a/b/c");
        assert!(!glob.test("a/b"));
        assert!(glob.with_mode(GlobMode::Prefix).test("a/b"));
        assert_eq!(glob.with_mode(GlobMode::Prefix).pattern(), "a/b/c");
    }

    proptest! {
        #[test]
        fn literal_path_matches_itself(parts in prop::collection::vec("[A-Za-z0-9_.-]{1,8}", 1..5)) {
            let path = parts.join("/");
            let glob = Glob::new(&path).unwrap();
            prop_assert!(glob.test(&path));
            prop_assert!(glob.test(&path.to_uppercase()));
            prop_assert!(glob.test(&parts.join("\\")));
        }

        #[test]
        fn every_ancestor_prefix_matches(parts in prop::collection::vec("[a-z0-9]{1,8}", 2..6)) {
            let glob = Glob::compile(&parts.join("/"), GlobMode::Prefix).unwrap();
            for depth in 1..parts.len() {
                prop_assert!(glob.test(&parts[..depth].join("/")));
            }
            prop_assert!(!glob.test(&parts.join("/")));
        }
    }
}

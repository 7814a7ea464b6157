//! Tab-completion engine and shell protocol.
//!
//! The engine answers "what could complete this prefix" from the documented
//! commands and options, in declaration order. The shell side drives it
//! through the `SK_COMPLETE` environment variable: its value is the 1-based
//! index of the word being completed, so the parser only sees the words
//! before the cursor. Output is a fixed type-marker line followed by one
//! `candidate<TAB>description` line per match.

use crate::docs::Usage;
use crate::options::Options;

/// Environment variable carrying the index of the word being completed.
pub const COMPLETE_ENV: &str = "SK_COMPLETE";

/// First line of every completion reply; tells the shell glue how to
/// interpret the candidate lines.
pub const TYPE_MARKER: &str = "plain";

/// A pending completion request decoded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The partially typed word (may be empty).
    pub prefix: String,
    /// Number of argv tokens visible to the argument parser.
    pub visible: usize,
}

impl Request {
    /// Decode a completion request from `SK_COMPLETE` against the full
    /// argument vector. Returns `None` when no completion is in progress
    /// or the variable does not hold a positive word index.
    #[must_use]
    pub fn from_env(argv: &[String]) -> Option<Request> {
        let word: usize = std::env::var(COMPLETE_ENV).ok()?.parse().ok()?;
        if word == 0 {
            return None;
        }
        Some(Request {
            prefix: argv.get(word).cloned().unwrap_or_default(),
            visible: word.min(argv.len()),
        })
    }
}

/// Answer a completion query for `prefix`.
///
/// The raw prefix decides which namespaces are searched (`--` long flags,
/// single `-` short flags, a lone `-` both, a bare word commands, an empty
/// prefix everything); matching is a case-sensitive starts-with test on the
/// bare identifier after stripping leading dashes. Candidates come back in
/// declaration order, flags rendered with their dashes.
#[must_use]
pub fn complete(prefix: &str, usage: &Usage, options: &Options) -> Vec<(String, String)> {
    let (check_long, check_short, check_command) = match prefix {
        "" => (true, true, true),
        "-" => (true, true, false),
        p if p.starts_with("--") => (true, false, false),
        p if p.starts_with('-') => (false, true, false),
        _ => (false, false, true),
    };

    let bare = prefix.trim_start_matches('-');
    let mut candidates = Vec::new();

    for &id in &usage.option_ids {
        let record = options.record(id);
        if check_long && !record.long_name.is_empty() && record.long_name.starts_with(bare) {
            candidates.push((format!("--{}", record.long_name), record.description.clone()));
        }
        if check_short && !record.short_name.is_empty() && record.short_name.starts_with(bare) {
            candidates.push((format!("-{}", record.short_name), record.description.clone()));
        }
    }

    for command in &usage.commands {
        if check_command && command.name.starts_with(bare) {
            candidates.push((command.name.clone(), command.description.clone()));
        }
    }

    candidates
}

/// Render a completion reply: the type marker, then one tab-separated
/// candidate line per match.
#[must_use]
pub fn render(candidates: &[(String, String)]) -> String {
    let mut out = String::from(TYPE_MARKER);
    for (candidate, description) in candidates {
        out.push('\n');
        out.push_str(candidate);
        out.push('\t');
        out.push_str(description);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::docs::Usage;

    const DOC: &str = "
      Commands:
        build    Build the project
        bench    Run benchmarks
        clean    Remove artifacts

      Options:
        -a, --all       Apply to everything
        -v, --verbose   Print more
        --store <dir>   Store directory
      ";

    fn fixture() -> (Usage, Options) {
        let mut options = Options::new();
        let usage = Usage::parse(DOC, &mut options);
        (usage, options)
    }

    fn names(candidates: &[(String, String)]) -> Vec<&str> {
        candidates.iter().map(|(c, _)| c.as_str()).collect()
    }

    #[test]
    fn test_empty_prefix_lists_everything_in_declaration_order() {
        let (usage, options) = fixture();
        let candidates = complete("", &usage, &options);
        assert_eq!(
            names(&candidates),
            vec!["--all", "-a", "--verbose", "-v", "--store", "build", "bench", "clean"]
        );
    }

    #[test]
    fn test_single_dash_lists_flags_only() {
        let (usage, options) = fixture();
        let candidates = complete("-", &usage, &options);
        assert_eq!(
            names(&candidates),
            vec!["--all", "-a", "--verbose", "-v", "--store"]
        );
    }

    #[test]
    fn test_double_dash_prefix_narrows_long_flags() {
        let (usage, options) = fixture();
        let candidates = complete("--v", &usage, &options);
        assert_eq!(names(&candidates), vec!["--verbose"]);
    }

    #[test]
    fn test_short_prefix_matches_short_flags_only() {
        let (usage, options) = fixture();
        let candidates = complete("-v", &usage, &options);
        assert_eq!(names(&candidates), vec!["-v"]);
    }

    #[test]
    fn test_bare_prefix_matches_commands_only() {
        let (usage, options) = fixture();
        let candidates = complete("b", &usage, &options);
        assert_eq!(names(&candidates), vec!["build", "bench"]);
    }

    #[test]
    fn test_no_match_yields_empty() {
        let (usage, options) = fixture();
        assert!(complete("zzz", &usage, &options).is_empty());
        assert!(complete("--zzz", &usage, &options).is_empty());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let (usage, options) = fixture();
        assert!(complete("B", &usage, &options).is_empty());
    }

    #[test]
    fn test_render_has_marker_and_tab_separated_lines() {
        let candidates = vec![
            ("build".to_string(), "Build the project".to_string()),
            ("--all".to_string(), "Apply to everything".to_string()),
        ];
        let rendered = render(&candidates);
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some(TYPE_MARKER));
        assert_eq!(lines.next(), Some("build\tBuild the project"));
        assert_eq!(lines.next(), Some("--all\tApply to everything"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_render_empty_is_just_the_marker() {
        assert_eq!(render(&[]), TYPE_MARKER);
    }
}

//! Hand-written argument parser for the docopt-style CLI surface.
//!
//! The grammar is `program [subcommand...] [options...] [rest...] [-- extra...]`:
//! leading non-dash tokens are subcommands, dash tokens are options written
//! through the registry, a bare token after the options starts the
//! rest-argument capture, and everything after an explicit `--` passes
//! through unparsed.

use crate::errors::{Error, Result};
use crate::options::Options;

/// Result of parsing one process argument vector.
#[derive(Debug, Default)]
pub struct Args {
    pub program: String,
    pub subcommands: Vec<String>,
    pub rest_arguments: Vec<String>,
    pub extra_arguments: Vec<String>,
    pub options: Options,
}

impl Args {
    /// Parse a raw argument vector (`argv[0]` is the program name).
    ///
    /// In a short-option cluster a trailing bare token is consumed as the
    /// value of the cluster's *last* letter (`-bc 2` sets `b=true, c=2`);
    /// `=` binds a value to the letter immediately preceding it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] when a rest-argument run contains a
    /// dash-prefixed token before an explicit `--` separator. Everything
    /// else parses to *some* `Args`.
    pub fn parse(argv: &[String]) -> Result<Args> {
        let mut args = Args {
            program: argv.first().cloned().unwrap_or_default(),
            ..Args::default()
        };

        let mut i = 1;
        while i < argv.len() && !argv[i].starts_with('-') {
            args.subcommands.push(argv[i].clone());
            i += 1;
        }

        while i < argv.len() {
            let arg = &argv[i];

            if arg == "--" {
                args.extra_arguments.extend(argv[i + 1..].iter().cloned());
                break;
            } else if arg.len() > 1 && arg.starts_with('-') && !arg.starts_with("--") {
                i = args.parse_short_cluster(argv, i);
            } else if arg.len() > 2 && arg.starts_with("--") {
                i = args.parse_long_option(argv, i);
            } else {
                i = args.parse_rest_run(argv, i)?;
                continue;
            }

            i += 1;
        }

        Ok(args)
    }

    /// Parse a `-xyz`, `-x=v` or `-xy v` token at `argv[i]`; returns the
    /// index of the last consumed token.
    fn parse_short_cluster(&mut self, argv: &[String], i: usize) -> usize {
        let chars: Vec<char> = argv[i].chars().collect();
        let mut consumed = i;

        let mut j = 1;
        while j < chars.len() {
            if chars[j] == '=' {
                if j > 1 {
                    let name = chars[j - 1].to_string();
                    let value: String = chars[j + 1..].iter().collect();
                    self.options.set_short(&name, value);
                }
                break;
            }
            let name = chars[j].to_string();
            if j == chars.len() - 1 && i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                consumed = i + 1;
                self.options.set_short(&name, argv[consumed].clone());
                break;
            }
            self.options.set_short(&name, "true".to_string());
            j += 1;
        }

        consumed
    }

    /// Parse a `--name`, `--name=value` or `--name value` token at
    /// `argv[i]`; returns the index of the last consumed token.
    fn parse_long_option(&mut self, argv: &[String], i: usize) -> usize {
        let body = &argv[i][2..];

        if let Some((name, value)) = body.split_once('=') {
            self.options.set_long(name, value.to_string());
            i
        } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
            self.options.set_long(body, argv[i + 1].clone());
            i + 1
        } else {
            self.options.set_long(body, "true".to_string());
            i
        }
    }

    /// Capture a rest-argument run starting at `argv[i]`; returns the index
    /// of the first unconsumed token (either `--` or the end of input). The
    /// initiating token is always captured; a bare `-` is a valid rest
    /// argument when it opens the run.
    fn parse_rest_run(&mut self, argv: &[String], i: usize) -> Result<usize> {
        let mut j = i + 1;
        while j < argv.len() {
            if argv[j] == "--" {
                break;
            }
            if argv[j].starts_with('-') {
                return Err(Error::Usage(format!(
                    "unexpected flag `{}` after positional arguments; separate pass-through flags with `--`",
                    argv[j]
                )));
            }
            j += 1;
        }
        self.rest_arguments.extend(argv[i..j].iter().cloned());
        Ok(j)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(tokens: &[&str]) -> Args {
        let argv: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        Args::parse(&argv).unwrap()
    }

    #[test]
    fn test_short_cluster() {
        let args = parse(&["test", "-ab"]);
        assert_eq!(args.program, "test");
        assert!(args.subcommands.is_empty());
        let map = args.options.to_map();
        assert_eq!(map.get("a").map(String::as_str), Some("true"));
        assert_eq!(map.get("b").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_subcommand_with_cluster_equals_and_long_equals() {
        let args = parse(&["test", "sub", "-a", "-bc=2", "--flag=1"]);
        assert_eq!(args.subcommands, vec!["sub"]);
        let map = args.options.to_map();
        assert_eq!(map.get("a").map(String::as_str), Some("true"));
        assert_eq!(map.get("b").map(String::as_str), Some("true"));
        assert_eq!(map.get("c").map(String::as_str), Some("2"));
        assert_eq!(map.get("flag").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_cluster_last_letter_consumes_value_token() {
        let args = parse(&[
            "test", "sub", "-a", "-bc", "2", "--path", "your_path", "--flag", "--", "--build",
            "--", "-j3",
        ]);
        assert_eq!(args.subcommands, vec!["sub"]);
        let map = args.options.to_map();
        assert_eq!(map.get("a").map(String::as_str), Some("true"));
        assert_eq!(map.get("b").map(String::as_str), Some("true"));
        assert_eq!(map.get("c").map(String::as_str), Some("2"));
        assert_eq!(map.get("path").map(String::as_str), Some("your_path"));
        assert_eq!(map.get("flag").map(String::as_str), Some("true"));
        assert_eq!(args.extra_arguments, vec!["--build", "--", "-j3"]);
    }

    #[test]
    fn test_rest_arguments() {
        let args = parse(&["test", "sub", "-a", "--path", "your_path", "rest1", "rest2"]);
        assert_eq!(args.subcommands, vec!["sub"]);
        let map = args.options.to_map();
        assert_eq!(map.get("a").map(String::as_str), Some("true"));
        assert_eq!(map.get("path").map(String::as_str), Some("your_path"));
        assert_eq!(args.rest_arguments, vec!["rest1", "rest2"]);
        assert!(args.extra_arguments.is_empty());
    }

    #[test]
    fn test_rest_then_extra_arguments() {
        let args = parse(&[
            "test", "sub", "-a", "--path", "your_path", "rest1", "rest2", "--", "--build", "--",
            "-j3",
        ]);
        assert_eq!(args.subcommands, vec!["sub"]);
        assert_eq!(args.rest_arguments, vec!["rest1", "rest2"]);
        assert_eq!(args.extra_arguments, vec!["--build", "--", "-j3"]);
    }

    #[test]
    fn test_rest_arguments_captured_exactly_once() {
        // The `=`-bound option ends the subcommand run without consuming
        // the following bare token, so the rest capture starts at `rest1`.
        let args = parse(&["test", "sub", "-a=1", "rest1", "rest2", "rest3"]);
        assert_eq!(args.subcommands, vec!["sub"]);
        assert_eq!(args.rest_arguments, vec!["rest1", "rest2", "rest3"]);
    }

    #[test]
    fn test_flag_after_rest_argument_is_a_usage_error() {
        for argv in [
            vec!["test", "sub", "-a=1", "rest1", "-x"],
            vec!["test", "-a=1", "rest1", "--flag"],
            vec!["test", "sub", "-a", "rest1", "rest2", "-j3"],
        ] {
            let tokens: Vec<String> = argv.iter().map(ToString::to_string).collect();
            assert!(
                matches!(Args::parse(&tokens), Err(Error::Usage(_))),
                "expected a usage error for {argv:?}"
            );
        }
    }

    #[test]
    fn test_subcommands_stop_at_first_dash_token() {
        let args = parse(&["test", "one", "two", "-a", "three", "four"]);
        assert_eq!(args.subcommands, vec!["one", "two"]);
        // `-a` consumed "three" as its value, so the rest run starts after.
        assert_eq!(args.options.to_map().get("a").map(String::as_str), Some("three"));
        assert_eq!(args.rest_arguments, vec!["four"]);
    }

    #[test]
    fn test_long_option_value_from_next_token() {
        let args = parse(&["test", "--store", "/tmp/store"]);
        assert_eq!(
            args.options.to_map().get("store").map(String::as_str),
            Some("/tmp/store")
        );
    }

    #[test]
    fn test_lone_double_dash_passes_everything_through() {
        let args = parse(&["test", "--", "-a", "sub", "--flag"]);
        assert!(args.subcommands.is_empty());
        assert!(args.options.to_map().is_empty());
        assert_eq!(args.extra_arguments, vec!["-a", "sub", "--flag"]);
    }

    #[test]
    fn test_empty_argv() {
        let args = parse(&["test"]);
        assert!(args.subcommands.is_empty());
        assert!(args.rest_arguments.is_empty());
        assert!(args.extra_arguments.is_empty());
    }

    #[test]
    fn test_equals_inside_cluster_binds_preceding_letter() {
        let args = parse(&["test", "-ab=7"]);
        let map = args.options.to_map();
        assert_eq!(map.get("a").map(String::as_str), Some("true"));
        assert_eq!(map.get("b").map(String::as_str), Some("7"));
    }
}

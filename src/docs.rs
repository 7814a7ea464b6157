//! Usage-documentation parser.
//!
//! The script's `doc` string is free text containing case-insensitive
//! `Commands:` and `Options:` headed sections whose bodies are indented
//! lines. Entries populate the option registry and an insertion-ordered
//! command list that later drive completion, `--help` and `--inspect`.
//! A malformed entry never fails the whole parse; it is logged and skipped.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::options::{OptionId, Options};

/// One documented subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDoc {
    pub name: String,
    pub description: String,
}

/// The documented surface of the CLI: commands and option ids in
/// declaration order.
#[derive(Debug, Default)]
pub struct Usage {
    pub commands: Vec<CommandDoc>,
    pub option_ids: Vec<OptionId>,
}

// `-x, --longname <type>  description`; the short flag and the type are
// optional. Entries are whitespace-normalized before matching.
#[allow(clippy::expect_used)]
fn option_entry_re() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:-(\w)[, ]+)?--(\w+)(?:\s+<(\w+)>)?\s+(.+)$").expect("valid pattern")
    });
    &RE
}

// `name  description`
#[allow(clippy::expect_used)]
fn command_entry_re() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(\S+)\s+(.+)$").expect("valid pattern"));
    &RE
}

impl Usage {
    /// Parse documentation text, populating `options` and returning the
    /// documented surface.
    pub fn parse(doc: &str, options: &mut Options) -> Usage {
        let mut usage = Usage::default();
        usage.parse_commands(doc);
        usage.parse_options(doc, options);
        usage
    }

    fn parse_commands(&mut self, doc: &str) {
        for section in sections(doc, "commands:") {
            for line in section.lines() {
                let entry = line.trim();
                if entry.is_empty() {
                    continue;
                }
                let Some(caps) = command_entry_re().captures(entry) else {
                    warn!("skipping malformed command entry \"{entry}\"");
                    continue;
                };
                let name = caps[1].to_string();
                if self.commands.iter().any(|c| c.name == name) {
                    continue;
                }
                self.commands.push(CommandDoc {
                    name,
                    description: caps[2].to_string(),
                });
            }
        }
    }

    fn parse_options(&mut self, doc: &str, options: &mut Options) {
        for section in sections(doc, "options:") {
            for entry in split_option_entries(&section) {
                if !entry.starts_with('-') {
                    warn!("skipping malformed option entry \"{entry}\"");
                    continue;
                }
                let Some(caps) = option_entry_re().captures(&entry) else {
                    warn!("skipping malformed option entry \"{entry}\"");
                    continue;
                };
                let short = caps.get(1).map_or("", |m| m.as_str());
                let long = &caps[2];
                let value_type = caps.get(3).map_or("", |m| m.as_str());
                let description = &caps[4];

                let id = options.add_documented(short, long, value_type, description);
                if !self.option_ids.contains(&id) {
                    self.option_ids.push(id);
                }
            }
        }
    }
}

/// Extract every section whose heading line contains `heading`
/// (case-insensitively). A section body is the remainder of the heading
/// line after its colon plus all immediately following indented lines;
/// the first non-indented line ends it.
fn sections(doc: &str, heading: &str) -> Vec<String> {
    let mut found = Vec::new();
    let lines: Vec<&str> = doc.lines().collect();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if !line.to_lowercase().contains(heading) {
            i += 1;
            continue;
        }

        let mut body = String::new();
        if let Some(colon) = line.find(':') {
            body.push_str(&line[colon + 1..]);
        }
        i += 1;
        while i < lines.len() && lines[i].starts_with([' ', '\t']) {
            body.push('\n');
            body.push_str(lines[i]);
            i += 1;
        }
        found.push(body);
    }

    found
}

/// Split an options-section body into entries. An entry starts at a line
/// whose first non-whitespace character is a dash; continuation lines are
/// folded into their owning entry with whitespace runs collapsed to single
/// spaces.
fn split_option_entries(body: &str) -> Vec<String> {
    let mut entries: Vec<Vec<&str>> = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('-') || entries.is_empty() {
            entries.push(vec![trimmed]);
        } else if let Some(current) = entries.last_mut() {
            current.push(trimmed);
        }
    }

    entries
        .into_iter()
        .map(|parts| {
            parts
                .join(" ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

//! Top-level dispatcher.
//!
//! The one place where all errors converge: `run` wires the pipeline
//! (argv → documentation merge → script call → task) and returns either an
//! exit status or a typed error; `main` alone turns the error into a
//! process exit code.

use serde::Serialize;
use tracing::debug;

use crate::args::Args;
use crate::complete::{self, Request};
use crate::docs::{CommandDoc, Usage};
use crate::errors::{Error, Result};
use crate::options::OptionRecord;
use crate::script::ScriptEngine;
use crate::store;
use crate::task::TaskSpec;
use crate::value::{marshal, Value};

const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the CLI against a raw argument vector and return the process exit
/// status.
///
/// # Errors
///
/// Every failure mode of the pipeline surfaces here as a typed
/// [`Error`]; the caller maps it to an exit code.
pub fn run(argv: &[String]) -> Result<i32> {
    if let Some(request) = Request::from_env(argv) {
        return run_completion(argv, &request);
    }

    let mut args = Args::parse(argv)?;

    if args.options.is_true("version") {
        println!("sk {PKG_VERSION}");
        return Ok(0);
    }

    let store_dir = store::resolve_store(&args.options)?;
    let script = store::script_path(&store_dir)?;
    let engine = ScriptEngine::load_file(&script)?;

    let doc = engine.doc_string();
    let usage = doc
        .as_deref()
        .map(|text| Usage::parse(text, &mut args.options))
        .unwrap_or_default();

    if args.options.is_true("help") {
        match &doc {
            Some(text) => println!("{}", text.trim_end()),
            None => println!("sk: the loaded script declares no documentation"),
        }
        return Ok(0);
    }

    if args.options.is_true("inspect") {
        println!("{}", inspect_json(&usage, &args)?);
        return Ok(0);
    }

    let Some(subcommand) = args.subcommands.first().cloned() else {
        return Err(Error::Usage("no subcommand specified".to_string()));
    };

    if !engine.exports(&subcommand) {
        return Err(Error::ScriptLookup(subcommand));
    }

    let spec = call_subcommand(&engine, &subcommand, &args)?;
    debug!("task: {spec:?}");
    spec.run()
}

/// Marshal the CLI context and call the subcommand's handler.
fn call_subcommand(engine: &ScriptEngine, subcommand: &str, args: &Args) -> Result<TaskSpec> {
    let cwd = std::env::current_dir()
        .map_err(|e| Error::Config(format!("cannot determine working directory: {e}")))?;

    let context: Vec<Value> = vec![
        marshal(cwd.to_string_lossy().to_string()),
        marshal(args.subcommands.clone()),
        marshal(args.options.to_map()),
        marshal(args.rest_arguments.clone()),
    ];

    engine
        .call(subcommand, &context)
        .ok_or_else(|| Error::ScriptCall(subcommand.to_string()))
}

/// Serve a completion request. Candidate preparation may fail for any of
/// the usual reasons (bad store, broken script, unparsable partial command
/// line); completion must never break the user's shell, so all of those
/// degrade to an empty reply with exit 0.
fn run_completion(argv: &[String], request: &Request) -> Result<i32> {
    let candidates = completion_candidates(argv, request).unwrap_or_default();
    println!("{}", complete::render(&candidates));
    Ok(0)
}

fn completion_candidates(argv: &[String], request: &Request) -> Result<Vec<(String, String)>> {
    let mut args = Args::parse(&argv[..request.visible])?;

    let store_dir = store::resolve_store(&args.options)?;
    let script = store::script_path(&store_dir)?;
    let engine = ScriptEngine::load_file(&script)?;

    let doc = engine.doc_string().unwrap_or_default();
    let usage = Usage::parse(&doc, &mut args.options);

    Ok(complete::complete(&request.prefix, &usage, &args.options))
}

#[derive(Serialize)]
struct InspectDump<'a> {
    commands: &'a [CommandDoc],
    options: Vec<&'a OptionRecord>,
}

/// Dump the documented surface as pretty JSON (tooling hook).
fn inspect_json(usage: &Usage, args: &Args) -> Result<String> {
    let dump = InspectDump {
        commands: &usage.commands,
        options: usage
            .option_ids
            .iter()
            .map(|&id| args.options.record(id))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&dump)?)
}

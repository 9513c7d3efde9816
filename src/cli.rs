//! # Command-Line Interface / 命令行接口
//!
//! Builds the `front-runner` command tree and dispatches to the commands:
//! `find`, `run` and `find-and-run`.
//!
//! 构建 `front-runner` 命令树并分派到各命令：`find`、`run` 和 `find-and-run`。

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::{env, path::PathBuf};

use crate::core::planner::ExplicitOption;
use crate::infra::{
    logging::{LogLevel, init_logger},
    t,
};

pub mod commands;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|arg| arg == "--lang")
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

fn assembly_args(locale: &str) -> Vec<Arg> {
    vec![
        Arg::new("assembly")
            .help(t!("cli.arg_assembly", locale = locale).to_string())
            .value_name("ASSEMBLY")
            .required(true)
            .value_parser(clap::value_parser!(PathBuf)),
        Arg::new("assembly-config")
            .long("assembly-config")
            .help(t!("cli.arg_assembly_config", locale = locale).to_string())
            .value_name("PATH")
            .value_parser(clap::value_parser!(PathBuf))
            .action(ArgAction::Set),
        Arg::new("no-shadow-copy")
            .long("no-shadow-copy")
            .help(t!("cli.arg_no_shadow_copy", locale = locale).to_string())
            .action(ArgAction::SetTrue),
        Arg::new("isolation")
            .long("isolation")
            .help(t!("cli.arg_isolation", locale = locale).to_string())
            .value_name("MODE")
            .value_parser(["required", "not-required"])
            .action(ArgAction::Set),
        Arg::new("isolation-culture")
            .long("isolation-culture")
            .help(t!("cli.arg_isolation_culture", locale = locale).to_string())
            .value_name("CULTURE")
            .action(ArgAction::Set),
    ]
}

fn discovery_args(locale: &str) -> Vec<Arg> {
    vec![
        Arg::new("source-info")
            .long("source-info")
            .help(t!("cli.arg_source_info", locale = locale).to_string())
            .action(ArgAction::SetTrue),
        Arg::new("allow-empty-theories")
            .long("allow-empty-theories")
            .help(t!("cli.arg_allow_empty_theories", locale = locale).to_string())
            .action(ArgAction::SetTrue),
        Arg::new("filter-method")
            .long("filter-method")
            .help(t!("cli.arg_filter_method", locale = locale).to_string())
            .value_name("PATTERN")
            .action(ArgAction::Append),
        Arg::new("trait")
            .long("trait")
            .help(t!("cli.arg_trait", locale = locale).to_string())
            .value_name("NAME=VALUE")
            .value_parser(commands::parse_trait)
            .action(ArgAction::Append),
        Arg::new("exclude-trait")
            .long("exclude-trait")
            .help(t!("cli.arg_exclude_trait", locale = locale).to_string())
            .value_name("NAME=VALUE")
            .value_parser(commands::parse_trait)
            .action(ArgAction::Append),
    ]
}

fn execution_args(locale: &str) -> Vec<Arg> {
    vec![
        Arg::new("explicit")
            .long("explicit")
            .help(t!("cli.arg_explicit", locale = locale).to_string())
            .value_name("MODE")
            .value_parser(clap::value_parser!(ExplicitOption))
            .action(ArgAction::Set),
        Arg::new("culture")
            .long("culture")
            .help(t!("cli.arg_culture", locale = locale).to_string())
            .value_name("CULTURE")
            .action(ArgAction::Set),
        Arg::new("parallel")
            .short('j')
            .long("parallel")
            .help(t!("cli.arg_parallel", locale = locale).to_string())
            .value_name("THREADS")
            .value_parser(clap::value_parser!(usize))
            .action(ArgAction::Set),
        Arg::new("stop-on-fail")
            .long("stop-on-fail")
            .help(t!("cli.arg_stop_on_fail", locale = locale).to_string())
            .action(ArgAction::SetTrue),
    ]
}

fn build_cli(locale: &str) -> Command {
    Command::new("front-runner")
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help(t!("cli.arg_config", locale = locale).to_string())
                .value_name("CONFIG")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help(t!("cli.arg_json", locale = locale).to_string())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help(t!("cli.arg_log_level", locale = locale).to_string())
                .value_name("LEVEL")
                .global(true)
                .default_value("warn")
                .value_parser(clap::value_parser!(LogLevel))
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("find")
                .about(t!("cli.cmd_find_about", locale = locale).to_string())
                .args(assembly_args(locale))
                .args(discovery_args(locale))
                .arg(
                    Arg::new("show-tokens")
                        .long("show-tokens")
                        .help(t!("cli.arg_show_tokens", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about", locale = locale).to_string())
                .args(assembly_args(locale))
                .args(execution_args(locale))
                .arg(
                    Arg::new("token")
                        .long("token")
                        .help(t!("cli.arg_token", locale = locale).to_string())
                        .value_name("TOKEN")
                        .allow_hyphen_values(true)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("tokens-file")
                        .long("tokens-file")
                        .help(t!("cli.arg_tokens_file", locale = locale).to_string())
                        .value_name("PATH")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("find-and-run")
                .about(t!("cli.cmd_find_and_run_about", locale = locale).to_string())
                .args(assembly_args(locale))
                .args(discovery_args(locale))
                .args(execution_args(locale)),
        )
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let explicit_language = pre_parse_language();
    match &explicit_language {
        Some(language) => rust_i18n::set_locale(language),
        None => crate::init(),
    }
    let language = rust_i18n::locale().to_string();

    let matches = build_cli(&language).get_matches();
    init_logger(matches.get_one::<LogLevel>("log-level").copied().unwrap_or_default());

    let global = commands::GlobalOptions::from_matches(&matches, explicit_language.is_some())?;

    match matches.subcommand() {
        Some(("find", find_matches)) => commands::find::execute(&global, find_matches).await,
        Some(("run", run_matches)) => commands::run::execute_run(&global, run_matches).await,
        Some(("find-and-run", run_matches)) => {
            commands::run::execute_find_and_run(&global, run_matches).await
        }
        // Clap prints help when no subcommand is given.
        _ => Ok(()),
    }
}

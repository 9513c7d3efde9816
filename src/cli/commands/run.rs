//! # Run Command Module / 运行命令模块
//!
//! Implements `run`, which executes previously emitted tokens, and
//! `find-and-run`, which discovers and executes in one pass. Both fail the
//! process when any case failed.
//!
//! 实现 `run`（执行之前发出的令牌）和 `find-and-run`（一次完成发现与执行）。
//! 只要有用例失败，两者都会使进程失败。

use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::*;
use std::{fs, path::PathBuf};

use super::{
    GlobalOptions, build_controller, discovery_options, execution_options, finish_reporting,
    project_from, setup_signal_handler, spawn_reporter,
};
use crate::{
    core::{
        MessageBus, RunSummary,
        bus::EventKind,
        config::{FindAndRunSettings, RunSettings},
    },
    infra::t,
    reporting::OutputFormat,
};

/// Executes the `run` command.
pub async fn execute_run(global: &GlobalOptions, matches: &ArgMatches) -> Result<()> {
    let tokens = collect_tokens(matches)?;
    if tokens.is_empty() {
        bail!(t!("cli.no_tokens", locale = &global.language).to_string());
    }

    let project = project_from(matches, &global.config)?;
    let settings = RunSettings::new(execution_options(matches, &global.config), tokens);
    let controller = build_controller(&project, &global.language)?;
    let cancel = setup_signal_handler(&global.language);

    let bus = MessageBus::new();
    let reporter = spawn_reporter(&bus, EventKind::TestAssemblyFinished, global, false);
    let outcome = controller.run(&bus, &settings, cancel).await;
    let summary = finish_reporting(bus, reporter, outcome).await?;

    conclude(global, &summary)
}

/// Executes the `find-and-run` command.
pub async fn execute_find_and_run(global: &GlobalOptions, matches: &ArgMatches) -> Result<()> {
    let project = project_from(matches, &global.config)?;
    let settings = FindAndRunSettings::new(
        discovery_options(matches, &global.config),
        execution_options(matches, &global.config),
    );
    let controller = build_controller(&project, &global.language)?;
    let cancel = setup_signal_handler(&global.language);

    let bus = MessageBus::new();
    let reporter = spawn_reporter(&bus, EventKind::TestAssemblyFinished, global, false);
    let outcome = controller.find_and_run(&bus, &settings, cancel).await;
    let summary = finish_reporting(bus, reporter, outcome).await?;

    conclude(global, &summary)
}

/// Tokens from `--token` arguments followed by the non-blank lines of `--tokens-file`.
fn collect_tokens(matches: &ArgMatches) -> Result<Vec<String>> {
    let mut tokens: Vec<String> = matches
        .get_many::<String>("token")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    if let Some(path) = matches.get_one::<PathBuf>("tokens-file") {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read tokens file: {}", path.display()))?;
        tokens.extend(
            content
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string),
        );
    }
    Ok(tokens)
}

fn conclude(global: &GlobalOptions, summary: &RunSummary) -> Result<()> {
    if summary.failed > 0 {
        bail!(
            t!(
                "cli.tests_failed",
                locale = &global.language,
                count = summary.failed
            )
            .to_string()
        );
    }
    if global.format == OutputFormat::Human {
        println!(
            "\n{}",
            t!("cli.all_tests_passed", locale = &global.language).green().bold()
        );
    }
    Ok(())
}

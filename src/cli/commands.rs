//! # Commands Module / 命令模块
//!
//! Shared plumbing for the CLI commands: configuration loading, option
//! assembly from flags, the Ctrl-C handler and the event reporter task.
//!
//! CLI 命令共享的基础设施：配置加载、根据参数组装选项、Ctrl-C 处理器以及事件报告任务。

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::*;
use std::path::PathBuf;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::{
    bus::{EventKind, MessageBus},
    config::{DiscoveryOptions, ExecutionOptions, IsolationMode, RunnerConfig, load_runner_config},
    controller::FrontController,
    error::OrchestrationError,
    planner::ExplicitOption,
};
use crate::infra::{
    loader::{ManifestLoader, ProjectAssembly},
    t,
};
use crate::reporting::console::{ConsoleReporter, OutputFormat, report_until};

pub mod find;
pub mod run;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "front-runner.toml";

/// Options shared by every command.
/// 所有命令共享的选项。
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub language: String,
    pub format: OutputFormat,
    pub config: RunnerConfig,
}

impl GlobalOptions {
    /// Loads the runner config; its `language` applies unless `--lang` was given.
    pub fn from_matches(matches: &ArgMatches, language_from_cli: bool) -> Result<Self> {
        let config_path = match matches.get_one::<PathBuf>("config") {
            Some(path) => Some(path.clone()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|path| path.is_file()),
        };
        let config = match &config_path {
            Some(path) => load_runner_config(path)?,
            None => RunnerConfig::default(),
        };

        if !language_from_cli && config_path.is_some() {
            rust_i18n::set_locale(&config.language);
        }

        Ok(Self {
            language: rust_i18n::locale().to_string(),
            format: if matches.get_flag("json") {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            },
            config,
        })
    }
}

/// Parses a `NAME=VALUE` trait filter.
pub fn parse_trait(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

pub fn project_from(matches: &ArgMatches, config: &RunnerConfig) -> Result<ProjectAssembly> {
    let assembly = matches
        .get_one::<PathBuf>("assembly")
        .context("missing assembly path")?;

    let mut isolation = config.isolation.clone();
    if matches.get_flag("no-shadow-copy") {
        isolation.shadow_copy = false;
    }
    match matches.get_one::<String>("isolation").map(String::as_str) {
        Some("required") => isolation.isolation = IsolationMode::Required,
        Some("not-required") => isolation.isolation = IsolationMode::NotRequired,
        _ => {}
    }
    if let Some(culture) = matches.get_one::<String>("isolation-culture") {
        isolation.culture = Some(culture.clone());
    }

    let mut project = ProjectAssembly::new(assembly.clone()).with_isolation(isolation);
    if let Some(config_path) = matches.get_one::<PathBuf>("assembly-config") {
        project = project.with_config(config_path.clone());
    }
    Ok(project)
}

pub fn discovery_options(matches: &ArgMatches, config: &RunnerConfig) -> DiscoveryOptions {
    let mut options = config.discovery.clone();
    if matches.get_flag("source-info") {
        options.include_source_information = true;
    }
    if matches.get_flag("allow-empty-theories") {
        options.flag_theories_without_data = false;
    }
    if let Some(patterns) = matches.get_many::<String>("filter-method") {
        options.filters.methods.extend(patterns.cloned());
    }
    if let Some(traits) = matches.get_many::<(String, String)>("trait") {
        options.filters.include_traits.extend(traits.cloned());
    }
    if let Some(traits) = matches.get_many::<(String, String)>("exclude-trait") {
        options.filters.exclude_traits.extend(traits.cloned());
    }
    options
}

pub fn execution_options(matches: &ArgMatches, config: &RunnerConfig) -> ExecutionOptions {
    let mut options = config.execution.clone();
    if let Some(explicit) = matches.get_one::<ExplicitOption>("explicit") {
        options.explicit = *explicit;
    }
    if let Some(culture) = matches.get_one::<String>("culture") {
        options.culture = Some(culture.clone());
    }
    if let Some(parallel) = matches.get_one::<usize>("parallel") {
        options.max_parallel_threads = *parallel;
    }
    if matches.get_flag("stop-on-fail") {
        options.stop_on_fail = true;
    }
    options
}

pub fn build_controller(project: &ProjectAssembly, locale: &str) -> Result<FrontController> {
    FrontController::for_discovery_and_execution(project, &ManifestLoader, None).with_context(|| {
        t!(
            "cli.load_failed",
            locale = locale,
            path = project.assembly_path.display()
        )
        .to_string()
    })
}

/// Sets up a signal handler for graceful shutdown.
pub fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", t!("cli.shutdown_signal", locale = &locale).yellow());
            token_clone.cancel();
        }
    });

    token
}

/// Subscribes a reporter to `bus` that stops after the first `last` event.
pub fn spawn_reporter(
    bus: &MessageBus,
    last: EventKind,
    global: &GlobalOptions,
    show_tokens: bool,
) -> JoinHandle<Result<()>> {
    let subscription = bus.subscribe();
    let reporter = ConsoleReporter::new(&global.language).with_tokens(show_tokens);
    tokio::spawn(report_until(subscription, last, global.format, reporter))
}

/// Waits for the reporter to print everything, then hands back the outcome.
/// A failed operation published nothing, so the bus is closed to release
/// the reporter.
///
/// 等待报告器打印完所有内容后返回结果。失败的操作不会发布任何事件，
/// 因此关闭总线以释放报告器。
pub async fn finish_reporting<T>(
    bus: MessageBus,
    reporter: JoinHandle<Result<()>>,
    outcome: Result<T, OrchestrationError>,
) -> Result<T> {
    if outcome.is_err() {
        bus.close();
    }
    drop(bus);
    reporter.await.context("reporter task failed")??;
    Ok(outcome?)
}

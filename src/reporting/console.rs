//! # Console Reporting Module / 控制台报告模块
//!
//! This module turns message bus events into console output: colored,
//! localized lines for people, or one JSON object per event for tools.
//!
//! 此模块将消息总线事件转换为控制台输出：面向人的彩色本地化文本，
//! 或面向工具的每个事件一个 JSON 对象。

use anyhow::{Context, Result};
use colored::*;
use std::collections::HashMap;

use crate::core::bus::{EventKind, MessageBusEvent, RunSummary, Subscription};
use crate::infra::t;

/// How events are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Prints events as they arrive, remembering display names so terminal
/// events can be shown by name.
///
/// 在事件到达时打印它们，并记住显示名称，以便按名称显示终止事件。
pub struct ConsoleReporter {
    locale: String,
    show_tokens: bool,
    names: HashMap<String, String>,
}

impl ConsoleReporter {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            show_tokens: false,
            names: HashMap::new(),
        }
    }

    /// Also print each discovered case's serialization token.
    pub fn with_tokens(mut self, show_tokens: bool) -> Self {
        self.show_tokens = show_tokens;
        self
    }

    fn name_of<'a>(&'a self, unique_id: &'a str) -> &'a str {
        self.names.get(unique_id).map_or(unique_id, String::as_str)
    }

    pub fn handle(&mut self, event: &MessageBusEvent) {
        let locale = self.locale.as_str();
        match event {
            MessageBusEvent::DiscoveryStarting { assembly } => {
                println!(
                    "{}",
                    t!("report.discovery_starting", locale = locale, assembly = assembly).cyan()
                );
            }
            MessageBusEvent::TestCaseDiscovered { case } => {
                println!("  {}", case.display_name());
                if self.show_tokens {
                    println!("    {}", case.serialization().dimmed());
                }
                self.names
                    .insert(case.unique_id().to_string(), case.display_name().to_string());
            }
            MessageBusEvent::DiscoveryComplete { assembly, test_cases } => {
                println!(
                    "{}",
                    t!(
                        "report.discovery_complete",
                        locale = locale,
                        assembly = assembly,
                        count = test_cases
                    )
                    .cyan()
                );
            }
            MessageBusEvent::TestStarting {
                unique_id,
                display_name,
            } => {
                self.names.insert(unique_id.clone(), display_name.clone());
            }
            MessageBusEvent::TestPassed { unique_id, duration } => {
                println!(
                    "  {:<9} {} ({:.2?})",
                    t!("report.status_passed", locale = locale).green(),
                    self.name_of(unique_id),
                    duration
                );
            }
            MessageBusEvent::TestFailed {
                unique_id,
                reason,
                messages,
                duration,
            } => {
                println!(
                    "  {:<9} {} ({:.2?}) [{:?}]",
                    t!("report.status_failed", locale = locale).red().bold(),
                    self.name_of(unique_id),
                    duration,
                    reason
                );
                for line in messages.iter().flat_map(|m| m.lines()) {
                    println!("      {}", line.red());
                }
            }
            MessageBusEvent::TestSkipped { unique_id, reason } => {
                println!(
                    "  {:<9} {}: {}",
                    t!("report.status_skipped", locale = locale).yellow(),
                    self.name_of(unique_id),
                    reason
                );
            }
            MessageBusEvent::TestNotRun { unique_id } => {
                println!(
                    "  {:<9} {}",
                    t!("report.status_not_run", locale = locale).dimmed(),
                    self.name_of(unique_id)
                );
            }
            MessageBusEvent::TestAssemblyFinished { assembly, summary } => {
                print_summary(assembly, summary, locale);
            }
        }
    }
}

/// Prints a formatted summary of one assembly's run.
///
/// 在控制台打印单个程序集运行的格式化摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Summary: Sample.Tests ---
///   Total: 5, Passed: 2, Failed: 1, Skipped: 1, Not run: 1 (12.34ms)
/// ```
pub fn print_summary(assembly: &str, summary: &RunSummary, locale: &str) {
    println!(
        "\n{}",
        t!("report.summary_banner", locale = locale, assembly = assembly).bold()
    );
    let line = t!(
        "report.summary_line",
        locale = locale,
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        not_run = summary.not_run,
        elapsed = format!("{:.2?}", summary.elapsed)
    );
    if summary.failed > 0 {
        println!("  {}", line.red());
    } else {
        println!("  {}", line.green());
    }
}

/// Writes one event as a single line of JSON.
pub fn print_event_json(event: &MessageBusEvent) -> Result<()> {
    let line = serde_json::to_string(event).context("Failed to serialize event")?;
    println!("{line}");
    Ok(())
}

/// Drains `subscription` until an event of `last` arrives or the bus stops,
/// printing every event in `format`.
///
/// 持续读取 `subscription`，直到收到 `last` 类型的事件或总线停止，并按 `format` 打印每个事件。
pub async fn report_until(
    mut subscription: Subscription,
    last: EventKind,
    format: OutputFormat,
    mut reporter: ConsoleReporter,
) -> Result<()> {
    while let Some(event) = subscription.next().await {
        match format {
            OutputFormat::Human => reporter.handle(&event),
            OutputFormat::Json => print_event_json(&event)?,
        }
        if event.kind() == last {
            break;
        }
    }
    Ok(())
}

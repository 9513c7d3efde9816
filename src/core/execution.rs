//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! This module provides the per-case execution wrapper and the run loop
//! shared by the engines. Each case publishes `TestStarting` followed by
//! exactly one terminal event; the body runs inside its culture scope and
//! under its timeout supervisor.
//!
//! 此模块提供单个用例的执行包装器以及各引擎共享的运行循环。
//! 每个用例先发布 `TestStarting`，随后恰好发布一个终止事件；
//! 主体在其区域设置作用域内、并在超时监督下运行。

use futures::{StreamExt, stream};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    core::{
        assembly::TestContext,
        bus::{EventKind, MessageBus, MessageBusEvent, RunSummary},
        config::ExecutionOptions,
        culture,
        engine::{CasePayload, ExecutableCase, Invocation},
        models::{FailureReason, TestCaseIdentity, TestFailure},
        planner::plan_execution,
        timeout::{self, Supervised},
    },
    infra::t,
};

/// The main entry point for running a single test case.
/// It publishes the case's lifecycle events and returns the terminal one.
///
/// # Arguments
/// * `case` - The case to execute
/// * `bus` - The bus receiving the lifecycle events
/// * `options` - Run-wide options (default culture)
pub async fn run_test_case(
    case: ExecutableCase,
    bus: &MessageBus,
    options: &ExecutionOptions,
) -> MessageBusEvent {
    let ExecutableCase { identity, payload } = case;
    report_starting(bus, &identity);

    if let Some(reason) = identity.skip_reason() {
        debug!(case = identity.display_name(), "skipping");
        return report_skipped(bus, &identity, reason.to_string());
    }

    let start_time = Instant::now();
    let result = match payload {
        CasePayload::Invoke(invocation) => {
            invoke(
                invocation,
                identity.display_name().to_string(),
                options.culture.clone(),
            )
            .await
        }
        CasePayload::Failure(failure) => Err(failure),
        CasePayload::Legacy(_) => Err(TestFailure::new(
            FailureReason::NoResult,
            "legacy test cases can only run on the legacy engine",
        )),
    };
    let duration = start_time.elapsed();

    match result {
        Ok(()) => report_passed(bus, &identity, duration),
        Err(failure) => report_failed(bus, &identity, failure, duration),
    }
}

/// Invokes a body inside its culture scope and under its timeout.
/// A case without its own culture runs in `default_culture`, if any.
///
/// 在区域设置作用域内并在超时监督下调用主体。
/// 没有自身区域设置的用例在 `default_culture`（如有）中运行。
pub async fn invoke(
    invocation: Invocation,
    display_name: String,
    default_culture: Option<String>,
) -> Result<(), TestFailure> {
    let Invocation {
        body,
        arguments,
        timeout_ms,
        culture,
    } = invocation;
    let culture = culture.or(default_culture);
    let message_culture = culture.clone();

    // The body future is built on the supervised task, under its panic guard.
    let scoped = async move {
        let context = TestContext {
            display_name,
            arguments,
        };
        match culture {
            Some(culture) => culture::run_with_culture(&culture, body(context))
                .await
                .unwrap_or_else(|e| Err(TestFailure::new(FailureReason::Culture, e.to_string()))),
            None => body(context).await,
        }
    };

    match timeout::run_with_timeout(timeout_ms, scoped).await {
        Supervised::Completed(result) => result,
        Supervised::TimedOut(deadline) => Err(timeout_failure(deadline, message_culture.as_deref())),
        Supervised::Panicked(message) => Err(TestFailure::new(FailureReason::Panicked, message)),
    }
}

/// The failure reported when a case exceeds its deadline. The message is
/// rendered in the case's culture, or in the process locale without one.
///
/// 用例超过截止时间时报告的失败。消息使用用例的区域设置渲染，
/// 若用例没有区域设置则使用进程级区域设置。
pub fn timeout_failure(deadline: Duration, culture: Option<&str>) -> TestFailure {
    let timeout = deadline.as_millis();
    let message = match culture {
        Some(locale) => t!("run.test_timeout_message", locale = locale, timeout = timeout),
        None => t!("run.test_timeout_message", timeout = timeout),
    };
    TestFailure::new(FailureReason::Timeout, message.to_string())
}

/// Runs a set of cases: explicit filtering first, then the survivors with
/// bounded concurrency. Cases not yet started when `cancel` fires (or after
/// the first failure with `stop_on_fail`) are never started.
///
/// 运行一组用例：先进行 explicit 过滤，然后以有限并发运行剩余用例。
/// 当 `cancel` 触发时（或启用 `stop_on_fail` 后出现第一次失败时）尚未启动的用例将不再启动。
pub async fn run_cases(
    cases: Vec<ExecutableCase>,
    bus: &MessageBus,
    options: &ExecutionOptions,
    cancel: CancellationToken,
) -> RunSummary {
    let plan = plan_execution(cases, options.explicit);
    let mut summary = RunSummary::default();

    for case in &plan.not_run {
        summary.record(&report_not_run(bus, &case.identity));
    }

    let stop_token = cancel.child_token();
    let jobs = options.effective_parallelism();
    info!(
        to_run = plan.cases_to_run.len(),
        not_run = plan.not_run.len(),
        jobs,
        "running test cases"
    );

    let terminals = stream::iter(plan.cases_to_run.into_iter().map(|case| {
        let stop_token = stop_token.clone();
        async move {
            if stop_token.is_cancelled() {
                debug!(case = case.identity.display_name(), "run stopped, case not started");
                return None;
            }
            let terminal = run_test_case(case, bus, options).await;
            if options.stop_on_fail && terminal.kind() == EventKind::TestFailed {
                stop_token.cancel();
            }
            Some(terminal)
        }
    }))
    .buffer_unordered(jobs)
    .collect::<Vec<Option<MessageBusEvent>>>()
    .await;

    for terminal in terminals.iter().flatten() {
        summary.record(terminal);
    }
    summary
}

pub fn report_starting(bus: &MessageBus, identity: &TestCaseIdentity) {
    bus.publish(MessageBusEvent::TestStarting {
        unique_id: identity.unique_id().to_string(),
        display_name: identity.display_name().to_string(),
    });
}

/// Publishes `TestStarting` followed by `TestNotRun`.
pub fn report_not_run(bus: &MessageBus, identity: &TestCaseIdentity) -> MessageBusEvent {
    report_starting(bus, identity);
    publish(
        bus,
        MessageBusEvent::TestNotRun {
            unique_id: identity.unique_id().to_string(),
        },
    )
}

pub fn report_passed(bus: &MessageBus, identity: &TestCaseIdentity, duration: Duration) -> MessageBusEvent {
    publish(
        bus,
        MessageBusEvent::TestPassed {
            unique_id: identity.unique_id().to_string(),
            duration,
        },
    )
}

pub fn report_skipped(bus: &MessageBus, identity: &TestCaseIdentity, reason: String) -> MessageBusEvent {
    publish(
        bus,
        MessageBusEvent::TestSkipped {
            unique_id: identity.unique_id().to_string(),
            reason,
        },
    )
}

pub fn report_failed(
    bus: &MessageBus,
    identity: &TestCaseIdentity,
    failure: TestFailure,
    duration: Duration,
) -> MessageBusEvent {
    debug!(case = identity.display_name(), reason = ?failure.reason, "test failed");
    publish(
        bus,
        MessageBusEvent::TestFailed {
            unique_id: identity.unique_id().to_string(),
            reason: failure.reason,
            messages: failure.messages,
            duration,
        },
    )
}

fn publish(bus: &MessageBus, event: MessageBusEvent) -> MessageBusEvent {
    bus.publish(event.clone());
    event
}

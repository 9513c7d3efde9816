//! # Legacy Protocol Adapter / 旧版协议适配器
//!
//! Drives frameworks built against the older synchronous, callback-style
//! contract and presents them as a [`TestEngine`].
//!
//! The legacy framework reports raw method metadata and never expands
//! theories, so the adapter expands them itself. It has no notion of explicit
//! cases either; explicit filtering happens here before anything is
//! forwarded. Its execution callbacks are translated into bus events, with
//! the ordering repaired where the framework misbehaves: a missing start is
//! synthesized, duplicate results are dropped, and a case that started but
//! never finished is reported as failed.
//!
//! 驱动针对旧版同步回调式契约构建的框架，并将其呈现为 [`TestEngine`]。
//!
//! 旧版框架只报告原始的方法元数据，从不展开理论，因此由适配器自行展开。
//! 它也没有 explicit 用例的概念；explicit 过滤在转发之前由此处完成。
//! 其执行回调会被翻译成总线事件，并在框架行为异常时修复顺序：
//! 补发缺失的开始事件、丢弃重复的结果，并将已开始但未结束的用例报告为失败。

use futures::future::BoxFuture;
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::{
    assembly::{FrameworkVersion, TestMethodDescriptor},
    bus::{EventKind, MessageBus, RunSummary},
    config::{DiscoveryOptions, ExecutionOptions},
    engine::{CasePayload, ExecutableCase, TestEngine, no_data_failure},
    error::{OrchestrationError, ResolveError},
    execution::{
        report_failed, report_not_run, report_passed, report_skipped, report_starting,
        run_test_case,
    },
    models::{ArgValue, FailureReason, SourceInformation, TestCaseIdentity, TestFailure},
    planner::plan_execution,
    theory::{MethodCase, expand_method},
    timeout::panic_message,
};
use crate::infra::source_info::SourceInformationProvider;

pub const LEGACY_TOKEN_PREFIX: &str = ":F:";

/// A case as the legacy framework addresses it.
/// 旧版框架所寻址的用例。
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyTestCase {
    /// Fully-qualified class name.
    pub type_name: String,
    pub method_name: String,
    pub row: Option<usize>,
    pub arguments: Vec<ArgValue>,
    pub culture: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// The addressable part of a legacy token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTokenParts {
    pub type_name: String,
    pub method_name: String,
    pub row: Option<usize>,
    pub culture: Option<String>,
}

impl LegacyTestCase {
    /// `:F:<Type>:<Method>:1:0:<row>:<culture>`; facts leave the row empty and
    /// culture-less cases leave the culture empty.
    pub fn token(&self) -> String {
        format!(
            "{LEGACY_TOKEN_PREFIX}{}:{}:1:0:{}:{}",
            self.type_name,
            self.method_name,
            self.row.map(|row| row.to_string()).unwrap_or_default(),
            self.culture.as_deref().unwrap_or_default()
        )
    }

    pub fn parse_token(token: &str) -> Result<LegacyTokenParts, ResolveError> {
        let Some(body) = token.strip_prefix(LEGACY_TOKEN_PREFIX) else {
            return Err(if token.starts_with("3:") {
                ResolveError::ForeignGeneration
            } else {
                ResolveError::Malformed(format!("missing '{LEGACY_TOKEN_PREFIX}' prefix"))
            });
        };

        let parts: Vec<&str> = body.split(':').collect();
        let [type_name, method_name, "1", "0", row, culture] = parts.as_slice() else {
            return Err(ResolveError::Malformed(format!(
                "expected 6 fields after the prefix, found {}",
                parts.len()
            )));
        };
        if type_name.is_empty() || method_name.is_empty() {
            return Err(ResolveError::Malformed("empty type or method name".to_string()));
        }

        let row = match *row {
            "" => None,
            digits => Some(
                digits
                    .parse::<usize>()
                    .map_err(|e| ResolveError::Malformed(format!("bad row '{digits}': {e}")))?,
            ),
        };

        Ok(LegacyTokenParts {
            type_name: type_name.to_string(),
            method_name: method_name.to_string(),
            row,
            culture: (!culture.is_empty()).then(|| culture.to_string()),
        })
    }
}

/// Result of one legacy case as reported by the framework.
/// 框架报告的单个旧版用例结果。
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyResult {
    Passed { duration: Duration },
    Failed { duration: Duration, failure: TestFailure },
    Skipped { reason: String },
}

/// Receives raw method metadata during legacy discovery.
pub trait LegacyDiscoverySink {
    /// Returns `false` to stop the enumeration.
    fn on_method(&mut self, method: &TestMethodDescriptor, source: Option<SourceInformation>) -> bool;
}

/// Receives one start and one result callback per case.
/// 每个用例接收一次开始回调和一次结果回调。
pub trait LegacyExecutionSink {
    /// Returns `false` once no further case should be started.
    fn on_test_starting(&mut self, case: &LegacyTestCase) -> bool;

    /// Returns `false` once no further case should be started.
    fn on_test_finished(&mut self, case: &LegacyTestCase, result: LegacyResult) -> bool;
}

/// The synchronous discovery/execution contract of the legacy generation.
///
/// 旧版代际的同步发现/执行契约。
pub trait LegacyFramework: Send + Sync {
    fn assembly_name(&self) -> &str;

    /// Reports every test method, unexpanded, in declaration order.
    fn find(&self, include_source_information: bool, sink: &mut dyn LegacyDiscoverySink);

    /// Runs `cases` in order on the calling thread. A framework must stop
    /// starting cases once a callback returns `false`.
    fn run(&self, cases: &[LegacyTestCase], sink: &mut dyn LegacyExecutionSink);
}

#[derive(Debug, Clone)]
struct LegacyMethod {
    descriptor: TestMethodDescriptor,
    source: Option<SourceInformation>,
}

#[derive(Default)]
struct MethodCollector(Vec<LegacyMethod>);

impl LegacyDiscoverySink for MethodCollector {
    fn on_method(&mut self, method: &TestMethodDescriptor, source: Option<SourceInformation>) -> bool {
        self.0.push(LegacyMethod {
            descriptor: method.clone(),
            source,
        });
        true
    }
}

/// Presents a [`LegacyFramework`] as a [`TestEngine`].
pub struct LegacyAdapter {
    framework: Arc<dyn LegacyFramework>,
    source_info: Option<Arc<dyn SourceInformationProvider>>,
    methods: OnceCell<Vec<LegacyMethod>>,
}

impl LegacyAdapter {
    pub fn new(framework: Arc<dyn LegacyFramework>) -> Self {
        Self {
            framework,
            source_info: None,
            methods: OnceCell::new(),
        }
    }

    /// Replaces the framework's own source lookup.
    /// 替换框架自身的源码信息查找。
    pub fn with_source_information(mut self, provider: Arc<dyn SourceInformationProvider>) -> Self {
        self.source_info = Some(provider);
        self
    }

    fn methods(&self) -> &[LegacyMethod] {
        self.methods.get_or_init(|| {
            let mut collector = MethodCollector::default();
            self.framework.find(true, &mut collector);
            debug!(
                assembly = self.framework.assembly_name(),
                methods = collector.0.len(),
                "legacy framework enumerated methods"
            );
            collector.0
        })
    }

    fn source_for(&self, method: &LegacyMethod) -> Option<SourceInformation> {
        match &self.source_info {
            Some(provider) => provider.lookup(
                &method.descriptor.class_name_with_namespace(),
                &method.descriptor.method_name,
            ),
            None => method.source.clone(),
        }
    }

    fn build_case(&self, method: &LegacyMethod, case: MethodCase, include_source: bool) -> ExecutableCase {
        let descriptor = &method.descriptor;
        let legacy = LegacyTestCase {
            type_name: descriptor.class_name_with_namespace(),
            method_name: descriptor.method_name.clone(),
            row: case.row,
            arguments: case.arguments,
            culture: case.culture,
            timeout_ms: descriptor.timeout_ms,
        };
        let source = if include_source { self.source_for(method) } else { None };
        let identity = case.builder.serialization(legacy.token()).source(source).build();

        let payload = if case.no_data {
            CasePayload::Failure(no_data_failure(&descriptor.method_id()))
        } else {
            CasePayload::Legacy(Box::new(legacy))
        };
        ExecutableCase::new(identity, payload)
    }

    /// Hands the legacy cases to the framework on a blocking thread and
    /// translates its callbacks.
    async fn forward(
        &self,
        bus: &MessageBus,
        options: &ExecutionOptions,
        cases: Vec<(TestCaseIdentity, LegacyTestCase)>,
        stop_token: CancellationToken,
    ) -> RunSummary {
        if cases.is_empty() || stop_token.is_cancelled() {
            return RunSummary::default();
        }

        let mut sink = BusSink::new(bus.clone(), stop_token, options.stop_on_fail);
        let mut forwarded = Vec::with_capacity(cases.len());
        for (identity, mut legacy) in cases {
            if legacy.culture.is_none() {
                legacy.culture = options.culture.clone();
            }
            if sink.track(identity, &legacy) {
                forwarded.push(legacy);
            }
        }

        debug!(cases = forwarded.len(), "forwarding cases to the legacy framework");
        let framework = Arc::clone(&self.framework);
        let joined = tokio::task::spawn_blocking(move || {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| framework.run(&forwarded, &mut sink)));
            if let Err(payload) = outcome {
                warn!(panic = %panic_message(payload.as_ref()), "legacy framework panicked during execution");
            }
            sink
        })
        .await;

        match joined {
            Ok(sink) => sink.finish(),
            Err(e) => {
                warn!(error = %e, "legacy execution task did not complete");
                RunSummary::default()
            }
        }
    }
}

impl TestEngine for LegacyAdapter {
    fn generation(&self) -> FrameworkVersion {
        FrameworkVersion::Legacy
    }

    fn discover(&self, options: &DiscoveryOptions) -> Result<Vec<ExecutableCase>, OrchestrationError> {
        let cases: Vec<ExecutableCase> = self
            .methods()
            .iter()
            .flat_map(|method| {
                expand_method(&method.descriptor, options.flag_theories_without_data)
                    .into_iter()
                    .map(move |case| self.build_case(method, case, options.include_source_information))
            })
            .filter(|case| options.filters.matches(&case.identity))
            .collect();
        debug!(assembly = self.framework.assembly_name(), cases = cases.len(), "legacy discovery finished");
        Ok(cases)
    }

    fn resolve(&self, token: &str) -> Result<ExecutableCase, ResolveError> {
        let parts = LegacyTestCase::parse_token(token)?;
        let method = self
            .methods()
            .iter()
            .find(|m| {
                m.descriptor.method_name == parts.method_name
                    && m.descriptor.class_name_with_namespace() == parts.type_name
            })
            .ok_or_else(|| ResolveError::UnknownMethod(format!("{}.{}", parts.type_name, parts.method_name)))?;

        let case = expand_method(&method.descriptor, true)
            .into_iter()
            .find(|case| case.row == parts.row && case.culture == parts.culture)
            .ok_or_else(|| match parts.row {
                Some(row) => ResolveError::RowOutOfRange {
                    method: method.descriptor.method_id(),
                    row,
                },
                None => ResolveError::Malformed(format!(
                    "no case of '{}' matches the requested culture",
                    method.descriptor.method_id()
                )),
            })?;

        Ok(self.build_case(method, case, true))
    }

    fn execute<'a>(
        &'a self,
        bus: &'a MessageBus,
        options: &'a ExecutionOptions,
        cases: Vec<ExecutableCase>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, RunSummary> {
        Box::pin(async move {
            let plan = plan_execution(cases, options.explicit);
            let mut summary = RunSummary::default();
            for case in &plan.not_run {
                summary.record(&report_not_run(bus, &case.identity));
            }

            let stop_token = cancel.child_token();
            let mut forwarded = Vec::new();
            for case in plan.cases_to_run {
                match case.payload {
                    CasePayload::Legacy(legacy) if case.identity.skip_reason().is_none() => {
                        forwarded.push((case.identity, *legacy));
                    }
                    payload => {
                        // Skipped and failing stand-in cases never reach the framework.
                        if stop_token.is_cancelled() {
                            continue;
                        }
                        let terminal =
                            run_test_case(ExecutableCase::new(case.identity, payload), bus, options).await;
                        if options.stop_on_fail && terminal.kind() == EventKind::TestFailed {
                            stop_token.cancel();
                        }
                        summary.record(&terminal);
                    }
                }
            }

            summary.merge(&self.forward(bus, options, forwarded, stop_token).await);
            summary
        })
    }
}

/// Translates legacy callbacks into bus events.
struct BusSink {
    bus: MessageBus,
    stop_token: CancellationToken,
    stop_on_fail: bool,
    order: Vec<String>,
    identities: HashMap<String, TestCaseIdentity>,
    started: HashSet<String>,
    finished: HashSet<String>,
    summary: RunSummary,
}

impl BusSink {
    fn new(bus: MessageBus, stop_token: CancellationToken, stop_on_fail: bool) -> Self {
        Self {
            bus,
            stop_token,
            stop_on_fail,
            order: Vec::new(),
            identities: HashMap::new(),
            started: HashSet::new(),
            finished: HashSet::new(),
            summary: RunSummary::default(),
        }
    }

    /// Registers a case; `false` if the same case is already tracked.
    fn track(&mut self, identity: TestCaseIdentity, case: &LegacyTestCase) -> bool {
        let key = case.token();
        if self.identities.contains_key(&key) {
            debug!(token = %key, "same legacy case requested twice, running it once");
            return false;
        }
        self.order.push(key.clone());
        self.identities.insert(key, identity);
        true
    }

    fn keep_going(&self) -> bool {
        !self.stop_token.is_cancelled()
    }

    /// Reports whatever the framework left unfinished and returns the totals.
    fn finish(mut self) -> RunSummary {
        let cancelled = self.stop_token.is_cancelled();
        for key in std::mem::take(&mut self.order) {
            if self.finished.contains(&key) {
                continue;
            }
            let Some(identity) = self.identities.get(&key) else {
                continue;
            };

            let message = if self.started.contains(&key) {
                warn!(case = identity.display_name(), "legacy framework never reported a result");
                "the legacy framework started this case but never reported a result"
            } else if !cancelled {
                warn!(case = identity.display_name(), "legacy framework never started the case");
                report_starting(&self.bus, identity);
                "the legacy framework never ran this case"
            } else {
                continue;
            };

            let terminal = report_failed(
                &self.bus,
                identity,
                TestFailure::new(FailureReason::NoResult, message),
                Duration::ZERO,
            );
            self.summary.record(&terminal);
        }
        self.summary
    }
}

impl LegacyExecutionSink for BusSink {
    fn on_test_starting(&mut self, case: &LegacyTestCase) -> bool {
        let key = case.token();
        let Some(identity) = self.identities.get(&key) else {
            warn!(token = %key, "start callback for a case that was never requested");
            return self.keep_going();
        };

        if self.finished.contains(&key) {
            debug!(case = identity.display_name(), "ignoring start after result");
        } else if self.started.insert(key) {
            report_starting(&self.bus, identity);
        } else {
            debug!(case = identity.display_name(), "ignoring duplicate start");
        }
        self.keep_going()
    }

    fn on_test_finished(&mut self, case: &LegacyTestCase, result: LegacyResult) -> bool {
        let key = case.token();
        let Some(identity) = self.identities.get(&key) else {
            warn!(token = %key, "result callback for a case that was never requested");
            return self.keep_going();
        };

        if !self.finished.insert(key.clone()) {
            debug!(case = identity.display_name(), "dropping duplicate result");
            return self.keep_going();
        }
        if self.started.insert(key) {
            debug!(case = identity.display_name(), "synthesizing missing start");
            report_starting(&self.bus, identity);
        }

        let terminal = match result {
            LegacyResult::Passed { duration } => report_passed(&self.bus, identity, duration),
            LegacyResult::Failed { duration, failure } => report_failed(&self.bus, identity, failure, duration),
            LegacyResult::Skipped { reason } => report_skipped(&self.bus, identity, reason),
        };

        if self.stop_on_fail && terminal.kind() == EventKind::TestFailed {
            self.stop_token.cancel();
        }
        self.summary.record(&terminal);
        self.keep_going()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let case = LegacyTestCase {
            type_name: "Ns.Outer+Inner".to_string(),
            method_name: "Adds".to_string(),
            row: Some(3),
            arguments: vec![],
            culture: Some("en-US".to_string()),
            timeout_ms: None,
        };
        assert_eq!(case.token(), ":F:Ns.Outer+Inner:Adds:1:0:3:en-US");

        let parts = LegacyTestCase::parse_token(&case.token()).unwrap();
        assert_eq!(parts.type_name, "Ns.Outer+Inner");
        assert_eq!(parts.row, Some(3));
        assert_eq!(parts.culture.as_deref(), Some("en-US"));
    }

    #[test]
    fn test_fact_token_has_empty_row_and_culture() {
        let case = LegacyTestCase {
            type_name: "Ns.C".to_string(),
            method_name: "M".to_string(),
            row: None,
            arguments: vec![],
            culture: None,
            timeout_ms: None,
        };
        assert_eq!(case.token(), ":F:Ns.C:M:1:0::");
        let parts = LegacyTestCase::parse_token(":F:Ns.C:M:1:0::").unwrap();
        assert_eq!(parts.row, None);
        assert_eq!(parts.culture, None);
    }

    #[test]
    fn test_parse_rejects_foreign_and_malformed_tokens() {
        assert_eq!(
            LegacyTestCase::parse_token("3:{\"class\":\"C\",\"method\":\"M\"}"),
            Err(ResolveError::ForeignGeneration)
        );
        assert!(matches!(
            LegacyTestCase::parse_token(":F:Ns.C:M:2:0::"),
            Err(ResolveError::Malformed(_))
        ));
        assert!(matches!(
            LegacyTestCase::parse_token(":F:Ns.C:M:1:0:x:"),
            Err(ResolveError::Malformed(_))
        ));
    }
}

//! # Front Controller Module / 前端控制器模块
//!
//! The façade over one loaded assembly. It owns the assembly handle for its
//! whole lifetime and exactly one [`TestEngine`], selected from the
//! assembly's framework generation when the controller is built.
//!
//! Every operation publishes to a caller-supplied [`MessageBus`]:
//!
//! - `find`: `DiscoveryStarting`, one `TestCaseDiscovered` per case, `DiscoveryComplete`
//! - `run`: per-case events, then `TestAssemblyFinished`
//! - `find_and_run`: the discovery events followed by the run events
//!
//! 单个已加载程序集之上的门面。控制器在整个生命周期内持有程序集句柄，
//! 以及构造时根据程序集框架代际选定的唯一一个 [`TestEngine`]。
//! 每个操作都向调用方提供的 [`MessageBus`] 发布事件。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{
    assembly::FrameworkVersion,
    bus::{MessageBus, MessageBusEvent, RunSummary},
    config::{DiscoveryOptions, ExecutionOptions, FindAndRunSettings, FindSettings, RunSettings},
    engine::{ExecutableCase, TestEngine},
    error::OrchestrationError,
    legacy::LegacyAdapter,
    models::TestCaseIdentity,
    native::NativeEngine,
};
use crate::infra::{
    legacy_framework::AssemblyLegacyFramework,
    loader::{AssemblyHandle, AssemblyLoader, ProjectAssembly},
    source_info::SourceInformationProvider,
};

/// Discovers and runs the tests of one assembly.
/// 发现并运行单个程序集中的测试。
pub struct FrontController {
    assembly_name: String,
    engine: Box<dyn TestEngine>,
    /// Culture for cases the run options leave unspecified.
    default_culture: Option<String>,
    handle: Option<AssemblyHandle>,
}

impl FrontController {
    /// Loads `project` and picks the engine matching its framework generation.
    ///
    /// `source_info`, when given, replaces whatever source lookup the loaded
    /// assembly brings with it.
    ///
    /// 加载 `project` 并选择与其框架代际匹配的引擎。
    /// 如果提供了 `source_info`，它将替换已加载程序集自带的源码信息查找。
    pub fn for_discovery_and_execution(
        project: &ProjectAssembly,
        loader: &dyn AssemblyLoader,
        source_info: Option<Arc<dyn SourceInformationProvider>>,
    ) -> Result<Self, OrchestrationError> {
        let loaded = loader.load(project)?;
        let assembly_name = loaded.assembly.name.clone();

        let engine: Box<dyn TestEngine> = match loaded.assembly.framework {
            FrameworkVersion::Native => {
                let engine = NativeEngine::new(Arc::clone(&loaded.assembly));
                Box::new(match source_info.or(loaded.source_info) {
                    Some(provider) => engine.with_source_information(provider),
                    None => engine,
                })
            }
            FrameworkVersion::Legacy => {
                // The framework does its own lookup; an explicit provider overrides it.
                let framework = AssemblyLegacyFramework::new(Arc::clone(&loaded.assembly))
                    .with_source_information(loaded.source_info);
                let adapter = LegacyAdapter::new(Arc::new(framework));
                Box::new(match source_info {
                    Some(provider) => adapter.with_source_information(provider),
                    None => adapter,
                })
            }
        };

        info!(
            assembly = %assembly_name,
            generation = ?engine.generation(),
            path = %loaded.handle.path().display(),
            "assembly loaded"
        );

        Ok(Self {
            assembly_name,
            engine,
            default_culture: loaded.default_culture,
            handle: Some(loaded.handle),
        })
    }

    /// A controller over an engine that needs no loaded assembly.
    pub fn with_engine(assembly_name: impl Into<String>, engine: Box<dyn TestEngine>) -> Self {
        Self {
            assembly_name: assembly_name.into(),
            engine,
            default_culture: None,
            handle: None,
        }
    }

    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    pub fn generation(&self) -> FrameworkVersion {
        self.engine.generation()
    }

    /// Discovers every case and publishes the discovery events.
    /// Nothing is published when discovery itself fails.
    ///
    /// 发现所有用例并发布发现事件。若发现本身失败，则不发布任何事件。
    pub fn find(
        &self,
        bus: &MessageBus,
        settings: &FindSettings,
    ) -> Result<Vec<TestCaseIdentity>, OrchestrationError> {
        let cases = self.discover(&settings.discovery)?;
        let identities: Vec<TestCaseIdentity> = cases.into_iter().map(|case| case.identity).collect();
        self.publish_discovery(bus, identities.iter());
        Ok(identities)
    }

    /// Resolves previously emitted tokens and runs them.
    ///
    /// A token that is structurally unusable (empty, or containing control
    /// characters) fails the whole call before anything is published. A token
    /// that is well-formed but cannot be resolved becomes one failed case.
    ///
    /// 解析之前发出的令牌并运行它们。
    /// 结构上不可用的令牌（为空或包含控制字符）会使整个调用在发布任何事件前失败；
    /// 格式正确但无法解析的令牌会成为一个失败的用例。
    pub async fn run(
        &self,
        bus: &MessageBus,
        settings: &RunSettings,
        cancel: CancellationToken,
    ) -> Result<RunSummary, OrchestrationError> {
        settings.execution.validate()?;
        validate_tokens(&settings.serialized_test_cases)?;

        // A token repeated in one request names the same case; only its first occurrence runs.
        let mut seen = HashSet::new();
        let cases: Vec<ExecutableCase> = settings
            .serialized_test_cases
            .iter()
            .filter(|token| seen.insert(token.as_str()))
            .map(|token| {
                self.engine.resolve(token).unwrap_or_else(|e| {
                    warn!(token = %token, error = %e, "could not resolve serialized test case");
                    ExecutableCase::unresolved(token, &e)
                })
            })
            .collect();

        Ok(self.execute(bus, &settings.execution, cases, cancel).await)
    }

    /// Discovery followed by execution of exactly the discovered cases.
    ///
    /// 先发现，然后执行恰好这些被发现的用例。
    pub async fn find_and_run(
        &self,
        bus: &MessageBus,
        settings: &FindAndRunSettings,
        cancel: CancellationToken,
    ) -> Result<RunSummary, OrchestrationError> {
        settings.execution.validate()?;
        let cases = self.discover(&settings.discovery)?;
        self.publish_discovery(bus, cases.iter().map(|case| &case.identity));
        Ok(self.execute(bus, &settings.execution, cases, cancel).await)
    }

    fn discover(&self, options: &DiscoveryOptions) -> Result<Vec<ExecutableCase>, OrchestrationError> {
        debug!(assembly = %self.assembly_name, "discovering test cases");
        self.engine.discover(options)
    }

    fn publish_discovery<'a>(&self, bus: &MessageBus, identities: impl Iterator<Item = &'a TestCaseIdentity>) {
        bus.publish(MessageBusEvent::DiscoveryStarting {
            assembly: self.assembly_name.clone(),
        });
        let mut count = 0;
        for identity in identities {
            bus.publish(MessageBusEvent::TestCaseDiscovered {
                case: identity.clone(),
            });
            count += 1;
        }
        bus.publish(MessageBusEvent::DiscoveryComplete {
            assembly: self.assembly_name.clone(),
            test_cases: count,
        });
    }

    /// Runs the cases and always finishes with `TestAssemblyFinished`, even
    /// when `cancel` fired.
    async fn execute(
        &self,
        bus: &MessageBus,
        options: &ExecutionOptions,
        cases: Vec<ExecutableCase>,
        cancel: CancellationToken,
    ) -> RunSummary {
        let mut options = options.clone();
        if options.culture.is_none() {
            options.culture = self.default_culture.clone();
        }

        let start_time = Instant::now();
        let mut summary = self.engine.execute(bus, &options, cases, cancel).await;
        summary.elapsed = start_time.elapsed();

        bus.publish(MessageBusEvent::TestAssemblyFinished {
            assembly: self.assembly_name.clone(),
            summary,
        });
        info!(
            assembly = %self.assembly_name,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            not_run = summary.not_run,
            "assembly finished"
        );
        summary
    }
}

impl Drop for FrontController {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(path = %handle.path().display(), "releasing assembly handle");
        }
    }
}

fn validate_tokens(tokens: &[String]) -> Result<(), OrchestrationError> {
    for (index, token) in tokens.iter().enumerate() {
        let reason = if token.trim().is_empty() {
            "is empty"
        } else if token.chars().any(char::is_control) {
            "contains control characters"
        } else {
            continue;
        };
        return Err(OrchestrationError::MalformedRunRequest {
            index,
            reason: reason.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tokens() {
        assert!(validate_tokens(&["3:{}".to_string(), "anything".to_string()]).is_ok());
        assert!(matches!(
            validate_tokens(&["ok".to_string(), "  ".to_string()]),
            Err(OrchestrationError::MalformedRunRequest { index: 1, .. })
        ));
        assert!(matches!(
            validate_tokens(&["bad\u{0}token".to_string()]),
            Err(OrchestrationError::MalformedRunRequest { index: 0, .. })
        ));
    }
}

//! # Test Engine Interface / 测试引擎接口
//!
//! The capability both protocol generations implement. The front controller
//! owns exactly one engine, chosen when it is constructed, and never needs to
//! know which generation it is talking to.
//!
//! 两个协议代际都实现的能力接口。前端控制器在构造时选定并持有唯一一个引擎，
//! 无需知道它正在与哪一代协议交互。

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::core::assembly::{FrameworkVersion, TestBody};
use crate::core::bus::{MessageBus, RunSummary};
use crate::core::config::{DiscoveryOptions, ExecutionOptions};
use crate::core::error::{OrchestrationError, ResolveError};
use crate::core::legacy::LegacyTestCase;
use crate::core::models::{ArgValue, FailureReason, TestCaseIdentity, TestFailure, stable_id};
use crate::infra::t;

/// What it takes to invoke a native case body.
/// 调用原生用例主体所需的全部信息。
#[derive(Clone)]
pub struct Invocation {
    pub body: TestBody,
    pub arguments: Vec<ArgValue>,
    pub timeout_ms: Option<u64>,
    pub culture: Option<String>,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("arguments", &self.arguments)
            .field("timeout_ms", &self.timeout_ms)
            .field("culture", &self.culture)
            .finish_non_exhaustive()
    }
}

/// Engine-specific payload of an executable case.
#[derive(Debug, Clone)]
pub enum CasePayload {
    /// Runs a body on the native engine.
    Invoke(Invocation),
    /// Forwarded to the legacy framework.
    Legacy(Box<LegacyTestCase>),
    /// Never runs; reported as a failure when executed.
    /// 永远不会运行；执行时报告为失败。
    Failure(TestFailure),
}

/// A case ready for execution: its identity plus whatever the engine needs.
/// 准备执行的用例：其标识加上引擎所需的信息。
#[derive(Debug, Clone)]
pub struct ExecutableCase {
    pub identity: TestCaseIdentity,
    pub payload: CasePayload,
}

impl ExecutableCase {
    pub fn new(identity: TestCaseIdentity, payload: CasePayload) -> Self {
        Self { identity, payload }
    }

    /// A stand-in case for a token that could not be resolved.
    ///
    /// 为无法解析的令牌创建的替代用例。
    pub fn unresolved(token: &str, error: &ResolveError) -> Self {
        let identity = TestCaseIdentity::builder(stable_id(["unresolved", token]), token)
            .serialization(token)
            .build();
        Self {
            identity,
            payload: CasePayload::Failure(TestFailure::new(
                FailureReason::Deserialization,
                format!("Could not resolve serialized test case: {error}"),
            )),
        }
    }
}

impl AsRef<TestCaseIdentity> for ExecutableCase {
    fn as_ref(&self) -> &TestCaseIdentity {
        &self.identity
    }
}

/// The failure carried by the stand-in case of a theory without data.
pub fn no_data_failure(method_id: &str) -> TestFailure {
    TestFailure::new(
        FailureReason::NoData,
        t!("run.no_data", method = method_id).to_string(),
    )
}

/// One protocol generation's discovery and execution capability.
///
/// 单个协议代际的发现与执行能力。
pub trait TestEngine: Send + Sync {
    fn generation(&self) -> FrameworkVersion;

    /// Discovers every case in the assembly, in discovery order, already
    /// filtered by `options.filters`.
    ///
    /// 按发现顺序发现程序集中的所有用例，并已按 `options.filters` 过滤。
    fn discover(&self, options: &DiscoveryOptions) -> Result<Vec<ExecutableCase>, OrchestrationError>;

    /// Resolves a token previously emitted by [`TestEngine::discover`].
    /// 解析先前由 [`TestEngine::discover`] 发出的令牌。
    fn resolve(&self, token: &str) -> Result<ExecutableCase, ResolveError>;

    /// Runs `cases`, publishing per-case events; assembly-level events are
    /// the caller's job. Once `cancel` fires no further case is started.
    ///
    /// 运行 `cases` 并发布每个用例的事件；程序集级事件由调用方负责。
    /// 一旦 `cancel` 触发，就不再启动新的用例。
    fn execute<'a>(
        &'a self,
        bus: &'a MessageBus,
        options: &'a ExecutionOptions,
        cases: Vec<ExecutableCase>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, RunSummary>;
}

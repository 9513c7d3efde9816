//! # Native Engine Module / 原生引擎模块
//!
//! The asynchronous engine generation. It discovers cases straight from the
//! in-memory assembly model and runs their bodies on the tokio runtime.
//!
//! Tokens have the shape `3:<json>`, where the JSON names the class, the
//! method, the data row and the culture of the case.
//!
//! 异步引擎代际。直接从内存中的程序集模型发现用例，并在 tokio 运行时上执行其主体。
//! 令牌形如 `3:<json>`，JSON 中记录了用例的类、方法、数据行和区域设置。

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::{
    assembly::{FrameworkVersion, TestAssembly, TestMethod, TestMethodDescriptor},
    bus::{MessageBus, RunSummary},
    config::{DiscoveryOptions, ExecutionOptions},
    engine::{CasePayload, ExecutableCase, Invocation, TestEngine, no_data_failure},
    error::{OrchestrationError, ResolveError},
    execution::run_cases,
    models::SourceInformation,
    theory::{MethodCase, expand_method},
};
use crate::infra::source_info::SourceInformationProvider;

pub const NATIVE_TOKEN_PREFIX: &str = "3:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct NativeToken {
    class: String,
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    culture: Option<String>,
}

impl NativeToken {
    fn encode(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{NATIVE_TOKEN_PREFIX}{}", serde_json::to_string(self)?))
    }

    fn decode(token: &str) -> Result<Self, ResolveError> {
        let Some(json) = token.strip_prefix(NATIVE_TOKEN_PREFIX) else {
            return Err(if token.starts_with(':') {
                ResolveError::ForeignGeneration
            } else {
                ResolveError::Malformed(format!("missing '{NATIVE_TOKEN_PREFIX}' prefix"))
            });
        };
        serde_json::from_str(json).map_err(|e| ResolveError::Malformed(e.to_string()))
    }
}

/// Engine for assemblies built against the asynchronous generation.
/// 针对异步代际构建的程序集所使用的引擎。
pub struct NativeEngine {
    assembly: Arc<TestAssembly>,
    source_info: Option<Arc<dyn SourceInformationProvider>>,
}

impl NativeEngine {
    pub fn new(assembly: Arc<TestAssembly>) -> Self {
        Self {
            assembly,
            source_info: None,
        }
    }

    pub fn with_source_information(mut self, provider: Arc<dyn SourceInformationProvider>) -> Self {
        self.source_info = Some(provider);
        self
    }

    fn source_for(&self, descriptor: &TestMethodDescriptor) -> Option<SourceInformation> {
        self.source_info
            .as_ref()
            .and_then(|provider| provider.lookup(&descriptor.class_name_with_namespace(), &descriptor.method_name))
    }

    fn build_case(
        &self,
        method: &TestMethod,
        case: MethodCase,
        source: Option<SourceInformation>,
    ) -> Result<ExecutableCase, serde_json::Error> {
        let descriptor = &method.descriptor;
        let token = NativeToken {
            class: descriptor.class_name_with_namespace(),
            method: descriptor.method_name.clone(),
            row: case.row,
            culture: case.culture.clone(),
        }
        .encode()?;

        let identity = case.builder.serialization(token).source(source).build();
        let payload = if case.no_data {
            CasePayload::Failure(no_data_failure(&descriptor.method_id()))
        } else {
            CasePayload::Invoke(Invocation {
                body: Arc::clone(&method.body),
                arguments: case.arguments,
                timeout_ms: descriptor.timeout_ms,
                culture: case.culture,
            })
        };
        Ok(ExecutableCase::new(identity, payload))
    }
}

impl TestEngine for NativeEngine {
    fn generation(&self) -> FrameworkVersion {
        FrameworkVersion::Native
    }

    fn discover(&self, options: &DiscoveryOptions) -> Result<Vec<ExecutableCase>, OrchestrationError> {
        let mut cases = Vec::new();
        for method in self.assembly.methods() {
            let source = if options.include_source_information {
                self.source_for(&method.descriptor)
            } else {
                None
            };

            for case in expand_method(&method.descriptor, options.flag_theories_without_data) {
                let executable = self
                    .build_case(method, case, source.clone())
                    .map_err(|e| OrchestrationError::Discovery {
                        assembly: self.assembly.name.clone(),
                        reason: e.to_string(),
                    })?;
                if options.filters.matches(&executable.identity) {
                    cases.push(executable);
                }
            }
        }
        debug!(assembly = %self.assembly.name, cases = cases.len(), "native discovery finished");
        Ok(cases)
    }

    fn resolve(&self, token: &str) -> Result<ExecutableCase, ResolveError> {
        let decoded = NativeToken::decode(token)?;
        let method = self
            .assembly
            .find_method(&decoded.class, &decoded.method)
            .ok_or_else(|| ResolveError::UnknownMethod(format!("{}.{}", decoded.class, decoded.method)))?;

        let case = expand_method(&method.descriptor, true)
            .into_iter()
            .find(|case| case.row == decoded.row && case.culture == decoded.culture)
            .ok_or_else(|| match decoded.row {
                Some(row) => ResolveError::RowOutOfRange {
                    method: method.descriptor.method_id(),
                    row,
                },
                None => ResolveError::Malformed(format!(
                    "no case of '{}' matches the requested culture",
                    method.descriptor.method_id()
                )),
            })?;

        let source = self.source_for(&method.descriptor);
        self.build_case(method, case, source)
            .map_err(|e| ResolveError::Malformed(e.to_string()))
    }

    fn execute<'a>(
        &'a self,
        bus: &'a MessageBus,
        options: &'a ExecutionOptions,
        cases: Vec<ExecutableCase>,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, RunSummary> {
        Box::pin(run_cases(cases, bus, options, cancel))
    }
}

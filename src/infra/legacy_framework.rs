//! # Legacy Framework Module / 旧版框架模块
//!
//! A synchronous, callback-style framework over the in-memory assembly
//! model, used for assemblies that declare the legacy generation. It runs
//! on the thread it is called from and blocks on each asynchronous body.
//!
//! 基于内存程序集模型的同步回调式框架，用于声明为旧版代际的程序集。
//! 它在调用线程上运行，并阻塞等待每个异步主体完成。

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::warn;

use crate::core::{
    assembly::TestAssembly,
    engine::Invocation,
    execution::invoke,
    legacy::{LegacyDiscoverySink, LegacyExecutionSink, LegacyFramework, LegacyResult, LegacyTestCase},
    models::{FailureReason, TestFailure},
    theory::format_display_name,
};
use crate::infra::source_info::SourceInformationProvider;

pub struct AssemblyLegacyFramework {
    assembly: Arc<TestAssembly>,
    source_info: Option<Arc<dyn SourceInformationProvider>>,
}

impl AssemblyLegacyFramework {
    pub fn new(assembly: Arc<TestAssembly>) -> Self {
        Self {
            assembly,
            source_info: None,
        }
    }

    pub fn with_source_information(mut self, provider: Option<Arc<dyn SourceInformationProvider>>) -> Self {
        self.source_info = provider;
        self
    }

    fn run_one(&self, runtime: &Handle, case: &LegacyTestCase) -> LegacyResult {
        let Some(method) = self.assembly.find_method(&case.type_name, &case.method_name) else {
            return LegacyResult::Failed {
                duration: Duration::ZERO,
                failure: TestFailure::new(
                    FailureReason::NoResult,
                    format!("method {}.{} not found", case.type_name, case.method_name),
                ),
            };
        };

        let descriptor = &method.descriptor;
        let display_name = format_display_name(
            &descriptor.base_display_name(),
            &descriptor.parameters,
            &case.arguments,
        );
        let invocation = Invocation {
            body: Arc::clone(&method.body),
            arguments: case.arguments.clone(),
            timeout_ms: case.timeout_ms,
            culture: case.culture.clone(),
        };

        let start_time = Instant::now();
        let outcome = runtime.block_on(invoke(invocation, display_name, None));
        let duration = start_time.elapsed();

        match outcome {
            Ok(()) => LegacyResult::Passed { duration },
            Err(failure) => LegacyResult::Failed { duration, failure },
        }
    }
}

impl LegacyFramework for AssemblyLegacyFramework {
    fn assembly_name(&self) -> &str {
        &self.assembly.name
    }

    fn find(&self, include_source_information: bool, sink: &mut dyn LegacyDiscoverySink) {
        for method in self.assembly.methods() {
            let descriptor = &method.descriptor;
            let source = match (&self.source_info, include_source_information) {
                (Some(provider), true) => {
                    provider.lookup(&descriptor.class_name_with_namespace(), &descriptor.method_name)
                }
                _ => None,
            };
            if !sink.on_method(descriptor, source) {
                break;
            }
        }
    }

    fn run(&self, cases: &[LegacyTestCase], sink: &mut dyn LegacyExecutionSink) {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "legacy framework called outside a tokio runtime");
                return;
            }
        };

        for case in cases {
            let keep_going = sink.on_test_starting(case);
            let result = self.run_one(&runtime, case);
            if !sink.on_test_finished(case, result) || !keep_going {
                break;
            }
        }
    }
}

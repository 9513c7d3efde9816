// Shared test helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use front_runner::core::assembly::{
    FrameworkVersion, TestAssembly, TestBody, TestMethodDescriptor, test_body,
};
use front_runner::core::bus::{EventKind, MessageBusEvent};
use front_runner::core::culture::current_culture;
use front_runner::core::models::{ArgValue, DataRow, TestFailure};
use front_runner::core::FrontController;
use front_runner::infra::loader::{InMemoryLoader, ProjectAssembly};
use front_runner::infra::source_info::SourceInformationProvider;

pub fn pass_body() -> TestBody {
    test_body(|_ctx| async { Ok(()) })
}

pub fn fail_body(message: &'static str) -> TestBody {
    test_body(move |_ctx| async move { Err(TestFailure::assertion(message)) })
}

pub fn panic_body(message: &'static str) -> TestBody {
    test_body(move |_ctx| async move {
        if !message.is_empty() {
            panic!("{message}");
        }
        Ok(())
    })
}

pub fn sleep_body(millis: u64) -> TestBody {
    test_body(move |_ctx| async move {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(())
    })
}

/// Passes when argument 0 equals `expected`.
pub fn assert_first_arg_body(expected: i64) -> TestBody {
    test_body(move |ctx| async move {
        match ctx.argument(0) {
            ArgValue::Int(actual) if *actual == expected => Ok(()),
            other => Err(TestFailure::assertion(format!(
                "Expected: {expected}\nActual:   {}",
                other.render()
            ))),
        }
    })
}

/// Passes when the ambient culture matches the `[culture]` suffix of the display name.
pub fn culture_suffix_body() -> TestBody {
    test_body(|ctx| async move {
        let culture = current_culture();
        if ctx.display_name.ends_with(&format!("[{culture}]")) {
            Ok(())
        } else {
            Err(TestFailure::assertion(format!(
                "'{}' ran in culture '{culture}'",
                ctx.display_name
            )))
        }
    })
}

/// A native assembly with one passing fact, one failing fact and a theory
/// `Adds(x)` whose rows are `[42]` (passes) and `[7]` (fails).
pub fn sample_assembly(framework: FrameworkVersion) -> TestAssembly {
    TestAssembly::new("Sample.Tests", framework)
        .with_method(
            TestMethodDescriptor::fact("MathTests", "Passes").in_namespace("Sample"),
            pass_body(),
        )
        .with_method(
            TestMethodDescriptor::fact("MathTests", "Fails").in_namespace("Sample"),
            fail_body("deliberate failure"),
        )
        .with_method(
            TestMethodDescriptor::theory("MathTests", "Adds", ["x"])
                .in_namespace("Sample")
                .with_row(DataRow::new([42]))
                .with_row(DataRow::new([7])),
            assert_first_arg_body(42),
        )
}

pub fn controller_for(assembly: TestAssembly) -> FrontController {
    FrontController::for_discovery_and_execution(
        &ProjectAssembly::new("memory.toml"),
        &InMemoryLoader::new(assembly),
        None,
    )
    .expect("in-memory assemblies always load")
}

pub fn controller_with_sources(
    assembly: TestAssembly,
    loaded: Arc<dyn SourceInformationProvider>,
    override_provider: Option<Arc<dyn SourceInformationProvider>>,
) -> FrontController {
    FrontController::for_discovery_and_execution(
        &ProjectAssembly::new("memory.toml"),
        &InMemoryLoader::new(assembly).with_source_information(loaded),
        override_provider,
    )
    .expect("in-memory assemblies always load")
}

/// Unique ids of the terminal events, grouped by kind.
pub fn terminal_ids(events: &[MessageBusEvent], kind: EventKind) -> Vec<String> {
    events
        .iter()
        .filter(|event| event.kind() == kind)
        .filter_map(|event| event.unique_id().map(str::to_string))
        .collect()
}

/// Asserts every case saw `TestStarting` before exactly one terminal event.
pub fn assert_well_ordered(events: &[MessageBusEvent]) {
    let mut started = std::collections::HashSet::new();
    let mut finished = std::collections::HashSet::new();
    for event in events {
        match event {
            MessageBusEvent::TestStarting { unique_id, .. } => {
                assert!(started.insert(unique_id.clone()), "{unique_id} started twice");
            }
            terminal if terminal.is_case_terminal() => {
                let id = terminal.unique_id().unwrap().to_string();
                assert!(started.contains(&id), "{id} finished before it started");
                assert!(finished.insert(id.clone()), "{id} finished twice");
            }
            _ => {}
        }
    }
    assert_eq!(started, finished, "every started case must finish");
}

pub fn failure_of(events: &[MessageBusEvent], unique_id: &str) -> Option<MessageBusEvent> {
    events
        .iter()
        .find(|event| event.kind() == EventKind::TestFailed && event.unique_id() == Some(unique_id))
        .cloned()
}

/// Writes a manifest into a fresh temporary directory.
pub fn write_manifest(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temporary directory");
    let path = temp_dir.path().join("assembly.toml");
    fs::write(&path, content).expect("Failed to write manifest");
    (temp_dir, path)
}

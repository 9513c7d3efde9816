//! # Manifest Loading Integration Tests / 清单加载集成测试
//!
//! Loads TOML assembly manifests from disk through the manifest loader,
//! including shadow copying, and runs them end to end.
//!
//! 通过清单加载器从磁盘加载 TOML 程序集清单（包括影子复制），并端到端地运行它们。

mod common;

use tokio_util::sync::CancellationToken;

use front_runner::core::assembly::FrameworkVersion;
use front_runner::core::bus::{EventKind, MessageBus, MessageBusEvent};
use front_runner::core::config::{
    DiscoveryOptions, FindAndRunSettings, FindSettings, IsolationPolicy,
};
use front_runner::core::error::{LoadError, OrchestrationError};
use front_runner::core::models::FailureReason;
use front_runner::core::FrontController;
use front_runner::infra::loader::{AssemblyLoader, ManifestLoader, ProjectAssembly};

use common::*;

const NATIVE_MANIFEST: &str = r#"
name = "Manifest.Tests"
framework = 3

[[class]]
namespace = "Manifest"
name = "Calc"
traits = [["Category", "Math"]]

[[class.method]]
name = "Passes"
source = { file = "calc.rs", line = 10 }

[[class.method]]
name = "Fails"
body = { action = "fail", message = "expected failure" }

[[class.method]]
name = "Equals42"
kind = "theory"
parameters = ["x"]
body = { action = "assert-arg", index = 0, equals = 42 }

[[class.method.row]]
args = [42]

[[class.method.row]]
args = [13]
skip = "not today"

[[class.method]]
name = "Slow"
timeout_ms = 50
body = { action = "sleep", ms = 5000 }
"#;

fn no_shadow() -> IsolationPolicy {
    IsolationPolicy {
        shadow_copy: false,
        ..IsolationPolicy::default()
    }
}

#[cfg(test)]
mod loader_tests {
    use super::*;

    #[test]
    fn test_shadow_copy_loads_from_a_private_directory() {
        let (_dir, path) = write_manifest(NATIVE_MANIFEST);
        let loaded = ManifestLoader.load(&ProjectAssembly::new(&path)).unwrap();

        assert!(loaded.handle.is_shadow_copy());
        assert_ne!(loaded.handle.path(), path.as_path());
        assert!(loaded.handle.path().is_file());
        assert_eq!(loaded.assembly.name, "Manifest.Tests");
        assert!(loaded.source_info.is_some());

        let shadow_dir = loaded.handle.path().parent().unwrap().to_path_buf();
        drop(loaded);
        assert!(!shadow_dir.exists(), "shadow copy should be removed with its handle");
    }

    #[test]
    fn test_in_place_load_without_shadow_copy() {
        let (_dir, path) = write_manifest(NATIVE_MANIFEST);
        let project = ProjectAssembly::new(&path).with_isolation(IsolationPolicy {
            culture: Some("en-GB".to_string()),
            ..no_shadow()
        });
        let loaded = ManifestLoader.load(&project).unwrap();

        assert!(!loaded.handle.is_shadow_copy());
        assert_eq!(loaded.handle.path(), path.as_path());
        assert_eq!(loaded.default_culture.as_deref(), Some("en-GB"));
    }

    #[test]
    fn test_missing_assembly_and_config() {
        let (dir, path) = write_manifest(NATIVE_MANIFEST);

        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            ManifestLoader.load(&ProjectAssembly::new(&missing)),
            Err(LoadError::NotFound(p)) if p == missing
        ));

        let project = ProjectAssembly::new(&path).with_config(dir.path().join("app.config"));
        assert!(matches!(ManifestLoader.load(&project), Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_unparsable_manifest() {
        let (_dir, path) = write_manifest("name = \"Broken\"\nframework = \"three\"\n");
        let result = FrontController::for_discovery_and_execution(
            &ProjectAssembly::new(&path).with_isolation(no_shadow()),
            &ManifestLoader,
            None,
        );
        assert!(matches!(result, Err(OrchestrationError::Load(LoadError::Parse { .. }))));
    }
}

#[cfg(test)]
mod end_to_end_tests {
    use super::*;

    fn controller(path: &std::path::Path) -> FrontController {
        FrontController::for_discovery_and_execution(&ProjectAssembly::new(path), &ManifestLoader, None)
            .unwrap()
    }

    #[tokio::test]
    async fn test_manifest_discovery_with_source_information() {
        let (_dir, path) = write_manifest(NATIVE_MANIFEST);
        let controller = controller(&path);
        assert_eq!(controller.generation(), FrameworkVersion::Native);

        let settings = FindSettings::new(DiscoveryOptions {
            include_source_information: true,
            ..DiscoveryOptions::default()
        });
        let cases = controller.find(&MessageBus::new(), &settings).unwrap();

        assert_eq!(cases.len(), 5);
        assert_eq!(cases[0].source_file(), Some("calc.rs"));
        assert_eq!(cases[0].source_line(), Some(10));
        assert_eq!(cases[1].source_file(), None);
        assert!(cases.iter().all(|c| c.traits().contains("Category", "Math")));
        assert_eq!(cases[3].skip_reason(), Some("not today"));
    }

    #[tokio::test]
    async fn test_manifest_find_and_run() {
        let (_dir, path) = write_manifest(NATIVE_MANIFEST);
        let controller = controller(&path);
        let bus = MessageBus::new();
        let sub = bus.subscribe();

        let summary = controller
            .find_and_run(&bus, &FindAndRunSettings::default(), CancellationToken::new())
            .await
            .unwrap();
        let events = sub.collect_until(EventKind::TestAssemblyFinished).await;

        assert_eq!(summary.total, 5);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
        assert_well_ordered(&events);
        assert!(events.iter().any(|e| matches!(
            e,
            MessageBusEvent::TestFailed { reason: FailureReason::Timeout, .. }
        )));
        assert!(matches!(
            events.last(),
            Some(MessageBusEvent::TestAssemblyFinished { assembly, .. }) if assembly == "Manifest.Tests"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_legacy_manifest_runs_through_the_adapter() {
        let (_dir, path) = write_manifest(&NATIVE_MANIFEST.replace("framework = 3", "framework = 2"));
        let controller = controller(&path);
        assert_eq!(controller.generation(), FrameworkVersion::Legacy);

        let bus = MessageBus::new();
        let summary = controller
            .find_and_run(&bus, &FindAndRunSettings::default(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
    }
}

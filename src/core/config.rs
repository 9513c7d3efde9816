//! # Configuration Module / 配置模块
//!
//! Discovery and execution options, the settings objects passed to the
//! front controller, and the runner configuration file.
//!
//! 发现和执行选项、传递给前端控制器的设置对象，以及运行器配置文件。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::OrchestrationError;
use crate::core::models::TestCaseIdentity;
use crate::core::planner::ExplicitOption;

/// Name filters and trait filters applied during discovery.
/// 发现阶段应用的名称过滤器和特征过滤器。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFilters {
    /// `Namespace.Class.Method` patterns; `*` matches any run of characters.
    /// An empty list matches every method.
    /// `Namespace.Class.Method` 模式；`*` 匹配任意字符序列。空列表匹配所有方法。
    #[serde(default)]
    pub methods: Vec<String>,
    /// A case must carry at least one of these `(name, value)` traits.
    /// 用例必须至少带有其中一个 `(name, value)` 特征。
    #[serde(default)]
    pub include_traits: Vec<(String, String)>,
    /// A case carrying any of these traits is dropped.
    /// 带有其中任意特征的用例将被丢弃。
    #[serde(default)]
    pub exclude_traits: Vec<(String, String)>,
}

impl TestFilters {
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.include_traits.is_empty() && self.exclude_traits.is_empty()
    }

    pub fn matches(&self, case: &TestCaseIdentity) -> bool {
        let method_id = format!("{}.{}", case.class_name_with_namespace(), case.method_name());
        let method_ok = self.methods.is_empty()
            || self.methods.iter().any(|pattern| wildcard_match(pattern, &method_id));
        let include_ok = self.include_traits.is_empty()
            || self
                .include_traits
                .iter()
                .any(|(name, value)| case.traits().contains(name, value));
        let exclude_ok = !self
            .exclude_traits
            .iter()
            .any(|(name, value)| case.traits().contains(name, value));
        method_ok && include_ok && exclude_ok
    }
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut rest = text;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

/// Options controlling discovery.
/// 控制发现阶段的选项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Consult the source information provider for file/line data.
    /// 是否向源码信息提供者查询文件/行号数据。
    pub include_source_information: bool,
    /// Report a theory with no data rows as one failing case.
    /// 将没有数据行的理论报告为一个失败用例。
    pub flag_theories_without_data: bool,
    pub filters: TestFilters,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            include_source_information: false,
            flag_theories_without_data: true,
            filters: TestFilters::default(),
        }
    }
}

/// Options controlling execution.
/// 控制执行阶段的选项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    pub explicit: ExplicitOption,
    /// Culture applied to cases that do not declare their own.
    /// 应用于未声明自身区域设置的用例的区域设置。
    pub culture: Option<String>,
    /// Maximum number of cases running at once; `0` means one per CPU.
    /// 同时运行的最大用例数；`0` 表示每个 CPU 一个。
    pub max_parallel_threads: usize,
    /// Stop starting new cases after the first failure.
    /// 第一次失败后不再启动新用例。
    pub stop_on_fail: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            explicit: ExplicitOption::Off,
            culture: None,
            max_parallel_threads: 1,
            stop_on_fail: false,
        }
    }
}

impl ExecutionOptions {
    pub fn effective_parallelism(&self) -> usize {
        match self.max_parallel_threads {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }

    pub fn validate(&self) -> Result<(), OrchestrationError> {
        if let Some(culture) = &self.culture {
            crate::core::culture::validate(culture)
                .map_err(|e| OrchestrationError::InvalidOptions(e.to_string()))?;
        }
        Ok(())
    }
}

/// Settings for `find`.
#[derive(Debug, Clone, Default)]
pub struct FindSettings {
    pub discovery: DiscoveryOptions,
}

impl FindSettings {
    pub fn new(discovery: DiscoveryOptions) -> Self {
        Self { discovery }
    }
}

/// Settings for `run`: execution options plus previously emitted tokens.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub execution: ExecutionOptions,
    pub serialized_test_cases: Vec<String>,
}

impl RunSettings {
    pub fn new(execution: ExecutionOptions, serialized_test_cases: Vec<String>) -> Self {
        Self {
            execution,
            serialized_test_cases,
        }
    }
}

/// Settings for `find_and_run`.
#[derive(Debug, Clone, Default)]
pub struct FindAndRunSettings {
    pub discovery: DiscoveryOptions,
    pub execution: ExecutionOptions,
}

impl FindAndRunSettings {
    pub fn new(discovery: DiscoveryOptions, execution: ExecutionOptions) -> Self {
        Self {
            discovery,
            execution,
        }
    }
}

/// Isolation mode requested from the assembly loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    Required,
    #[default]
    NotRequired,
}

/// Environment isolation settings forwarded opaquely to the loader.
/// 原样转发给加载器的环境隔离设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationPolicy {
    pub shadow_copy: bool,
    pub isolation: IsolationMode,
    pub culture: Option<String>,
}

impl Default for IsolationPolicy {
    fn default() -> Self {
        Self {
            shadow_copy: true,
            isolation: IsolationMode::NotRequired,
            culture: None,
        }
    }
}

/// Represents the runner configuration, loaded from a TOML file.
/// Every section is optional.
///
/// 代表从 TOML 文件加载的运行器配置。所有部分都是可选的。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// Defaults to "en" if not specified.
    ///
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    /// 如果未指定，则默认为 "en"。
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub discovery: DiscoveryOptions,
    #[serde(default)]
    pub execution: ExecutionOptions,
    #[serde(default)]
    pub isolation: IsolationPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            discovery: DiscoveryOptions::default(),
            execution: ExecutionOptions::default(),
            isolation: IsolationPolicy::default(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

/// Loads a runner configuration file.
/// 加载运行器配置文件。
pub fn load_runner_config(path: &Path) -> Result<RunnerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("A.B.C", "A.B.C"));
        assert!(wildcard_match("A.*", "A.B.C"));
        assert!(wildcard_match("*.C", "A.B.C"));
        assert!(wildcard_match("A*C", "A.B.C"));
        assert!(wildcard_match("*B*", "A.B.C"));
        assert!(!wildcard_match("A.*.D", "A.B.C"));
        assert!(!wildcard_match("B.*", "A.B.C"));
    }
}

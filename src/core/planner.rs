//! # Test Execution Planner Module / 测试执行计划模块
//!
//! This module decides which cases of a run actually execute. Cases are
//! partitioned by the explicit-filter policy into those to run and those
//! reported as not run.
//!
//! 此模块决定一次运行中哪些用例实际执行。
//! 用例按 explicit 过滤策略被划分为要运行的用例和报告为未运行的用例。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::models::TestCaseIdentity;

/// Per-run explicit filtering mode.
/// 每次运行的 explicit 过滤模式。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplicitOption {
    /// Run normal cases only / 仅运行普通用例
    #[default]
    Off,
    /// Run normal and explicit cases / 运行普通用例和 explicit 用例
    On,
    /// Run explicit cases only / 仅运行 explicit 用例
    Only,
}

impl FromStr for ExplicitOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(ExplicitOption::Off),
            "on" => Ok(ExplicitOption::On),
            "only" => Ok(ExplicitOption::Only),
            other => Err(format!("unknown explicit option '{other}' (expected off, on or only)")),
        }
    }
}

impl fmt::Display for ExplicitOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExplicitOption::Off => "off",
            ExplicitOption::On => "on",
            ExplicitOption::Only => "only",
        })
    }
}

/// Per-case explicit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Normal,
    Explicit,
}

impl CaseState {
    pub fn of(identity: &TestCaseIdentity) -> Self {
        if identity.is_explicit() {
            CaseState::Explicit
        } else {
            CaseState::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Run,
    NotRun,
}

/// The explicit-filter decision table.
///
/// | state    | Off    | On  | Only   |
/// |----------|--------|-----|--------|
/// | Normal   | run    | run | NotRun |
/// | Explicit | NotRun | run | run    |
pub fn decide(state: CaseState, option: ExplicitOption) -> FilterDecision {
    match (state, option) {
        (CaseState::Normal, ExplicitOption::Only) | (CaseState::Explicit, ExplicitOption::Off) => {
            FilterDecision::NotRun
        }
        _ => FilterDecision::Run,
    }
}

/// Represents the execution plan for one run.
/// 表示一次运行的执行计划。
#[derive(Debug)]
pub struct ExecutionPlan<T> {
    /// Cases that pass the explicit filter, in their original order.
    /// 通过 explicit 过滤的用例，保持原有顺序。
    pub cases_to_run: Vec<T>,
    /// Cases to report as `TestNotRun`.
    /// 需要报告为 `TestNotRun` 的用例。
    pub not_run: Vec<T>,
}

/// Partitions `cases` by the explicit-filter policy.
///
/// 按 explicit 过滤策略划分 `cases`。
pub fn plan_execution<T>(cases: Vec<T>, option: ExplicitOption) -> ExecutionPlan<T>
where
    T: AsRef<TestCaseIdentity>,
{
    let (cases_to_run, not_run): (Vec<_>, Vec<_>) = cases
        .into_iter()
        .partition(|case| decide(CaseState::of(case.as_ref()), option) == FilterDecision::Run);

    ExecutionPlan {
        cases_to_run,
        not_run,
    }
}

impl AsRef<TestCaseIdentity> for TestCaseIdentity {
    fn as_ref(&self) -> &TestCaseIdentity {
        self
    }
}

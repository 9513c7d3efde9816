//! # Theory Expansion Module / 理论展开模块
//!
//! Turns one parameterized test method plus its data rows into one case per
//! row, in row order, each with a display name embedding its arguments.
//!
//! 将一个参数化测试方法及其数据行展开为每行一个用例（保持行顺序），
//! 每个用例的显示名称都嵌入了其参数值。
//!
//! ## Identity stability / 标识稳定性
//!
//! The unique id of an expanded case is derived from the method id, the row
//! index and the argument fingerprint. Reordering rows in source therefore
//! changes ids.
//!
//! 展开用例的唯一 ID 由方法 ID、行索引和参数指纹派生。
//! 因此在源码中调整行顺序会改变 ID。

use crate::core::assembly::{MethodKind, TestMethodDescriptor};
use crate::core::culture;
use crate::core::models::{
    ArgValue, CaseBuilder, DataRow, MISSING_PLACEHOLDER, TestCaseIdentity, stable_id,
};

/// One case produced by expanding a theory row.
/// 展开理论数据行后产生的单个用例。
#[derive(Debug, Clone)]
pub struct TheoryCase {
    pub row_index: usize,
    pub arguments: Vec<ArgValue>,
    pub identity: TestCaseIdentity,
}

/// Expands `rows` against `method`, one case per row.
///
/// Zero rows yield zero cases; flagging a theory without data is left to the
/// discovery layer.
///
/// 针对 `method` 展开 `rows`，每行产生一个用例。
/// 零行数据产生零个用例；是否将无数据的理论标记为错误由发现层决定。
pub fn expand(method: &TestMethodDescriptor, rows: &[DataRow]) -> Vec<TheoryCase> {
    rows.iter()
        .enumerate()
        .map(|(row_index, row)| TheoryCase {
            row_index,
            arguments: row.args.clone(),
            identity: expand_row(method, row_index, row).build(),
        })
        .collect()
}

/// Builds the still-open identity for a single row.
pub fn expand_row(method: &TestMethodDescriptor, row_index: usize, row: &DataRow) -> CaseBuilder {
    let base_name = row
        .display_name
        .clone()
        .unwrap_or_else(|| method.base_display_name());
    let display_name = format_display_name(&base_name, &method.parameters, &row.args);
    let unique_id = stable_id([
        method.method_id(),
        row_index.to_string(),
        row.fingerprint(),
    ]);

    let mut builder = method_builder(method, unique_id)
        .with_display_name(display_name)
        .skip_reason(row.skip.clone().or_else(|| method.skip.clone()))
        .explicit(row.explicit.unwrap_or(method.explicit));

    for (name, value) in &row.traits {
        builder = builder.add_trait(name.clone(), value.clone());
    }
    builder
}

/// One case of a method before the engine attaches its token and payload.
/// 引擎附加令牌和负载之前的单个方法用例。
#[derive(Debug, Clone)]
pub struct MethodCase {
    /// Data row index; `None` for facts and for a theory without data.
    pub row: Option<usize>,
    pub arguments: Vec<ArgValue>,
    pub culture: Option<String>,
    pub builder: CaseBuilder,
    /// Stands in for a theory that declared no data.
    pub no_data: bool,
}

/// Expands a method into its cases: one per fact, one per theory row, each
/// repeated once per declared culture.
///
/// A theory without rows yields nothing, or a single `no_data` case when
/// `flag_theories_without_data` is set.
///
/// 将方法展开为用例：每个 fact 一个、每个理论数据行一个，
/// 并针对声明的每个区域设置各重复一次。
/// 没有数据行的理论不产生用例；若设置了 `flag_theories_without_data`，
/// 则产生一个 `no_data` 用例。
pub fn expand_method(method: &TestMethodDescriptor, flag_theories_without_data: bool) -> Vec<MethodCase> {
    let base: Vec<MethodCase> = match method.kind {
        MethodKind::Fact => vec![MethodCase {
            row: None,
            arguments: Vec::new(),
            culture: None,
            builder: method_builder(method, stable_id([method.method_id()])),
            no_data: false,
        }],
        MethodKind::Theory if method.data.is_empty() => {
            if !flag_theories_without_data {
                return Vec::new();
            }
            vec![MethodCase {
                row: None,
                arguments: Vec::new(),
                culture: None,
                builder: method_builder(method, stable_id([method.method_id(), "no-data".to_string()])),
                no_data: true,
            }]
        }
        MethodKind::Theory => method
            .data
            .iter()
            .enumerate()
            .map(|(row_index, row)| MethodCase {
                row: Some(row_index),
                arguments: row.args.clone(),
                culture: None,
                builder: expand_row(method, row_index, row),
                no_data: false,
            })
            .collect(),
    };

    if method.cultures.is_empty() {
        return base;
    }

    base.into_iter()
        .flat_map(|case| {
            method.cultures.iter().map(move |name| MethodCase {
                culture: Some(name.clone()),
                builder: culture::qualify(case.builder.clone(), name),
                ..case.clone()
            })
        })
        .collect()
}

fn method_builder(method: &TestMethodDescriptor, unique_id: String) -> CaseBuilder {
    CaseBuilder::new(unique_id, method.base_display_name())
        .method(
            method.namespace.clone(),
            method.class_name.clone(),
            method.method_name.clone(),
        )
        .traits(&method.traits)
        .skip_reason(method.skip.clone())
        .explicit(method.explicit)
}

/// Formats `Base(p1: v1, p2: v2, ...)`.
///
/// Parameters without a supplied argument render their value as `???`;
/// arguments beyond the declared parameters render with `???` as the name.
///
/// 格式化为 `Base(p1: v1, p2: v2, ...)`。
/// 没有提供参数值的形参以 `???` 作为值；超出声明形参的实参以 `???` 作为名称。
pub fn format_display_name(base_name: &str, parameters: &[String], args: &[ArgValue]) -> String {
    let count = parameters.len().max(args.len());
    if count == 0 {
        return base_name.to_string();
    }

    let rendered: Vec<String> = (0..count)
        .map(|i| {
            let name = parameters.get(i).map_or(MISSING_PLACEHOLDER, String::as_str);
            let value = args.get(i).map_or_else(|| MISSING_PLACEHOLDER.to_string(), ArgValue::render);
            format!("{name}: {value}")
        })
        .collect();

    format!("{base_name}({})", rendered.join(", "))
}

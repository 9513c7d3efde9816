//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures shared by discovery and
//! execution: the immutable test case identity, theory data rows, argument
//! values and failure descriptions.
//!
//! 此模块定义了发现和执行共享的核心数据结构：
//! 不可变的测试用例标识、理论数据行、参数值和失败描述。

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Placeholder rendered for missing arguments and unnamed extra parameters.
/// 缺失参数和多余的未命名参数所使用的占位符。
pub const MISSING_PLACEHOLDER: &str = "???";

const MAX_RENDERED_STRING_LEN: usize = 50;

/// A single argument value supplied by a theory data row.
/// 理论数据行提供的单个参数值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// An explicit null value / 显式的 null 值
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A character value; only constructed programmatically.
    /// 字符值；仅能以编程方式构造。
    #[serde(skip)]
    Char(char),
    /// A value that is absent or could not be converted for display.
    /// 缺失或无法转换为显示形式的值。
    #[serde(skip)]
    Missing,
}

impl ArgValue {
    /// Renders the value the way it appears inside a theory display name.
    ///
    /// 以理论显示名称中的形式渲染该值。
    pub fn render(&self) -> String {
        match self {
            ArgValue::Null => "null".to_string(),
            ArgValue::Bool(true) => "True".to_string(),
            ArgValue::Bool(false) => "False".to_string(),
            ArgValue::Int(v) => v.to_string(),
            ArgValue::Float(v) => v.to_string(),
            ArgValue::Char(c) => format!("'{}'", escape(&c.to_string())),
            ArgValue::Str(s) => {
                if s.chars().count() > MAX_RENDERED_STRING_LEN {
                    let head: String = s.chars().take(MAX_RENDERED_STRING_LEN).collect();
                    format!("\"{}\"...", escape(&head))
                } else {
                    format!("\"{}\"", escape(s))
                }
            }
            ArgValue::Missing => MISSING_PLACEHOLDER.to_string(),
        }
    }

    /// A type-tagged textual form used when fingerprinting a data row.
    pub fn fingerprint(&self) -> String {
        match self {
            ArgValue::Null => "n:".to_string(),
            ArgValue::Bool(v) => format!("b:{v}"),
            ArgValue::Int(v) => format!("i:{v}"),
            ArgValue::Float(v) => format!("f:{v}"),
            ArgValue::Str(s) => format!("s:{}:{s}", s.len()),
            ArgValue::Char(c) => format!("c:{c}"),
            ArgValue::Missing => "m:".to_string(),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(v as i64)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

impl From<char> for ArgValue {
    fn from(v: char) -> Self {
        ArgValue::Char(v)
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

/// One row of theory data: the arguments for one generated case plus
/// optional row-level overrides.
///
/// 一行理论数据：一个生成用例的参数，以及可选的行级覆盖设置。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    /// Positional argument values / 按位置排列的参数值
    #[serde(default)]
    pub args: Vec<ArgValue>,
    /// Row-level skip reason; a skipped row never reaches execution.
    /// 行级跳过原因；被跳过的行永远不会进入执行阶段。
    #[serde(default)]
    pub skip: Option<String>,
    /// Row-level explicit flag, overriding the method-level flag.
    /// 行级 explicit 标志，覆盖方法级标志。
    #[serde(default)]
    pub explicit: Option<bool>,
    /// Replaces the method's base display name for this row.
    /// 为此行替换方法的基础显示名称。
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub traits: Vec<(String, String)>,
}

impl DataRow {
    pub fn new<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ArgValue>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A row that supplies no arguments at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    pub fn with_explicit(mut self, explicit: bool) -> Self {
        self.explicit = Some(explicit);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_trait(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.traits.push((name.into(), value.into()));
        self
    }

    /// Stable textual fingerprint of the row's arguments.
    pub fn fingerprint(&self) -> String {
        self.args
            .iter()
            .map(ArgValue::fingerprint)
            .collect::<Vec<_>>()
            .join("\u{1f}")
    }
}

/// Ordered trait tags. Adding a value under an existing name merges it into
/// that name's value set instead of creating a second entry.
///
/// 有序的特征标签。在已有名称下添加值时会合并到该名称的值集合中，
/// 而不会创建第二个条目。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traits(Vec<(String, Vec<String>)>);

impl Traits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            None => self.0.push((name, vec![value])),
        }
    }

    pub fn merge(&mut self, other: &Traits) {
        for (name, values) in other.iter() {
            for value in values {
                self.add(name, value.clone());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn contains(&self, name: &str, value: &str) -> bool {
        self.get(name)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Traits {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut traits = Traits::new();
        for (name, value) in iter {
            traits.add(name, value);
        }
        traits
    }
}

/// A file and line pointing at the source of a test method.
/// 指向测试方法源码的文件和行号。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInformation {
    pub file: String,
    pub line: u32,
}

/// The immutable identity of one runnable test case.
///
/// Fields are only settable through [`CaseBuilder`]; once built, the identity
/// is handed to the message bus as-is and never changes.
///
/// 单个可运行测试用例的不可变标识。
///
/// 字段只能通过 [`CaseBuilder`] 设置；构建完成后，标识将原样交给消息总线，
/// 之后不会再改变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseIdentity {
    unique_id: String,
    display_name: String,
    skip_reason: Option<String>,
    traits: Traits,
    source_file: Option<String>,
    source_line: Option<u32>,
    serialization: String,
    is_explicit: bool,
    namespace: Option<String>,
    class_name: String,
    method_name: String,
}

impl TestCaseIdentity {
    pub fn builder(unique_id: impl Into<String>, display_name: impl Into<String>) -> CaseBuilder {
        CaseBuilder::new(unique_id, display_name)
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }

    pub fn traits(&self) -> &Traits {
        &self.traits
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn source_line(&self) -> Option<u32> {
        self.source_line
    }

    /// The opaque token that resolves back to this case in a later `run`.
    /// 在之后的 `run` 调用中可解析回此用例的不透明令牌。
    pub fn serialization(&self) -> &str {
        &self.serialization
    }

    pub fn is_explicit(&self) -> bool {
        self.is_explicit
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The class name without its namespace.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn class_name_with_namespace(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.class_name),
            None => self.class_name.clone(),
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Reopens an identity that has not been published yet, so discovery can
    /// decorate it (culture suffix, serialization token) before handing it out.
    pub fn into_builder(self) -> CaseBuilder {
        CaseBuilder { identity: self }
    }
}

/// Construction-time view of a [`TestCaseIdentity`].
/// [`TestCaseIdentity`] 的构造期视图。
#[derive(Debug, Clone)]
pub struct CaseBuilder {
    identity: TestCaseIdentity,
}

impl CaseBuilder {
    pub fn new(unique_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identity: TestCaseIdentity {
                unique_id: unique_id.into(),
                display_name: display_name.into(),
                skip_reason: None,
                traits: Traits::new(),
                source_file: None,
                source_line: None,
                serialization: String::new(),
                is_explicit: false,
                namespace: None,
                class_name: String::new(),
                method_name: String::new(),
            },
        }
    }

    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn unique_id(&self) -> &str {
        &self.identity.unique_id
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.identity.display_name = display_name.into();
        self
    }

    /// Appends the same suffix to both the display name and the unique id.
    pub fn append_suffix(mut self, suffix: &str) -> Self {
        self.identity.display_name.push_str(suffix);
        self.identity.unique_id.push_str(suffix);
        self
    }

    pub fn skip_reason(mut self, reason: Option<String>) -> Self {
        self.identity.skip_reason = reason;
        self
    }

    pub fn add_trait(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.identity.traits.add(name, value);
        self
    }

    pub fn traits(mut self, traits: &Traits) -> Self {
        self.identity.traits.merge(traits);
        self
    }

    pub fn source(mut self, source: Option<SourceInformation>) -> Self {
        match source {
            Some(info) => {
                self.identity.source_file = Some(info.file);
                self.identity.source_line = Some(info.line);
            }
            None => {
                self.identity.source_file = None;
                self.identity.source_line = None;
            }
        }
        self
    }

    pub fn serialization(mut self, token: impl Into<String>) -> Self {
        self.identity.serialization = token.into();
        self
    }

    pub fn explicit(mut self, explicit: bool) -> Self {
        self.identity.is_explicit = explicit;
        self
    }

    pub fn method(
        mut self,
        namespace: Option<String>,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        self.identity.namespace = namespace;
        self.identity.class_name = class_name.into();
        self.identity.method_name = method_name.into();
        self
    }

    pub fn build(self) -> TestCaseIdentity {
        self.identity
    }
}

/// Computes a deterministic identifier from ordered parts.
///
/// 根据有序的组成部分计算确定性标识符。
pub fn stable_id<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Enumerates the possible reasons for a test case failure.
/// This helps in categorizing errors for reporting and handling.
/// 枚举测试用例失败的可能原因。
/// 这有助于对错误进行分类，以便报告和处理。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum FailureReason {
    /// The test body returned a failure.
    /// 测试主体返回了失败。
    Assertion,
    /// The test body panicked.
    /// 测试主体发生了 panic。
    Panicked,
    /// The test case exceeded its configured timeout.
    /// 测试用例超出了其配置的超时时间。
    Timeout,
    /// A serialized case could not be resolved.
    /// 无法解析序列化的用例。
    Deserialization,
    /// A theory declared no data rows.
    /// 理论没有声明任何数据行。
    NoData,
    /// The culture scope could not be entered.
    /// 无法进入区域设置作用域。
    Culture,
    /// An engine started the case but never reported a result.
    /// 引擎启动了用例，但从未报告结果。
    NoResult,
}

/// A failed outcome for a single case.
/// 单个用例的失败结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    pub reason: FailureReason,
    pub messages: Vec<String>,
}

impl TestFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            messages: vec![message.into()],
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Assertion, message)
    }

    pub fn message(&self) -> String {
        self.messages.join("\n")
    }
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.reason, self.message())
    }
}

impl std::error::Error for TestFailure {}

impl From<&str> for TestFailure {
    fn from(message: &str) -> Self {
        TestFailure::assertion(message)
    }
}

impl From<String> for TestFailure {
    fn from(message: String) -> Self {
        TestFailure::assertion(message)
    }
}

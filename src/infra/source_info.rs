//! # Source Information Module / 源码信息模块
//!
//! Looks up the file and line of a test method. Discovery consults a provider
//! only when the discovery options ask for source information.
//!
//! 查找测试方法所在的文件和行号。仅当发现选项请求源码信息时，发现阶段才会查询提供者。

use std::collections::HashMap;

use crate::core::models::SourceInformation;

/// Maps `(declaring type, member)` to a source location.
/// 将 `(声明类型, 成员)` 映射到源码位置。
pub trait SourceInformationProvider: Send + Sync {
    /// `type_name` is the fully-qualified class name.
    fn lookup(&self, type_name: &str, member_name: &str) -> Option<SourceInformation>;
}

/// A provider that never knows anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSourceInformationProvider;

impl SourceInformationProvider for NullSourceInformationProvider {
    fn lookup(&self, _type_name: &str, _member_name: &str) -> Option<SourceInformation> {
        None
    }
}

/// A provider backed by a fixed table, e.g. one read from a manifest.
/// 由固定表支持的提供者，例如从清单文件读取的表。
#[derive(Debug, Default, Clone)]
pub struct MapSourceInformationProvider {
    entries: HashMap<(String, String), SourceInformation>,
}

impl MapSourceInformationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        type_name: impl Into<String>,
        member_name: impl Into<String>,
        info: SourceInformation,
    ) {
        self.entries.insert((type_name.into(), member_name.into()), info);
    }

    pub fn with_entry(
        mut self,
        type_name: impl Into<String>,
        member_name: impl Into<String>,
        file: impl Into<String>,
        line: u32,
    ) -> Self {
        self.insert(
            type_name,
            member_name,
            SourceInformation {
                file: file.into(),
                line,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SourceInformationProvider for MapSourceInformationProvider {
    fn lookup(&self, type_name: &str, member_name: &str) -> Option<SourceInformation> {
        self.entries
            .get(&(type_name.to_string(), member_name.to_string()))
            .cloned()
    }
}

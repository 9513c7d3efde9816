//! # Infrastructure Module / 基础设施模块
//!
//! This module provides the collaborators around the orchestration core:
//! assembly loading and manifests, source information lookup, the concrete
//! legacy framework, file system helpers, logging and i18n support.
//!
//! 此模块提供编排核心周边的协作组件：
//! 程序集加载与清单、源码信息查找、具体的旧版框架、文件系统辅助功能、日志和国际化支持。

pub mod fs;
pub mod legacy_framework;
pub mod loader;
pub mod logging;
pub mod manifest;
pub mod source_info;

// Re-export i18n functions for easier access
pub use rust_i18n::t;

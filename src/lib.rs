//! # Front Runner Library / Front Runner 库
//!
//! This library provides the core functionality for the Front Runner tool,
//! a test-execution front controller. It discovers the test cases of an
//! assembly, expands data-driven theories into individual cases, runs them
//! under a controlled culture and timeout, and streams every lifecycle event
//! over an ordered message bus. Assemblies of the older framework generation
//! are driven through a callback adapter that yields the same event stream.
//!
//! 此库为 Front Runner 工具提供核心功能，这是一个测试执行前端控制器。
//! 它发现程序集中的测试用例，将数据驱动的理论展开为独立用例，在受控的区域设置和超时下运行，
//! 并通过有序消息总线流式发布所有生命周期事件。旧代框架的程序集通过回调适配器驱动，
//! 产生相同的事件流。
//!
//! ## Modules / 模块
//!
//! - `core` - Test model, message bus, engines and the front controller
//! - `infra` - Assembly loading, manifests, source information, logging
//! - `reporting` - Console and JSON event output
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 测试模型、消息总线、引擎和前端控制器
//! - `infra` - 程序集加载、清单、源码信息、日志
//! - `reporting` - 控制台与 JSON 事件输出
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::models;
pub use core::{
    ExecutableCase, FrontController, MessageBus, MessageBusEvent, OrchestrationError, RunSummary,
    TestCaseIdentity, TestEngine,
};

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    // Detect system locale and set it for i18n.
    // Fallback to "en" if detection fails.
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    // Try to match the full locale first (e.g., "zh-CN")
    // Then try to match the language part only (e.g., "en" from "en-US")
    // Finally, fall back to "en"
    let lang = if available_locales.contains(&locale.as_str()) {
        &locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

//! # Reporting Module / 报告模块
//!
//! This module handles the display of discovery and execution events.
//! It provides colorful, localized console output and a JSON event stream.
//!
//! 此模块处理发现和执行事件的显示。
//! 它提供彩色的本地化控制台输出以及 JSON 事件流。

pub mod console;

// Re-export common reporting functions
pub use console::{ConsoleReporter, OutputFormat, print_summary, report_until};

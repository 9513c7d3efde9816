//! # Core Module / 核心模块
//!
//! This module contains the orchestration core of Front Runner: case
//! identities, the message bus, theory expansion, the culture and timeout
//! wrappers, explicit filtering, the two engine generations and the front
//! controller composing them.
//!
//! 此模块包含 Front Runner 的编排核心：用例标识、消息总线、理论展开、
//! 区域设置与超时包装器、explicit 过滤、两代引擎以及组合它们的前端控制器。

pub mod assembly;
pub mod bus;
pub mod config;
pub mod controller;
pub mod culture;
pub mod engine;
pub mod error;
pub mod execution;
pub mod legacy;
pub mod models;
pub mod native;
pub mod planner;
pub mod theory;
pub mod timeout;

// Re-exports
pub use bus::{MessageBus, MessageBusEvent, RunSummary};
pub use controller::FrontController;
pub use engine::{ExecutableCase, TestEngine};
pub use error::OrchestrationError;
pub use models::TestCaseIdentity;

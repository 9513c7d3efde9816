//! # Culture Scope Module / 区域设置作用域模块
//!
//! Overrides the ambient culture for the duration of one case. The culture
//! lives in a task-local slot, so concurrently running cases never see each
//! other's culture, and the previous value comes back when the scoped future
//! completes, fails, panics or is dropped.
//!
//! 在单个用例执行期间覆盖环境区域设置。区域设置存放在任务本地槽中，
//! 因此并发运行的用例互不可见；当作用域内的 future 完成、失败、panic 或被丢弃时，
//! 之前的值会被恢复。

use std::future::Future;

use crate::core::error::CultureError;
use crate::core::models::CaseBuilder;

tokio::task_local! {
    static CURRENT_CULTURE: String;
}

/// Name of the trait added to culture-qualified cases.
pub const CULTURE_TRAIT: &str = "Culture";

/// The culture seen by code running on this task: the scoped culture if one
/// is active, otherwise the process-wide locale.
///
/// 当前任务上运行的代码所见的区域设置：如果存在活动的作用域则为作用域内的区域设置，
/// 否则为进程级区域设置。
pub fn current_culture() -> String {
    CURRENT_CULTURE
        .try_with(Clone::clone)
        .unwrap_or_else(|_| default_culture())
}

/// The process-wide culture, taken from the active i18n locale.
pub fn default_culture() -> String {
    rust_i18n::locale().to_string()
}

/// `true` while a culture scope is active on the current task.
pub fn is_scoped() -> bool {
    CURRENT_CULTURE.try_with(|_| ()).is_ok()
}

/// Runs `body` with `culture` as the ambient culture.
///
/// Nested scopes are rejected rather than composed.
///
/// 以 `culture` 作为环境区域设置运行 `body`。
/// 嵌套作用域会被直接拒绝，而不会进行组合。
pub async fn run_with_culture<F>(culture: &str, body: F) -> Result<F::Output, CultureError>
where
    F: Future,
{
    validate(culture)?;
    if let Ok(active) = CURRENT_CULTURE.try_with(Clone::clone) {
        return Err(CultureError::Nested {
            active,
            requested: culture.to_string(),
        });
    }
    Ok(CURRENT_CULTURE.scope(culture.to_string(), body).await)
}

/// Accepts BCP 47 style identifiers such as `en`, `en-US` or `zh-Hans-CN`.
pub fn validate(culture: &str) -> Result<(), CultureError> {
    let valid = !culture.is_empty()
        && culture.split('-').all(|part| {
            !part.is_empty() && part.len() <= 8 && part.chars().all(|c| c.is_ascii_alphanumeric())
        });
    if valid {
        Ok(())
    } else {
        Err(CultureError::Invalid(culture.to_string()))
    }
}

/// The `[culture]` suffix appended to display names and unique ids.
pub fn culture_suffix(culture: &str) -> String {
    format!("[{culture}]")
}

/// Decorates a case under construction as running in `culture`.
/// 将构造中的用例标记为在 `culture` 中运行。
pub fn qualify(builder: CaseBuilder, culture: &str) -> CaseBuilder {
    builder
        .append_suffix(&culture_suffix(culture))
        .add_trait(CULTURE_TRAIT, culture)
}

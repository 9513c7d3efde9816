//! # I18n Unit Tests / I18n 单元测试
//!
//! Checks that localized failure messages follow the active locale. The
//! locale is process-wide, so every check lives in one sequential test.
//!
//! 检查本地化的失败消息是否跟随当前区域设置。区域设置是进程级的，
//! 因此所有检查都放在同一个顺序执行的测试中。

use std::time::Duration;

use front_runner::core::engine::no_data_failure;
use front_runner::core::execution::timeout_failure;
use front_runner::core::models::FailureReason;

#[cfg(test)]
mod i18n_message_tests {
    use super::*;

    #[test]
    fn test_messages_follow_the_active_locale() {
        rust_i18n::set_locale("en");
        let failure = timeout_failure(Duration::from_millis(250), None);
        assert_eq!(failure.reason, FailureReason::Timeout);
        assert_eq!(failure.message(), "Test execution timed out after 250ms");
        assert_eq!(no_data_failure("A.B.C").message(), "No data found for A.B.C");

        // A case culture wins over the process locale.
        assert_eq!(
            timeout_failure(Duration::from_millis(250), Some("zh-CN")).message(),
            "测试执行在 250ms 后超时"
        );

        rust_i18n::set_locale("zh-CN");
        assert_eq!(
            timeout_failure(Duration::from_millis(250), None).message(),
            "测试执行在 250ms 后超时"
        );
        assert_eq!(
            timeout_failure(Duration::from_millis(250), Some("en")).message(),
            "Test execution timed out after 250ms"
        );
        assert_eq!(no_data_failure("A.B.C").message(), "未找到 A.B.C 的数据");

        // Unknown locales fall back to English.
        rust_i18n::set_locale("xx-YY");
        assert_eq!(no_data_failure("A.B.C").message(), "No data found for A.B.C");

        front_runner::init();
        assert!(!rust_i18n::locale().is_empty());
        rust_i18n::set_locale("en");
    }
}

//! # Models Module Unit Tests / Models 模块单元测试
//!
//! This module contains unit tests for the data models: argument rendering,
//! trait merging, stable ids and the case builder.
//!
//! 此模块包含数据模型的单元测试：参数渲染、特征合并、稳定 ID 以及用例构建器。

use front_runner::core::models::{
    ArgValue, CaseBuilder, DataRow, FailureReason, TestFailure, Traits, stable_id,
};

#[cfg(test)]
mod arg_value_tests {
    use super::*;

    #[test]
    fn test_render_scalars() {
        assert_eq!(ArgValue::Null.render(), "null");
        assert_eq!(ArgValue::from(true).render(), "True");
        assert_eq!(ArgValue::from(false).render(), "False");
        assert_eq!(ArgValue::from(-3).render(), "-3");
        assert_eq!(ArgValue::from(1.5).render(), "1.5");
        assert_eq!(ArgValue::from('x').render(), "'x'");
        assert_eq!(ArgValue::Missing.render(), "???");
    }

    #[test]
    fn test_render_escapes_and_truncates_strings() {
        assert_eq!(ArgValue::from("a\"b\n").render(), r#""a\"b\n""#);
        let long = "x".repeat(60);
        let rendered = ArgValue::from(long).render();
        assert_eq!(rendered, format!("\"{}\"...", "x".repeat(50)));
    }

    #[test]
    fn test_fingerprint_distinguishes_types() {
        assert_ne!(ArgValue::from(1).fingerprint(), ArgValue::from("1").fingerprint());
        assert_ne!(ArgValue::from(true).fingerprint(), ArgValue::from("true").fingerprint());
        assert_ne!(
            DataRow::new(["a,b"]).fingerprint(),
            DataRow::new(["a", "b"]).fingerprint()
        );
    }
}

#[cfg(test)]
mod traits_tests {
    use super::*;

    #[test]
    fn test_add_merges_values_under_one_name() {
        let mut traits = Traits::new();
        traits.add("Category", "Fast");
        traits.add("Category", "Unit");
        traits.add("Category", "Fast");
        traits.add("Owner", "core");

        assert_eq!(traits.len(), 2);
        assert_eq!(traits.get("Category").unwrap(), ["Fast", "Unit"]);
        assert!(traits.contains("Owner", "core"));
        assert!(!traits.contains("Owner", "ui"));
        assert_eq!(traits.keys().collect::<Vec<_>>(), vec!["Category", "Owner"]);
    }

    #[test]
    fn test_merge_and_collect() {
        let mut left: Traits = [("A", "1")].into_iter().collect();
        let right: Traits = [("A", "2"), ("B", "3")].into_iter().collect();
        left.merge(&right);
        assert_eq!(left.get("A").unwrap(), ["1", "2"]);
        assert!(left.contains("B", "3"));
    }
}

#[cfg(test)]
mod identity_tests {
    use super::*;

    #[test]
    fn test_stable_id_is_deterministic_and_part_sensitive() {
        assert_eq!(stable_id(["a", "b"]), stable_id(["a", "b"]));
        assert_ne!(stable_id(["ab", "c"]), stable_id(["a", "bc"]));
        assert_eq!(stable_id(["x"]).len(), 64);
    }

    #[test]
    fn test_builder_sets_every_field() {
        let identity = CaseBuilder::new("id", "Name")
            .method(Some("Ns".to_string()), "Class", "Method")
            .append_suffix("[en-US]")
            .skip_reason(Some("later".to_string()))
            .add_trait("Culture", "en-US")
            .serialization("3:{}")
            .explicit(true)
            .build();

        assert_eq!(identity.unique_id(), "id[en-US]");
        assert_eq!(identity.display_name(), "Name[en-US]");
        assert_eq!(identity.skip_reason(), Some("later"));
        assert_eq!(identity.class_name(), "Class");
        assert_eq!(identity.class_name_with_namespace(), "Ns.Class");
        assert_eq!(identity.method_name(), "Method");
        assert_eq!(identity.serialization(), "3:{}");
        assert!(identity.is_explicit());
        assert!(identity.traits().contains("Culture", "en-US"));
    }

    #[test]
    fn test_identity_serializes_for_json_output() {
        let identity = CaseBuilder::new("id", "Name").serialization("3:{}").build();
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["unique_id"], "id");
        assert_eq!(json["serialization"], "3:{}");
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[test]
    fn test_failure_message_joins_lines() {
        let mut failure = TestFailure::new(FailureReason::Timeout, "first");
        failure.messages.push("second".to_string());
        assert_eq!(failure.message(), "first\nsecond");
        assert_eq!(TestFailure::from("oops").reason, FailureReason::Assertion);
    }
}

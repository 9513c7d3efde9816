//! # Planner Unit Tests / 执行计划单元测试
//!
//! The explicit-filter decision table and execution plan partitioning.
//!
//! explicit 过滤决策表以及执行计划划分。

use front_runner::core::models::{CaseBuilder, TestCaseIdentity};
use front_runner::core::planner::{
    CaseState, ExplicitOption, FilterDecision, decide, plan_execution,
};

fn case(id: &str, explicit: bool) -> TestCaseIdentity {
    CaseBuilder::new(id, id).explicit(explicit).build()
}

fn ids(cases: &[TestCaseIdentity]) -> Vec<&str> {
    cases.iter().map(TestCaseIdentity::unique_id).collect()
}

#[cfg(test)]
mod decision_tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        use CaseState::*;
        use ExplicitOption::*;
        use FilterDecision::*;

        let table = [
            (Normal, Off, Run),
            (Normal, On, Run),
            (Normal, Only, NotRun),
            (Explicit, Off, NotRun),
            (Explicit, On, Run),
            (Explicit, Only, Run),
        ];
        for (state, option, expected) in table {
            assert_eq!(decide(state, option), expected, "{state:?} with {option:?}");
        }
    }

    #[test]
    fn test_case_state_from_identity() {
        assert_eq!(CaseState::of(&case("a", false)), CaseState::Normal);
        assert_eq!(CaseState::of(&case("b", true)), CaseState::Explicit);
    }
}

#[cfg(test)]
mod plan_tests {
    use super::*;

    fn mixed() -> Vec<TestCaseIdentity> {
        vec![
            case("n1", false),
            case("e1", true),
            case("n2", false),
            case("e2", true),
        ]
    }

    #[test]
    fn test_plan_keeps_original_order_on_both_sides() {
        let plan = plan_execution(mixed(), ExplicitOption::Off);
        assert_eq!(ids(&plan.cases_to_run), vec!["n1", "n2"]);
        assert_eq!(ids(&plan.not_run), vec!["e1", "e2"]);

        let plan = plan_execution(mixed(), ExplicitOption::Only);
        assert_eq!(ids(&plan.cases_to_run), vec!["e1", "e2"]);
        assert_eq!(ids(&plan.not_run), vec!["n1", "n2"]);
    }

    #[test]
    fn test_plan_with_on_runs_everything() {
        let plan = plan_execution(mixed(), ExplicitOption::On);
        assert_eq!(plan.cases_to_run.len(), 4);
        assert!(plan.not_run.is_empty());
    }

    #[test]
    fn test_plan_of_empty_input() {
        let plan = plan_execution(Vec::<TestCaseIdentity>::new(), ExplicitOption::Only);
        assert!(plan.cases_to_run.is_empty());
        assert!(plan.not_run.is_empty());
    }
}

#[cfg(test)]
mod option_parsing_tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("off".parse::<ExplicitOption>(), Ok(ExplicitOption::Off));
        assert_eq!("On".parse::<ExplicitOption>(), Ok(ExplicitOption::On));
        assert_eq!("ONLY".parse::<ExplicitOption>(), Ok(ExplicitOption::Only));
        assert!("sometimes".parse::<ExplicitOption>().is_err());

        for option in [ExplicitOption::Off, ExplicitOption::On, ExplicitOption::Only] {
            assert_eq!(option.to_string().parse::<ExplicitOption>(), Ok(option));
        }
        assert_eq!(ExplicitOption::default(), ExplicitOption::Off);
    }
}

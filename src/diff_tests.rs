#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use crate::diff::{diff, structurally_equal};
    use crate::flag::{FeatureFlag, Scope, Strategy, Value};

    fn strategy(name: &str, parameters: &[(&str, Value)], scopes: &[&str]) -> Strategy {
        Strategy {
            name: name.to_string(),
            parameters: parameters
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            scopes: scopes.iter().map(|env| Scope::new(*env)).collect(),
        }
    }

    fn rollout_flag() -> FeatureFlag {
        let mut nested = BTreeMap::new();
        nested.insert("region".to_string(), Value::from("eu"));
        nested.insert(
            "tiers".to_string(),
            Value::Sequence(vec![Value::from(1), Value::from("gold"), Value::Null]),
        );

        FeatureFlag {
            name: "rollout".to_string(),
            description: "Gradual rollout".to_string(),
            active: true,
            strategies: vec![
                strategy(
                    "gradualRolloutUserId",
                    &[
                        ("groupId", Value::from("default")),
                        ("percentage", Value::from(50)),
                        ("targeting", Value::Mapping(nested)),
                    ],
                    &["production", "staging"],
                ),
                strategy("default", &[], &["*"]),
            ],
        }
    }

    fn names(flags: &[FeatureFlag]) -> Vec<&str> {
        flags.iter().map(|flag| flag.name.as_str()).collect()
    }

    #[test]
    fn test_example_scenario() {
        let desired = vec![FeatureFlag::new("A", true), FeatureFlag::new("B", false)];
        let remote = vec![FeatureFlag::new("B", true), FeatureFlag::new("C", true)];

        let plan = diff(&desired, &remote);

        assert_eq!(names(&plan.to_add), vec!["A"]);
        assert_eq!(names(&plan.to_update), vec!["B"]);
        assert_eq!(plan.to_delete, vec!["C".to_string()]);
        assert!(plan.unchanged.is_empty());
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_update_carries_desired_version() {
        let desired = vec![FeatureFlag::new("B", false)];
        let remote = vec![FeatureFlag::new("B", true)];

        let plan = diff(&desired, &remote);
        assert_eq!(plan.to_update.len(), 1);
        assert!(!plan.to_update[0].active);
    }

    #[test]
    fn test_equal_flags_are_unchanged() {
        let desired = vec![rollout_flag(), FeatureFlag::new("plain", false)];
        let remote = vec![FeatureFlag::new("plain", false), rollout_flag()];

        let plan = diff(&desired, &remote);
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged.len(), 2);
    }

    #[test]
    fn test_plan_partitions_names() {
        let mut changed = rollout_flag();
        changed.description = "changed".to_string();

        let desired = vec![
            rollout_flag(),
            FeatureFlag::new("new-1", true),
            FeatureFlag::new("new-2", false),
            FeatureFlag {
                name: "edited".to_string(),
                ..changed
            },
        ];
        let remote = vec![
            rollout_flag(),
            FeatureFlag {
                name: "edited".to_string(),
                ..rollout_flag()
            },
            FeatureFlag::new("stale-1", true),
            FeatureFlag::new("stale-2", true),
        ];

        let plan = diff(&desired, &remote);

        let add: HashSet<&str> = plan.to_add.iter().map(|f| f.name.as_str()).collect();
        let update: HashSet<&str> = plan.to_update.iter().map(|f| f.name.as_str()).collect();
        let delete: HashSet<&str> = plan.to_delete.iter().map(String::as_str).collect();
        let unchanged: HashSet<&str> = plan.unchanged.iter().map(String::as_str).collect();

        assert!(add.is_disjoint(&update));
        assert!(add.is_disjoint(&delete));
        assert!(update.is_disjoint(&delete));

        let all: HashSet<&str> = desired
            .iter()
            .chain(&remote)
            .map(|f| f.name.as_str())
            .collect();
        let touched: HashSet<&str> = add.iter().chain(&update).chain(&delete).copied().collect();
        let expected: HashSet<&str> = all.difference(&unchanged).copied().collect();
        assert_eq!(touched, expected);

        assert_eq!(add, HashSet::from(["new-1", "new-2"]));
        assert_eq!(update, HashSet::from(["edited"]));
        assert_eq!(delete, HashSet::from(["stale-1", "stale-2"]));
        assert_eq!(unchanged, HashSet::from(["rollout"]));
    }

    #[test]
    fn test_empty_desired_deletes_everything() {
        let remote = vec![FeatureFlag::new("x", true), FeatureFlag::new("y", false)];
        let plan = diff(&[], &remote);
        assert!(plan.to_add.is_empty());
        assert!(plan.to_update.is_empty());
        assert_eq!(plan.to_delete, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_structural_equality_is_reflexive() {
        let flag = rollout_flag();
        assert!(structurally_equal(&flag, &flag));
        assert!(structurally_equal(&flag, &flag.clone()));
        let plain = FeatureFlag::new("plain", false);
        assert!(structurally_equal(&plain, &plain));
    }

    #[test]
    fn test_single_field_changes_break_equality() {
        let base = rollout_flag();

        let mut description = base.clone();
        description.description.push('!');
        assert!(!structurally_equal(&base, &description));

        let mut active = base.clone();
        active.active = false;
        assert!(!structurally_equal(&base, &active));

        let mut strategy_name = base.clone();
        strategy_name.strategies[1].name = "userWithId".to_string();
        assert!(!structurally_equal(&base, &strategy_name));

        let mut parameter = base.clone();
        parameter.strategies[0]
            .parameters
            .insert("percentage".to_string(), Value::from(51));
        assert!(!structurally_equal(&base, &parameter));

        let mut nested = base.clone();
        if let Some(Value::Mapping(map)) = nested.strategies[0].parameters.get_mut("targeting") {
            map.insert("region".to_string(), Value::from("us"));
        }
        assert!(!structurally_equal(&base, &nested));

        let mut scope = base.clone();
        scope.strategies[0].scopes[1].environment = "review/*".to_string();
        assert!(!structurally_equal(&base, &scope));

        let mut extra_strategy = base.clone();
        extra_strategy.strategies.push(strategy("default", &[], &[]));
        assert!(!structurally_equal(&base, &extra_strategy));
    }

    #[test]
    fn test_scope_order_is_ignored() {
        let a = FeatureFlag {
            strategies: vec![strategy("default", &[], &["production", "staging"])],
            ..FeatureFlag::new("f", true)
        };
        let b = FeatureFlag {
            strategies: vec![strategy("default", &[], &["staging", "production"])],
            ..FeatureFlag::new("f", true)
        };
        assert!(structurally_equal(&a, &b));
    }

    #[test]
    fn test_duplicate_scopes_do_not_mask_missing_environment() {
        let a = FeatureFlag {
            strategies: vec![strategy("default", &[], &["production", "production"])],
            ..FeatureFlag::new("f", true)
        };
        let b = FeatureFlag {
            strategies: vec![strategy("default", &[], &["production", "staging"])],
            ..FeatureFlag::new("f", true)
        };
        assert!(!structurally_equal(&a, &b));
        assert!(!structurally_equal(&b, &a));
    }

    #[test]
    fn test_strategy_order_is_significant() {
        let a = rollout_flag();
        let mut b = rollout_flag();
        b.strategies.reverse();
        assert!(!structurally_equal(&a, &b));
    }

    #[test]
    fn test_parameter_key_sets_must_match() {
        let a = FeatureFlag {
            strategies: vec![strategy("default", &[("x", Value::Null)], &[])],
            ..FeatureFlag::new("f", true)
        };
        let b = FeatureFlag {
            strategies: vec![strategy("default", &[("y", Value::Null)], &[])],
            ..FeatureFlag::new("f", true)
        };
        assert!(!structurally_equal(&a, &b));
    }

    #[test]
    fn test_value_deep_equality() {
        let yaml: Value = serde_yaml::from_str("{ rollout: 50, tags: [a, b], on: true }").unwrap();
        let json: Value =
            serde_json::from_str(r#"{"tags": ["a", "b"], "on": true, "rollout": 50.0}"#).unwrap();
        assert_eq!(yaml, json);

        assert_ne!(Value::from("50"), Value::from(50));
        assert_ne!(
            Value::Sequence(vec![Value::from(1), Value::from(2)]),
            Value::Sequence(vec![Value::from(2), Value::from(1)])
        );
        assert_ne!(Value::Null, Value::Bool(false));
    }
}

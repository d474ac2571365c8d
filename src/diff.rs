//! Classification of desired flags against the remote flag set.

use std::collections::{HashMap, HashSet};

use crate::flag::{FeatureFlag, Scope, Strategy};

/// The operations needed to converge the remote flag set onto the desired one.
///
/// The lists are disjoint by flag name. Every desired flag lands in exactly
/// one of `to_add`, `to_update` or `unchanged`; every remote-only flag is
/// named in `to_delete`.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub to_add: Vec<FeatureFlag>,
    /// Desired versions of flags whose remote definition differs.
    pub to_update: Vec<FeatureFlag>,
    pub to_delete: Vec<String>,
    pub unchanged: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Number of remote operations the plan will apply.
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.to_delete.len()
    }
}

pub fn diff(desired: &[FeatureFlag], remote: &[FeatureFlag]) -> Plan {
    let remote_by_name: HashMap<&str, &FeatureFlag> =
        remote.iter().map(|flag| (flag.name.as_str(), flag)).collect();
    let desired_names: HashSet<&str> = desired.iter().map(|flag| flag.name.as_str()).collect();

    let mut plan = Plan::default();

    for flag in desired {
        match remote_by_name.get(flag.name.as_str()) {
            None => plan.to_add.push(flag.clone()),
            Some(existing) if structurally_equal(flag, existing) => {
                plan.unchanged.push(flag.name.clone())
            }
            Some(_) => plan.to_update.push(flag.clone()),
        }
    }

    for flag in remote {
        if !desired_names.contains(flag.name.as_str()) {
            plan.to_delete.push(flag.name.clone());
        }
    }

    plan
}

/// Field-by-field comparison of two flag definitions.
///
/// Strategy order is significant. Parameters compare by deep value
/// equality. Scopes compare as sets of environments of equal length.
pub fn structurally_equal(a: &FeatureFlag, b: &FeatureFlag) -> bool {
    if a.name != b.name || a.description != b.description || a.active != b.active {
        return false;
    }

    a.strategies.len() == b.strategies.len()
        && a.strategies
            .iter()
            .zip(&b.strategies)
            .all(|(x, y)| strategies_equal(x, y))
}

fn strategies_equal(a: &Strategy, b: &Strategy) -> bool {
    a.name == b.name && a.parameters == b.parameters && scopes_equal(&a.scopes, &b.scopes)
}

// Lengths must match and both sides must cover the same environments, so
// `[a, a]` and `[a, b]` are not equal even though every entry of the first
// appears in the second.
fn scopes_equal(a: &[Scope], b: &[Scope]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    environments(a) == environments(b)
}

fn environments(scopes: &[Scope]) -> HashSet<&str> {
    scopes.iter().map(|scope| scope.environment.as_str()).collect()
}

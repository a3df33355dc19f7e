//! Built-in plan modifiers
//!
//! Plan modifiers run after the framework has produced the proposed plan and can:
//! - Modify the planned value
//! - Mark an attribute as requiring replacement
//! - Add warnings or errors to the plan

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplaceIfChanged;

impl RequiresReplaceIfChanged {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplaceIfChanged {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = !matches!(
            (&request.state_value.value, &request.plan_value.value),
            (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state_value.value, &request.plan_value.value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// A plan modifier that uses the current state value when the planned value is unknown
///
/// Keeps computed identifiers such as ARNs stable across in-place updates.
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value does not change across updates".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = if request.plan_value.is_unknown() && !request.state_value.is_null() {
            request.state_value
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Structural equality where null and an empty collection compare equal
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Null, other) | (other, Dynamic::Null) => {
            matches!(other, Dynamic::List(_) | Dynamic::Map(_)) && other.is_empty_collection()
        }
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.iter()
                .all(|(k, v)| values_equal(v, b.get(k).unwrap_or(&Dynamic::Null)))
                && b.iter()
                    .all(|(k, v)| values_equal(v, a.get(k).unwrap_or(&Dynamic::Null)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(plan.clone()),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("name"),
        }
    }

    #[test]
    fn requires_replace_if_changed_does_not_trigger_on_same_value() {
        let response = RequiresReplaceIfChanged.modify(request(
            Dynamic::String("hello".to_string()),
            Dynamic::String("hello".to_string()),
        ));

        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_if_changed_triggers_on_different_value() {
        let response = RequiresReplaceIfChanged.modify(request(
            Dynamic::String("hello".to_string()),
            Dynamic::String("world".to_string()),
        ));

        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_if_changed_ignores_unknown_values() {
        let response = RequiresReplaceIfChanged
            .modify(request(Dynamic::String("value".to_string()), Dynamic::Unknown));
        assert!(!response.requires_replace);

        let response = RequiresReplaceIfChanged
            .modify(request(Dynamic::Unknown, Dynamic::String("value".to_string())));
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_keeps_prior_value() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("arn:aws:bedrock-agentcore:us-east-1:1:gateway/gw".to_string()),
            Dynamic::Unknown,
        ));

        assert_eq!(
            response.plan_value.value,
            Dynamic::String("arn:aws:bedrock-agentcore:us-east-1:1:gateway/gw".to_string())
        );
    }

    #[test]
    fn use_state_for_unknown_stays_unknown_without_state() {
        let response = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown));
        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn null_equals_empty_collections() {
        assert!(values_equal(&Dynamic::Null, &Dynamic::List(vec![])));
        assert!(values_equal(&Dynamic::Map(HashMap::new()), &Dynamic::Null));
        assert!(!values_equal(&Dynamic::Null, &Dynamic::String(String::new())));

        let a = Dynamic::Map(HashMap::from([("x".to_string(), Dynamic::Null)]));
        let b = Dynamic::Map(HashMap::new());
        assert!(values_equal(&a, &b));
    }
}

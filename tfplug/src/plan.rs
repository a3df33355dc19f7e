//! Framework-side planning
//!
//! Turns (prior state, configuration) into a planned state and an action the
//! same way terraform-plugin-framework does before handing control to the
//! resource:
//! 1. proposed state = configuration, computed attributes keep prior values
//! 2. computed attributes become unknown when anything configurable changed
//! 3. defaults and attribute plan modifiers
//! 4. the resource's own ModifyPlan, if any

use crate::context::Context;
use crate::plan_modifier::values_equal;
use crate::resource::{ModifyPlanRequest, Resource, ResourceSchemaRequest};
use crate::schema::{AttributeType, Block, DefaultRequest, NestedBlock, NestingMode, PlanModifierRequest};
use crate::types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    NoOp,
    Create,
    Update,
    Replace,
    Delete,
}

#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub action: PlanAction,
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub async fn plan_resource_change(
    ctx: &Context,
    resource: &dyn Resource,
    prior_state: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    if config.is_null() {
        return PlannedChange {
            action: if prior_state.is_null() {
                PlanAction::NoOp
            } else {
                PlanAction::Delete
            },
            planned_state: DynamicValue::null(),
            requires_replace: vec![],
            diagnostics: vec![],
        };
    }

    let schema_response = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
    let mut diagnostics = schema_response.diagnostics;
    let block = &schema_response.schema.block;
    let creating = prior_state.is_null();

    let mut planned = propose_block(block, &config.value, &prior_state.value);
    if creating || !block_equal(block, &planned, &prior_state.value) {
        mark_unknown(block, &config.value, &mut planned);
    }

    let mut requires_replace = vec![];
    if !creating {
        run_plan_modifiers(
            block,
            &config.value,
            &prior_state.value,
            &mut planned,
            &AttributePath::root(),
            &mut requires_replace,
            &mut diagnostics,
        );
    }

    if let Some(modifier) = resource.as_modify_plan() {
        let response = modifier
            .modify_plan(
                ctx.clone(),
                ModifyPlanRequest {
                    type_name: resource.type_name().to_string(),
                    config: config.clone(),
                    prior_state: prior_state.clone(),
                    proposed_new_state: DynamicValue::new(planned),
                },
            )
            .await;
        planned = response.planned_state.value;
        requires_replace.extend(response.requires_replace);
        diagnostics.extend(response.diagnostics);
    }

    let action = if creating {
        PlanAction::Create
    } else if !requires_replace.is_empty() {
        planned = propose_block(block, &config.value, &Dynamic::Null);
        mark_unknown(block, &config.value, &mut planned);
        PlanAction::Replace
    } else if block_equal(block, &planned, &prior_state.value) {
        PlanAction::NoOp
    } else {
        PlanAction::Update
    };

    if has_errors(&diagnostics) {
        tracing::debug!(
            "planning {} produced errors: {:?}",
            resource.type_name(),
            diagnostics
        );
    }

    PlannedChange {
        action,
        planned_state: DynamicValue::new(planned),
        requires_replace,
        diagnostics,
    }
}

fn propose_block(block: &Block, config: &Dynamic, prior: &Dynamic) -> Dynamic {
    match config {
        Dynamic::Null => return Dynamic::Null,
        Dynamic::Unknown => return Dynamic::Unknown,
        _ => {}
    }

    let mut values = HashMap::new();
    for attr in &block.attributes {
        let cfg = config.get(&attr.name);
        let value = if attr.write_only {
            Dynamic::Null
        } else if !cfg.is_null() {
            cfg.clone()
        } else if let Some(default) = &attr.default {
            default
                .default_value(DefaultRequest {
                    path: AttributePath::new(&attr.name),
                })
                .value
                .value
        } else if attr.computed {
            prior.get(&attr.name).clone()
        } else {
            Dynamic::Null
        };
        values.insert(attr.name.clone(), value);
    }

    for nested in &block.block_types {
        let cfg = config.get(&nested.type_name);
        let pri = prior.get(&nested.type_name);
        let value = match (nested.nesting, cfg) {
            (NestingMode::Single, _) => propose_block(&nested.block, cfg, pri),
            (_, Dynamic::List(items)) => {
                let prior_items = pri.as_list().unwrap_or(&[]);
                Dynamic::List(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let prior_item = prior_items.get(i).unwrap_or(&Dynamic::Null);
                            propose_block(&nested.block, item, prior_item)
                        })
                        .collect(),
                )
            }
            (_, other) => other.clone(),
        };
        values.insert(nested.type_name.clone(), value);
    }

    Dynamic::Map(values)
}

fn mark_unknown(block: &Block, config: &Dynamic, planned: &mut Dynamic) {
    let Dynamic::Map(values) = planned else {
        return;
    };

    for attr in &block.attributes {
        if attr.computed
            && !attr.write_only
            && attr.default.is_none()
            && config.get(&attr.name).is_null()
        {
            values.insert(attr.name.clone(), Dynamic::Unknown);
        }
    }

    for nested in &block.block_types {
        let cfg = config.get(&nested.type_name);
        match values.get_mut(&nested.type_name) {
            Some(Dynamic::List(items)) => {
                let cfg_items = cfg.as_list().unwrap_or(&[]);
                for (i, item) in items.iter_mut().enumerate() {
                    mark_unknown(
                        &nested.block,
                        cfg_items.get(i).unwrap_or(&Dynamic::Null),
                        item,
                    );
                }
            }
            Some(item @ Dynamic::Map(_)) => mark_unknown(&nested.block, cfg, item),
            _ => {}
        }
    }
}

fn run_plan_modifiers(
    block: &Block,
    config: &Dynamic,
    prior: &Dynamic,
    planned: &mut Dynamic,
    path: &AttributePath,
    requires_replace: &mut Vec<AttributePath>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Dynamic::Map(values) = planned else {
        return;
    };

    for attr in &block.attributes {
        if attr.plan_modifiers.is_empty() {
            continue;
        }
        let attr_path = path.clone().attribute(&attr.name);
        let mut current = values.get(&attr.name).cloned().unwrap_or(Dynamic::Null);

        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: DynamicValue::new(config.get(&attr.name).clone()),
                state_value: DynamicValue::new(prior.get(&attr.name).clone()),
                plan_value: DynamicValue::new(current),
                path: attr_path.clone(),
            });
            current = response.plan_value.value;
            if response.requires_replace {
                requires_replace.push(attr_path.clone());
            }
            diagnostics.extend(response.diagnostics);
        }

        values.insert(attr.name.clone(), current);
    }

    for nested in &block.block_types {
        let block_path = path.clone().attribute(&nested.type_name);
        let cfg = config.get(&nested.type_name);
        let pri = prior.get(&nested.type_name);

        for modifier in &nested.plan_modifiers {
            let current = values
                .get(&nested.type_name)
                .cloned()
                .unwrap_or(Dynamic::Null);
            let response = modifier.modify(PlanModifierRequest {
                config_value: DynamicValue::new(cfg.clone()),
                state_value: DynamicValue::new(pri.clone()),
                plan_value: DynamicValue::new(current),
                path: block_path.clone(),
            });
            if response.requires_replace {
                requires_replace.push(block_path.clone());
            }
            diagnostics.extend(response.diagnostics);
            values.insert(nested.type_name.clone(), response.plan_value.value);
        }

        match values.get_mut(&nested.type_name) {
            Some(Dynamic::List(items)) if nested.nesting == NestingMode::List => {
                let cfg_items = cfg.as_list().unwrap_or(&[]);
                let prior_items = pri.as_list().unwrap_or(&[]);
                for (i, item) in items.iter_mut().enumerate() {
                    let Some(prior_item) = prior_items.get(i) else {
                        continue;
                    };
                    run_plan_modifiers(
                        &nested.block,
                        cfg_items.get(i).unwrap_or(&Dynamic::Null),
                        prior_item,
                        item,
                        &block_path.clone().index(i as i64),
                        requires_replace,
                        diagnostics,
                    );
                }
            }
            Some(item @ Dynamic::Map(_)) if !pri.is_null() => run_plan_modifiers(
                &nested.block,
                cfg,
                pri,
                item,
                &block_path,
                requires_replace,
                diagnostics,
            ),
            _ => {}
        }
    }
}

/// Schema-aware equality: sets compare without order, absent blocks equal empty ones
pub fn block_equal(block: &Block, a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Map(_), Dynamic::Map(_)) => {
            block
                .attributes
                .iter()
                .all(|attr| type_equal(&attr.r#type, a.get(&attr.name), b.get(&attr.name)))
                && block.block_types.iter().all(|nested| {
                    nested_equal(nested, a.get(&nested.type_name), b.get(&nested.type_name))
                })
        }
        _ => values_equal(a, b),
    }
}

/// Names of the top-level attributes and blocks that differ between two objects
pub fn changed_attributes(block: &Block, prior: &Dynamic, planned: &Dynamic) -> Vec<String> {
    let mut changed: Vec<String> = block
        .attributes
        .iter()
        .filter(|attr| !type_equal(&attr.r#type, prior.get(&attr.name), planned.get(&attr.name)))
        .map(|attr| attr.name.clone())
        .collect();
    changed.extend(
        block
            .block_types
            .iter()
            .filter(|nested| {
                !nested_equal(
                    nested,
                    prior.get(&nested.type_name),
                    planned.get(&nested.type_name),
                )
            })
            .map(|nested| nested.type_name.clone()),
    );
    changed
}

fn type_equal(attr_type: &AttributeType, a: &Dynamic, b: &Dynamic) -> bool {
    match (attr_type, a.as_list(), b.as_list()) {
        (AttributeType::Set(inner), Some(x), Some(y)) => {
            unordered_equal(x, y, |p, q| type_equal(inner, p, q))
        }
        (AttributeType::List(inner), Some(x), Some(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| type_equal(inner, p, q))
        }
        _ => values_equal(a, b),
    }
}

fn nested_equal(nested: &NestedBlock, a: &Dynamic, b: &Dynamic) -> bool {
    if a.is_empty_collection() && b.is_empty_collection() {
        return true;
    }
    match (nested.nesting, a.as_list(), b.as_list()) {
        (NestingMode::Single, _, _) => block_equal(&nested.block, a, b),
        (NestingMode::List, Some(x), Some(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .zip(y)
                    .all(|(p, q)| block_equal(&nested.block, p, q))
        }
        (NestingMode::Set, Some(x), Some(y)) => {
            unordered_equal(x, y, |p, q| block_equal(&nested.block, p, q))
        }
        _ => values_equal(a, b),
    }
}

fn unordered_equal(x: &[Dynamic], y: &[Dynamic], eq: impl Fn(&Dynamic, &Dynamic) -> bool) -> bool {
    if x.len() != y.len() {
        return false;
    }
    let mut used = vec![false; y.len()];
    x.iter().all(|item| {
        match (0..y.len()).find(|&j| !used[j] && eq(item, &y[j])) {
            Some(j) => {
                used[j] = true;
                true
            }
            None => false,
        }
    })
}

#[cfg(test)]
#[path = "./plan_test.rs"]
mod plan_test;

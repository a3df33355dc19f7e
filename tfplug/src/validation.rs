//! Schema-driven configuration checks run before a resource's own validate

use crate::schema::{Block, NestingMode, ValidatorRequest};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Required attributes, unconfigurable computed attributes, block counts and
/// attribute validators
pub fn validate_block(block: &Block, config: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let value = config.get(&attr.name);

        if attr.required && value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("The argument \"{}\" is required, but no definition was found.", attr_path),
                )
                .with_attribute(attr_path.clone()),
            );
            continue;
        }

        if attr.computed && !attr.optional && !attr.required && !value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid Configuration for Read-Only Attribute",
                    format!("Cannot set value for this attribute as the provider has marked it as read-only: {}", attr_path),
                )
                .with_attribute(attr_path.clone()),
            );
            continue;
        }

        if value.is_known() {
            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: DynamicValue::new(value.clone()),
                    path: attr_path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }
    }

    for nested in &block.block_types {
        let block_path = path.clone().attribute(&nested.type_name);
        let value = config.get(&nested.type_name);
        if value.is_unknown() {
            continue;
        }

        let items: Vec<&Dynamic> = match (nested.nesting, value) {
            (NestingMode::Single, Dynamic::Null) => vec![],
            (NestingMode::Single, item) => vec![item],
            (_, Dynamic::List(items)) => items.iter().collect(),
            _ => vec![],
        };

        if (items.len() as i64) < nested.min_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Insufficient {} blocks", nested.type_name),
                    format!(
                        "At least {} \"{}\" blocks are required.",
                        nested.min_items, nested.type_name
                    ),
                )
                .with_attribute(block_path.clone()),
            );
        }
        if nested.max_items > 0 && (items.len() as i64) > nested.max_items {
            diagnostics.push(
                Diagnostic::error(
                    format!("Too many {} blocks", nested.type_name),
                    format!(
                        "No more than {} \"{}\" blocks are allowed.",
                        nested.max_items, nested.type_name
                    ),
                )
                .with_attribute(block_path.clone()),
            );
        }

        for (i, item) in items.into_iter().enumerate() {
            let item_path = match nested.nesting {
                NestingMode::Single => block_path.clone(),
                _ => block_path.clone().index(i as i64),
            };
            diagnostics.extend(validate_block(&nested.block, item, &item_path));
        }
    }

    diagnostics
}

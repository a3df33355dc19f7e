//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, AttributePathStep, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state.
///
/// Example: ID "gw-123" -> state.gateway_id = "gw-123"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let [AttributePathStep::AttributeName(name)] = attr_path.steps.as_slice() else {
        response.diagnostics.push(
            Diagnostic::error(
                "Failed to set import ID",
                format!(
                    "Could not set attribute '{}' to value '{}': only top-level attributes can hold an import ID",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    };

    let state = DynamicValue::object(HashMap::from([(
        name.clone(),
        Dynamic::String(request.id.clone()),
    )]));
    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

/// Splits a composite import ID into one state attribute per part
///
/// Example: ID "gw-1,tgt-2" with attributes ["gateway_identifier", "target_id"]
pub fn import_state_composite_id(
    _ctx: &Context,
    separator: char,
    attributes: &[&str],
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let parts: Vec<&str> = request.id.split(separator).collect();

    if parts.len() != attributes.len() || parts.iter().any(|p| p.is_empty()) {
        let expected = attributes.join(&separator.to_string());
        response.diagnostics.push(Diagnostic::error(
            "Invalid import ID",
            format!(
                "Unexpected format for import ID ({}), use: \"{}\"",
                request.id, expected
            ),
        ));
        return;
    }

    let values: HashMap<String, Dynamic> = attributes
        .iter()
        .zip(parts)
        .map(|(attr, part)| (attr.to_string(), Dynamic::String(part.to_string())))
        .collect();

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state: DynamicValue::object(values),
    });
}

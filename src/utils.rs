//! Utility functions for the cotton compiler

use regex::Regex;
use std::sync::OnceLock;

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("identifier pattern is valid")
    })
}

fn component_name_regex() -> &'static Regex {
    static COMPONENT_NAME: OnceLock<Regex> = OnceLock::new();
    COMPONENT_NAME.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_][a-zA-Z0-9_-]*(\.[a-zA-Z0-9_][a-zA-Z0-9_-]*)*$")
            .expect("component name pattern is valid")
    })
}

/// Check whether `name` can be used as a host-engine variable name
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// Check whether `name` is a well-formed component name (`card`, `forms.input-group`)
pub fn is_valid_component_name(name: &str) -> bool {
    component_name_regex().is_match(name)
}

/// Convert an attribute name into a host-engine identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, so `x-data` binds as
/// `x_data` and `@click.prevent` as `_click_prevent`. A leading digit gets a
/// `_` prefix.
pub fn normalize_identifier(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if result.is_empty() || result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// Map a component name onto its fragment template path.
///
/// `.` separates directories, hyphens are kept unless `snake_case` is set:
/// `forms.text-input` becomes `cotton/forms/text-input.html`.
pub fn fragment_path(name: &str, root: &str, extension: &str, snake_case: bool) -> String {
    let relative = name.replace('.', "/");
    let relative = if snake_case { relative.replace('-', "_") } else { relative };
    let root = root.trim_end_matches('/');
    let extension = extension.trim_start_matches('.');

    let mut path = String::new();
    if !root.is_empty() {
        path.push_str(root);
        path.push('/');
    }
    path.push_str(&relative);
    if !extension.is_empty() {
        path.push('.');
        path.push_str(extension);
    }
    path
}

/// True when a value cannot be placed inside a single-line host tag and has
/// to be emitted as a block instead
pub fn needs_block_form(value: &str) -> bool {
    value.contains('\n')
        || value.contains('\r')
        || value.contains("{{")
        || value.contains("{%")
        || value.contains("%}")
        || value.contains("{#")
        || value.contains("<c-")
}

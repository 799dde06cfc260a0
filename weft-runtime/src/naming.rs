//! Component name helpers: case conversion for registry lookups and display
//! names, and validation of names used to register components.

/// Tags that can never be used as component names.
const RESERVED_TAGS: &[&str] = &[
    "slot", "component", "html", "head", "body", "template", "div", "span", "p", "a", "img",
    "ul", "ol", "li", "table", "input", "button", "form", "select", "option", "textarea",
    "label", "script", "style", "svg",
];

/// `my-component` → `myComponent`.
#[must_use]
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Uppercases the first character.
#[must_use]
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `my-component` or `my_component` → `MyComponent`.
#[must_use]
pub fn classify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c == '-' || c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Checks that `name` can be used to register a component.
///
/// A valid name starts with an ASCII letter, continues with letters, digits,
/// `_` or `-`, and is not a built-in or reserved tag.
pub fn validate_component_name(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !starts_with_letter || !rest_ok {
        return Err(format!(
            "invalid component name \"{name}\": names must start with a letter and contain only letters, digits, '_' or '-'"
        ));
    }
    if RESERVED_TAGS.contains(&name.to_ascii_lowercase().as_str()) {
        return Err(format!(
            "do not use built-in or reserved tags as component names: \"{name}\""
        ));
    }
    Ok(())
}

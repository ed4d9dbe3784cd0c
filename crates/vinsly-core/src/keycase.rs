//! camelCase ↔ kebab-case mapping for frontmatter keys.
//!
//! The two directions are deliberately asymmetric. Serialization only rewrites
//! the keys in [`KEBAB_CASE_KEYS`]; deserialization normalizes every key that
//! contains a hyphen.

use serde_yaml::{Mapping, Value};

/// Frontmatter keys that are written to disk in kebab-case.
pub const KEBAB_CASE_KEYS: &[&str] = &[
    "disableModelInvocation",
    "argumentHint",
    "allowedTools",
    "permissionMode",
];

/// `argumentHint` → `argument-hint`
pub fn to_kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if prev_lower && c.is_uppercase() {
            out.push('-');
        }
        prev_lower = c.is_lowercase();
        out.extend(c.to_lowercase());
    }
    out
}

/// `argument-hint` → `argumentHint`
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
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

fn rename_keys(mapping: Mapping, rename: impl Fn(&str) -> Option<String>) -> Mapping {
    mapping
        .into_iter()
        .map(|(key, value)| {
            let renamed = key.as_str().and_then(|s| rename(s));
            (renamed.map(Value::String).unwrap_or(key), value)
        })
        .collect()
}

/// Rewrite allow-listed camelCase keys to kebab-case; everything else passes through.
pub fn serialize_keys(mapping: Mapping) -> Mapping {
    rename_keys(mapping, |key| {
        KEBAB_CASE_KEYS
            .contains(&key)
            .then(|| to_kebab_case(key))
    })
}

/// Rewrite every hyphenated key to camelCase.
pub fn deserialize_keys(mapping: Mapping) -> Mapping {
    rename_keys(mapping, |key| key.contains('-').then(|| to_camel_case(key)))
}

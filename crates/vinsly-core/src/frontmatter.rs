use crate::error::Result;
use crate::keycase;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Frontmatter keys in document order. Values are arbitrary YAML.
pub type Frontmatter = Mapping;

/// A markdown document split into its YAML frontmatter and body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub body: String,
}

/// Diagnostic view of a document's frontmatter block.
///
/// [`parse`] collapses `Missing` and `Malformed` into `None`; this type keeps
/// them apart so callers can log why a file was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontmatterStatus {
    Missing,
    Malformed(String),
    Valid,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

static FRONTMATTER_RE: OnceLock<Regex> = OnceLock::new();

fn frontmatter_re() -> &'static Regex {
    FRONTMATTER_RE.get_or_init(|| {
        Regex::new(r"(?s)\A\s*---\r?\n(?:(.*?)\r?\n)?---(?:\r?\n|\z)(.*)\z").unwrap()
    })
}

/// Split `text` into the raw YAML block and the untrimmed remainder.
fn split(text: &str) -> Option<(&str, &str)> {
    let caps = frontmatter_re().captures(text)?;
    let block = caps.get(1).map_or("", |m| m.as_str());
    let rest = caps.get(2).map_or("", |m| m.as_str());
    Some((block, rest))
}

fn parse_block(block: &str) -> std::result::Result<Mapping, String> {
    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Mapping(m)) => Ok(m),
        Ok(_) => Err("frontmatter is not a mapping".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Parse a leading `---` delimited YAML block.
///
/// Returns `None` when the text has no frontmatter block, when the block is not
/// valid YAML, or when it is not a mapping. Hyphenated keys are normalized to
/// camelCase and the body is trimmed.
pub fn parse(text: &str) -> Option<Document> {
    let (block, rest) = split(text)?;
    let mapping = parse_block(block).ok()?;
    Some(Document {
        frontmatter: keycase::deserialize_keys(mapping),
        body: rest.trim().to_string(),
    })
}

pub fn inspect(text: &str) -> FrontmatterStatus {
    match split(text) {
        None => FrontmatterStatus::Missing,
        Some((block, _)) => match parse_block(block) {
            Ok(_) => FrontmatterStatus::Valid,
            Err(reason) => FrontmatterStatus::Malformed(reason),
        },
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize frontmatter to block-style YAML without the `---` fences.
///
/// Every key is written, nulls included; allow-listed keys are written in
/// kebab-case. Trailing whitespace is stripped.
pub fn serialize(frontmatter: &Frontmatter) -> Result<String> {
    let yaml = serde_yaml::to_string(&keycase::serialize_keys(frontmatter.clone()))?;
    Ok(yaml.trim_end().to_string())
}

/// Render a full document: `---\n<yaml>\n---\n\n<body>`.
pub fn render(frontmatter: &Frontmatter, body: &str) -> Result<String> {
    let yaml = serialize(frontmatter)?;
    Ok(format!("---\n{yaml}\n---\n\n{body}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(fm: &'a Frontmatter, key: &str) -> Option<&'a Value> {
        fm.get(key)
    }

    #[test]
    fn parse_basic_document() {
        let text = "---\nname: reviewer\ndescription: Reviews code\n---\n\n# Reviewer\n\nBe thorough.\n";
        let doc = parse(text).unwrap();
        assert_eq!(get(&doc.frontmatter, "name").unwrap().as_str(), Some("reviewer"));
        assert_eq!(doc.body, "# Reviewer\n\nBe thorough.");
    }

    #[test]
    fn parse_allows_leading_whitespace_and_crlf() {
        let text = "\n  ---\r\nname: x\r\n---\r\nbody";
        let doc = parse(text).unwrap();
        assert_eq!(get(&doc.frontmatter, "name").unwrap().as_str(), Some("x"));
        assert_eq!(doc.body, "body");
    }

    #[test]
    fn parse_without_body() {
        let doc = parse("---\nname: x\n---").unwrap();
        assert_eq!(doc.body, "");
    }

    #[test]
    fn parse_normalizes_hyphenated_keys() {
        let text = "---\nargument-hint: \"[path]\"\nallowed-tools:\n  - Read\n  - Grep\n---\nbody";
        let doc = parse(text).unwrap();
        assert!(get(&doc.frontmatter, "argumentHint").is_some());
        let tools = get(&doc.frontmatter, "allowedTools").unwrap();
        assert_eq!(tools.as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn no_frontmatter_is_none() {
        assert!(parse("# Just markdown\n\nNo frontmatter.").is_none());
        assert!(parse("---\nname: unterminated\n").is_none());
        assert!(parse("text\n---\nname: x\n---\n").is_none());
    }

    #[test]
    fn delimiter_must_be_exact() {
        assert!(parse("----\nname: x\n----\nbody").is_none());
    }

    #[test]
    fn malformed_yaml_is_none() {
        let text = "---\nname: [unclosed\n---\nbody";
        assert!(parse(text).is_none());
        assert!(matches!(inspect(text), FrontmatterStatus::Malformed(_)));
    }

    #[test]
    fn non_mapping_yaml_is_none() {
        assert!(parse("---\n- a\n- b\n---\nbody").is_none());
        assert!(parse("---\njust a string\n---\nbody").is_none());
        assert!(parse("---\n---\nbody").is_none());
    }

    #[test]
    fn inspect_distinguishes_states() {
        assert_eq!(inspect("plain"), FrontmatterStatus::Missing);
        assert_eq!(inspect("---\nname: x\n---\n"), FrontmatterStatus::Valid);
    }

    #[test]
    fn serialize_keeps_nulls_and_kebabs_allow_list() {
        let mut fm = Mapping::new();
        fm.insert("name".into(), "reviewer".into());
        fm.insert("model".into(), Value::Null);
        fm.insert("argumentHint".into(), "[file]".into());
        let yaml = serialize(&fm).unwrap();
        assert!(yaml.contains("name: reviewer"));
        assert!(yaml.contains("argument-hint:"));
        assert!(yaml.contains("model: null"));
        assert!(!yaml.ends_with('\n'));
    }

    #[test]
    fn null_values_survive_render_and_parse() {
        let text = "---\nname: reviewer\ntools:\nmodel: ~\n---\n\nBody";
        let doc = parse(text).unwrap();
        let back = parse(&render(&doc.frontmatter, &doc.body).unwrap()).unwrap();
        assert_eq!(back, doc);
        assert_eq!(get(&back.frontmatter, "tools"), Some(&Value::Null));
        assert_eq!(get(&back.frontmatter, "model"), Some(&Value::Null));
    }

    #[test]
    fn serialize_preserves_key_order() {
        let mut fm = Mapping::new();
        fm.insert("zeta".into(), "1".into());
        fm.insert("alpha".into(), "2".into());
        let yaml = serialize(&fm).unwrap();
        assert!(yaml.find("zeta").unwrap() < yaml.find("alpha").unwrap());
    }

    #[test]
    fn serialize_does_not_wrap_long_values() {
        let long = "word ".repeat(60).trim_end().to_string();
        let mut fm = Mapping::new();
        fm.insert("description".into(), long.clone().into());
        let yaml = serialize(&fm).unwrap();
        assert_eq!(yaml.lines().count(), 1);
        let doc = parse(&render(&fm, "").unwrap()).unwrap();
        assert_eq!(get(&doc.frontmatter, "description").unwrap().as_str(), Some(long.as_str()));
    }

    #[test]
    fn render_then_parse_preserves_nested_values() {
        let text = "---\nname: x\nhooks:\n  pre:\n    - lint\n    - test\n  enabled: true\n---\n\nBody text";
        let doc = parse(text).unwrap();
        let rendered = render(&doc.frontmatter, &doc.body).unwrap();
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.contains("\n---\n\nBody text"));
        assert_eq!(parse(&rendered).unwrap(), doc);
    }
}

//! Comment-tolerant settings document
//!
//! The document is parsed with comments and trailing commas blanked out
//! (replaced by spaces, so byte offsets are unchanged). Edits are spliced
//! into the original text, which keeps comments and every unrelated member
//! exactly as they were.

use envsync_api::RuleSet;
use serde_json::{json, Value};
use std::ops::Range;
use thiserror::Error;

/// Error type for settings document operations
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read settings document: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse settings document: {0}")]
    Parse(String),

    #[error("Unexpected settings layout: {0}")]
    Malformed(String),

    #[error("Failed to write settings document: {0}")]
    Write(#[source] std::io::Error),

    #[error("Settings store is read-only")]
    ReadOnly,
}

/// A settings document: original text plus its parsed value
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    text: String,
    value: Value,
}

impl ConfigDocument {
    /// Parse document text, tolerating `//` and `/* */` comments and trailing commas
    pub fn parse(text: impl Into<String>) -> Result<Self, DocumentError> {
        let text = text.into();
        let blanked = blank_comments(&text);
        let value: Value =
            serde_json::from_str(&blanked).map_err(|e| DocumentError::Parse(e.to_string()))?;

        if !value.is_object() {
            return Err(DocumentError::Malformed(
                "top level must be an object".to_string(),
            ));
        }

        Ok(Self { text, value })
    }

    /// Synthesize a fresh document holding exactly `rules` under `permissions.allow`
    pub fn with_rules(rules: &RuleSet) -> Self {
        let value = json!({ "permissions": { "allow": rules.as_slice() } });
        let text = format!("{}\n", pretty(&value));
        Self { text, value }
    }

    /// Document text as it would be written
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Current `permissions.allow` entries; non-string entries are ignored
    pub fn allow_list(&self) -> Result<RuleSet, DocumentError> {
        let permissions = match self.value.get("permissions") {
            None | Some(Value::Null) => return Ok(RuleSet::default()),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(DocumentError::Malformed(
                    "permissions must be an object".to_string(),
                ))
            }
        };

        match permissions.get("allow") {
            None | Some(Value::Null) => Ok(RuleSet::default()),
            Some(Value::Array(items)) => Ok(RuleSet::new(
                items.iter().filter_map(|v| v.as_str()).map(str::to_string),
            )),
            Some(_) => Err(DocumentError::Malformed(
                "permissions.allow must be an array".to_string(),
            )),
        }
    }

    /// Append rules to `permissions.allow`, creating the members when missing.
    ///
    /// Callers pass only rules that are not yet present; no membership check
    /// happens here.
    pub fn append_allow(&mut self, rules: &[String]) -> Result<(), DocumentError> {
        if rules.is_empty() {
            return Ok(());
        }

        let blanked = blank_comments(&self.text);
        let b = blanked.as_bytes();
        let root = skip_ws(b, 0);
        if b.get(root) != Some(&b'{') {
            return Err(DocumentError::Malformed(
                "top level must be an object".to_string(),
            ));
        }

        let edit = match find_member(b, root, "permissions") {
            Some(perms) => match b[perms.value.start] {
                b'{' => match find_member(b, perms.value.start, "allow") {
                    Some(allow) => match b[allow.value.start] {
                        b'[' => self.append_to_array(b, &allow, rules),
                        b'n' => self.replace_value(&allow, json!(rules)),
                        _ => {
                            return Err(DocumentError::Malformed(
                                "permissions.allow must be an array".to_string(),
                            ))
                        }
                    },
                    None => self.insert_member(b, perms.value.start, "allow", json!(rules)),
                },
                b'n' => self.replace_value(&perms, json!({ "allow": rules })),
                _ => {
                    return Err(DocumentError::Malformed(
                        "permissions must be an object".to_string(),
                    ))
                }
            },
            None => self.insert_member(b, root, "permissions", json!({ "allow": rules })),
        };

        let mut text = String::with_capacity(self.text.len() + edit.replacement.len());
        text.push_str(&self.text[..edit.range.start]);
        text.push_str(&edit.replacement);
        text.push_str(&self.text[edit.range.end..]);

        *self = Self::parse(text)?;
        Ok(())
    }

    fn append_to_array(&self, b: &[u8], allow: &Member, rules: &[String]) -> Edit {
        let open = allow.value.start;
        let close = allow.value.end - 1;
        let literals: Vec<String> = rules.iter().map(|r| literal(r)).collect();

        match elements(b, open).last() {
            Some(last) if b[open..last.end].contains(&b'\n') => {
                let indent = line_indent(&self.text, last.start);
                let replacement = literals
                    .iter()
                    .map(|lit| format!(",\n{}{}", indent, lit))
                    .collect();
                Edit::insert(last.end, replacement)
            }
            Some(last) => {
                let replacement = literals.iter().map(|lit| format!(", {}", lit)).collect();
                Edit::insert(last.end, replacement)
            }
            None => {
                let outer = line_indent(&self.text, allow.key_start);
                let inner = format!("{}  ", outer);
                let body = literals
                    .iter()
                    .map(|lit| format!("{}{}", inner, lit))
                    .collect::<Vec<_>>()
                    .join(",\n");
                let replacement = format!("\n{}\n{}", body, outer);
                self.fill_empty(b, open, close, replacement)
            }
        }
    }

    fn insert_member(&self, b: &[u8], open: usize, key: &str, value: Value) -> Edit {
        let members = members(b, open);

        match members.last() {
            Some(last) if b[open..last.key_start].contains(&b'\n') => {
                let indent = line_indent(&self.text, last.key_start);
                let rendered = reindent(&pretty(&value), &indent);
                Edit::insert(
                    last.value.end,
                    format!(",\n{}{}: {}", indent, literal(key), rendered),
                )
            }
            Some(last) => Edit::insert(
                last.value.end,
                format!(", {}: {}", literal(key), value),
            ),
            None => {
                let close = value_end(b, open) - 1;
                let outer = line_indent(&self.text, open);
                let inner = format!("{}  ", outer);
                let rendered = reindent(&pretty(&value), &inner);
                let replacement = format!("\n{}{}: {}\n{}", inner, literal(key), rendered, outer);
                self.fill_empty(b, open, close, replacement)
            }
        }
    }

    fn replace_value(&self, member: &Member, value: Value) -> Edit {
        let indent = line_indent(&self.text, member.key_start);
        Edit {
            range: member.value.clone(),
            replacement: reindent(&pretty(&value), &indent),
        }
    }

    /// Fill an empty container: replace plain whitespace, otherwise insert
    /// after the opening bracket so blanked comments stay put.
    fn fill_empty(&self, b: &[u8], open: usize, close: usize, replacement: String) -> Edit {
        let interior = open + 1..close;
        let untouched = self.text.as_bytes()[interior.clone()] == b[interior.clone()];
        if untouched && b[interior.clone()].iter().all(u8::is_ascii_whitespace) {
            Edit {
                range: interior,
                replacement,
            }
        } else {
            Edit::insert(open + 1, replacement)
        }
    }
}

struct Edit {
    range: Range<usize>,
    replacement: String,
}

impl Edit {
    fn insert(at: usize, replacement: String) -> Self {
        Self {
            range: at..at,
            replacement,
        }
    }
}

struct Member {
    key_start: usize,
    value: Range<usize>,
}

fn literal(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Prefix every line but the first with `indent`
fn reindent(rendered: &str, indent: &str) -> String {
    rendered
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leading whitespace of the line containing `pos`
fn line_indent(text: &str, pos: usize) -> String {
    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    text[line_start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

// ============================================================================
// Scanner over blanked (comment-free, already validated) JSON
// ============================================================================

fn skip_ws(b: &[u8], mut i: usize) -> usize {
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Index just past the string starting at `i`
fn string_end(b: &[u8], i: usize) -> usize {
    let mut j = i + 1;
    while j < b.len() {
        match b[j] {
            b'\\' => j += 2,
            b'"' => return j + 1,
            _ => j += 1,
        }
    }
    b.len()
}

/// Index just past the value starting at `i`
fn value_end(b: &[u8], i: usize) -> usize {
    match b.get(i) {
        Some(b'"') => string_end(b, i),
        Some(b'{') | Some(b'[') => {
            let mut depth = 0usize;
            let mut j = i;
            while j < b.len() {
                match b[j] {
                    b'"' => {
                        j = string_end(b, j);
                        continue;
                    }
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        depth -= 1;
                        if depth == 0 {
                            return j + 1;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            b.len()
        }
        _ => {
            let mut j = i;
            while j < b.len() && !matches!(b[j], b',' | b'}' | b']') && !b[j].is_ascii_whitespace()
            {
                j += 1;
            }
            j
        }
    }
}

/// Members of the object opening at `open`
fn members(b: &[u8], open: usize) -> Vec<Member> {
    let mut out = Vec::new();
    let mut i = skip_ws(b, open + 1);
    while i < b.len() && b[i] == b'"' {
        let key_start = i;
        i = skip_ws(b, string_end(b, i));
        if b.get(i) != Some(&b':') {
            break;
        }
        let start = skip_ws(b, i + 1);
        let end = value_end(b, start);
        out.push(Member {
            key_start,
            value: start..end,
        });
        i = skip_ws(b, end);
        if b.get(i) == Some(&b',') {
            i = skip_ws(b, i + 1);
        }
    }
    out
}

/// Last member named `key` (matching serde_json's last-wins behavior)
fn find_member(b: &[u8], open: usize, key: &str) -> Option<Member> {
    members(b, open).into_iter().rev().find(|m| {
        let raw_key = &b[m.key_start + 1..string_end(b, m.key_start) - 1];
        raw_key == key.as_bytes()
    })
}

/// Element spans of the array opening at `open`
fn elements(b: &[u8], open: usize) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut i = skip_ws(b, open + 1);
    while i < b.len() && b[i] != b']' {
        let end = value_end(b, i);
        out.push(i..end);
        i = skip_ws(b, end);
        if b.get(i) == Some(&b',') {
            i = skip_ws(b, i + 1);
        }
    }
    out
}

/// Replace comments with spaces (newlines kept) and drop trailing commas
pub(crate) fn blank_comments(text: &str) -> String {
    let b = text.as_bytes();
    let mut out = b.to_vec();
    let mut i = 0;

    while i < b.len() {
        match b[i] {
            b'"' => i = string_end(b, i),
            b'/' if b.get(i + 1) == Some(&b'/') => {
                while i < b.len() && b[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if b.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                while i < b.len() && !(b[i] == b'*' && b.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                let end = (i + 2).min(b.len());
                for byte in &mut out[start..end] {
                    if *byte != b'\n' {
                        *byte = b' ';
                    }
                }
                i = end;
            }
            _ => i += 1,
        }
    }

    // trailing commas, now that comments are gone
    let mut i = 0;
    while i < out.len() {
        match out[i] {
            b'"' => i = string_end(&out, i),
            b',' => {
                let next = skip_ws(&out, i + 1);
                if matches!(out.get(next), Some(b']') | Some(b'}')) {
                    out[i] = b' ';
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn allow(doc: &ConfigDocument) -> Vec<String> {
        doc.allow_list().unwrap().into()
    }

    #[test]
    fn test_parse_with_comments_and_trailing_commas() {
        let doc = ConfigDocument::parse(
            r#"{
  // local overrides
  "permissions": {
    /* keep */ "allow": ["B", "http://x//y",],
  },
}"#,
        )
        .unwrap();
        assert_eq!(allow(&doc), rules(&["B", "http://x//y"]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ConfigDocument::parse("{ not json"),
            Err(DocumentError::Parse(_))
        ));
        assert!(matches!(
            ConfigDocument::parse("[1, 2]"),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_with_rules_is_pretty() {
        let doc = ConfigDocument::with_rules(&RuleSet::new(["A", "B"]));
        assert_eq!(
            doc.text(),
            "{\n  \"permissions\": {\n    \"allow\": [\n      \"A\",\n      \"B\"\n    ]\n  }\n}\n"
        );
    }

    #[test]
    fn test_append_multiline_preserves_surroundings() {
        let before = r#"{
  // user comment
  "model": "opus",
  "permissions": {
    "allow": [
      "B" // trailing note
    ],
    "deny": ["Bash(rm -rf /)"]
  }
}
"#;
        let mut doc = ConfigDocument::parse(before).unwrap();
        doc.append_allow(&rules(&["A", "C"])).unwrap();

        assert_eq!(allow(&doc), rules(&["B", "A", "C"]));
        let insert_at = before.find("\"B\"").unwrap() + 3;
        assert!(doc.text().starts_with(&before[..insert_at]));
        assert!(doc.text().ends_with(&before[insert_at..]));
        assert!(doc.text().contains(",\n      \"A\",\n      \"C\" // trailing note"));
        assert_eq!(doc.value()["model"], "opus");
        assert_eq!(doc.value()["permissions"]["deny"][0], "Bash(rm -rf /)");
    }

    #[test]
    fn test_append_inline_array() {
        let mut doc = ConfigDocument::parse(r#"{"permissions": {"allow": ["B"]}}"#).unwrap();
        doc.append_allow(&rules(&["A", "C"])).unwrap();
        assert_eq!(doc.text(), r#"{"permissions": {"allow": ["B", "A", "C"]}}"#);
    }

    #[test]
    fn test_append_empty_array() {
        let mut doc = ConfigDocument::parse("{\n  \"permissions\": {\n    \"allow\": []\n  }\n}")
            .unwrap();
        doc.append_allow(&rules(&["A"])).unwrap();
        assert_eq!(
            doc.text(),
            "{\n  \"permissions\": {\n    \"allow\": [\n      \"A\"\n    ]\n  }\n}"
        );
    }

    #[test]
    fn test_append_creates_missing_members() {
        let mut doc = ConfigDocument::parse("{\n  \"model\": \"opus\"\n}\n").unwrap();
        doc.append_allow(&rules(&["A"])).unwrap();
        assert_eq!(allow(&doc), rules(&["A"]));
        assert!(doc.text().starts_with("{\n  \"model\": \"opus\",\n  \"permissions\": {"));

        let mut doc = ConfigDocument::parse("{\"permissions\": {\"deny\": []}}").unwrap();
        doc.append_allow(&rules(&["A"])).unwrap();
        assert_eq!(allow(&doc), rules(&["A"]));
        assert_eq!(doc.value()["permissions"]["deny"], json!([]));

        let mut doc = ConfigDocument::parse("{}").unwrap();
        doc.append_allow(&rules(&["A"])).unwrap();
        assert_eq!(allow(&doc), rules(&["A"]));
    }

    #[test]
    fn test_append_replaces_null() {
        let mut doc = ConfigDocument::parse(r#"{"permissions": null}"#).unwrap();
        doc.append_allow(&rules(&["A"])).unwrap();
        assert_eq!(allow(&doc), rules(&["A"]));

        let mut doc = ConfigDocument::parse(r#"{"permissions": {"allow": null}}"#).unwrap();
        doc.append_allow(&rules(&["A"])).unwrap();
        assert_eq!(allow(&doc), rules(&["A"]));
    }

    #[test]
    fn test_append_rejects_wrong_shapes() {
        let mut doc = ConfigDocument::parse(r#"{"permissions": {"allow": "Bash"}}"#).unwrap();
        assert!(matches!(
            doc.allow_list(),
            Err(DocumentError::Malformed(_))
        ));
        assert!(matches!(
            doc.append_allow(&rules(&["A"])),
            Err(DocumentError::Malformed(_))
        ));

        let mut doc = ConfigDocument::parse(r#"{"permissions": []}"#).unwrap();
        assert!(matches!(
            doc.append_allow(&rules(&["A"])),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_append_escapes_literals() {
        let mut doc = ConfigDocument::parse(r#"{"permissions": {"allow": []}}"#).unwrap();
        let rule = r"Bash(if exist *bmad-docs\architecture* rmdir /s /q *bmad-docs\architecture*)";
        doc.append_allow(&rules(&[rule])).unwrap();
        assert_eq!(allow(&doc), rules(&[rule]));
    }

    #[test]
    fn test_duplicate_keys_edit_last() {
        let mut doc =
            ConfigDocument::parse(r#"{"permissions": {"allow": ["X"], "allow": ["B"]}}"#).unwrap();
        doc.append_allow(&rules(&["A"])).unwrap();
        assert_eq!(allow(&doc), rules(&["B", "A"]));
    }

    #[test]
    fn test_blank_comments_keeps_offsets() {
        let text = "{ /* é */ \"a\": 1, // x\n}";
        let blanked = blank_comments(text);
        assert_eq!(blanked.len(), text.len());
        assert!(!blanked.contains("/*"));
        assert!(!blanked.contains(','));
    }
}

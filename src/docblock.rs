//! Docblock parsing.
//!
//! Handles both `/** ... */` blocks and line doc comments (`///`), extracting the
//! summary, the long description and the tags that carry type information:
//! `@param`, `@return`/`@returns`, `@var`, `@throws` and `@deprecated`.

use crate::error::Result;
use crate::types::Type;

/// Structured representation of a parsed docblock
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocBlock {
    /// First paragraph
    pub summary: Option<String>,
    /// Remaining free text before the first tag
    pub description: Option<String>,
    pub params: Vec<ParamTag>,
    /// Raw type expression of `@return`
    pub returns: Option<String>,
    /// Raw type expression of `@var`
    pub var: Option<String>,
    pub throws: Vec<String>,
    pub deprecated: Option<String>,
}

/// One `@param` tag
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTag {
    /// Variable name without the leading `$`
    pub name: String,
    pub type_expr: Option<String>,
    pub description: Option<String>,
}

impl DocBlock {
    /// Parse a docblock. Comment delimiters are optional.
    pub fn parse(raw: &str) -> DocBlock {
        let mut doc = DocBlock::default();
        let mut summary_lines: Vec<String> = Vec::new();
        let mut description_lines: Vec<String> = Vec::new();
        let mut in_summary = true;
        let mut seen_tag = false;

        for line in normalize_lines(raw) {
            if let Some(rest) = line.strip_prefix('@') {
                seen_tag = true;
                let (tag, payload) = split_tag_payload(rest);
                doc.apply_tag(tag, payload);
                continue;
            }
            if seen_tag {
                continue;
            }
            if line.is_empty() {
                if !summary_lines.is_empty() {
                    in_summary = false;
                }
                if !description_lines.is_empty() {
                    description_lines.push(String::new());
                }
                continue;
            }
            if in_summary {
                summary_lines.push(line);
            } else {
                description_lines.push(line);
            }
        }

        doc.summary = join_text(&summary_lines, " ");
        doc.description = join_text(&description_lines, "\n");
        doc
    }

    fn apply_tag(&mut self, tag: &str, payload: &str) {
        match tag {
            "param" => {
                if let Some(param) = parse_param(payload) {
                    self.params.push(param);
                }
            }
            "return" | "returns" => {
                let (type_expr, _) = split_type_token(payload);
                self.returns = type_expr;
            }
            "var" => {
                let (type_expr, _) = split_type_token(payload);
                self.var = type_expr;
            }
            "throws" | "throw" => {
                if let (Some(exception), _) = split_type_token(payload) {
                    self.throws.push(exception);
                }
            }
            "deprecated" => {
                let message = payload.trim();
                self.deprecated = Some(if message.is_empty() {
                    "Deprecated".to_string()
                } else {
                    message.to_string()
                });
            }
            _ => {}
        }
    }

    /// Returns `true` if the block carries nothing useful
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.params.is_empty()
            && self.returns.is_none()
            && self.var.is_none()
            && self.throws.is_empty()
            && self.deprecated.is_none()
    }

    pub fn param(&self, name: &str) -> Option<&ParamTag> {
        let name = name.trim_start_matches('$');
        self.params.iter().find(|p| p.name == name)
    }

    /// Declared type of a parameter; malformed expressions are errors
    pub fn param_type(&self, name: &str) -> Result<Option<Type>> {
        self.param(name)
            .and_then(|p| p.type_expr.as_deref())
            .map(Type::parse)
            .transpose()
    }

    pub fn return_type(&self) -> Result<Option<Type>> {
        self.returns.as_deref().map(Type::parse).transpose()
    }

    pub fn var_type(&self) -> Result<Option<Type>> {
        self.var.as_deref().map(Type::parse).transpose()
    }
}

fn normalize_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let mut line = line.trim();
            for prefix in ["/**", "///", "//!", "/*"] {
                if let Some(rest) = line.strip_prefix(prefix) {
                    line = rest;
                    break;
                }
            }
            if let Some(rest) = line.strip_suffix("*/") {
                line = rest;
            }
            line.trim().trim_start_matches('*').trim().to_string()
        })
        .collect()
}

fn split_tag_payload(rest: &str) -> (&str, &str) {
    match rest.find(char::is_whitespace) {
        Some(pos) => (&rest[..pos], rest[pos..].trim()),
        None => (rest, ""),
    }
}

fn parse_param(payload: &str) -> Option<ParamTag> {
    let payload = payload.trim();
    let (type_expr, rest) = if payload.starts_with('$') {
        (None, payload)
    } else {
        split_type_token(payload)
    };

    let rest = rest.trim_start();
    let variable = rest.strip_prefix('$')?;
    let (name, description) = match variable.find(char::is_whitespace) {
        Some(pos) => (&variable[..pos], variable[pos..].trim()),
        None => (variable, ""),
    };
    if name.is_empty() {
        return None;
    }

    Some(ParamTag {
        name: name.to_string(),
        type_expr,
        description: if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        },
    })
}

/// Split the leading type expression off `payload`. Whitespace inside `<...>`,
/// `(...)` or `{...}` belongs to the type.
fn split_type_token(payload: &str) -> (Option<String>, &str) {
    let payload = payload.trim();
    let mut depth = 0usize;
    let mut end = payload.len();
    for (idx, c) in payload.char_indices() {
        match c {
            '<' | '(' | '{' => depth += 1,
            '>' | ')' | '}' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                end = idx;
                break;
            }
            _ => {}
        }
    }
    // An unclosed bracket ends the type at the first whitespace, leaving the
    // malformed expression for `Type::parse` to reject
    if depth > 0 {
        end = payload.find(char::is_whitespace).unwrap_or(payload.len());
    }

    let token = &payload[..end];
    let rest = &payload[end..];
    if token.is_empty() {
        (None, rest)
    } else {
        (Some(token.to_string()), rest)
    }
}

fn join_text(lines: &[String], separator: &str) -> Option<String> {
    let text = lines.join(separator).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

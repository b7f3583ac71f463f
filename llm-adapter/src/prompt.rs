//! `{name}`-placeholder prompt templates.
//!
//! Templates use single braces for variables; `{{` and `}}` render as literal
//! braces so JSON examples can sit inside a prompt file.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while rendering a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    /// The template references a variable that was not supplied.
    #[error("missing prompt variable '{0}'")]
    MissingVariable(String),
    /// A `{` was never closed.
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
}

/// Values substituted into a template.
pub type PromptVariables = BTreeMap<String, String>;

/// Immutable prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    source: String,
}

impl PromptTemplate {
    /// Creates a template from its raw text.
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Name the template was loaded under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names referenced by the template, in order of first use.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        let _ = self.walk(|piece| {
            if let Piece::Variable(name) = piece {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            Ok(())
        });
        names
    }

    /// Substitutes every placeholder.
    ///
    /// # Errors
    ///
    /// Returns `PromptError::MissingVariable` for an unknown placeholder and
    /// `PromptError::Unterminated` for a dangling `{`.
    pub fn render(&self, variables: &PromptVariables) -> Result<String, PromptError> {
        let mut out = String::with_capacity(self.source.len());
        self.walk(|piece| {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Variable(name) => {
                    let value = variables
                        .get(name)
                        .ok_or_else(|| PromptError::MissingVariable(name.to_string()))?;
                    out.push_str(value);
                }
            }
            Ok(())
        })?;
        Ok(out)
    }

    fn walk<'a, F>(&'a self, mut visit: F) -> Result<(), PromptError>
    where
        F: FnMut(Piece<'a>) -> Result<(), PromptError>,
    {
        let src = self.source.as_str();
        let mut literal_start = 0;
        let mut i = 0;
        let bytes = src.as_bytes();

        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    visit(Piece::Literal(&src[literal_start..i]))?;
                    visit(Piece::Literal("{"))?;
                    i += 2;
                    literal_start = i;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    visit(Piece::Literal(&src[literal_start..i]))?;
                    visit(Piece::Literal("}"))?;
                    i += 2;
                    literal_start = i;
                }
                b'{' => {
                    let close = src[i + 1..]
                        .find('}')
                        .ok_or(PromptError::Unterminated(i))?;
                    visit(Piece::Literal(&src[literal_start..i]))?;
                    visit(Piece::Variable(src[i + 1..i + 1 + close].trim()))?;
                    i += close + 2;
                    literal_start = i;
                }
                _ => i += 1,
            }
        }
        visit(Piece::Literal(&src[literal_start..]))
    }
}

enum Piece<'a> {
    Literal(&'a str),
    Variable(&'a str),
}

/// Builds a [`PromptVariables`] map from `(name, value)` pairs.
#[must_use]
pub fn variables<I, K, V>(pairs: I) -> PromptVariables
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_variables() {
        let template = PromptTemplate::new("t", "提取以下公告：\n{raw_text}\n输出 JSON");
        let rendered = template
            .render(&variables([("raw_text", "宗地编号：长土2024-01")]))
            .unwrap();
        assert_eq!(rendered, "提取以下公告：\n宗地编号：长土2024-01\n输出 JSON");
    }

    #[test]
    fn test_escaped_braces_are_literal() {
        let template = PromptTemplate::new("t", "示例：{{\"宗地编号\": \"A\"}} 文本：{ raw_text }");
        let rendered = template.render(&variables([("raw_text", "x")])).unwrap();
        assert_eq!(rendered, "示例：{\"宗地编号\": \"A\"} 文本：x");
        assert_eq!(template.variables(), vec!["raw_text".to_string()]);
    }

    #[test]
    fn test_missing_variable() {
        let template = PromptTemplate::new("t", "{raw_text} {schema}");
        let err = template
            .render(&variables([("raw_text", "x")]))
            .unwrap_err();
        assert_eq!(err, PromptError::MissingVariable("schema".to_string()));
    }

    #[test]
    fn test_unterminated_placeholder() {
        let template = PromptTemplate::new("t", "abc {raw_text");
        assert_eq!(
            template.render(&PromptVariables::new()).unwrap_err(),
            PromptError::Unterminated(4)
        );
    }
}

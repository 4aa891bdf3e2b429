use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Name,
    Version,
}

/// A per-package source location such as
/// `https://example.org/src/%{name}-%{version}.tar.gz`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTemplate {
    parts: Vec<Part>,
}

impl SourceTemplate {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(pos) = rest.find("%{") {
            literal.push_str(&rest[..pos]);
            let after = &rest[pos + 2..];
            let end = after.find('}').ok_or_else(|| {
                Error::Config(format!("unterminated placeholder in source template '{}'", raw))
            })?;
            let part = match &after[..end] {
                "name" => Part::Name,
                "version" => Part::Version,
                other => {
                    return Err(Error::Config(format!(
                        "unknown placeholder '%{{{}}}' in source template '{}'",
                        other, raw
                    )))
                }
            };
            if !literal.is_empty() {
                parts.push(Part::Literal(std::mem::take(&mut literal)));
            }
            parts.push(part);
            rest = &after[end + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self { parts })
    }

    /// Substitute the placeholders; a missing value renders as empty.
    pub fn render(&self, name: Option<&str>, version: Option<&str>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Name => out.push_str(name.unwrap_or_default()),
                Part::Version => out.push_str(version.unwrap_or_default()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders() {
        let t = SourceTemplate::parse("https://cdn.example.org/%{name}/%{name}-%{version}.tgz").unwrap();
        assert_eq!(
            t.render(Some("react"), Some("18.2.0")),
            "https://cdn.example.org/react/react-18.2.0.tgz"
        );
    }

    #[test]
    fn test_plain_percent_is_literal() {
        let t = SourceTemplate::parse("100%/%{version}").unwrap();
        assert_eq!(t.render(None, Some("1.0")), "100%/1.0");
    }

    #[test]
    fn test_missing_value_renders_empty() {
        let t = SourceTemplate::parse("%{name}@%{version}").unwrap();
        assert_eq!(t.render(Some("x"), None), "x@");
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(SourceTemplate::parse("%{name"), Err(Error::Config(_))));
        assert!(matches!(SourceTemplate::parse("%{license}"), Err(Error::Config(_))));
    }
}

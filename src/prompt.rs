use crate::error::PromptError;

const CODE_TEMPLATE: &str = "Write a {language} code that will perform the following task: {task} (return only the code, no explanations)";

const TEST_TEMPLATE: &str = "Write a test for the following {language} code:\n{code}\n(return only the test code, no explanations)";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A prompt with named `{placeholders}`, parsed once and rendered many times.
///
/// Substitution is verbatim: supplied values are copied into the output as-is
/// and never scanned for further placeholders. `{{` and `}}` produce literal
/// braces.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    pub fn new(template: &str) -> Result<Self, PromptError> {
        let mut segments = Vec::new();
        let mut input_variables: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }
                    let start = pos + 1;
                    let mut end = None;
                    for (j, inner) in chars.by_ref() {
                        if inner == '}' {
                            end = Some(j);
                            break;
                        }
                        if inner == '{' {
                            return Err(malformed(j, "nested '{' inside placeholder"));
                        }
                    }
                    let end = end.ok_or_else(|| malformed(pos, "unterminated placeholder"))?;
                    let name = &template[start..end];
                    if !is_valid_name(name) {
                        return Err(malformed(pos, format!("invalid placeholder name '{name}'")));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    if !input_variables.iter().any(|v| v == name) {
                        input_variables.push(name.to_string());
                    }
                    segments.push(Segment::Variable(name.to_string()));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(malformed(pos, "unmatched '}'"));
                    }
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            segments,
            input_variables,
        })
    }

    /// Placeholder names in order of first appearance.
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Substitute every placeholder. Extra values are ignored.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, PromptError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| PromptError::MissingVariable(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Prompt asking for an implementation of `{task}` in `{language}`.
pub fn code_template() -> PromptTemplate {
    builtin(CODE_TEMPLATE, &["language", "task"])
}

/// Prompt asking for a test of `{code}` written in `{language}`.
pub fn test_template() -> PromptTemplate {
    builtin(TEST_TEMPLATE, &["language", "code"])
}

fn builtin(text: &str, variables: &[&str]) -> PromptTemplate {
    let template = PromptTemplate::new(text).expect("built-in template is well formed");
    debug_assert_eq!(template.input_variables(), variables);
    template
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn malformed(position: usize, reason: impl Into<String>) -> PromptError {
    PromptError::Malformed {
        position,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_unresolved_placeholder(text: &str, template: &PromptTemplate) -> bool {
        template
            .input_variables()
            .iter()
            .any(|name| text.contains(&format!("{{{name}}}")))
    }

    #[test]
    fn test_code_template_contains_inputs() {
        let template = code_template();
        assert_eq!(template.input_variables(), ["language", "task"]);

        let cases = [
            ("python", "sort a list of numbers"),
            ("C#", "parse a CSV line"),
            ("Rust", "count words in a file\nand print them"),
        ];
        for (language, task) in cases {
            let text = template
                .render(&[("language", language), ("task", task)])
                .unwrap();
            assert!(text.contains(language));
            assert!(text.contains(task));
            assert!(!has_unresolved_placeholder(&text, &template));
        }
    }

    #[test]
    fn test_code_template_exact_text() {
        let text = code_template()
            .render(&[("language", "Go"), ("task", "reverse a string")])
            .unwrap();
        assert_eq!(
            text,
            "Write a Go code that will perform the following task: reverse a string (return only the code, no explanations)"
        );
    }

    #[test]
    fn test_test_template_keeps_code_verbatim() {
        let template = test_template();
        assert_eq!(template.input_variables(), ["language", "code"]);
        let code = "fn main() {\n    println!(\"{}\", 1);\n}\n\t  trailing  ";
        let text = template
            .render(&[("language", "rust"), ("code", code)])
            .unwrap();
        assert!(text.contains(code));
        assert!(text.starts_with("Write a test for the following rust code:\n"));
        assert!(text.ends_with("\n(return only the test code, no explanations)"));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let text = code_template()
            .render(&[("language", "{task}"), ("task", "{language}")])
            .unwrap();
        assert!(text.starts_with("Write a {task} code"));
        assert!(text.contains("task: {language} (return"));
    }

    #[test]
    fn test_missing_variable() {
        let err = test_template().render(&[("language", "python")]).unwrap_err();
        assert_eq!(err, PromptError::MissingVariable("code".to_string()));
    }

    #[test]
    fn test_extra_values_ignored() {
        let template = PromptTemplate::new("Hello {name}").unwrap();
        let text = template
            .render(&[("name", "world"), ("unused", "x")])
            .unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_escaped_braces() {
        let template = PromptTemplate::new("{{literal}} {value} }}").unwrap();
        assert_eq!(template.input_variables(), ["value"]);
        assert_eq!(template.render(&[("value", "v")]).unwrap(), "{literal} v }");
    }

    #[test]
    fn test_repeated_variable_listed_once() {
        let template = PromptTemplate::new("{a}-{b}-{a}").unwrap();
        assert_eq!(template.input_variables(), ["a", "b"]);
        assert_eq!(template.render(&[("a", "1"), ("b", "2")]).unwrap(), "1-2-1");
    }

    #[test]
    fn test_malformed_templates() {
        for bad in ["open {name", "stray } brace", "{}", "{1abc}", "{a{b}}", "{with space}"] {
            assert!(
                matches!(PromptTemplate::new(bad), Err(PromptError::Malformed { .. })),
                "expected malformed: {bad}"
            );
        }
    }
}

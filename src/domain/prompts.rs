//! Templates exposed as MCP prompts

use crate::errors::RegistrationError;
use crate::registry::{
    signature::{Arguments, ParamSpec, ParamType},
    RegistryBuilder, Template,
};

pub fn register_prompts(builder: &mut RegistryBuilder) -> Result<(), RegistrationError> {
    builder.register(
        Template::new(
            "code_review_prompt",
            "Creates a prompt for code review.",
            code_review_prompt,
        )
        .param(ParamSpec::required("code", ParamType::Text))
        .param(ParamSpec::optional("language", ParamType::Text, "python")),
    )?;
    builder.register(
        Template::new(
            "summarize_text_prompt",
            "Creates a prompt for text summarization.",
            summarize_text_prompt,
        )
        .param(ParamSpec::required("text", ParamType::Text))
        .param(ParamSpec::optional("max_sentences", ParamType::Integer, 3)),
    )?;
    builder.register(
        Template::new(
            "debug_help_prompt",
            "Creates a prompt for debugging assistance.",
            debug_help_prompt,
        )
        .param(ParamSpec::required("error_message", ParamType::Text))
        .param(ParamSpec::optional("context", ParamType::Text, "")),
    )?;

    Ok(())
}

fn code_review_prompt(arguments: &Arguments) -> String {
    let code = arguments.text("code");
    let language = arguments.text("language");

    format!(
        "Please review the following {language} code and provide feedback on:
1. Code quality and readability
2. Potential bugs or issues
3. Performance considerations
4. Best practices

Code:
```{language}
{code}
```

Please provide a detailed analysis."
    )
}

fn summarize_text_prompt(arguments: &Arguments) -> String {
    let text = arguments.text("text");
    let max_sentences = arguments.integer("max_sentences");

    format!(
        "Please summarize the following text in no more than {max_sentences} sentences:

{text}

Summary:"
    )
}

fn debug_help_prompt(arguments: &Arguments) -> String {
    let error_message = arguments.text("error_message");
    let context = arguments.text("context");

    let mut prompt = format!("I'm encountering the following error:\n\nError: {error_message}\n");
    if !context.is_empty() {
        prompt.push_str(&format!("\nContext:\n{context}\n"));
    }
    prompt.push_str(
        "
Please help me:
1. Understand what this error means
2. Identify the likely cause
3. Suggest solutions to fix it
",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::register_prompts;
    use crate::errors::AppError;
    use crate::registry::{CapabilityRegistry, DuplicatePolicy};

    fn render(name: &str, arguments: Value) -> Result<String, AppError> {
        let mut builder = CapabilityRegistry::builder(DuplicatePolicy::Reject);
        register_prompts(&mut builder).expect("prompts register");
        let arguments: Map<String, Value> = arguments.as_object().cloned().unwrap_or_default();
        builder.build().render_template(name, &arguments)
    }

    #[test]
    fn summarize_uses_supplied_sentence_limit() {
        let text = render(
            "summarize_text_prompt",
            json!({"text": "hello", "max_sentences": 2}),
        )
        .expect("renders");
        assert!(text.contains("no more than 2 sentences"));
        assert!(text.contains("\n\nhello\n\nSummary:"));
    }

    #[test]
    fn summarize_defaults_to_three_sentences() {
        let text = render("summarize_text_prompt", json!({"text": "hello"})).expect("renders");
        assert!(text.contains("no more than 3 sentences"));
    }

    #[test]
    fn summarize_accepts_string_encoded_limit() {
        let text = render(
            "summarize_text_prompt",
            json!({"text": "hello", "max_sentences": "5"}),
        )
        .expect("renders");
        assert!(text.contains("no more than 5 sentences"));
    }

    #[test]
    fn summarize_rejects_limit_beyond_integer_range() {
        let error = render(
            "summarize_text_prompt",
            json!({"text": "hello", "max_sentences": 18446744073709551615u64}),
        )
        .expect_err("limit out of range");
        assert!(matches!(
            error,
            AppError::Validation { ref parameter, .. } if parameter == "max_sentences"
        ));
    }

    #[test]
    fn code_review_defaults_to_python() {
        let text = render("code_review_prompt", json!({"code": "print(1)"})).expect("renders");
        assert!(text.starts_with("Please review the following python code"));
        assert!(text.contains("```python\nprint(1)\n```"));
    }

    #[test]
    fn debug_help_omits_empty_context() {
        let without = render("debug_help_prompt", json!({"error_message": "boom"}))
            .expect("renders");
        assert!(without.contains("Error: boom\n"));
        assert!(!without.contains("Context:"));

        let with = render(
            "debug_help_prompt",
            json!({"error_message": "boom", "context": "during startup"}),
        )
        .expect("renders");
        assert!(with.contains("\nContext:\nduring startup\n"));
    }

    #[test]
    fn missing_required_argument_is_reported() {
        let error = render("code_review_prompt", json!({})).expect_err("code is required");
        assert!(matches!(
            error,
            AppError::Validation { ref parameter, .. } if parameter == "code"
        ));
    }
}

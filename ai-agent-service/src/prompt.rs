//! Review prompt templating.
//!
//! Templates carry three placeholders — `{{context}}`, `{{language}}`, and
//! `{{diff}}` — with whitespace tolerated inside the braces. Unknown
//! placeholders are left untouched so a broken template fails visibly in the
//! rendered prompt instead of silently dropping text.

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};

/// Default bilingual review prompt used when no template is configured.
pub const DEFAULT_PROMPT: &str = "\
请对以下 GitLab 代码变更进行简要的代码审查，如果有任何 bug 风险和改进建议，请提出来：\n\n\
{{context}}\n\
编程语言：{{language}}\n\n\
{{diff}}\n\n\
请提供简洁的分析，包括：\n\
1. 代码质量和最佳实践\n\
2. 潜在的 bug 或安全问题\n\
3. 性能考虑\n\
4. 可维护性和可读性\n\n\
请确保回复简洁明了，每个要点不超过100字。总体回复不要超过500字。";

/// Values substituted into a prompt template.
#[derive(Debug, Clone, Default)]
pub struct PromptValues<'a> {
    pub context: &'a str,
    pub language: &'a str,
    pub diff: &'a str,
}

lazy_static! {
    static ref PH_CONTEXT: Regex = Regex::new(r"\{\{\s*context\s*\}\}").unwrap();
    static ref PH_LANGUAGE: Regex = Regex::new(r"\{\{\s*language\s*\}\}").unwrap();
    static ref PH_DIFF: Regex = Regex::new(r"\{\{\s*diff\s*\}\}").unwrap();
}

/// Renders a template by substituting the three known placeholders.
///
/// Values are inserted literally (`NoExpand`): diffs routinely contain
/// `$1` or `${VAR}`, which must not be treated as capture references.
pub fn render_template(tpl: &str, values: &PromptValues<'_>) -> String {
    let out = PH_CONTEXT.replace_all(tpl, NoExpand(values.context));
    let out = PH_LANGUAGE.replace_all(&out, NoExpand(values.language));
    PH_DIFF.replace_all(&out, NoExpand(values.diff)).into_owned()
}

/// Renders the configured template, or [`DEFAULT_PROMPT`] when the override
/// is absent or blank.
pub fn render_review_prompt(template: Option<&str>, values: &PromptValues<'_>) -> String {
    let tpl = match template {
        Some(t) if !t.trim().is_empty() => t,
        _ => DEFAULT_PROMPT,
    };
    render_template(tpl, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_all_placeholders() {
        let out = render_template(
            "ctx={{context}} lang={{ language }} diff={{diff}}",
            &PromptValues {
                context: "C",
                language: "Rust",
                diff: "+x",
            },
        );
        assert_eq!(out, "ctx=C lang=Rust diff=+x");
    }

    #[test]
    fn dollar_sequences_are_inserted_literally() {
        let values = PromptValues {
            diff: "+echo ${HOME}\n+price = $1",
            ..Default::default()
        };
        let out = render_template("{{diff}}", &values);
        assert_eq!(out, "+echo ${HOME}\n+price = $1");
    }

    #[test]
    fn missing_values_render_empty() {
        let out = render_template("[{{context}}]", &PromptValues::default());
        assert_eq!(out, "[]");
    }

    #[test]
    fn blank_override_falls_back_to_default() {
        let values = PromptValues {
            diff: "@@ -1 +1 @@",
            ..Default::default()
        };
        let out = render_review_prompt(Some("   "), &values);
        assert!(out.contains("@@ -1 +1 @@"));
        assert!(!out.contains("{{diff}}"));
    }
}

//! Prompt templates. Placeholders are `{{key}}` and are filled by
//! [`render_prompt`](signalist_providers::summarize::render_prompt).

use signalist_core::event::UserCreated;

pub const WELCOME_EMAIL_PROMPT: &str = r#"Write a short, personalized welcome paragraph for a new user of Signalist, a stock market tracking app.

User profile:
{{userProfile}}

Requirements:
- Return a single HTML fragment: one <p> element with inline style "font-size:16px;line-height:1.6;color:#CCDADC;margin:0 0 24px 0;".
- Two or three sentences. Mention something specific from the profile (goals, risk tolerance, or industry).
- Confident, friendly, no hype, no financial advice.
- Do not include a greeting line, a sign-off, markdown, or code fences."#;

pub const NEWS_SUMMARY_EMAIL_PROMPT: &str = r#"Summarize today's market news for a Signalist user.

Articles (JSON):
{{newsData}}

Requirements:
- Return a single HTML fragment. Group related articles under <h3> section headings.
- For each story give a <p> with one or two plain-language sentences on what happened and why it matters to an investor.
- Bold key numbers and tickers with <strong>. Link each story's headline to its url with <a href="...">.
- Keep it under 300 words. No greeting, no sign-off, no markdown, no code fences."#;

/// Profile block inserted as `{{userProfile}}`.
pub fn user_profile(user: &UserCreated) -> String {
    let field = |value: &str| {
        let value = value.trim();
        if value.is_empty() { "Not specified".to_string() } else { value.to_string() }
    };
    format!(
        "- Country: {}\n- Investment goals: {}\n- Risk tolerance: {}\n- Preferred industry: {}",
        field(&user.country),
        field(&user.investment_goals),
        field(&user.risk_tolerance),
        field(&user.preferred_industry),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_profile_block() {
        let user = UserCreated {
            email: "a@example.com".into(),
            name: "Ada".into(),
            country: "US".into(),
            investment_goals: "Growth".into(),
            risk_tolerance: "".into(),
            preferred_industry: "Technology".into(),
        };
        let profile = user_profile(&user);
        assert!(profile.contains("- Country: US"));
        assert!(profile.contains("- Risk tolerance: Not specified"));
        assert!(profile.contains("- Preferred industry: Technology"));
    }

    #[test]
    fn test_templates_carry_placeholders() {
        assert!(WELCOME_EMAIL_PROMPT.contains("{{userProfile}}"));
        assert!(NEWS_SUMMARY_EMAIL_PROMPT.contains("{{newsData}}"));
    }
}

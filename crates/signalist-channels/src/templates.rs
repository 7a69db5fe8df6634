//! HTML bodies for the two Signalist emails.
//!
//! `intro` and `news_content` come from the model as HTML fragments and are
//! inserted as-is. Everything user-supplied (names) is escaped.

use signalist_core::traits::mailer::{NewsSummaryEmail, WelcomeEmail};

pub const WELCOME_SUBJECT: &str = "Welcome to Signalist - your stock market toolkit is ready!";

pub fn news_subject(date: &str) -> String {
    format!("📈 Market News Summary Today - {date}")
}

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{{title}}</title></head>
<body style="margin:0;padding:0;background-color:#050505;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;">
<table width="100%" cellpadding="0" cellspacing="0" style="background-color:#050505;">
<tr><td align="center" style="padding:40px 20px;">
<table width="600" cellpadding="0" cellspacing="0" style="background-color:#141414;border-radius:8px;border:1px solid #30333A;">
<tr><td style="padding:40px;color:#CCDADC;font-size:16px;line-height:1.6;">
{{body}}
<p style="margin:32px 0 0 0;color:#9095A1;font-size:13px;">Signalist · You are receiving this because you signed up for Signalist.</p>
</td></tr>
</table>
</td></tr>
</table>
</body>
</html>"#;

fn layout(title: &str, body: &str) -> String {
    LAYOUT.replacen("{{title}}", &escape(title), 1).replacen("{{body}}", body, 1)
}

pub fn welcome_html(email: &WelcomeEmail) -> String {
    let greeting = if email.name.trim().is_empty() {
        "Welcome aboard!".to_string()
    } else {
        format!("Welcome aboard, {}!", escape(email.name.trim()))
    };
    let body = format!(
        "<h1 style=\"margin:0 0 24px 0;color:#FDD458;font-size:24px;\">{greeting}</h1>\n\
         {intro}\n\
         <p style=\"margin:24px 0 0 0;\">Set up your watchlist to get a daily digest of the news that moves your stocks.</p>",
        intro = email.intro,
    );
    layout(WELCOME_SUBJECT, &body)
}

pub fn news_summary_html(email: &NewsSummaryEmail) -> String {
    let body = format!(
        "<h1 style=\"margin:0 0 8px 0;color:#FDD458;font-size:24px;\">Market News Summary</h1>\n\
         <p style=\"margin:0 0 24px 0;color:#9095A1;font-size:14px;\">{date}</p>\n\
         {content}",
        date = escape(&email.date),
        content = email.news_content,
    );
    layout(&news_subject(&email.date), &body)
}

/// Plain-text alternative for clients that do not render HTML.
pub fn strip_html(html: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

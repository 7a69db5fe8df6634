//! # Signalist Channels
//! Outbound delivery channels. Email is the only one: welcome and daily
//! digest messages rendered to HTML and sent over SMTP.

pub mod email;
pub mod templates;

pub use email::{LogMailer, SmtpMailer};

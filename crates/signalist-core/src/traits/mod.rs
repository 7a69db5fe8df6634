//! Contracts for the external collaborators the pipeline depends on.

pub mod inference;
pub mod mailer;
pub mod news;
pub mod users;

pub use inference::{Content, InferenceClient, Part};
pub use mailer::{Mailer, NewsSummaryEmail, WelcomeEmail};
pub use news::NewsSource;
pub use users::UserStore;

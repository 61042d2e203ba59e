pub mod bootstrap;
pub mod desk;
pub mod notify;

pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use desk::{DeskRepositories, QuoteDesk, SubmittedQuote};
pub use notify::{
    DeliveryHandle, EmailNotifier, NotificationDispatcher, NotificationError, QuoteNotifier,
    WebhookNotifier,
};

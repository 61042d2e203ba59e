use rust_decimal::Decimal;

use roomquote_app::bootstrap_with_config;
use roomquote_core::config::AppConfig;
use roomquote_core::domain::quote::{ClientContact, QuoteStatus};
use roomquote_core::domain::room_type::RoomEntry;
use roomquote_core::submission::QuoteSubmission;
use roomquote_db::repositories::{NotificationFilter, NotificationOutcome, QuoteFilter};
use roomquote_db::seed_demo_catalog;

fn submission(email: &str, entries: Vec<RoomEntry>) -> QuoteSubmission {
    QuoteSubmission {
        client: ClientContact { name: "Grace Client".to_string(), email: email.to_string(), phone: None },
        notes: None,
        entries,
    }
}

#[tokio::test]
async fn sqlite_backed_desk_numbers_stores_and_reports_failed_webhooks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("roomquote.db").display());
    config.webhook.url = Some("http://127.0.0.1:9/hooks/quotes".to_string());
    config.notifications.timeout_secs = 2;

    let app = bootstrap_with_config(config).await.expect("bootstrap");
    seed_demo_catalog(&app.db_pool).await.expect("seed");

    let first = app
        .desk
        .submit_quote(submission("grace@example.com", vec![RoomEntry::new("standard", Decimal::new(50, 0))]))
        .await
        .expect("first submission");
    let second = app
        .desk
        .submit_quote(submission(
            "linus@example.com",
            vec![
                RoomEntry::new("standard", Decimal::TEN),
                RoomEntry::new("bathroom", Decimal::new(6, 0)),
            ],
        ))
        .await
        .expect("second submission");

    assert_eq!(first.quote.quote_number.0, "Q-000001");
    assert_eq!(second.quote.quote_number.0, "Q-000002");
    assert_eq!(first.quote.total, Decimal::new(11250, 2));
    assert_eq!(second.quote.subtotal, Decimal::new(4900, 2));
    assert_eq!(second.quote.total, Decimal::new(4900, 2));

    let first_records = first.delivery.wait().await;
    let second_records = second.delivery.wait().await;
    assert_eq!(first_records.len(), 1);
    assert_eq!(first_records[0].outcome, NotificationOutcome::Failed);
    assert_eq!(second_records[0].channel, "webhook");

    let failed = app
        .desk
        .list_notifications(&NotificationFilter { outcome: Some(NotificationOutcome::Failed), limit: None })
        .await
        .expect("failed deliveries");
    assert_eq!(failed.len(), 2);

    app.desk
        .update_status(&first.quote.quote_number, QuoteStatus::Confirmed)
        .await
        .expect("confirm");

    let pending = app
        .desk
        .list_quotes(&QuoteFilter { status: Some(QuoteStatus::Pending), ..QuoteFilter::default() })
        .await
        .expect("pending quotes");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].quote_number, second.quote.quote_number);

    let by_email = app
        .desk
        .list_quotes(&QuoteFilter {
            client_email: Some("GRACE@example.com".to_string()),
            ..QuoteFilter::default()
        })
        .await
        .expect("quotes by email");
    assert_eq!(by_email.len(), 1);
    assert_eq!(by_email[0].status, QuoteStatus::Confirmed);
}

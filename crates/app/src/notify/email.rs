use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use roomquote_core::config::{BrandingConfig, EmailConfig, PricingConfig};
use roomquote_core::domain::quote::Quote;
use roomquote_core::pricing::format_amount;

use super::{NotificationError, QuoteNotifier};

/// Sends the admin a summary of each new quote over SMTP, and optionally the
/// client a copy.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    admin: Mailbox,
    send_client_copy: bool,
    branding: BrandingConfig,
    pricing: PricingConfig,
}

impl EmailNotifier {
    pub fn from_config(
        email: &EmailConfig,
        branding: &BrandingConfig,
        pricing: &PricingConfig,
    ) -> Result<Self, NotificationError> {
        let host = email.smtp_host.as_deref().ok_or_else(|| {
            NotificationError::Configuration("email.smtp_host is required".to_string())
        })?;
        let admin = email.admin_address.as_deref().ok_or_else(|| {
            NotificationError::Configuration("email.admin_address is required".to_string())
        })?;

        let mut from = parse_mailbox(&email.from_address)?;
        if from.name.is_none() {
            from.name = Some(branding.company_name.clone());
        }

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotificationError::Configuration(e.to_string()))?
            .port(email.smtp_port);
        if let (Some(user), Some(password)) = (&email.smtp_user, &email.smtp_password) {
            builder = builder
                .credentials(Credentials::new(user.clone(), password.expose_secret().to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            admin: parse_mailbox(admin)?,
            send_client_copy: email.send_client_copy,
            branding: branding.clone(),
            pricing: pricing.clone(),
        })
    }

    fn build_message(
        &self,
        to: Mailbox,
        subject: String,
        quote: &Quote,
    ) -> Result<Message, NotificationError> {
        let plain = render_plain(quote, &self.branding, &self.pricing);
        let html = render_html(quote, &self.branding, &self.pricing);

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(plain, html))
            .map_err(|e| NotificationError::Email(e.to_string()))
    }
}

#[async_trait]
impl QuoteNotifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send_quote_notification(&self, quote: &Quote) -> Result<(), NotificationError> {
        let admin_message = self.build_message(
            self.admin.clone(),
            format!("New quote {} from {}", quote.quote_number, quote.client.name),
            quote,
        )?;
        self.transport
            .send(admin_message)
            .await
            .map_err(|e| NotificationError::Email(e.to_string()))?;

        if self.send_client_copy {
            let client = Mailbox::new(
                Some(quote.client.name.clone()),
                quote
                    .client
                    .email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        NotificationError::Email(e.to_string())
                    })?,
            );
            let copy = self.build_message(
                client,
                format!("Your {} quote {}", self.branding.company_name, quote.quote_number),
                quote,
            )?;
            self.transport.send(copy).await.map_err(|e| NotificationError::Email(e.to_string()))?;
        }

        tracing::debug!(
            quote_number = %quote.quote_number,
            client_copy = self.send_client_copy,
            "quote email sent"
        );
        Ok(())
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, NotificationError> {
    raw.parse::<Mailbox>()
        .map_err(|e| NotificationError::Configuration(format!("invalid address `{raw}`: {e}")))
}

pub fn render_plain(quote: &Quote, branding: &BrandingConfig, pricing: &PricingConfig) -> String {
    let mut body = format!(
        "{company}\nQuote {number} ({status})\n\nClient: {name} <{email}>\n",
        company = branding.company_name,
        number = quote.quote_number,
        status = quote.status.as_str(),
        name = quote.client.name,
        email = quote.client.email,
    );
    if let Some(phone) = &quote.client.phone {
        body.push_str(&format!("Phone: {phone}\n"));
    }
    body.push('\n');

    for line in &quote.line_items {
        body.push_str(&format!(
            "- {} : {} x {} = {}\n",
            line.room_type_name,
            line.area,
            format_amount(line.rate, pricing),
            format_amount(line.computed_price, pricing),
        ));
    }
    body.push_str(&format!("\nSubtotal: {}\n", format_amount(quote.subtotal, pricing)));
    for discount in &quote.applied_discounts {
        body.push_str(&format!(
            "Discount ({}): -{}\n",
            discount.label,
            format_amount(discount.amount, pricing)
        ));
    }
    body.push_str(&format!("Total: {}\n", format_amount(quote.total, pricing)));

    if let Some(notes) = &quote.notes {
        body.push_str(&format!("\nNotes:\n{notes}\n"));
    }
    body
}

pub fn render_html(quote: &Quote, branding: &BrandingConfig, pricing: &PricingConfig) -> String {
    let color = &branding.primary_color;
    let mut rows = String::new();
    for line in &quote.line_items {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td style=\"text-align:right\">{}</td></tr>",
            escape_html(&line.room_type_name),
            line.area,
            escape_html(&format_amount(line.rate, pricing)),
            escape_html(&format_amount(line.computed_price, pricing)),
        ));
    }

    let mut summary = format!(
        "<tr><td colspan=\"3\">Subtotal</td><td style=\"text-align:right\">{}</td></tr>",
        escape_html(&format_amount(quote.subtotal, pricing))
    );
    for discount in &quote.applied_discounts {
        summary.push_str(&format!(
            "<tr><td colspan=\"3\">{}</td><td style=\"text-align:right\">-{}</td></tr>",
            escape_html(&discount.label),
            escape_html(&format_amount(discount.amount, pricing))
        ));
    }
    summary.push_str(&format!(
        "<tr><th colspan=\"3\" style=\"text-align:left\">Total</th>\
         <th style=\"text-align:right;color:{color}\">{}</th></tr>",
        escape_html(&format_amount(quote.total, pricing))
    ));

    let notes = quote
        .notes
        .as_deref()
        .map(|notes| format!("<p><strong>Notes:</strong><br>{}</p>", escape_html(notes)))
        .unwrap_or_default();

    format!(
        "<html><body style=\"font-family:sans-serif\">\
         <h2 style=\"color:{color}\">{company}</h2>\
         <p>Quote <strong>{number}</strong> for {name} &lt;{email}&gt;</p>\
         <table style=\"border-collapse:collapse;width:100%\">\
         <thead><tr style=\"background:{color};color:#fff\">\
         <th>Room</th><th>Area</th><th>Rate</th><th>Price</th></tr></thead>\
         <tbody>{rows}{summary}</tbody></table>{notes}</body></html>",
        company = escape_html(&branding.company_name),
        number = escape_html(&quote.quote_number.0),
        name = escape_html(&quote.client.name),
        email = escape_html(&quote.client.email),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

//! Purchase receipts over SMTP.
//!
//! Uses lettre for delivery with Askama text and HTML templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use bazaar_core::Price;

use crate::config::EmailConfig;
use crate::db::orders::OrderDetail;

/// One receipt row, pre-formatted.
struct ReceiptLine {
    name: String,
    qty: i32,
    price: String,
}

/// Values shared by both receipt bodies.
struct Receipt {
    buyer_name: String,
    order_id: String,
    order_date: String,
    lines: Vec<ReceiptLine>,
    items_price: String,
    shipping_price: String,
    tax_price: String,
    total_price: String,
    payment_method: String,
    order_url: String,
}

impl Receipt {
    fn new(detail: &OrderDetail, storefront_url: &str) -> Self {
        let order = &detail.order;
        Self {
            buyer_name: detail.buyer_name.clone(),
            order_id: order.id.to_string(),
            order_date: order.created_at.format("%d %b %Y").to_string(),
            lines: order
                .lines
                .iter()
                .map(|line| ReceiptLine {
                    name: line.name.clone(),
                    qty: line.qty,
                    price: Price::pkr(line.price).to_string(),
                })
                .collect(),
            items_price: Price::pkr(order.totals.items_price).to_string(),
            shipping_price: Price::pkr(order.totals.shipping_price).to_string(),
            tax_price: Price::pkr(order.totals.tax_price).to_string(),
            total_price: Price::pkr(order.totals.total_price).to_string(),
            payment_method: order.payment_method.to_string(),
            order_url: format!("{}/order/{}", storefront_url.trim_end_matches('/'), order.id),
        }
    }
}

#[derive(Template)]
#[template(path = "email/purchase_receipt.html")]
struct PurchaseReceiptHtml<'a> {
    receipt: &'a Receipt,
}

#[derive(Template)]
#[template(path = "email/purchase_receipt.txt")]
struct PurchaseReceiptText<'a> {
    receipt: &'a Receipt,
}

/// Errors that can occur when sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Transactional mail sender.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: Mailbox,
    storefront_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// Links in messages point at `storefront_url`.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the relay or sender address is invalid.
    pub fn new(config: &EmailConfig, storefront_url: &str) -> Result<Self, MailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let from_address = config
            .from_address
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from_address.clone()))?;

        Ok(Self {
            mailer,
            from_address,
            storefront_url: storefront_url.to_owned(),
        })
    }

    /// Send the purchase receipt for a paid order to its buyer.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if rendering or delivery fails.
    pub async fn send_purchase_receipt(&self, detail: &OrderDetail) -> Result<(), MailError> {
        let (text, html) = render_receipt(detail, &self.storefront_url)?;
        let subject = format!("Order confirmation {}", detail.order.id);

        self.send_multipart_email(&detail.buyer_email, &subject, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from_address.clone())
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Render the text and HTML receipt bodies.
fn render_receipt(detail: &OrderDetail, storefront_url: &str) -> Result<(String, String), MailError> {
    let receipt = Receipt::new(detail, storefront_url);
    let text = PurchaseReceiptText { receipt: &receipt }.render()?;
    let html = PurchaseReceiptHtml { receipt: &receipt }.render()?;
    Ok((text, html))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use bazaar_core::{
        Order, OrderId, OrderLine, PaymentMethod, ProductId, ShippingAddress, Totals, UserId,
    };

    use super::*;

    fn detail() -> OrderDetail {
        OrderDetail {
            order: Order {
                id: OrderId::generate(),
                user_id: UserId::generate(),
                shipping_address: ShippingAddress {
                    full_name: "Sana <b>Mir</b>".to_owned(),
                    street_address: "12 Mall Road".to_owned(),
                    city: "Lahore".to_owned(),
                    postal_code: "54000".to_owned(),
                    country: "Pakistan".to_owned(),
                    phone: "03001234567".to_owned(),
                    lat: None,
                    lng: None,
                },
                payment_method: PaymentMethod::JazzCash,
                totals: Totals {
                    items_price: Decimal::new(300_000, 2),
                    shipping_price: Decimal::new(20_000, 2),
                    tax_price: Decimal::new(45_000, 2),
                    total_price: Decimal::new(365_000, 2),
                },
                is_paid: true,
                paid_at: Some(Utc::now()),
                is_delivered: false,
                delivered_at: None,
                created_at: Utc::now(),
                lines: vec![OrderLine {
                    line_no: 1,
                    product_id: ProductId::generate(),
                    name: "Khussa <Gold>".to_owned(),
                    slug: "khussa-gold".to_owned(),
                    image: "/images/khussa.jpg".to_owned(),
                    qty: 2,
                    price: Decimal::new(150_000, 2),
                }],
            },
            buyer_name: "Sana".to_owned(),
            buyer_email: "sana@example.com".to_owned(),
        }
    }

    #[test]
    fn test_receipt_lists_lines_and_total() {
        let detail = detail();
        let (text, html) = render_receipt(&detail, "https://shop.example.com/").unwrap();

        assert!(text.contains("2 x Khussa <Gold>"));
        assert!(text.contains("Rs 3650.00"));
        assert!(text.contains(&format!(
            "https://shop.example.com/order/{}",
            detail.order.id
        )));
        assert!(html.contains("Khussa &#60;Gold&#62;") || html.contains("Khussa &lt;Gold&gt;"));
        assert!(html.contains("JazzCash"));
    }
}

//! SMTP delivery of alert batches.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::SmtpConfig;
use crate::models::AlertEvent;

use super::Notifier;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    pub fn new(smtp: &SmtpConfig, recipients: &[String]) -> Result<Self> {
        let credentials = Credentials::new(smtp.user.clone(), smtp.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .context("invalid SMTP host")?
            .credentials(credentials)
            .build();

        let from: Mailbox = smtp
            .user
            .parse()
            .context("SMTP user is not a valid mailbox")?;
        let to = recipients
            .iter()
            .map(|r| r.parse().with_context(|| format!("invalid recipient {r}")))
            .collect::<Result<Vec<Mailbox>>>()?;

        Ok(Self { mailer, from, to })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_alerts(&self, alerts: &[AlertEvent]) -> Result<()> {
        let mut builder = Message::builder().from(self.from.clone()).subject(format!(
            "Price alert: {} item(s) hit your target!",
            alerts.len()
        ));
        for mailbox in &self.to {
            builder = builder.to(mailbox.clone());
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(
                render_text(alerts),
                render_html(alerts),
            ))
            .context("building alert email")?;

        self.mailer
            .send(message)
            .await
            .context("sending alert email")?;
        info!(
            alerts = alerts.len(),
            recipients = self.to.len(),
            "alert email sent"
        );
        Ok(())
    }
}

/// Plain-text part, one block per alert.
pub fn render_text(alerts: &[AlertEvent]) -> String {
    let mut lines = vec![
        "Price alert!".to_string(),
        String::new(),
        format!(
            "Found {} item(s) at or below your target price:",
            alerts.len()
        ),
        String::new(),
    ];
    for alert in alerts {
        lines.push(format!("- {}", alert.name));
        lines.push(format!(
            "  Current: ${:.2} (threshold: ${:.2})",
            alert.price, alert.threshold
        ));
        lines.push(format!("  Link: {}", alert.url));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// HTML part: a table of item, current price, threshold, previous price
/// ("N/A" on first observation) and a buy link.
pub fn render_html(alerts: &[AlertEvent]) -> String {
    let rows: String = alerts
        .iter()
        .map(|alert| {
            let previous = alert
                .previous_price
                .map_or_else(|| "N/A".to_string(), |p| format!("${p:.2}"));
            format!(
                r#"<tr>
    <td style="padding:12px;border-bottom:1px solid #ddd;">{name}</td>
    <td style="padding:12px;border-bottom:1px solid #ddd;color:#16a34a;font-weight:bold;">${price:.2}</td>
    <td style="padding:12px;border-bottom:1px solid #ddd;">${threshold:.2}</td>
    <td style="padding:12px;border-bottom:1px solid #ddd;">{previous}</td>
    <td style="padding:12px;border-bottom:1px solid #ddd;"><a href="{url}" style="color:#dc2626;font-weight:bold;">Buy Now</a></td>
</tr>"#,
                name = alert.name,
                price = alert.price,
                threshold = alert.threshold,
                url = alert.url,
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family:system-ui,sans-serif;max-width:800px;margin:0 auto;padding:20px;">
    <h2 style="color:#dc2626;">Price Alert!</h2>
    <p>The following item(s) have dropped to or below your target price:</p>
    <table style="border-collapse:collapse;width:100%;margin:20px 0;">
        <thead>
            <tr style="background:#f3f4f6;">
                <th style="padding:12px;text-align:left;border-bottom:2px solid #ddd;">Item</th>
                <th style="padding:12px;text-align:left;border-bottom:2px solid #ddd;">Current Price</th>
                <th style="padding:12px;text-align:left;border-bottom:2px solid #ddd;">Your Threshold</th>
                <th style="padding:12px;text-align:left;border-bottom:2px solid #ddd;">Previous Price</th>
                <th style="padding:12px;text-align:left;border-bottom:2px solid #ddd;">Action</th>
            </tr>
        </thead>
        <tbody>{rows}</tbody>
    </table>
    <p style="color:#666;font-size:14px;">Prices may change - act fast!</p>
</body>
</html>"#
    )
}

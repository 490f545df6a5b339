use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use rsvp_types::models::{Rsvp, WeddingEvent};

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body_html: String,
}

/// Outbound mail transport. `Disabled` only logs, which is what tests and
/// local development use.
#[derive(Clone)]
pub enum Mailer {
    Disabled,
    Relay(MailRelay),
}

/// JSON mail relay: `POST {endpoint}` with a bearer API key.
#[derive(Clone)]
pub struct MailRelay {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl Mailer {
    pub fn relay(endpoint: String, api_key: String, from: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .context("failed to build mail relay client")?;
        Ok(Self::Relay(MailRelay {
            client,
            endpoint,
            api_key,
            from,
        }))
    }

    pub async fn send(&self, email: &Email) -> Result<()> {
        match self {
            Self::Disabled => {
                debug!(to = %email.to, subject = %email.subject, "Mail delivery disabled, dropping message");
                Ok(())
            }
            Self::Relay(relay) => relay.send(email).await,
        }
    }
}

impl MailRelay {
    async fn send(&self, email: &Email) -> Result<()> {
        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&RelayMessage {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                html: &email.body_html,
            })
            .send()
            .await
            .context("mail relay unreachable")?
            .error_for_status()
            .context("mail relay rejected message")?;

        info!(to = %email.to, "Sent mail: {}", email.subject);
        Ok(())
    }
}

/// Confirmation sent to a guest after they submit or change their RSVP.
pub fn rsvp_confirmation(
    name: &str,
    to: &str,
    rsvp: &Rsvp,
    event: Option<&WeddingEvent>,
) -> Email {
    let title = event.map(|e| e.title.as_str()).unwrap_or("our wedding");
    let subject = format!("Your RSVP for {}", title);

    let mut body = format!("<p>Hi {},</p>", escape_html(name));
    if rsvp.attending {
        body.push_str("<p>Thank you, we have you down as <strong>attending</strong>.</p>");
        if let Some(event) = event {
            body.push_str(&format!(
                "<p>{} at {}.</p>",
                event.date.format("%A %-d %B %Y"),
                escape_html(&event.location)
            ));
        }
    } else {
        body.push_str("<p>We have you down as <strong>not attending</strong>. We'll miss you.</p>");
    }

    let details = [
        ("Allergies", &rsvp.allergies),
        ("Food preferences", &rsvp.food_preferences),
        ("Message", &rsvp.message),
    ];
    let rows: Vec<String> = details
        .iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(|v| format!("<li>{}: {}</li>", label, escape_html(v)))
        })
        .collect();
    if !rows.is_empty() {
        body.push_str(&format!("<ul>{}</ul>", rows.concat()));
    }
    body.push_str("<p>You can change your answer any time before the day.</p>");

    Email {
        to: to.to_string(),
        subject,
        body_html: body,
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

//! Invitation email dispatch.
//!
//! Sends the invitation email through a Resend-style HTTP API. Dispatch
//! is strictly best-effort: callers log failures and fold them into the
//! review outcome message; the persisted approval is never affected.

use anyhow::Context;
use serde_json::json;

use crate::{config::Config, models::invite::IssuedInvite};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Send the invitation email for a freshly issued token.
///
/// # Process
///
/// 1. Build the invitation link from `PUBLIC_BASE_URL`
/// 2. POST the rendered message to the email provider
/// 3. Treat any non-2xx provider response as a failure
///
/// # Timeout
///
/// 5 seconds per dispatch (prevents hanging an admin review on a slow
/// provider).
///
/// # Errors
///
/// Fails when no provider key is configured, the link cannot be built,
/// the request fails, or the provider rejects the message.
pub async fn send_invitation_email(
    config: &Config,
    email: &str,
    invite: &IssuedInvite,
) -> anyhow::Result<()> {
    let api_key = config
        .resend_api_key
        .as_deref()
        .context("RESEND_API_KEY is not configured")?;

    let link = invitation_link(&config.public_base_url, email, &invite.token)?;
    let subject = format!("Your invitation to {}", config.app_name);
    let (html, text) = render_invitation(&config.app_name, &link, config.invite_ttl_hours);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .post(RESEND_API_URL)
        .bearer_auth(api_key)
        .json(&json!({
            "from": config.email_from_header(),
            "to": [email],
            "subject": subject,
            "html": html,
            "text": text,
        }))
        .send()
        .await
        .context("email provider request failed")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("email provider returned {status}: {body}");
    }

    tracing::info!(%email, "invitation email dispatched");
    Ok(())
}

/// Build the registration link carried by the invitation email.
///
/// Appends `register` to the configured base URL, preserving any base
/// path, with the email and token as query parameters.
fn invitation_link(base_url: &str, email: &str, token: &str) -> anyhow::Result<String> {
    let mut url = url::Url::parse(base_url).context("PUBLIC_BASE_URL is not a valid URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("PUBLIC_BASE_URL cannot be a base URL"))?
        .pop_if_empty()
        .push("register");
    url.query_pairs_mut()
        .append_pair("email", email)
        .append_pair("token", token);
    Ok(url.into())
}

/// Render the HTML and plaintext bodies of the invitation email.
fn render_invitation(app_name: &str, link: &str, ttl_hours: i64) -> (String, String) {
    let html = format!(
        "<p>You have been approved to join {app_name}.</p>\
         <p><a href=\"{link}\">Accept your invitation</a></p>\
         <p>This invitation expires in {ttl_hours} hours. If you did not \
         request access, you can ignore this email.</p>"
    );
    let text = format!(
        "You have been approved to join {app_name}.\n\n\
         Accept your invitation: {link}\n\n\
         This invitation expires in {ttl_hours} hours. If you did not \
         request access, you can ignore this email."
    );
    (html, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_includes_email_and_token() {
        let link = invitation_link("http://localhost:3000", "a@example.com", "tok123").unwrap();
        assert_eq!(
            link,
            "http://localhost:3000/register?email=a%40example.com&token=tok123"
        );
    }

    #[test]
    fn link_preserves_base_path() {
        let link = invitation_link("https://app.example.com/beta/", "a@x.com", "t").unwrap();
        assert!(link.starts_with("https://app.example.com/beta/register?"));
    }

    #[test]
    fn link_rejects_invalid_base() {
        assert!(invitation_link("not a url", "a@x.com", "t").is_err());
    }

    #[test]
    fn bodies_carry_the_link_and_ttl() {
        let (html, text) = render_invitation("Private Beta", "https://x/register?t=1", 48);
        assert!(html.contains("https://x/register?t=1"));
        assert!(text.contains("https://x/register?t=1"));
        assert!(html.contains("Private Beta"));
        assert!(text.contains("expires in 48 hours"));
    }
}

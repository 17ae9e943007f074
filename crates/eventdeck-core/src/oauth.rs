//! Google OAuth (authorization code + PKCE) for provider sign-in.
//!
//! The handshake only yields an [`ExternalIdentity`]; turning it into a
//! backend session is the session coordinator's job.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::api::USER_AGENT;
use crate::api::types::ExternalIdentity;
use crate::config::GoogleClient;

/// Provider name sent to the backend.
pub const PROVIDER_GOOGLE: &str = "google";

/// Local OAuth callback path (port is dynamic).
pub const LOCAL_CALLBACK_PATH: &str = "/oauth2callback";

const SCOPES: &str = "openid email profile";

/// PKCE code verifier and challenge
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        // Two v4 UUIDs give 32 random bytes
        let mut verifier_bytes = [0u8; 32];
        verifier_bytes[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        verifier_bytes[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let challenge = challenge_for(&verifier);

        Self {
            verifier,
            challenge,
        }
    }
}

fn challenge_for(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Build the Google authorization URL.
pub fn build_auth_url(client: &GoogleClient, pkce: &Pkce, state: &str, redirect_uri: &str) -> String {
    let params = [
        ("response_type", "code"),
        ("client_id", client.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", SCOPES),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
        ("state", state),
        ("prompt", "select_account"),
    ];

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    format!("{}?{query}", client.authorize_url)
}

pub fn build_redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}{LOCAL_CALLBACK_PATH}")
}

/// Parses a pasted authorization input into code + optional state.
///
/// Accepts a full redirect URL, a `code=...&state=...` query, `code#state`,
/// or a bare code.
pub fn parse_authorization_input(input: &str) -> (Option<String>, Option<String>) {
    let value = input.trim();
    if value.is_empty() {
        return (None, None);
    }

    if let Ok(url) = url::Url::parse(value) {
        let code = url.query_pairs().find(|(k, _)| k == "code").map(|(_, v)| v.to_string());
        let state = url.query_pairs().find(|(k, _)| k == "state").map(|(_, v)| v.to_string());
        return (code, state);
    }

    if let Some((code, state)) = value.split_once('#') {
        return (Some(code.to_string()), Some(state.to_string()));
    }

    if value.contains("code=") {
        let params = url::form_urlencoded::parse(value.trim_start_matches('?').as_bytes())
            .collect::<Vec<_>>();
        let code = params.iter().find(|(k, _)| k == "code").map(|(_, v)| v.to_string());
        let state = params.iter().find(|(k, _)| k == "state").map(|(_, v)| v.to_string());
        return (code, state);
    }

    (Some(value.to_string()), None)
}

/// Extracts the code from a raw HTTP request hitting the local callback.
///
/// Returns `None` for other paths or a state mismatch.
pub fn extract_code_from_request(request: &str, expected_state: &str) -> Option<String> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    let path = parts.next()?;

    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    if url.path() != LOCAL_CALLBACK_PATH {
        return None;
    }
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())?;
    if state != expected_state {
        return None;
    }
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

/// Exchanges an authorization code for a Google access token.
///
/// # Errors
/// Returns an error if the request fails or Google refuses the code.
pub async fn exchange_code(
    client: &GoogleClient,
    auth_code: &str,
    pkce: &Pkce,
    redirect_uri: &str,
) -> Result<String> {
    let http = reqwest::Client::new();
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "authorization_code")
        .append_pair("client_id", &client.client_id)
        .append_pair("client_secret", &client.client_secret)
        .append_pair("code", auth_code)
        .append_pair("code_verifier", &pkce.verifier)
        .append_pair("redirect_uri", redirect_uri)
        .finish();

    let response = http
        .post(&client.token_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("User-Agent", USER_AGENT)
        .body(body)
        .send()
        .await
        .context("Failed to send token exchange request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Token exchange failed (HTTP {status}): {body}");
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;
    Ok(token.access_token)
}

/// Fetches the signed-in Google account.
///
/// # Errors
/// Returns an error if the request fails or the account has no email.
pub async fn fetch_identity(client: &GoogleClient, access_token: &str) -> Result<ExternalIdentity> {
    let http = reqwest::Client::new();
    let response = http
        .get(&client.userinfo_url)
        .bearer_auth(access_token)
        .header("User-Agent", USER_AGENT)
        .send()
        .await
        .context("Failed to send userinfo request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Userinfo request failed (HTTP {status}): {body}");
    }

    let info: UserInfo = response
        .json()
        .await
        .context("Failed to parse userinfo response")?;
    identity_from_userinfo(info)
}

fn identity_from_userinfo(info: UserInfo) -> Result<ExternalIdentity> {
    let email = info
        .email
        .filter(|e| !e.trim().is_empty())
        .context("Google account has no email address")?;
    // Same fallback the sign-up form would show: the mailbox name.
    let name = info
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    Ok(ExternalIdentity {
        provider: PROVIDER_GOOGLE.to_string(),
        subject: info.sub,
        email,
        name,
    })
}

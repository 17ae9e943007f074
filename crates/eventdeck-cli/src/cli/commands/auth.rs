//! Sign-in, sign-out and identity commands.

use std::io::{self, Read, Write};
use std::net::TcpListener;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use eventdeck_core::App;
use eventdeck_core::oauth::{self, Pkce};
use eventdeck_core::session::Session;
use eventdeck_core::token_store::mask_token;

use super::{prompt, secret_or_prompt, value_or_prompt};

/// Skips opening a browser when set (headless and test runs).
const NO_BROWSER_ENV: &str = "EVENTDECK_NO_BROWSER";
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);
/// Used in the redirect URI when no local listener could be bound.
const FALLBACK_CALLBACK_PORT: u16 = 8085;

fn announce_replacing(app: &App) {
    if let Some(existing) = app.session_handle().current() {
        println!(
            "Replacing current session for {} (token: {})",
            existing.user.email,
            mask_token(&existing.token)
        );
    }
}

fn print_signed_in(session: &Session) {
    println!("✓ Logged in as {} <{}>", session.user.name, session.user.email);
}

pub async fn login_with_password(
    app: &App,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    announce_replacing(app);
    let email = value_or_prompt(email, "Email: ")?;
    let password = secret_or_prompt(password, "Password: ")?;
    if email.is_empty() || password.is_empty() {
        anyhow::bail!("Email and password are required");
    }

    let session = app.session.login(&email, &password).await?;
    print_signed_in(&session);
    Ok(())
}

pub async fn register(
    app: &App,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let name = value_or_prompt(name, "Name: ")?;
    let email = value_or_prompt(email, "Email: ")?;
    let password = secret_or_prompt(password, "Password: ")?;
    if name.is_empty() || email.is_empty() || password.is_empty() {
        anyhow::bail!("Name, email and password are required");
    }

    let session = app.session.register(&name, &email, &password).await?;
    println!("✓ Account created");
    print_signed_in(&session);
    Ok(())
}

pub async fn login_google(app: &App) -> Result<()> {
    let client = app.config.google_client();
    if client.uses_placeholder() {
        tracing::warn!("Google OAuth client credentials are placeholders");
        eprintln!(
            "warning: Google client id/secret are placeholders; set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET"
        );
    }
    announce_replacing(app);

    let listener = TcpListener::bind(("127.0.0.1", 0)).ok();
    let port = listener
        .as_ref()
        .and_then(|l| l.local_addr().ok())
        .map_or(FALLBACK_CALLBACK_PORT, |addr| addr.port());
    let redirect_uri = oauth::build_redirect_uri(port);

    let pkce = Pkce::generate();
    let state = uuid::Uuid::new_v4().to_string();
    let auth_url = oauth::build_auth_url(&client, &pkce, &state, &redirect_uri);

    println!("To sign in with Google:");
    println!();
    println!("  1. A browser window will open (or visit the URL below)");
    println!("  2. Choose your Google account");
    println!("  3. If redirected to localhost, return here to continue");
    println!("  4. Otherwise, paste the authorization code or URL");
    println!();
    println!("Authorization URL:");
    println!("  {auth_url}");
    println!();

    if std::env::var(NO_BROWSER_ENV).is_err() {
        let _ = open::that(&auth_url);
    }

    let code = match listener.and_then(|l| wait_for_code(l, &state)) {
        Some(code) => code,
        None => {
            let input = prompt("Paste authorization code (or full redirect URL): ")?;
            let (code, provided_state) = oauth::parse_authorization_input(&input);
            if let Some(provided) = provided_state
                && provided != state
            {
                anyhow::bail!("State mismatch");
            }
            code.context("Authorization code cannot be empty")?
        }
    };

    println!("Exchanging code with Google...");
    let access_token = oauth::exchange_code(&client, &code, &pkce, &redirect_uri).await?;
    let identity = oauth::fetch_identity(&client, &access_token).await?;

    let session = app.session.sign_in_with_provider(&identity).await?;
    print_signed_in(&session);
    Ok(())
}

/// Waits for the browser redirect on the local listener.
///
/// Requests for other paths (favicon probes) get a 400 and waiting continues.
fn wait_for_code(listener: TcpListener, state: &str) -> Option<String> {
    let _ = listener.set_nonblocking(true);

    let (tx, rx) = std::sync::mpsc::channel::<Option<String>>();
    let state = state.to_string();

    std::thread::spawn(move || {
        let start = Instant::now();
        loop {
            match listener.accept() {
                Ok((mut stream, _)) => {
                    let _ = stream.set_nonblocking(false);
                    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
                    let mut buffer = [0u8; 4096];
                    let read = stream.read(&mut buffer).unwrap_or(0);
                    let request = String::from_utf8_lossy(&buffer[..read]);
                    let code = oauth::extract_code_from_request(&request, &state);
                    let response = if code.is_some() {
                        callback_success_response()
                    } else {
                        callback_error_response()
                    };
                    let _ = stream.write_all(response.as_bytes());
                    if code.is_some() {
                        let _ = tx.send(code);
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    if start.elapsed() > CALLBACK_TIMEOUT {
                        let _ = tx.send(None);
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(_) => {
                    let _ = tx.send(None);
                    break;
                }
            }
        }
    });

    rx.recv_timeout(CALLBACK_TIMEOUT).ok().flatten()
}

fn callback_success_response() -> String {
    let body = "<!doctype html><html><head><meta charset=\"utf-8\" /><title>Signed in</title></head><body><p>Signed in to eventdeck. You can close this tab and return to your terminal.</p></body></html>";
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn callback_error_response() -> String {
    let body = "Invalid OAuth callback";
    format!(
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

pub fn logout(app: &App) -> Result<()> {
    if app.session.logout()? {
        println!("✓ Logged out");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub async fn whoami(app: &App, verify: bool) -> Result<()> {
    let Some(session) = app.session_handle().current() else {
        println!("Not logged in.");
        return Ok(());
    };

    if verify {
        let user = app
            .session
            .verify()
            .await
            .context("verify session with server")?;
        println!("{} <{}> (id: {}, verified)", user.name, user.email, user.id);
    } else {
        println!(
            "{} <{}> (id: {})",
            session.user.name, session.user.email, session.user.id
        );
    }
    println!("Token: {}", mask_token(&session.token));
    println!("Server: {}", app.api.base_url());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::TcpStream;

    use super::*;

    fn can_bind_localhost() -> bool {
        TcpListener::bind(("127.0.0.1", 0)).is_ok()
    }

    #[test]
    fn test_wait_for_code_ignores_other_paths() {
        if !can_bind_localhost() {
            return;
        }
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            let mut probe = TcpStream::connect(("127.0.0.1", port)).unwrap();
            probe
                .write_all(b"GET /favicon.ico HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .unwrap();
            let mut reply = String::new();
            let _ = probe.read_to_string(&mut reply);
            assert!(reply.starts_with("HTTP/1.1 400"));

            let mut callback = TcpStream::connect(("127.0.0.1", port)).unwrap();
            callback
                .write_all(b"GET /oauth2callback?code=abc&state=st HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .unwrap();
            let mut reply = String::new();
            let _ = callback.read_to_string(&mut reply);
            assert!(reply.starts_with("HTTP/1.1 200"));
        });

        assert_eq!(wait_for_code(listener, "st").as_deref(), Some("abc"));
        client.join().unwrap();
    }

    #[test]
    fn test_callback_responses_have_content_length() {
        let ok = callback_success_response();
        assert!(ok.contains("Content-Length:"));
        assert!(ok.ends_with("</html>"));
        assert!(callback_error_response().ends_with("Invalid OAuth callback"));
    }
}

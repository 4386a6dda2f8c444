//! Server-rendered HTML pages.

use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State},
    http::{header, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tagportal_shared::cards;
use tagportal_shared::protocol::{ServerMessage, WifiMode};

use crate::api::device::send_command;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route(
            "/wifi-config",
            get(wifi_config_form).post(wifi_config_submit),
        )
        .route("/switch-mode", post(switch_mode))
        .route("/card/{index}", get(card_page))
}

const BASE_STYLE: &str = r#"
    :root {
      --primary: #2563eb;
      --secondary: #1e40af;
      --bg: #f8fafc;
      --card-bg: #ffffff;
      --text: #1e293b;
      --text-light: #64748b;
      --warning: #d97706;
      --success: #059669;
    }
    body {
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      line-height: 1.6;
      color: var(--text);
      background-color: var(--bg);
      padding: 20px;
      max-width: 800px;
      margin: 0 auto;
    }
    h1 { color: var(--primary); margin-bottom: 0.5rem; }
    header { text-align: center; margin-bottom: 2rem; padding-bottom: 1rem; border-bottom: 1px solid #e2e8f0; }
    .card { background: var(--card-bg); border-radius: 12px; padding: 2rem; margin-bottom: 2rem; box-shadow: 0 4px 6px -1px rgba(0, 0, 0, 0.1); }
    .tag { display: inline-block; background: #e0f2fe; color: #0369a1; padding: 0.25rem 0.75rem; border-radius: 9999px; font-size: 0.875rem; font-weight: 500; }
    .mode { display: inline-block; padding: 0.5rem 1rem; border-radius: 9999px; font-weight: 600; color: white; }
    .mode-ap { background-color: var(--warning); }
    .mode-client { background-color: var(--success); }
    .btn { display: inline-block; background: var(--primary); color: white; padding: 0.75rem 1.5rem; border-radius: 8px; text-decoration: none; font-weight: 600; margin-top: 1rem; margin-right: 0.5rem; border: none; cursor: pointer; }
    .btn:hover { background: var(--secondary); }
    .btn-warning { background: var(--warning); }
    .btn-secondary { background: var(--text-light); }
    .form-group { margin-bottom: 1.5rem; }
    label { display: block; margin-bottom: 0.5rem; font-weight: 500; }
    input { width: 100%; padding: 0.75rem; border: 1px solid #e2e8f0; border-radius: 8px; font-size: 1rem; }
    footer { text-align: center; margin-top: 3rem; color: var(--text-light); font-size: 0.875rem; }
    .loader { width: 50px; height: 50px; border: 5px solid #e2e8f0; border-top-color: var(--primary); border-radius: 50%; animation: spin 1s linear infinite; margin: 0 auto 2rem; }
    @keyframes spin { to { transform: rotate(360deg); } }
"#;

/// Escapes text for use in HTML content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
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

fn page(title: &str, head_extra: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  {head_extra}
  <style>{BASE_STYLE}</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
    ))
}

/// GET / - Reader status
async fn root(State(state): State<Arc<AppState>>) -> Html<String> {
    let device_state = state.device_state.read().await;
    let is_ap = device_state.network.mode == WifiMode::AccessPoint;
    let ip = device_state
        .network
        .ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "-".into());

    let mut body = String::new();

    body.push_str(&format!(
        r#"<header>
  <h1>RFID Access System</h1>
  <div class="mode {mode_class}">Mode: {mode_label}</div>
  <p>Connected at: {ip}</p>
  <p>Reader: {reader}</p>
</header>
"#,
        mode_class = if is_ap { "mode-ap" } else { "mode-client" },
        mode_label = if is_ap { "Access Point" } else { "WiFi Client" },
        ip = escape_html(&ip),
        reader = if device_state.connected { "online" } else { "offline" },
    ));

    body.push_str("<div class=\"card\">\n  <h2>Current status</h2>\n  <p>");
    match &device_state.active_card {
        Some(active) => body.push_str(&format!(
            "Card detected: <span class=\"tag\">{}</span>",
            escape_html(active.card.uid)
        )),
        None => body.push_str("No card detected"),
    }
    body.push_str("</p>\n");
    if let Some(tag) = &device_state.present_tag {
        body.push_str(&format!(
            "  <p>Tag in field: <span class=\"tag\">{}</span> ({})</p>\n",
            escape_html(&tag.uid.to_string()),
            tag.tag_type
        ));
        if let Some(url) = &tag.ndef_url {
            body.push_str(&format!("  <p>NDEF URL: {}</p>\n", escape_html(url)));
        }
    }
    body.push_str("</div>\n");

    if let Some(active) = &device_state.active_card {
        body.push_str(&format!(
            r#"<div class="card">
  <h2>Available content</h2>
  <a href="{url}" class="btn" target="_blank">Open {name}</a>
  <a href="/card/{index}" class="btn btn-secondary">Redirect page</a>
</div>
"#,
            url = escape_html(active.card.url),
            name = escape_html(active.card.name),
            index = active.index,
        ));
    }

    let wifi_state = if is_ap {
        format!("Access Point mode ({})", state.config.ap_ssid)
    } else {
        let ssid = device_state
            .network
            .ssid
            .clone()
            .unwrap_or_else(|| state.config.client_ssid.clone());
        format!("Connected to {ssid}")
    };
    body.push_str(&format!(
        r#"<div class="card">
  <h2>WiFi configuration</h2>
  <p>Current state: <strong>{wifi_state}</strong></p>
  <a href="/wifi-config" class="btn">Configure WiFi</a>
  <form action="/switch-mode" method="POST" style="display: inline;">
    <button type="submit" class="btn btn-warning">{switch_label}</button>
  </form>
</div>
<footer><p>TagPortal RFID reader</p></footer>
<script>
  setTimeout(function () {{ window.location.reload(); }}, 10000);
</script>
"#,
        wifi_state = escape_html(&wifi_state),
        switch_label = if is_ap { "Try connecting as client" } else { "Switch to AP mode" },
    ));
    drop(device_state);

    page("RFID Reader", "", &body)
}

/// GET /wifi-config - Credentials form
async fn wifi_config_form(State(state): State<Arc<AppState>>) -> Html<String> {
    let body = format!(
        r#"<h1>WiFi configuration</h1>
<div class="card">
  <form action="/wifi-config" method="POST">
    <div class="form-group">
      <label for="ssid">Network name (SSID)</label>
      <input type="text" id="ssid" name="ssid" placeholder="Your WiFi network" value="{ssid}" required>
    </div>
    <div class="form-group">
      <label for="password">Password</label>
      <input type="password" id="password" name="password" placeholder="Your WiFi password" required>
    </div>
    <button type="submit" class="btn">Save configuration</button>
    <a href="/" class="btn btn-secondary">Cancel</a>
  </form>
</div>
"#,
        ssid = escape_html(&state.config.client_ssid),
    );
    page("WiFi configuration", "", &body)
}

#[derive(Debug, Deserialize)]
pub struct WifiForm {
    pub ssid: String,
    pub password: String,
}

/// POST /wifi-config - Forward credentials to the device
async fn wifi_config_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<WifiForm>,
) -> Html<String> {
    let forwarded = send_command(
        &state,
        ServerMessage::ConfigureWifi {
            request_id: uuid::Uuid::new_v4().to_string(),
            ssid: form.ssid.clone(),
            password: form.password,
        },
    )
    .await;

    let note = match forwarded {
        Ok(()) => {
            tracing::info!("Forwarded WiFi credentials for {} to device", form.ssid);
            "The reader will use these credentials on its next station connection."
        }
        Err((_, reason)) => {
            tracing::warn!("WiFi credentials not forwarded: {}", reason);
            "No reader is connected, the credentials were not forwarded."
        }
    };

    let body = format!(
        r#"<div class="card">
  <h1>WiFi configuration received</h1>
  <p>SSID: {ssid}</p>
  <p>{note}</p>
  <p><strong>Note:</strong> credentials are not stored and are lost when the reader restarts.</p>
  <a href="/" class="btn">Back to start</a>
</div>
"#,
        ssid = escape_html(&form.ssid),
    );
    page("WiFi configuration", "", &body)
}

/// POST /switch-mode - Toggle the reader between AP and station mode
async fn switch_mode(State(state): State<Arc<AppState>>) -> Result<Response, (StatusCode, String)> {
    let target = state.device_state.read().await.network.mode.toggled();
    send_command(
        &state,
        ServerMessage::SwitchWifiMode {
            request_id: uuid::Uuid::new_v4().to_string(),
            target,
        },
    )
    .await?;
    tracing::info!("Requested switch to {} mode", target);

    let redirect = (StatusCode::FOUND, [(header::LOCATION, "/")]);
    Ok(redirect.into_response())
}

/// GET /card/{index} - Redirect page for a known card
async fn card_page(Path(index): Path<usize>) -> Result<Html<String>, (StatusCode, String)> {
    let card = cards::get(index)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Card {} not found", index)))?;
    let url = escape_html(card.url);
    let name = escape_html(card.name);

    let head = format!(r#"<meta http-equiv="refresh" content="0;url={url}">"#);
    let body = format!(
        r#"<div style="text-align: center;">
  <div class="loader"></div>
  <h1>Redirecting...</h1>
  <p>You are being sent to: <strong>{name}</strong></p>
  <p>If you are not redirected automatically, <a href="{url}">click here</a></p>
  <p><a href="/">&larr; Back to start</a></p>
</div>
"#
    );
    Ok(page("Redirecting...", &head, &body))
}

/// Fallback for unknown routes
pub async fn not_found(
    method: Method,
    uri: Uri,
    Query(args): Query<Vec<(String, String)>>,
) -> (StatusCode, String) {
    let mut message = format!(
        "Page not found\n\nURI: {}\nMethod: {}\nArguments: {}\n",
        uri.path(),
        method,
        args.len()
    );
    for (name, value) in &args {
        message.push_str(&format!(" {}: {}\n", name, value));
    }
    (StatusCode::NOT_FOUND, message)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tagportal_shared::nfc::Uid;
    use tokio::time::Instant;

    use super::*;
    use crate::api::test_support::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[tokio::test]
    async fn test_root_without_card() {
        let state = test_state();
        let response = send(&state, get_request("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("No card detected"));
        assert!(html.contains("Mode: WiFi Client"));
        assert!(html.contains("Switch to AP mode"));
        assert!(!html.contains("Available content"));
    }

    #[tokio::test]
    async fn test_root_with_active_card() {
        let state = test_state();
        state.device_state.write().await.tag_detected(
            Uid::parse("CB3B90DB").unwrap(),
            None,
            None,
            Instant::now(),
        );
        let response = send(&state, get_request("/")).await;
        let html = body_string(response).await;
        assert!(html.contains(r#"<span class="tag">CB3B90DB</span>"#));
        let link = r#"href="https://futur.upc.edu/ManuelLopezPalma""#;
        assert!(html.contains(link));
        assert!(html.contains("Open FUTUR Manuel Palma"));
    }

    #[tokio::test]
    async fn test_card_page_redirects() {
        let state = test_state();
        let response = send(&state, get_request("/card/1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        let refresh = r#"content="0;url=https://github.com/pau-lozano-danes""#;
        assert!(html.contains(refresh));

        let response = send(&state, get_request("/card/9")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wifi_form_and_submit_escape_input() {
        let state = test_state();
        let response = send(&state, get_request("/wifi-config")).await;
        assert!(body_string(response).await.contains(r#"name="ssid""#));

        let response = send(
            &state,
            Request::post("/wifi-config")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("ssid=%3Cb%3Enet&password=secret"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("SSID: &lt;b&gt;net"));
        assert!(html.contains("not forwarded"));
        assert!(!html.contains("secret"));
    }

    #[tokio::test]
    async fn test_switch_mode_redirects_when_device_connected() {
        let state = test_state();
        let response = send(&state, post_request("/switch-mode")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        {
            let mut inner = state.device_state.write().await;
            inner.connected = true;
            inner.command_tx = Some(tx);
        }
        let response = send(&state, post_request("/switch-mode")).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::SwitchWifiMode {
                target: WifiMode::AccessPoint,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_not_found_lists_arguments() {
        let state = test_state();
        let response = send(&state, get_request("/missing?a=1&b=two")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let text = body_string(response).await;
        assert!(text.contains("URI: /missing"));
        assert!(text.contains("Method: GET"));
        assert!(text.contains("Arguments: 2"));
        assert!(text.contains(" b: two"));
    }
}

use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use std::path::Path;

/// On-disk directory checked before falling back to the built-in assets.
pub const STATIC_ROOT: &str = "static";

/// Browser-side polling hooks. `updateValues` is inert; `stopUpdates` clears
/// `window.updateInterval` when a page ever set one.
pub fn polling_script() -> &'static str {
    r#"// FAIR EVA polling hooks (no refresh protocol defined)
(function(global) {
  function updateValues() {}

  function stopUpdates() {
    if (global.updateInterval) {
      clearInterval(global.updateInterval);
      global.updateInterval = null;
    }
  }

  global.updateValues = updateValues;
  global.stopUpdates = stopUpdates;
})(window);
"#
}

/// Minimal `$` helper: first match only, text get/set.
pub fn selector_script() -> &'static str {
    r#"// FAIR EVA selector helper
(function(global) {
  function $(selector) {
    const el = document.querySelector(selector);
    return {
      text(value) {
        if (value === undefined) {
          return el ? el.textContent : undefined;
        }
        if (el) {
          el.textContent = value;
        }
        return this;
      },
    };
  }

  global.$ = global.$ || $;
})(window);
"#
}

pub fn theme_css() -> &'static str {
    r#":root {
  --fair-bg: #f5f7fa;
  --fair-fg: #1f2d3d;
  --fair-accent: #005a9c;
  --fair-track: #e6e9ef;
}

body {
  margin: 0;
  font-family: "Helvetica Neue", Arial, sans-serif;
  background: var(--fair-bg);
  color: var(--fair-fg);
}

nav.topbar {
  display: flex;
  align-items: center;
  gap: 1rem;
  padding: 0.75rem 1.5rem;
  background: #fff;
  border-bottom: 3px solid var(--fair-accent);
}

nav.topbar img { height: 40px; }

main { max-width: 1100px; margin: 0 auto; padding: 1.5rem; }

.card {
  background: #fff;
  border-radius: 6px;
  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.08);
  padding: 1rem 1.25rem;
  margin-bottom: 1rem;
}

.areas { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 1rem; }

.progress {
  height: 14px;
  background: var(--fair-track);
  border-radius: 7px;
  overflow: hidden;
}

.fair-progress { height: 100%; width: 0; }

.chart canvas { max-width: 360px; margin: 0 auto; display: block; }

.form-error { color: #E74C3C; }

.indicator-messages { font-size: 0.9rem; color: #52606d; }
"#
}

pub async fn serve_polling_js() -> Response {
    serve_asset("js/polling.js", polling_script(), "application/javascript").await
}

pub async fn serve_selector_js() -> Response {
    serve_asset("js/selector.js", selector_script(), "application/javascript").await
}

pub async fn serve_theme_css() -> Response {
    serve_asset("css/theme.css", theme_css(), "text/css").await
}

async fn serve_asset(relative: &str, builtin: &'static str, content_type: &'static str) -> Response {
    let body = match tokio::fs::read_to_string(Path::new(STATIC_ROOT).join(relative)).await {
        Ok(contents) => contents,
        Err(_) => builtin.to_string(),
    };
    let mut resp = body.into_response();
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

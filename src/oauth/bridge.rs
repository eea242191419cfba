//! Bridge pages
//!
//! The only client-executed logic in the system: a minimal document that
//! delivers the result to the window that opened the popup and then gets
//! out of the way.
//!
//! Delivery contract (keep stable for the editor):
//! - success: `{type: "authorization:github", token}` posted to this
//!   service's own origin, never a wildcard
//! - failure: `{type: "authorization:github", error}` posted the same way
//! - no opener/parent reference: navigate to the admin UI with
//!   `auth:github:success:<token>` in the URL fragment, so the token never
//!   reaches a server log

/// Error kind delivered when the provider refuses the exchange.
pub(crate) const ERROR_EXCHANGE_FAILED: &str = "token_exchange_failed";

/// Render the bridge page that hands the access token to the opener.
pub(crate) fn success_page(origin: &str, admin_path: &str, token: &str) -> String {
    let token_js = js_string(token);
    let origin_js = js_string(origin);
    let fallback_js = js_string(&format!(
        "{origin}{admin_path}#auth:github:success:{}",
        urlencoding::encode(token)
    ));

    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Authenticating…</title></head>
<body>
<script>
(function () {{
  var token = {token_js};
  var targetOrigin = {origin_js};
  var parentWin = window.opener || window.parent;

  var noOpener = false;
  try {{ noOpener = !parentWin || parentWin === window; }} catch (e) {{ noOpener = true; }}

  if (noOpener) {{
    window.location = {fallback_js};
    return;
  }}

  try {{ parentWin.focus(); }} catch (e) {{}}
  try {{
    parentWin.postMessage({{ type: 'authorization:github', token: token }}, targetOrigin);
  }} catch (e) {{}}
  setTimeout(function () {{ try {{ window.close(); }} catch (e) {{}} }}, 80);
}})();
</script>
<p>You can close this window.</p>
</body>
</html>"#
    )
}

/// Render the bridge page that reports a failed exchange.
///
/// No provider diagnostics reach this page; the opener only learns the
/// error kind.
pub(crate) fn error_page(origin: &str, error_kind: &str) -> String {
    let kind_js = js_string(error_kind);
    let origin_js = js_string(origin);

    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Authentication failed</title></head>
<body>
<script>
(function () {{
  var parentWin = window.opener || window.parent;
  try {{
    parentWin.postMessage({{ type: 'authorization:github', error: {kind_js} }}, {origin_js});
  }} catch (e) {{}}
}})();
</script>
<p>Authentication failed. You can close this window.</p>
</body>
</html>"#
    )
}

/// Embed a value as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_page_embeds_token_as_json_string() {
        let page = success_page("https://cms.example.com", "/admin/", r#"to"ken"#);

        assert!(page.contains(r#"var token = "to\"ken";"#));
    }

    #[test]
    fn success_page_targets_the_configured_origin_only() {
        let page = success_page("https://cms.example.com", "/admin/", "abc123");

        assert!(page.contains(r#"var targetOrigin = "https://cms.example.com";"#));
        assert!(!page.contains("'*'"));
        assert!(!page.contains(r#", "*")"#));
    }

    #[test]
    fn success_page_fallback_puts_the_token_in_the_fragment() {
        let page = success_page("https://cms.example.com", "/admin/", "a b+c");

        assert!(page.contains("https://cms.example.com/admin/#auth:github:success:a%20b%2Bc"));
        assert!(!page.contains("?auth:github:success"));
    }

    #[test]
    fn error_page_reports_the_kind_and_nothing_else() {
        let page = error_page("https://cms.example.com", ERROR_EXCHANGE_FAILED);

        assert!(page.contains(r#"error: "token_exchange_failed""#));
        assert!(page.contains(r#""https://cms.example.com""#));
        assert!(!page.contains("token:"));
    }
}

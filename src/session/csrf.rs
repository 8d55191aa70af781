//! CSRF scraping and the credential exchange.
//!
//! The login form is protected by a Rails-style anti-forgery token published
//! in two meta tags:
//!
//! ```text
//! <meta name="csrf-param" content="authenticity_token" />
//! <meta name="csrf-token" content="3q2+7w==" />
//! ```
//!
//! [`extract_csrf`] pulls both values out with a small tag-attribute scan,
//! and [`bootstrap`] runs the two-request login exchange over a cookie-jar
//! bound client so the resulting session cookie lands in the jar.

use reqwest::Client;
use tracing::debug;

use crate::error::LoginError;

use super::Credentials;

/// Meta tag name carrying the form field name.
pub const CSRF_PARAM_META: &str = "csrf-param";

/// Meta tag name carrying the token value.
pub const CSRF_TOKEN_META: &str = "csrf-token";

/// Anti-forgery field scraped from the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    /// Form field name the token must be posted under
    pub param: String,

    /// Token value
    pub token: String,
}

/// Extract the CSRF parameter name and token from login page markup.
///
/// Fails with [`LoginError::MissingCsrfToken`] naming the first meta tag that
/// is absent.
pub fn extract_csrf(html: &str) -> Result<CsrfToken, LoginError> {
    let mut param = None;
    let mut token = None;

    for attrs in meta_tags(html) {
        let name = attribute(&attrs, "name");
        let content = attribute(&attrs, "content");
        match (name, content) {
            (Some(CSRF_PARAM_META), Some(value)) if param.is_none() => {
                param = Some(value.to_string())
            }
            (Some(CSRF_TOKEN_META), Some(value)) if token.is_none() => {
                token = Some(value.to_string())
            }
            _ => {}
        }
    }

    Ok(CsrfToken {
        param: param.ok_or(LoginError::MissingCsrfToken(CSRF_PARAM_META))?,
        token: token.ok_or(LoginError::MissingCsrfToken(CSRF_TOKEN_META))?,
    })
}

/// Run the login exchange: fetch the login page, scrape the CSRF token, and
/// post the credentials to the session endpoint.
///
/// Both requests go through `client`, so it must be bound to the session's
/// cookie jar. The response body of the credential post is not inspected;
/// the cookies it sets are the only effect.
pub async fn bootstrap(client: &Client, credentials: &Credentials) -> Result<(), LoginError> {
    let page = client.get(credentials.login_url()).send().await?;
    if !page.status().is_success() {
        return Err(LoginError::Rejected {
            stage: "login page",
            status: page.status().as_u16(),
        });
    }

    let html = page.text().await?;
    let csrf = extract_csrf(&html)?;
    debug!(param = %csrf.param, "Found CSRF token on login page");

    let form = [
        (csrf.param.as_str(), csrf.token.as_str()),
        ("email", credentials.email()),
        ("password", credentials.password()),
    ];
    let response = client
        .post(credentials.session_url())
        .form(&form)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(LoginError::Rejected {
            stage: "credential submission",
            status: response.status().as_u16(),
        });
    }

    Ok(())
}

fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Collect the attributes of every `<meta>` tag in document order.
fn meta_tags(html: &str) -> Vec<Vec<(String, String)>> {
    const OPEN: &str = "<meta";

    // ASCII lowercasing keeps byte offsets identical to `html`.
    let lower = html.to_ascii_lowercase();
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(found) = lower[pos..].find(OPEN) {
        let start = pos + found + OPEN.len();
        let rest = &html[start..];

        // Skip things like <metadata>
        let at_boundary = rest
            .bytes()
            .next()
            .is_some_and(|b| b.is_ascii_whitespace() || b == b'/' || b == b'>');
        if !at_boundary {
            pos = start;
            continue;
        }

        let (attrs, consumed) = parse_attributes(rest);
        tags.push(attrs);
        pos = start + consumed;
    }

    tags
}

/// Parse `key="value"` pairs up to and including the closing `>`.
///
/// Returns the attributes (keys lowercased) and the number of bytes consumed.
fn parse_attributes(s: &str) -> (Vec<(String, String)>, usize) {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut attrs = Vec::new();
    let mut i = 0;

    loop {
        while i < len && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= len {
            return (attrs, i);
        }
        if bytes[i] == b'>' {
            return (attrs, i + 1);
        }

        let name_start = i;
        while i < len && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = s[name_start..i].to_ascii_lowercase();

        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = String::new();
        if i < len && bytes[i] == b'=' {
            i += 1;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < len && bytes[i] != quote {
                    i += 1;
                }
                value = decode_entities(&s[value_start..i]);
                if i < len {
                    i += 1;
                }
            } else {
                let value_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                value = decode_entities(&s[value_start..i]);
            }
        }

        attrs.push((name, value));
    }
}

/// Decode the handful of character references that show up in attribute values.
fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

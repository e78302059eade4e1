use http::{header, HeaderMap, HeaderName, HeaderValue};

use super::credentials::Credentials;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/124.0.0.0 Safari/537.36";

pub const APP_USER_AGENT: &str = "Instagram 275.0.0.27.98 Android (33/13; 420dpi; 1080x2400; \
                                  samsung; SM-G991B; o1s; exynos2100; en_US; 458229237)";

pub const IG_APP_ID: &str = "936619743392459";

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

/// Headers of a desktop browser loading a page
#[must_use]
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(BROWSER_USER_AGENT),
    );
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );

    headers
}

/// Headers of the website's own XHR calls, without a session
#[must_use]
pub fn web_api_headers() -> HeaderMap {
    let mut headers = browser_headers();

    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    insert(&mut headers, "x-ig-app-id", IG_APP_ID);
    insert(&mut headers, "x-requested-with", "XMLHttpRequest");

    headers
}

/// Same as [`web_api_headers`], carrying the session cookies
#[must_use]
pub fn authenticated_web_headers(credentials: &Credentials) -> HeaderMap {
    let mut headers = web_api_headers();

    insert(&mut headers, "x-csrftoken", &credentials.csrf_token);
    if let Ok(cookie) = HeaderValue::from_str(&credentials.cookie_header()) {
        headers.insert(header::COOKIE, cookie);
    }

    headers
}

/// Headers of the mobile app talking to the private API
#[must_use]
pub fn app_headers(credentials: &Credentials) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(header::USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US"),
    );
    insert(&mut headers, "x-ig-app-id", IG_APP_ID);
    insert(&mut headers, "x-csrftoken", &credentials.csrf_token);

    if let Some(device_id) = &credentials.device_id {
        insert(&mut headers, "x-ig-device-id", device_id);
    }

    if let Some(install_id) = &credentials.install_id {
        insert(&mut headers, "x-mid", install_id);
    }

    if let Ok(cookie) = HeaderValue::from_str(&credentials.cookie_header()) {
        headers.insert(header::COOKIE, cookie);
    }

    headers
}

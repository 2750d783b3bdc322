use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Create the session cookie. The private jar encrypts the value on `add`.
pub(super) fn session_cookie(
    name: &str,
    value: String,
    ttl_days: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::days(ttl_days))
        .build()
}

/// Create an already-expired session cookie.
pub(super) fn clear_session_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

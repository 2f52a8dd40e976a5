use std::path::PathBuf;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tower::ServiceExt;

use super::*;
use crate::routes::guard::CookieSession;
use crate::state::test_helpers::strict_state;

/// Static page directory with an admin index and a sign-in page.
fn static_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("storefront-gate-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("admin")).unwrap();
    std::fs::create_dir_all(dir.join("auth")).unwrap();
    std::fs::write(dir.join("admin/index.html"), "<h1>console</h1>").unwrap();
    std::fs::write(dir.join("auth/sign-in"), "<h1>sign in</h1>").unwrap();
    dir
}

#[tokio::test]
async fn healthz_ok() {
    let app = app(strict_state(), &static_dir("health"));
    let res = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_admin_page_redirects_to_sign_in() {
    let app = app(strict_state(), &static_dir("anon"));
    let res = app
        .oneshot(Request::get("/admin/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        res.headers().get(header::LOCATION).unwrap(),
        "/auth/sign-in?returnUrl=%2Fadmin%2F"
    );
}

#[tokio::test]
async fn non_canonical_admin_paths_are_still_guarded() {
    let dir = static_dir("canonical");
    for path in ["/%61dmin/", "//admin/", "/./admin/", "/x/../admin/", "/%2Fadmin/"] {
        let res = app(strict_state(), &dir)
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
    }
}

#[tokio::test]
async fn non_canonical_shopper_path_is_guarded() {
    let res = app(strict_state(), &static_dir("canonical-cart"))
        .oneshot(Request::get("/%63art").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn sign_in_page_is_served_without_cookies() {
    let app = app(strict_state(), &static_dir("signin"));
    let res = app
        .oneshot(Request::get("/auth/sign-in").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn bridged_cookies_open_the_admin_console() {
    let dir = static_dir("roundtrip");

    let post = Request::post(session::cookies::SESSION_BRIDGE_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"accessToken":"t","role":"ADMIN"}"#))
        .unwrap();
    let res = app(strict_state(), &dir).oneshot(post).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Replay the Set-Cookie values the way a browser would.
    let cookie_header = res
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| {
            let cookie = Cookie::parse(v.to_str().unwrap().to_owned()).unwrap();
            format!("{}={}", cookie.name(), cookie.value())
        })
        .collect::<Vec<_>>()
        .join("; ");

    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(&cookie_header).unwrap());
    let seen = CookieSession::from_jar(&CookieJar::from_headers(&headers));
    assert!(seen.is_authenticated());
    assert_eq!(seen.role, Some(session::Role::Admin));

    let get = Request::get("/admin/")
        .header(header::COOKIE, cookie_header)
        .body(Body::empty())
        .unwrap();
    let res = app(strict_state(), &dir).oneshot(get).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

use snippetbox::{
    middleware, App, Config, Request, Response, SnippetModel, SnippetStore, TemplateCache,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

/// 返回 App、底层存储以及可拨动的时钟
fn build_app() -> (App, Arc<SnippetModel>, Arc<Mutex<DateTime<Utc>>>) {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let now = Arc::new(Mutex::new(start()));
    let clock_now = Arc::clone(&now);
    let model = Arc::new(
        SnippetModel::open_in_memory()
            .unwrap()
            .with_clock(Box::new(move || *clock_now.lock().unwrap())),
    );
    let config = Config::new().with_static_dir(&root.join("ui/static").to_string_lossy());
    let templates = TemplateCache::new(root.join("ui/html")).unwrap();
    let app = App::new(&config, templates, model.clone());
    (app, model, now)
}

fn send(app: &App, raw: &str) -> Response {
    let request = Request::try_from(raw.as_bytes(), 1).unwrap();
    middleware::serve_request(app, &request, 1)
}

fn get(app: &App, path: &str) -> Response {
    send(app, &format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path))
}

fn text(response: &Response) -> String {
    String::from_utf8_lossy(response.body()).to_string()
}

#[test]
fn test_view_shows_human_dates() {
    let (app, model, _) = build_app();
    let id = model.insert("Frog", "An old silent pond", 7).unwrap();

    let html = text(&get(&app, &format!("/snippet/view/{}", id)));

    assert!(html.contains("01 Mar 2024 at 09:30"));
    assert!(html.contains("08 Mar 2024 at 09:30"));
}

#[test]
fn test_expired_snippet_disappears() {
    let (app, model, now) = build_app();
    let id = model.insert("Short", "Gone tomorrow", 1).unwrap();
    let path = format!("/snippet/view/{}", id);

    assert_eq!(get(&app, &path).status_code(), 200);

    *now.lock().unwrap() = start() + Duration::days(1);
    assert_eq!(get(&app, &path).status_code(), 404);
    assert!(!text(&get(&app, "/")).contains("Short"));
}

#[test]
fn test_user_content_is_escaped() {
    let (app, model, _) = build_app();
    let id = model
        .insert("<script>alert(1)</script>", "<b>bold</b>", 365)
        .unwrap();

    let view = text(&get(&app, &format!("/snippet/view/{}", id)));
    let home = text(&get(&app, "/"));

    for html in [view, home] {
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}

#[test]
fn test_home_shows_ten_most_recent() {
    let (app, model, now) = build_app();
    for i in 0..12 {
        *now.lock().unwrap() = start() + Duration::minutes(i);
        model.insert(&format!("haiku number {:02}", i), "text", 7).unwrap();
    }

    let html = text(&get(&app, "/"));

    assert_eq!(html.matches("haiku number").count(), 10);
    assert!(html.contains("haiku number 11"));
    assert!(!html.contains("haiku number 01"));
    let newest = html.find("haiku number 11").unwrap();
    let older = html.find("haiku number 10").unwrap();
    assert!(newest < older);
}

#[test]
fn test_create_post_persists_snippet() {
    let (app, model, _) = build_app();
    let body = "title=Over+the+wintry&content=forest%2C+winds+howl+in+rage&expires=365";
    let raw = format!(
        "POST /snippet/create HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\n\
         Content-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );

    let response = send(&app, &raw);

    assert_eq!(response.status_code(), 303);
    let id: i64 = response
        .location()
        .and_then(|l| l.strip_prefix("/snippet/view/"))
        .and_then(|id| id.parse().ok())
        .unwrap();
    let snippet = model.get(id).unwrap();
    assert_eq!(snippet.title, "Over the wintry");
    assert_eq!(snippet.content, "forest, winds howl in rage");
    assert_eq!(snippet.expires, start() + Duration::days(365));
}

#[test]
fn test_static_files_and_headers() {
    let (app, _, _) = build_app();

    let css = get(&app, "/static/css/main.css");
    assert_eq!(css.status_code(), 200);
    assert_eq!(css.content_type(), Some("text/css;charset=utf-8"));
    assert_eq!(css.header("X-Frame-Options"), Some("deny"));

    let js = get(&app, "/static/js/main.js");
    assert_eq!(js.content_type(), Some("text/javascript;charset=utf-8"));

    // 第二次读取命中缓存，内容一致
    assert_eq!(get(&app, "/static/css/main.css").body(), css.body());

    assert_eq!(get(&app, "/static/").status_code(), 404);
    assert_eq!(get(&app, "/static/img/missing.png").status_code(), 404);
}

#[test]
fn test_error_pages_have_security_headers() {
    let (app, _, _) = build_app();

    let response = get(&app, "/snippet/view/abc");

    assert_eq!(response.status_code(), 404);
    assert!(text(&response).contains("Not Found"));
    assert_eq!(response.header("X-Content-Type-Options"), Some("nosniff"));
    assert_eq!(response.header("Referrer-Policy"), Some("origin-when-cross-origin"));
}

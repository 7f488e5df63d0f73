//! End-to-end behaviour through `Engine::handle`.

use gantry_core::{handler, Context, Engine, FileSystem, Method, Request, Response};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn get(engine: &Engine, path: &str) -> Response {
    engine.handle(Request::new(Method::Get, path))
}

fn recorder(log: &Log, name: &'static str) -> impl Fn(&mut Context<'_>) + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |ctx: &mut Context<'_>| {
        log.lock().unwrap().push(format!("{name}:before"));
        ctx.next();
        log.lock().unwrap().push(format!("{name}:after"));
    }
}

#[test]
fn test_hello_name() {
    let mut engine = Engine::new();
    engine.get("/hello/:name", |c| {
        let body = format!("hello, {}", c.param("name"));
        c.string(200, body);
    });

    let resp = get(&engine, "/hello/world");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.body_string(), "hello, world");
}

#[test]
fn test_custom_no_route() {
    let mut engine = Engine::new();
    engine.no_route(vec![handler(|c| {
        c.json(404, &serde_json::json!({ "message": "not found" }));
    })]);

    let resp = get(&engine, "/missing");
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.body_string(), r#"{"message":"not found"}"#);
}

#[test]
fn test_group_middleware_ordering() {
    let log: Log = Arc::default();
    let mut engine = Engine::new();
    engine.group("/").use_middleware(recorder(&log, "A"));
    engine.group("/api").use_middleware(recorder(&log, "B"));
    let handler_log = Arc::clone(&log);
    engine.get("/api/x", move |c| {
        handler_log.lock().unwrap().push("handler".to_string());
        c.string(200, "x");
    });

    let resp = get(&engine, "/api/x");
    assert_eq!(resp.status(), 200);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["A:before", "B:before", "handler", "B:after", "A:after"]
    );
}

#[test]
fn test_fail_skips_rest_for_every_position() {
    for k in 0..4 {
        let calls: Log = Arc::default();
        let mut engine = Engine::new();
        for i in 0..3 {
            let calls = Arc::clone(&calls);
            engine.use_middleware(move |c| {
                calls.lock().unwrap().push(format!("m{i}"));
                if i == k {
                    c.fail(403, "stop");
                }
            });
        }
        let route_calls = Arc::clone(&calls);
        engine.get("/", move |c| {
            route_calls.lock().unwrap().push("route".to_string());
            if k == 3 {
                c.fail(403, "stop");
            }
        });

        let resp = get(&engine, "/");
        assert_eq!(resp.status(), 403);
        assert_eq!(resp.body_string(), r#"{"message":"stop"}"#);

        let seen = calls.lock().unwrap().clone();
        assert_eq!(seen.len(), k + 1, "k = {k}: {seen:?}");
    }
}

#[test]
fn test_literal_beats_param() {
    let mut engine = Engine::new();
    engine.get("/user/new", |c| c.string(200, "literal"));
    engine.get("/user/:id", |c| {
        let body = format!("id={}", c.param("id"));
        c.string(200, body);
    });

    assert_eq!(get(&engine, "/user/new").body_string(), "literal");
    assert_eq!(get(&engine, "/user/42").body_string(), "id=42");
}

#[test]
fn test_wildcard_capture_and_full_path() {
    let mut engine = Engine::new();
    engine.get("/assets/*filepath", |c| {
        let body = format!("{} via {}", c.param("filepath"), c.full_path().unwrap_or("-"));
        c.string(200, body);
    });

    let resp = get(&engine, "/assets/css/a.css");
    assert_eq!(resp.body_string(), "css/a.css via /assets/*filepath");
}

#[test]
fn test_prefix_only_is_a_miss() {
    let mut engine = Engine::new();
    engine.get("/a/b/c", |c| c.string(200, "deep"));

    assert_eq!(get(&engine, "/a/b").status(), 404);
    assert_eq!(get(&engine, "/a/b/c").status(), 200);
}

#[test]
fn test_reregistration_overwrites() {
    let mut engine = Engine::new();
    engine.get("/v", |c| c.string(200, "first"));
    engine.get("/v", |c| c.string(200, "second"));

    assert_eq!(get(&engine, "/v").body_string(), "second");
    assert_eq!(engine.routes().len(), 1);
}

#[test]
fn test_static_mount_and_miss() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css/site.css"), "body{}").unwrap();

    let mut engine = Engine::new();
    engine.group("/v1").static_dir("/assets", dir.path());
    engine.no_route(vec![handler(|c| c.string(404, "custom miss"))]);

    let resp = get(&engine, "/v1/assets/css/site.css");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.body_string(), "body{}");
    assert_eq!(resp.header("content-type"), Some("text/css; charset=utf-8"));

    let resp = engine.handle(Request::new(Method::Head, "/v1/assets/css/site.css"));
    assert_eq!(resp.status(), 200);

    let resp = get(&engine, "/v1/assets/css/missing.css");
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.body_string(), "custom miss");

    let resp = get(&engine, "/v1/assets/../secret");
    assert_eq!(resp.status(), 404);
}

#[test]
fn test_static_miss_without_handlers_gets_default_body() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = Engine::new();
    engine.static_dir("/files", dir.path());

    let resp = get(&engine, "/files/nothing.txt");
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.body_string(), "404 page not found");
}

#[test]
fn test_method_not_allowed_lists_methods() {
    let mut engine = Engine::new();
    engine.handle_method_not_allowed(true);
    engine.post("/items", |c| c.string(201, "made"));
    engine.head("/items", |c| c.status(200));

    let resp = get(&engine, "/items");
    assert_eq!(resp.status(), 405);
    assert_eq!(resp.header("allow"), Some("POST, HEAD"));
    assert_eq!(resp.body_string(), "405 method not allowed");
}

#[test]
fn test_global_middleware_runs_for_misses() {
    let log: Log = Arc::default();
    let mut engine = Engine::new();
    engine.no_route(vec![handler(|c| c.string(404, "gone"))]);
    engine.use_middleware(recorder(&log, "G"));

    let resp = get(&engine, "/nowhere");
    assert_eq!(resp.body_string(), "gone");
    assert_eq!(*log.lock().unwrap(), vec!["G:before", "G:after"]);
}

#[test]
fn test_html_rendering() {
    let mut engine = Engine::new();
    engine
        .add_template("greet.html", "<h1>Hi {{ name }}</h1>")
        .unwrap();
    engine.get("/greet/:name", |c| {
        let name = c.param("name").to_string();
        c.html(200, "greet.html", serde_json::json!({ "name": name }));
    });

    let resp = get(&engine, "/greet/sam");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.body_string(), "<h1>Hi sam</h1>");
    assert_eq!(resp.header("content-type"), Some("text/html"));
}

struct MemoryFs {
    files: HashMap<&'static str, &'static str>,
}

impl FileSystem for MemoryFs {
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        self.files
            .get(path)
            .map(|body| Box::new(Cursor::new(body.as_bytes())) as Box<dyn Read + Send>)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not in memory"))
    }
}

#[test]
fn test_static_fs_custom_filesystem() {
    let memory = MemoryFs {
        files: HashMap::from([("js/app.js", "run()")]),
    };
    let mut engine = Engine::new();
    engine.group("/ui").static_fs("/bundle", memory);
    engine.no_route(vec![handler(|c| {
        let body = serde_json::json!({ "missing": c.param("filepath") });
        c.json(404, &body);
    })]);

    let resp = get(&engine, "/ui/bundle/js/app.js");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.body_string(), "run()");
    assert_eq!(resp.header("content-type"), Some("application/javascript"));

    let resp = get(&engine, "/ui/bundle/js/other.js");
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.body_string(), r#"{"missing":"js/other.js"}"#);
}

#[test]
fn test_load_html_dir_then_render() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("pages")).unwrap();
    fs::write(dir.path().join("pages/about.html"), "<p>{{ who }}</p>").unwrap();

    let mut engine = Engine::new();
    assert_eq!(engine.load_html_dir(dir.path()).unwrap(), 1);
    engine.get("/about", |c| {
        c.html(200, "pages/about.html", serde_json::json!({ "who": "us" }));
    });

    let resp = get(&engine, "/about");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.body_string(), "<p>us</p>");
}

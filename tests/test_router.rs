use std::sync::{Arc, Mutex};

use vigil::http::request::RequestBuilder;
use vigil::http::response::Response;
use vigil::http::router::{handler_fn, HandlerFn, Middleware, Router};

fn ok_handler(body: &'static str) -> HandlerFn {
    handler_fn(move |_req| async move { Response::text(200, body) })
}

/// Middleware that records its prologue and epilogue into a shared trace.
fn tracing_step(name: &'static str, trace: Arc<Mutex<Vec<String>>>) -> Middleware {
    Arc::new(move |next: HandlerFn| {
        let trace = trace.clone();
        Arc::new(move |req| {
            let trace = trace.clone();
            let next = next.clone();
            Box::pin(async move {
                trace.lock().unwrap().push(format!("{}-before", name));
                let resp = next(req).await;
                trace.lock().unwrap().push(format!("{}-after", name));
                resp
            })
        })
    })
}

#[tokio::test]
async fn test_register_and_lookup() {
    let router = Router::new();
    router.register("GET", "/items", ok_handler("items"));

    assert!(router.lookup("GET", "/items").is_some());
    assert!(router.lookup("get", "/items").is_some());
    assert!(router.lookup("POST", "/items").is_none());
    assert!(router.lookup("GET", "/other").is_none());
}

#[tokio::test]
async fn test_resolve_invokes_handler() {
    let router = Router::new();
    router.register("GET", "/hello", ok_handler("hello"));

    let handler = router.resolve("GET", "/hello").unwrap();
    let resp = handler(RequestBuilder::new("GET", "/hello").build()).await;

    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.body, b"hello");
}

#[tokio::test]
async fn test_resolve_applies_middleware_outermost_first() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new();

    router.use_middleware(tracing_step("first", trace.clone()));
    router.use_middleware(tracing_step("second", trace.clone()));
    router.register(
        "GET",
        "/traced",
        handler_fn({
            let trace = trace.clone();
            move |_req| {
                let trace = trace.clone();
                async move {
                    trace.lock().unwrap().push("handler".to_string());
                    Response::new()
                }
            }
        }),
    );

    let handler = router.resolve("GET", "/traced").unwrap();
    handler(RequestBuilder::new("GET", "/traced").build()).await;

    let events = trace.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "first-before",
            "second-before",
            "handler",
            "second-after",
            "first-after",
        ]
    );
}

#[tokio::test]
async fn test_middleware_can_short_circuit() {
    let router = Router::new();
    router.use_middleware(Arc::new(|_next: HandlerFn| {
        let short: HandlerFn = Arc::new(|_req| {
            Box::pin(async {
                let mut resp = Response::new();
                resp.set_status(401);
                resp.write_string("denied");
                resp
            })
        });
        short
    }));
    router.register("GET", "/guarded", ok_handler("secret"));

    let handler = router.resolve("GET", "/guarded").unwrap();
    let resp = handler(RequestBuilder::new("GET", "/guarded").build()).await;

    assert_eq!(resp.status_code, 401);
    assert_eq!(resp.body, b"denied");
}

#[test]
fn test_allowed_methods_sorted_and_deduplicated() {
    let router = Router::new();
    router.register("post", "/users", ok_handler("a"));
    router.register("GET", "/users", ok_handler("b"));
    router.register("DELETE", "/users", ok_handler("c"));
    router.register("GET", "/users", ok_handler("d"));
    router.register("GET", "/other", ok_handler("e"));

    assert_eq!(router.allowed_methods("/users"), vec!["DELETE", "GET", "POST"]);
    assert_eq!(router.allowed_methods("/other"), vec!["GET"]);
    assert!(router.allowed_methods("/missing").is_empty());
}

#[test]
fn test_allowed_methods_requires_full_path_match() {
    let router = Router::new();
    router.register("GET", "/api/users", ok_handler("a"));

    assert!(router.allowed_methods("/users").is_empty());
    assert_eq!(router.allowed_methods("/api/users"), vec!["GET"]);
}

#[tokio::test]
async fn test_resolve_snapshot_ignores_later_middleware() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new();
    router.register("GET", "/snap", ok_handler("snap"));

    let before = router.resolve("GET", "/snap").unwrap();
    router.use_middleware(tracing_step("late", trace.clone()));

    before(RequestBuilder::new("GET", "/snap").build()).await;
    assert!(trace.lock().unwrap().is_empty());

    let after = router.resolve("GET", "/snap").unwrap();
    after(RequestBuilder::new("GET", "/snap").build()).await;
    assert_eq!(trace.lock().unwrap().len(), 2);
}

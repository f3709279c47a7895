//! End-to-end tests for HttpExecutor against a local server.
//!
//! The server is bound to a random port and echoes back the method, headers
//! and body it received, so assertions are made on what actually went over
//! the wire.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use axum::response::AppendHeaders;
use axum::routing::{any, get};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use courier_executor::{ErrorKind, ExecutionContext, Executor, ExecutorError, ExecutorRegistry};
use courier_executor_http::{DefaultExecutors, HttpExecutor, HttpOutput};
use courier_task::Task;
use courier_template::{TemplateError, TemplateRenderer};

async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
  let headers: serde_json::Map<String, Value> = headers
    .iter()
    .map(|(name, value)| {
      (
        name.as_str().to_string(),
        Value::String(value.to_str().unwrap_or_default().to_string()),
      )
    })
    .collect();

  Json(json!({
    "method": method.as_str(),
    "headers": headers,
    "body": String::from_utf8_lossy(&body),
  }))
}

async fn cookies() -> (AppendHeaders<[(&'static str, &'static str); 2]>, &'static str) {
  (
    AppendHeaders([("set-cookie", "a=1"), ("set-cookie", "b=2")]),
    "ok",
  )
}

struct TestServer {
  addr: SocketAddr,
  hits: Arc<AtomicUsize>,
}

impl TestServer {
  fn url(&self, path: &str) -> String {
    format!("http://{}{}", self.addr, path)
  }

  fn hits(&self) -> usize {
    self.hits.load(Ordering::SeqCst)
  }
}

async fn start_server() -> TestServer {
  let hits = Arc::new(AtomicUsize::new(0));
  let counter = hits.clone();

  let app = Router::new()
    .route("/hello", get(|| async { "Hello, World!" }))
    .route("/echo", any(echo))
    .route("/cookies", get(cookies))
    .route(
      "/slow",
      get(|| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        "too late"
      }),
    )
    .route(
      "/count",
      get(move || {
        let counter = counter.clone();
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          "counted"
        }
      }),
    );

  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  TestServer { addr, hits }
}

/// Server that sends the response head and a partial body, then stalls.
async fn start_stalled_body_server() -> SocketAddr {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut buf = [0u8; 4096];
    let _ = socket.read(&mut buf).await;
    socket
      .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\npartial")
      .await
      .unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
  });
  addr
}

/// Cancel the context's token after `delay`.
fn cancel_after(ctx: &ExecutionContext, delay: Duration) {
  let cancel = ctx.cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(delay).await;
    cancel.cancel();
  });
}

fn http_task(input: Value) -> Task {
  Task::new("task1", "http").with_input(input)
}

fn ctx() -> ExecutionContext {
  ExecutionContext::new("exec-1")
}

/// Run validate + send on a fresh executor and return the echoed request.
async fn echo_request(executor: HttpExecutor, task: &Task, siblings: &[Task]) -> Value {
  let mut executor = executor;
  let ctx = ctx();
  executor
    .validate(&ctx, task, siblings)
    .expect("input should be valid");
  let output = executor
    .send(&ctx, task, siblings)
    .await
    .expect("request should succeed");
  serde_json::from_slice(&output.body).expect("echo returns JSON")
}

#[derive(Default)]
struct CountingRenderer {
  calls: AtomicUsize,
}

impl TemplateRenderer for CountingRenderer {
  fn render(&self, template: &str, _task: &Task, _siblings: &[Task]) -> Result<String, TemplateError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(template.replace("{{name}}", "John"))
  }
}

#[tokio::test]
async fn test_get_returns_headers_and_body() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/hello"),
    "method": "GET",
    "headers": {}
  }));
  let mut executor = HttpExecutor::new();

  executor.validate(&ctx(), &task, &[]).unwrap();
  let value = executor.execute(&ctx(), &task, &[]).await.unwrap();

  let output: HttpOutput = serde_json::from_value(value).unwrap();
  assert_eq!(output.body, b"Hello, World!".to_vec());
  assert!(!output.headers.is_empty());
  assert_eq!(
    output.headers.get("content-type").map(String::as_str),
    Some("text/plain; charset=utf-8")
  );
}

#[tokio::test]
async fn test_unreachable_host_fails() {
  let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let task = http_task(json!({
    "url": format!("http://{}/", addr),
    "method": "GET",
    "headers": {}
  }));
  let mut executor = HttpExecutor::new();

  let err = executor.execute(&ctx(), &task, &[]).await.unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Transport);
  assert!(err.is_retryable());
}

#[tokio::test]
async fn test_string_body_sent_verbatim() {
  let server = start_server().await;

  for method in ["POST", "PUT", "PATCH"] {
    let task = http_task(json!({
      "url": server.url("/echo"),
      "method": method,
      "headers": {},
      "body": "raw-text"
    }));

    let echoed = echo_request(HttpExecutor::new(), &task, &[]).await;

    assert_eq!(echoed["method"], method);
    assert_eq!(echoed["body"], "raw-text");
  }
}

#[tokio::test]
async fn test_object_body_sent_as_json() {
  let server = start_server().await;
  let body = json!({"name": "John", "age": 25});
  let task = http_task(json!({
    "url": server.url("/echo"),
    "method": "POST",
    "headers": {},
    "body": body
  }));

  let echoed = echo_request(HttpExecutor::new(), &task, &[]).await;

  let sent = echoed["body"].as_str().unwrap();
  assert_eq!(sent, serde_json::to_string(&body).unwrap());
  assert!(echoed["headers"].get("content-type").is_none());
}

#[tokio::test]
async fn test_bodyless_methods_send_no_body() {
  let server = start_server().await;

  for method in ["GET", "DELETE", "OPTIONS"] {
    let task = http_task(json!({
      "url": server.url("/echo"),
      "method": method,
      "headers": {},
      "body": {"ignored": true}
    }));

    let echoed = echo_request(HttpExecutor::new(), &task, &[]).await;

    assert_eq!(echoed["method"], method);
    assert_eq!(echoed["body"], "", "{} should not send a body", method);
  }
}

#[tokio::test]
async fn test_head_returns_empty_body() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/hello"),
    "method": "HEAD",
    "headers": {}
  }));
  let mut executor = HttpExecutor::new();

  let output = executor.send(&ctx(), &task, &[]).await.unwrap();

  assert!(output.body.is_empty());
}

#[tokio::test]
async fn test_headers_applied() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/echo"),
    "method": "GET",
    "headers": {"X-Test": "abc", "Accept": "application/json"}
  }));

  let echoed = echo_request(HttpExecutor::new(), &task, &[]).await;

  assert_eq!(echoed["headers"]["x-test"], "abc");
  assert_eq!(echoed["headers"]["accept"], "application/json");
}

#[tokio::test]
async fn test_repeated_response_headers_joined() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/cookies"),
    "method": "GET",
    "headers": {}
  }));
  let mut executor = HttpExecutor::new();

  let output = executor.send(&ctx(), &task, &[]).await.unwrap();

  assert_eq!(output.headers["set-cookie"], "a=1, b=2");
}

#[tokio::test]
async fn test_template_resolves_sibling_output() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/echo"),
    "method": "POST",
    "headers": {"Authorization": "Bearer {{ auth.output.token }}"},
    "body": {"user": "{{ auth.output.user }}"}
  }));
  let siblings = vec![Task::new("auth", "http").with_output(json!({"token": "abc", "user": "john"}))];

  let echoed = echo_request(HttpExecutor::new(), &task, &siblings).await;

  assert_eq!(echoed["headers"]["authorization"], "Bearer abc");
  assert_eq!(echoed["body"], r#"{"user":"john"}"#);
}

#[tokio::test]
async fn test_renderer_called_only_with_marker() {
  let server = start_server().await;
  let renderer = Arc::new(CountingRenderer::default());

  let plain = http_task(json!({
    "url": server.url("/echo"),
    "method": "GET",
    "headers": {}
  }));
  let executor = HttpExecutor::new().with_renderer(renderer.clone());
  echo_request(executor, &plain, &[]).await;
  assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);

  let templated = http_task(json!({
    "url": server.url("/echo"),
    "method": "GET",
    "headers": {"X-Name": "{{name}}"}
  }));
  let executor = HttpExecutor::new().with_renderer(renderer.clone());
  let echoed = echo_request(executor, &templated, &[]).await;
  assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
  assert_eq!(echoed["headers"]["x-name"], "John");
}

#[tokio::test]
async fn test_template_failure_stops_before_request() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/count"),
    "method": "GET",
    "headers": {"X-Missing": "{{ nowhere.output }}"}
  }));
  let mut executor = HttpExecutor::new();

  let err = executor.execute(&ctx(), &task, &[]).await.unwrap_err();

  assert!(matches!(err, ExecutorError::TemplateRender { .. }));
  assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_validate_is_idempotent_and_offline() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/count"),
    "method": "GET",
    "headers": {}
  }));
  let mut executor = HttpExecutor::new();

  assert!(executor.validate(&ctx(), &task, &[]).is_ok());
  assert!(executor.validate(&ctx(), &task, &[]).is_ok());
  assert_eq!(server.hits(), 0);

  executor.execute(&ctx(), &task, &[]).await.unwrap();
  assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_validate_rejects_invalid_inputs() {
  let cases = vec![
    ("no input", None),
    ("bare string", Some(json!("invalid input"))),
    (
      "missing headers",
      Some(json!({"url": "http://example.com", "method": "GET"})),
    ),
    (
      "unknown method",
      Some(json!({"url": "http://example.com", "method": "CONNECT", "headers": {}})),
    ),
    (
      "invalid url",
      Some(json!({"url": "http//example", "method": "GET", "headers": {}})),
    ),
  ];

  for (name, input) in cases {
    let mut task = Task::new("task1", "http");
    task.input = input;
    let mut executor = HttpExecutor::new();

    let first = executor.validate(&ctx(), &task, &[]).unwrap_err();
    let second = executor.validate(&ctx(), &task, &[]).unwrap_err();

    assert_eq!(first.kind(), ErrorKind::InvalidInput, "{}", name);
    assert_eq!(first.to_string(), second.to_string(), "{}", name);
  }
}

#[tokio::test]
async fn test_execute_rejects_non_object_input() {
  let task = http_task(json!("invalid input"));
  let mut executor = HttpExecutor::new();

  let err = executor.execute(&ctx(), &task, &[]).await.unwrap_err();

  assert_eq!(err.kind(), ErrorKind::InvalidInput);
  assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_cancelled_before_send() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/count"),
    "method": "GET",
    "headers": {}
  }));
  let ctx = ctx();
  ctx.cancel.cancel();
  let mut executor = HttpExecutor::new();

  let err = executor.execute(&ctx, &task, &[]).await.unwrap_err();

  assert!(matches!(err, ExecutorError::Cancelled));
  assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn test_cancelled_while_in_flight() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/slow"),
    "method": "GET",
    "headers": {}
  }));
  let ctx = ctx();
  let mut executor = HttpExecutor::new();
  executor.validate(&ctx, &task, &[]).unwrap();

  let started = Instant::now();
  cancel_after(&ctx, Duration::from_millis(100));
  let err = executor.execute(&ctx, &task, &[]).await.unwrap_err();

  assert!(matches!(err, ExecutorError::Cancelled));
  assert_eq!(err.kind(), ErrorKind::Cancelled);
  assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_cancelled_while_reading_body() {
  let addr = start_stalled_body_server().await;
  let task = http_task(json!({
    "url": format!("http://{}/partial", addr),
    "method": "GET",
    "headers": {}
  }));
  let ctx = ctx();
  let mut executor = HttpExecutor::new();
  executor.validate(&ctx, &task, &[]).unwrap();

  let started = Instant::now();
  cancel_after(&ctx, Duration::from_millis(200));
  let err = executor.execute(&ctx, &task, &[]).await.unwrap_err();

  assert!(matches!(err, ExecutorError::Cancelled));
  assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_custom_client_timeout_is_transport_error() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/slow"),
    "method": "GET",
    "headers": {}
  }));
  let client = reqwest::Client::builder()
    .timeout(Duration::from_millis(100))
    .build()
    .unwrap();
  let mut executor = HttpExecutor::new().with_client(client);

  executor.validate(&ctx(), &task, &[]).unwrap();
  let err = executor.execute(&ctx(), &task, &[]).await.unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Transport);
  assert!(err.is_retryable());
}

#[tokio::test]
async fn test_template_keeps_literal_comment_and_block_markers() {
  let server = start_server().await;
  let task = http_task(json!({
    "url": server.url("/echo"),
    "method": "POST",
    "headers": { "X-Task": "{{ task.id }}" },
    "body": "ticket {#42} is closed, discount {% off"
  }));

  let echoed = echo_request(HttpExecutor::new(), &task, &[]).await;

  assert_eq!(echoed["headers"]["x-task"], "task1");
  assert_eq!(echoed["body"], "ticket {#42} is closed, discount {% off");
}

#[tokio::test]
async fn test_registry_hands_out_fresh_instances() {
  let server = start_server().await;
  let registry = ExecutorRegistry::with_defaults().unwrap();

  let first = http_task(json!({
    "url": server.url("/hello"),
    "method": "GET",
    "headers": {}
  }));
  let mut second = http_task(json!({
    "url": server.url("/count"),
    "method": "GET",
    "headers": {}
  }));
  second.id = "task2".to_string();

  for task in [&first, &second] {
    let mut executor = registry.instantiate("http").unwrap();
    executor.validate(&ctx(), task, &[]).unwrap();
    executor.execute(&ctx(), task, &[]).await.unwrap();
  }

  assert_eq!(server.hits(), 1);

  let descriptor = registry.describe("http").unwrap();
  assert_eq!(
    descriptor.input_rules.get("method"),
    Some("required,in(GET|POST|PUT|DELETE|PATCH|OPTIONS|HEAD)")
  );
}

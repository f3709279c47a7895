use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, error, info, instrument};
use url::Url;

use courier_executor::{ExecutionContext, Executor, ExecutorError, RuleSet, Schema};
use courier_task::Task;
use courier_template::{JinjaRenderer, TemplateRenderer};

use crate::input::{self, HttpInput, HttpMethod};
use crate::output::{HttpOutput, normalize_headers};

static INPUT_RULES: LazyLock<RuleSet> = LazyLock::new(HttpInput::rules);
static OUTPUT_RULES: LazyLock<RuleSet> = LazyLock::new(HttpOutput::rules);

/// Executor that performs one HTTP request per task.
///
/// The coerced input is cached on the instance between `validate` and
/// `execute`, so an instance must not be reused for another task. Instances
/// created through [`Executor::new_instance`] share the HTTP client and the
/// renderer but start with an empty cache.
pub struct HttpExecutor {
  client: Client,
  renderer: Arc<dyn TemplateRenderer>,
  input: Option<HttpInput>,
}

impl HttpExecutor {
  pub const ID: &'static str = "http";

  pub fn new() -> Self {
    Self {
      client: Client::new(),
      renderer: Arc::new(JinjaRenderer::new()),
      input: None,
    }
  }

  pub fn with_client(mut self, client: Client) -> Self {
    self.client = client;
    self
  }

  pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
    self.renderer = renderer;
    self
  }

  /// Coerce the task's input once and keep it for the instance's lifetime.
  fn coerced_input(&mut self, task: &Task) -> Result<&HttpInput, ExecutorError> {
    if self.input.is_none() {
      self.input = Some(input::coerce(task.input.as_ref())?);
    }
    self
      .input
      .as_ref()
      .ok_or_else(|| ExecutorError::invalid_input("input is required"))
  }

  /// Execute the task and return the typed response.
  #[instrument(
    name = "http_execute",
    skip(self, ctx, task, siblings),
    fields(
      execution_id = %ctx.execution_id,
      task_id = %task.id,
    )
  )]
  pub async fn send(
    &mut self,
    ctx: &ExecutionContext,
    task: &Task,
    siblings: &[Task],
  ) -> Result<HttpOutput, ExecutorError> {
    debug!("executing task in the http executor");

    match self.send_inner(ctx, task, siblings).await {
      Ok((status, output)) => {
        info!(
          status = status.as_u16(),
          headers = output.headers.len(),
          body_bytes = output.body.len(),
          "http task completed"
        );
        Ok(output)
      }
      Err(e) => {
        error!(error = %e, kind = ?e.kind(), "http task failed");
        Err(e)
      }
    }
  }

  async fn send_inner(
    &mut self,
    ctx: &ExecutionContext,
    task: &Task,
    siblings: &[Task],
  ) -> Result<(StatusCode, HttpOutput), ExecutorError> {
    let input = self.coerced_input(task)?.clone();
    let input = input::expand_input(self.renderer.as_ref(), &input, task, siblings)?;
    let request = build_request(&self.client, &input)?;

    if ctx.cancel.is_cancelled() {
      return Err(ExecutorError::Cancelled);
    }

    info!(method = %request.method(), url = %request.url(), "sending http request");

    let response = tokio::select! {
      _ = ctx.cancel.cancelled() => return Err(ExecutorError::Cancelled),
      result = self.client.execute(request) => {
        result.map_err(|e| ExecutorError::Transport { source: Box::new(e) })?
      }
    };

    let status = response.status();
    let headers = normalize_headers(response.headers());

    // `bytes` consumes the response, returning its connection on every path.
    let body = tokio::select! {
      _ = ctx.cancel.cancelled() => return Err(ExecutorError::Cancelled),
      result = response.bytes() => {
        result.map_err(|e| ExecutorError::ResponseRead { source: Box::new(e) })?
      }
    };

    let output = HttpOutput {
      headers,
      body: body.to_vec(),
    };
    Ok((status, output))
  }
}

impl Default for HttpExecutor {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Executor for HttpExecutor {
  fn id(&self) -> &'static str {
    Self::ID
  }

  fn name(&self) -> &'static str {
    "HTTP"
  }

  fn description(&self) -> &'static str {
    "Http executor to make http requests to a given url with the given method and headers."
  }

  fn input_rules(&self) -> &RuleSet {
    &INPUT_RULES
  }

  fn output_rules(&self) -> &RuleSet {
    &OUTPUT_RULES
  }

  fn new_instance(&self) -> Box<dyn Executor> {
    Box::new(Self {
      client: self.client.clone(),
      renderer: Arc::clone(&self.renderer),
      input: None,
    })
  }

  fn validate(
    &mut self,
    _ctx: &ExecutionContext,
    task: &Task,
    _siblings: &[Task],
  ) -> Result<(), ExecutorError> {
    let input = self.coerced_input(task)?;
    input::check(input)
  }

  async fn execute(
    &mut self,
    ctx: &ExecutionContext,
    task: &Task,
    siblings: &[Task],
  ) -> Result<serde_json::Value, ExecutorError> {
    let output = self.send(ctx, task, siblings).await?;
    serde_json::to_value(output).map_err(|source| ExecutorError::OutputEncode { source })
  }
}

/// Build the outbound request for a resolved input.
///
/// `POST`, `PUT` and `PATCH` carry the body; the other methods never do.
pub fn build_request(client: &Client, input: &HttpInput) -> Result<reqwest::Request, ExecutorError> {
  let method = HttpMethod::parse(&input.method).ok_or_else(|| ExecutorError::RequestBuild {
    message: format!("unsupported http method '{}'", input.method),
  })?;

  let url = Url::parse(&input.url).map_err(|e| ExecutorError::RequestBuild {
    message: format!("invalid url '{}': {}", input.url, e),
  })?;

  let mut headers = HeaderMap::with_capacity(input.headers.len());
  for (name, value) in &input.headers {
    let header_name =
      HeaderName::from_bytes(name.as_bytes()).map_err(|e| ExecutorError::RequestBuild {
        message: format!("invalid header name '{}': {}", name, e),
      })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| ExecutorError::RequestBuild {
      message: format!("invalid value for header '{}': {}", name, e),
    })?;
    headers.insert(header_name, header_value);
  }

  let mut request = client.request(method.into(), url).headers(headers);

  if method.carries_body() {
    request = request.body(encode_body(input.body.as_ref())?);
  }

  request.build().map_err(|e| ExecutorError::RequestBuild {
    message: e.to_string(),
  })
}

/// Strings are sent as-is; every other value, including an absent body, is
/// sent as its compact JSON encoding.
pub fn encode_body(body: Option<&serde_json::Value>) -> Result<String, ExecutorError> {
  match body {
    Some(serde_json::Value::String(text)) => Ok(text.clone()),
    Some(value) => {
      serde_json::to_string(value).map_err(|source| ExecutorError::InputEncode { source })
    }
    None => Ok("null".to_string()),
  }
}

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use simlab_catalog::CatalogKind;
use simlab_config::PortalConfig;
use tracing::{error, info, instrument};
use url::Url;

use crate::error::ApiError;
use crate::portal::PortalApi;
use crate::types::{
  ApiReply, Credentials, Download, ImageMetadata, PasswordReset, Registration, UploadAccepted,
  UploadStatus, backend_message, disposition_filename,
};

/// [`PortalApi`] over HTTP, plus the rest of the backend surface.
///
/// Requests are credentialed: the session cookie set by `/login` is kept in
/// a cookie jar and sent with every later request.
pub struct HttpPortalApi {
  client: Client,
  base: Url,
  jar: Arc<Jar>,
}

impl HttpPortalApi {
  pub fn new(config: &PortalConfig) -> Result<Self, ApiError> {
    let mut base = Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl {
      url: config.base_url.clone(),
      message: e.to_string(),
    })?;
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }

    let jar = Arc::new(Jar::default());
    let client = Client::builder()
      .cookie_provider(jar.clone())
      .timeout(config.request_timeout())
      .danger_accept_invalid_certs(config.accept_invalid_certs)
      .build()?;

    Ok(Self { client, base, jar })
  }

  /// Seed the jar with a previously persisted session cookie
  /// (`name=value[; name=value]`).
  pub fn with_cookie(self, cookie: &str) -> Self {
    for pair in cookie.split(';').map(str::trim).filter(|p| !p.is_empty()) {
      self.jar.add_cookie_str(pair, &self.base);
    }
    self
  }

  /// The session cookie currently held for the API root, if any.
  pub fn session_cookie(&self) -> Option<String> {
    self
      .jar
      .cookies(&self.base)
      .and_then(|value| value.to_str().ok().map(str::to_string))
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  #[instrument(skip(self, credentials), fields(username = %credentials.username))]
  pub async fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
    let body = self.post_json("login", credentials).await?;
    info!("logged in");
    Ok(message_or(&body, "Login successful"))
  }

  #[instrument(skip(self, registration), fields(username = %registration.username))]
  pub async fn register(&self, registration: &Registration) -> Result<String, ApiError> {
    let body = self.post_json("register", registration).await?;
    Ok(message_or(&body, "User registered successfully."))
  }

  #[instrument(skip(self, reset), fields(email = %reset.email))]
  pub async fn reset_password(&self, reset: &PasswordReset) -> Result<String, ApiError> {
    let body = self.post_json("reset-password", reset).await?;
    Ok(message_or(&body, "Password reset successfully."))
  }

  #[instrument(skip(self))]
  pub async fn logout(&self) -> Result<String, ApiError> {
    let body = self.post_json("logout", &json!({})).await?;
    Ok(message_or(&body, "Logout successful"))
  }

  /// Upload a Docker image archive. The backend accepts it with 202 and
  /// imports it in the background; poll [`Self::upload_status`].
  #[instrument(skip(self, archive), fields(archive = %archive.display()))]
  pub async fn upload_image(
    &self,
    archive: &Path,
    image_name: &str,
  ) -> Result<UploadAccepted, ApiError> {
    let data = tokio::fs::read(archive).await.map_err(|source| ApiError::Io {
      path: archive.to_path_buf(),
      source,
    })?;
    let file_name = archive
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| format!("{image_name}.tar"));

    let form = Form::new()
      .text("image_name", image_name.to_string())
      .part("file", Part::bytes(data).file_name(file_name));

    let url = self.endpoint("upload-image")?;
    let response = self.send("upload-image", self.client.post(url).multipart(form)).await?;
    let body = expect_success("upload-image", response).await?;
    let accepted: UploadAccepted = decode("upload-image", body)?;
    info!(task_id = %accepted.task_id, "image upload accepted");
    Ok(accepted)
  }

  /// Poll a background upload.
  ///
  /// A failed import is answered with 500 and a status document; that is
  /// returned as a [`UploadStatus`] rather than an error.
  #[instrument(skip(self))]
  pub async fn upload_status(&self, task_id: &str) -> Result<UploadStatus, ApiError> {
    let url = self.endpoint("upload-image-status")?;
    let request = self.client.post(url).json(&json!({ "task_id": task_id }));
    let response = self.send("upload-image-status", request).await?;
    let status = response.status().as_u16();
    let body = read_json(response).await?;

    if let Some(body) = body.as_ref()
      && body.get("status").is_some()
    {
      return decode("upload-image-status", body.clone());
    }

    Err(ApiError::Status {
      path: "upload-image-status".to_string(),
      status,
      message: body.as_ref().and_then(backend_message).map(str::to_string),
    })
  }

  /// Download an image archive. The backend either streams a file or answers
  /// with a JSON document.
  #[instrument(skip(self))]
  pub async fn download_image(&self, image_name: &str) -> Result<Download, ApiError> {
    let url = self.endpoint("download-image")?;
    let request = self.client.post(url).json(&json!({ "image_name": image_name }));
    let response = self.send("download-image", request).await?;

    if !response.status().is_success() {
      let status = response.status().as_u16();
      let body = read_json(response).await?;
      return Err(status_error("download-image", status, body.as_ref()));
    }

    let is_json = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
      let body = response.json::<Value>().await?;
      return Ok(Download::Json(body));
    }

    let filename = response
      .headers()
      .get(CONTENT_DISPOSITION)
      .and_then(|v| v.to_str().ok())
      .and_then(disposition_filename)
      .unwrap_or_else(|| format!("{image_name}.tar"));
    let bytes = response.bytes().await?.to_vec();
    info!(filename = %filename, size = bytes.len(), "image downloaded");
    Ok(Download::File { filename, bytes })
  }

  /// Leaderboard records for a task (`GET /results/<task_id>`).
  ///
  /// A task without results is answered with 404 and comes back empty.
  #[instrument(skip(self))]
  pub async fn results(&self, task_id: &str) -> Result<Vec<Value>, ApiError> {
    self.records(&format!("results/{task_id}")).await
  }

  /// The logged-in user's runs (`GET /results-user`).
  #[instrument(skip(self))]
  pub async fn user_results(&self) -> Result<Vec<Value>, ApiError> {
    self.records("results-user").await
  }

  async fn records(&self, path: &str) -> Result<Vec<Value>, ApiError> {
    let body = match self.get_json(path).await {
      Ok(body) => body,
      Err(ApiError::Status { status: 404, .. }) => {
        info!(path, "no results recorded");
        return Ok(Vec::new());
      }
      Err(e) => return Err(e),
    };
    match body.get("results") {
      Some(Value::Array(records)) => Ok(records.clone()),
      _ => Err(ApiError::Decode {
        path: path.to_string(),
        message: "expected a 'results' list".to_string(),
      }),
    }
  }

  fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base
      .join(path.trim_start_matches('/'))
      .map_err(|e| ApiError::InvalidUrl {
        url: format!("{}{}", self.base, path),
        message: e.to_string(),
      })
  }

  async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
    let url = self.endpoint(path)?;
    let response = self.send(path, self.client.get(url)).await?;
    expect_success(path, response).await
  }

  async fn post_json<T: Serialize + Sync + ?Sized>(
    &self,
    path: &str,
    payload: &T,
  ) -> Result<Value, ApiError> {
    let url = self.endpoint(path)?;
    let response = self.send(path, self.client.post(url).json(payload)).await?;
    expect_success(path, response).await
  }

  async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response, ApiError> {
    request.send().await.map_err(|e| {
      error!(path, error = %e, "request failed");
      ApiError::Http(e)
    })
  }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
  #[instrument(skip(self))]
  async fn fetch_catalog(&self, kind: CatalogKind) -> Result<Value, ApiError> {
    let body = self.get_json(kind.path()).await?;
    info!("catalog fetched");
    Ok(body)
  }

  #[instrument(skip(self, payload))]
  async fn submit_run(&self, payload: &Value) -> Result<ApiReply, ApiError> {
    let url = self.endpoint("run-request")?;
    let response = self.send("run-request", self.client.post(url).json(payload)).await?;
    let status = response.status().as_u16();
    let body = read_json(response).await?;
    info!(status, "run request answered");
    Ok(ApiReply { status, body })
  }

  #[instrument(skip(self))]
  async fn resolve_image(&self, image: &str) -> Result<ImageMetadata, ApiError> {
    let body = self.post_json("image", &json!({ "image": image })).await?;
    decode("image", body)
  }
}

/// Read a body as JSON. Empty and non-JSON bodies yield `None`.
async fn read_json(response: Response) -> Result<Option<Value>, ApiError> {
  let text = response.text().await?;
  Ok(serde_json::from_str(&text).ok())
}

async fn expect_success(path: &str, response: Response) -> Result<Value, ApiError> {
  let status = response.status();
  let body = read_json(response).await?;
  if status.is_success() {
    Ok(body.unwrap_or(Value::Null))
  } else {
    Err(status_error(path, status.as_u16(), body.as_ref()))
  }
}

fn status_error(path: &str, status: u16, body: Option<&Value>) -> ApiError {
  let message = body.and_then(backend_message).map(str::to_string);
  error!(path, status, backend_message = message.as_deref().unwrap_or(""), "backend error");
  ApiError::Status {
    path: path.to_string(),
    status,
    message,
  }
}

fn decode<T: DeserializeOwned>(path: &str, body: Value) -> Result<T, ApiError> {
  serde_json::from_value(body).map_err(|e| ApiError::Decode {
    path: path.to_string(),
    message: e.to_string(),
  })
}

fn message_or(body: &Value, fallback: &str) -> String {
  backend_message(body).unwrap_or(fallback).to_string()
}

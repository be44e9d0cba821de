//! Blocking HTTP access to the Photo-z Server REST API.
//!
//! All requests go through one [`ureq::Agent`]. Responses are checked for
//! success here so the client layer only deals with parsed records or a
//! [`PzError`] already classified as Access / NotFound / Network / Server.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use ureq::http::{self, header, Method};
use ureq::{Agent, Body};

use crate::config::ClientConfig;
use crate::error::{PzError, Result};
use crate::filters::FilterOptions;
use crate::models::Page;

/// File name used when the server does not send one.
const DEFAULT_FILENAME: &str = "file.zip";

/// File fetched from a download endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub filename: String,
    pub content: Vec<u8>,
}

impl DownloadedFile {
    /// Write the content into `dir` under its own file name.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.content).map_err(|e| PzError::io(&path, e))?;
        log::info!("File saved as: {}", path.display());
        Ok(path)
    }
}

/// Low-level client for the Photo-z Server REST API.
#[derive(Debug)]
pub struct PzServerApi {
    agent: Agent,
    base_url: String,
    token: Option<String>,
    filter_options: Mutex<HashMap<String, FilterOptions>>,
}

impl PzServerApi {
    /// Create an API client; no request is sent.
    pub fn new(config: &ClientConfig) -> Self {
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout()));
        if !config.proxy_from_env {
            builder = builder.proxy(None);
        }
        let agent: Agent = builder.build().into();

        Self {
            agent,
            base_url: config.host.api_url(),
            token: config.token.clone(),
            filter_options: Mutex::new(HashMap::new()),
        }
    }

    /// Root URL of the API, ending with '/'.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, path.trim_start_matches('/'));
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(key, value)| {
                    format!(
                        "{}={}",
                        urlencoding::encode(key),
                        urlencoding::encode(value)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&encoded);
        }
        url
    }

    // === Internal HTTP helpers ===

    fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
    ) -> Result<http::Response<Body>> {
        let url = self.url(path, query);
        log::debug!("{method} {url}");

        let mut request = http::Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let request = request
            .body(())
            .map_err(|e| PzError::Network(format!("Invalid request for {url}: {e}")))?;

        let mut response = self.agent.run(request)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.body_mut().read_to_string().unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
        log::debug!("{url} -> {status}: {message}");
        Err(PzError::from_status(status.as_u16(), message))
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let mut response = self.send(Method::GET, path, query)?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| PzError::Network(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }

    // === Entities ===

    /// Check the token against the API root.
    pub fn check_token(&self) -> Result<()> {
        self.send(Method::GET, "", &[]).map(|_| ())
    }

    /// All records of an entity, e.g. "releases" or "product-types".
    pub fn get_all<T: DeserializeOwned>(&self, entity: &str) -> Result<Vec<T>> {
        self.list(entity, &[])
    }

    /// Records of an entity matching query parameters.
    pub fn list<T: DeserializeOwned>(
        &self,
        entity: &str,
        query: &[(String, String)],
    ) -> Result<Vec<T>> {
        let page: Page<T> = self.get_json(&format!("{entity}/"), query)?;
        Ok(page.results)
    }

    /// One record of an entity by id.
    pub fn get<T: DeserializeOwned>(&self, entity: &str, id: u64) -> Result<T> {
        self.get_json(&format!("{entity}/{id}/"), &[])
    }

    /// Filter options of an entity, fetched once per client.
    pub fn options(&self, entity: &str) -> Result<FilterOptions> {
        if let Some(options) = self.cached_options(entity) {
            return Ok(options);
        }

        let mut response = self.send(Method::OPTIONS, &format!("{entity}/"), &[])?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| PzError::Network(e.to_string()))?;
        let options: FilterOptions = serde_json::from_str(&body)?;

        if let Ok(mut cache) = self.filter_options.lock() {
            cache.insert(entity.to_string(), options.clone());
        }
        Ok(options)
    }

    fn cached_options(&self, entity: &str) -> Option<FilterOptions> {
        self.filter_options
            .lock()
            .ok()
            .and_then(|cache| cache.get(entity).cloned())
    }

    /// Value of the JSON member `key` of a single-object endpoint.
    pub fn get_member<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Option<T>> {
        let mut body: serde_json::Map<String, serde_json::Value> = self.get_json(path, &[])?;
        match body.remove(key) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    // === Downloads ===

    /// Fetch a file endpoint into memory.
    pub fn fetch_file(&self, path: &str) -> Result<DownloadedFile> {
        let response = self.send(Method::GET, path, &[])?;
        let filename = response_filename(&response);

        let mut content = Vec::new();
        response
            .into_body()
            .into_reader()
            .read_to_end(&mut content)
            .map_err(|e| PzError::Network(format!("Download interrupted: {e}")))?;

        Ok(DownloadedFile { filename, content })
    }

    /// Stream a file endpoint into `save_in`, returning the written path.
    ///
    /// The body goes to a temporary file in `save_in` that is renamed on
    /// success, so an interrupted transfer leaves nothing under the final name.
    pub fn download_to(&self, path: &str, save_in: &Path) -> Result<PathBuf> {
        let response = self.send(Method::GET, path, &[])?;
        let destination = save_in.join(response_filename(&response));

        let mut partial = tempfile::Builder::new()
            .prefix(".pz-download-")
            .tempfile_in(save_in)
            .map_err(|e| PzError::io(&destination, e))?;
        let mut reader = response.into_body().into_reader();
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buffer).map_err(|e| {
                log::warn!("Download of {} interrupted: {e}", destination.display());
                PzError::Network(format!("Download interrupted: {e}"))
            })?;
            if n == 0 {
                break;
            }
            partial
                .write_all(&buffer[..n])
                .map_err(|e| PzError::io(&destination, e))?;
        }
        partial
            .persist(&destination)
            .map_err(|e| PzError::io(&destination, e.error))?;

        log::info!("File saved as: {}", destination.display());
        Ok(destination)
    }
}

/// Message carried by an error body: `error`, else `detail`, else the raw text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => {
            let field = ["error", "detail"]
                .iter()
                .find_map(|key| json.get(key))
                .map(|value| match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
            Some(field.unwrap_or_else(|| json.to_string()))
        }
        Err(_) => Some(body.to_string()),
    }
}

fn response_filename(response: &http::Response<Body>) -> String {
    response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// File name from a Content-Disposition value, reduced to its last path component.
fn filename_from_disposition(disposition: &str) -> Option<String> {
    let (_, rest) = disposition.split_once("filename=")?;
    let raw = rest.split(';').next()?.trim().trim_matches('"');
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

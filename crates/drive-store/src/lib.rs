//! A Google Drive (v3 REST API) backend for [`diary_store::ObjectStore`].
//!
//! Authentication is out of scope here: the store is handed a ready OAuth
//! access token and sends it as a bearer token on every request.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use diary_store::{Error, FileId, ObjectStore};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url, header};
use serde::Deserialize;

pub use config::{DriveConfig, DriveConfigBuilder};

const MULTIPART_BOUNDARY: &str = "diary-drive-boundary-7f3a9c";
const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
}

/// Google Drive backed store.
#[derive(Clone, Debug)]
pub struct DriveStore {
    client: Client,
    config: Arc<DriveConfig>,
}

impl DriveStore {
    /// Creates a new `DriveStore` with the given configuration.
    #[inline]
    pub fn new(config: DriveConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    #[inline]
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.config.access_token)
    }

    fn url(&self, base: String, params: &[(&str, &str)]) -> Result<Url, Error> {
        Url::parse_with_params(&base, params)
            .map_err(|err| Error::invalid_input().with_reason(format!("{err}")))
    }
}

#[async_trait]
impl ObjectStore for DriveStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<FileId>, Error> {
        let query = find_query(name);
        let url = self.url(
            self.config.files_url(),
            &[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id,name)"),
            ],
        )?;
        let resp = send(self.authorized(self.client.get(url))).await?;
        let list: FileList = resp.json().await.map_err(transport)?;
        let id = list.files.into_iter().next().map(|f| FileId::new(f.id));
        debug!("lookup of {name:?} gave {id:?}");
        Ok(id)
    }

    async fn read_content(&self, id: &FileId) -> Result<Bytes, Error> {
        let url = self.url(
            format!("{}/{}", self.config.files_url(), id),
            &[("alt", "media")],
        )?;
        let resp = send(self.authorized(self.client.get(url))).await?;
        resp.bytes().await.map_err(transport)
    }

    async fn create_file(
        &self,
        name: &str,
        content: Bytes,
    ) -> Result<FileId, Error> {
        let url = self.url(
            self.config.upload_url(),
            &[("uploadType", "multipart"), ("fields", "id")],
        )?;
        let body = multipart_body(name, &content)?;
        let req = self
            .authorized(self.client.post(url))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body);
        let resp = send(req).await?;
        let entry: FileEntry = resp.json().await.map_err(transport)?;
        info!("created drive file {name:?} as {}", entry.id);
        Ok(FileId::new(entry.id))
    }

    async fn update_file(
        &self,
        id: &FileId,
        content: Bytes,
    ) -> Result<(), Error> {
        let url = self.url(
            format!("{}/{}", self.config.upload_url(), id),
            &[("uploadType", "media")],
        )?;
        let req = self
            .authorized(self.client.patch(url))
            .header(header::CONTENT_TYPE, TEXT_PLAIN)
            .body(content);
        send(req).await?;
        Ok(())
    }
}

async fn send(req: RequestBuilder) -> Result<Response, Error> {
    let resp = req.send().await.map_err(transport)?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(error_for_status(status, &body))
}

#[inline]
fn transport(err: reqwest::Error) -> Error {
    Error::transport().with_reason(format!("{err}"))
}

fn error_for_status(status: StatusCode, body: &str) -> Error {
    let err = match status {
        StatusCode::NOT_FOUND => Error::not_found(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::permission_denied()
        }
        _ => Error::transport(),
    };
    warn!("drive request failed with {status}");
    err.with_reason(format!("{status}: {}", body.trim()))
}

/// Builds the Drive query matching a non-trashed file by exact name.
fn find_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name='{escaped}' and trashed=false")
}

fn multipart_body(name: &str, content: &[u8]) -> Result<Vec<u8>, Error> {
    let metadata = serde_json::json!({ "name": name, "mimeType": "text/plain" });
    let metadata = serde_json::to_string(&metadata)
        .map_err(|err| Error::invalid_input().with_reason(format!("{err}")))?;

    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n\
             --{MULTIPART_BOUNDARY}\r\n\
             Content-Type: {TEXT_PLAIN}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--").as_bytes());
    Ok(body)
}

//! HTTP object backend (spec §6.1)
//!
//! Talks to the remote object space over byte-range HTTP: `GET` with a
//! `Range` header for reads, `PUT` with `Content-Range` for writes, plain
//! `DELETE` for removal, and a `/api/info/<path>` JSON endpoint for stat.
//! Blocking on purpose — the Cache Manager's read/write path runs on plain
//! OS threads, not an async runtime, so a blocking client keeps every layer
//! in the same concurrency model instead of bridging into one just here.

use crate::{ObjectBackend, ObjectInfo};
use cachefs_common::{Error, Result};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, RANGE};
use url::Url;

pub struct HttpBackend {
    base_url: Url,
    token: Option<String>,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl AsRef<str>, token: Option<String>) -> Result<Self> {
        let base_url =
            Url::parse(base_url.as_ref()).map_err(|e| Error::invalid(format!("bad base url: {e}")))?;
        let client = Client::builder()
            .build()
            .map_err(|e| Error::backend(e.to_string()))?;
        Ok(Self {
            base_url,
            token,
            client,
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    fn stat_url(&self, path: &str) -> String {
        format!(
            "{}/api/info{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    fn authorize(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    /// Stat a remote object without fetching its data.
    pub fn stat(&self, path: &str) -> Result<ObjectInfo> {
        let req = self.authorize(self.client.get(self.stat_url(path)));
        let resp = req.send().map_err(|e| Error::backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(path.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Error::backend(format!(
                "stat {path} returned {}",
                resp.status()
            )));
        }

        resp.json::<ObjectInfo>()
            .map_err(|e| Error::backend(format!("decoding stat response: {e}")))
    }
}

impl ObjectBackend for HttpBackend {
    fn get_range(&self, path: &str, buf: &mut [u8], len: usize, offset: u64) -> Result<i64> {
        let len = len.min(buf.len());
        if len == 0 {
            return Ok(0);
        }
        let range = format!("bytes={}-{}", offset, offset + len as u64 - 1);
        let req = self
            .authorize(self.client.get(self.object_url(path)))
            .header(RANGE, range);
        let resp = req.send().map_err(|e| Error::backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(path.to_string()));
        }
        if !(resp.status().is_success() || resp.status() == reqwest::StatusCode::PARTIAL_CONTENT) {
            return Err(Error::backend(format!(
                "get {path} returned {}",
                resp.status()
            )));
        }

        let body = resp.bytes().map_err(|e| Error::backend(e.to_string()))?;
        let n = body.len().min(len);
        buf[..n].copy_from_slice(&body[..n]);
        tracing::debug!(path, offset, n, "http backend get_range");
        Ok(n as i64)
    }

    fn put_range(&self, path: &str, buf: &[u8], len: usize, offset: u64) -> Result<i64> {
        let len = len.min(buf.len());
        let content_range = format!("bytes {}-{}/*", offset, offset + len as u64 - 1);
        let req = self
            .authorize(self.client.put(self.object_url(path)))
            .header(CONTENT_RANGE, content_range)
            .body(buf[..len].to_vec());
        let resp = req.send().map_err(|e| Error::backend(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::backend(format!(
                "put {path} returned {}",
                resp.status()
            )));
        }
        tracing::debug!(path, offset, len, "http backend put_range");
        Ok(len as i64)
    }

    fn delete(&self, path: &str) -> Result<i64> {
        let req = self.authorize(self.client.delete(self.object_url(path)));
        let resp = req.send().map_err(|e| Error::backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(path.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Error::backend(format!(
                "delete {path} returned {}",
                resp.status()
            )));
        }
        Ok(0)
    }
}

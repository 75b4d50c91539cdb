//! HTTP client for the lookup protocol

use reqwest::Client;
use serde::Deserialize;

use sealdict_core::{
    DictKey, Error as CoreError, Params, ParamsReply, ParamsStatus, PrivateContext,
    SealedContext, SealedKeys, ShareReply, ShareRequest, ShareStatus, StoreFile,
};

use crate::error::{ClientError, Result};

/// Suffix under which the server registers a sealed store's nonce table
pub const NONCES_SUFFIX: &str = ".nonces";

/// Reply to an artifact upload
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub kind: String,
    pub stores: Vec<String>,
}

/// Client for a sealdict provider
///
/// Holds no key material; lookups take the caller's context.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: Client,
    server_url: String,
}

impl StoreClient {
    pub fn new(server_url: String) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Fetch a store's public params
    pub async fn fetch_params(&self, name: &str) -> Result<Params> {
        let url = format!("{}/stores/{}/params", self.server_url, name);
        let resp = self.http.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ClientError::Server {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let reply: ParamsReply = resp.json().await?;
        match (reply.status, reply.params) {
            (ParamsStatus::Ok, Some(params)) => {
                params.validate()?;
                Ok(params)
            }
            (ParamsStatus::Ok, None) => Err(ClientError::InvalidResponse(
                "status OK without params".to_string(),
            )),
            (ParamsStatus::NotFound, _) => Err(ClientError::StoreNotFound(name.to_string())),
        }
    }

    /// Ask for the XOR of rows `x` and `y`
    pub async fn fetch_share(&self, name: &str, x: u32, y: u32) -> Result<ShareReply> {
        let url = format!("{}/stores/{}/share", self.server_url, name);
        let resp = self
            .http
            .post(&url)
            .json(&ShareRequest { x, y })
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::StoreNotFound(name.to_string()));
        }
        if !resp.status().is_success() {
            return Err(ClientError::Server {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let reply: ShareReply = resp.json().await?;
        Ok(reply)
    }

    /// Build a context for `name` from the key and the server's params
    pub async fn context(&self, key: &DictKey, name: &str) -> Result<PrivateContext> {
        let params = self.fetch_params(name).await?;
        Ok(PrivateContext::new(key, params)?)
    }

    /// Build a sealed context for `name` and its nonce table
    pub async fn sealed_context(&self, keys: &SealedKeys, name: &str) -> Result<SealedContext> {
        let values = self.fetch_params(name).await?;
        let nonces = self.fetch_params(&nonces_name(name)).await?;
        Ok(SealedContext::new(keys, values, nonces)?)
    }

    /// Look up `input` in store `name`
    ///
    /// `Ok(None)` means the input is not stored.
    pub async fn get(
        &self,
        context: &PrivateContext,
        name: &str,
        input: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let (x, y) = context.indices(input);
        tracing::debug!(store = name, x, y, "Requesting share");

        let share = self
            .share(name, x, y, context.params().table_length)
            .await?;
        Ok(context.decode(input, &share)?)
    }

    /// Look up `input` in sealed store `name`
    pub async fn get_sealed(
        &self,
        context: &SealedContext,
        name: &str,
        input: &[u8],
    ) -> Result<Option<Vec<u8>>> {
        let ((vx, vy), (nx, ny)) = context.indices(input);
        let nonces = nonces_name(name);

        let (value_share, nonce_share) = tokio::try_join!(
            self.share(name, vx, vy, context.values().params().table_length),
            self.share(&nonces, nx, ny, context.nonces().params().table_length),
        )?;
        Ok(context.open(input, &value_share, &nonce_share)?)
    }

    /// Upload an artifact, replacing any store of the same name
    pub async fn upload(&self, name: &str, file: &StoreFile) -> Result<UploadResponse> {
        let url = format!("{}/stores/{}", self.server_url, name);
        let body = file.to_bytes()?;
        let resp = self
            .http
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ClientError::Server {
                status: resp.status().as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let reply: UploadResponse = resp.json().await?;
        tracing::info!(store = name, kind = %reply.kind, "Uploaded store");
        Ok(reply)
    }

    async fn share(&self, name: &str, x: u32, y: u32, table_length: u32) -> Result<Vec<u8>> {
        let reply = self.fetch_share(name, x, y).await?;
        share_from_reply(reply, x, y, table_length)
    }
}

fn share_from_reply(reply: ShareReply, x: u32, y: u32, table_length: u32) -> Result<Vec<u8>> {
    match reply.status {
        ShareStatus::Ok => Ok(reply.share),
        ShareStatus::IndexOutOfRange => Err(CoreError::IndexOutOfRange {
            index: x.max(y),
            table_length,
        }
        .into()),
    }
}

pub fn nonces_name(name: &str) -> String {
    format!("{}{}", name, NONCES_SUFFIX)
}

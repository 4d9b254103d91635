use std::time::Duration;

use api_types::{
    ErrorResponse,
    record::{RecordListQuery, RecordListResponse, RecordView},
};
use async_trait::async_trait;
use engine::{RecordId, RecordKind, RemoteError, RemoteRecord, RemoteStore};
use reqwest::{Response, Url};

use crate::{ClientError, build_http, parse_base_url};

/// Remote record store over the hosted HTTP API.
///
/// - `POST {base}/records/{collection}` with the business fields creates a row.
/// - `GET {base}/records/{collection}?owner=..&order=..` lists an owner's rows.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    base_url: Url,
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpRemote {
    /// `timeout` bounds every request made by this client.
    pub fn new(
        base_url: &str,
        api_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            http: build_http(api_token, timeout)?,
            timeout,
        })
    }

    fn endpoint(&self, kind: RecordKind) -> Result<Url, RemoteError> {
        self.base_url
            .join(&format!("records/{}", kind.collection()))
            .map_err(|err| RemoteError::Transport(format!("invalid base_url: {err}")))
    }

    fn transport(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout)
        } else if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }

    async fn rejected(res: Response) -> RemoteError {
        let status = res.status();
        let message = res
            .json::<ErrorResponse>()
            .await
            .map(|err| err.error)
            .unwrap_or_else(|_| "unknown error".to_string());
        RemoteError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

fn into_remote(view: RecordView) -> RemoteRecord {
    RemoteRecord {
        id: RecordId::new(view.id),
        created_at: view.created_at,
        updated_at: view.updated_at,
        fields: serde_json::Value::Object(view.fields),
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn create(
        &self,
        kind: RecordKind,
        fields: &serde_json::Value,
    ) -> Result<RemoteRecord, RemoteError> {
        let endpoint = self.endpoint(kind)?;

        let res = self
            .http
            .post(endpoint)
            .json(fields)
            .send()
            .await
            .map_err(|err| self.transport(err))?;

        if !res.status().is_success() {
            return Err(Self::rejected(res).await);
        }

        let view = res
            .json::<RecordView>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        Ok(into_remote(view))
    }

    async fn list(
        &self,
        kind: RecordKind,
        owner: &str,
        order_by: &str,
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        let endpoint = self.endpoint(kind)?;
        let query = RecordListQuery {
            owner: owner.to_string(),
            order: order_by.to_string(),
        };

        let res = self
            .http
            .get(endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|err| self.transport(err))?;

        if !res.status().is_success() {
            return Err(Self::rejected(res).await);
        }

        let body = res
            .json::<RecordListResponse>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        Ok(body.records.into_iter().map(into_remote).collect())
    }
}

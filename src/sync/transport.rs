use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};

use crate::{
    DiagflowError, Result,
    sync::{HttpMethod, PendingMutation},
};

/// Delivers replayed offline mutations.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        mutation: &PendingMutation,
    ) -> Result<()>;
}

/// [`Transport`] sending mutations as plain HTTP requests.
///
/// Relative mutation urls are resolved against `base_url`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Option<String>,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| DiagflowError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    pub fn base_url(
        mut self,
        base_url: impl Into<String>,
    ) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    fn resolve(
        &self,
        url: &str,
    ) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => format!("{}{}", base, url),
            _ => url.to_string(),
        }
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        mutation: &PendingMutation,
    ) -> Result<()> {
        let mut request = self.client.request(mutation.method.into(), self.resolve(&mutation.url));
        for (name, value) in &mutation.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &mutation.body {
            request = request.json(body);
        }
        check_status(request.send().await?).await?;
        Ok(())
    }
}

/// Maps 401/403 to [`DiagflowError::Auth`] and any other non-2xx status to [`DiagflowError::Network`].
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DiagflowError::Auth(format!("{} {}: {}", status, url, body))),
        _ => Err(DiagflowError::Network(format!("{} {}: {}", status, url, body))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_urls() {
        let transport = HttpTransport::new(Duration::from_secs(1)).unwrap().base_url("https://api.example.co/");
        assert_eq!(transport.resolve("/rest/v1/tickets"), "https://api.example.co/rest/v1/tickets");
        assert_eq!(transport.resolve("https://other.example.co/x"), "https://other.example.co/x");
    }

    #[tokio::test]
    async fn test_bad_header_fails_without_retry() {
        let transport = HttpTransport::new(Duration::from_secs(1)).unwrap().base_url("http://127.0.0.1:9");
        let mutation = PendingMutation::new("/tickets", HttpMethod::Post, None).header("bad header\n", "x");
        let err = transport.send(&mutation).await.unwrap_err();
        assert!(matches!(err, DiagflowError::Convert(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(Method::from(HttpMethod::Patch), Method::PATCH);
        assert_eq!(Method::from(HttpMethod::Delete), Method::DELETE);
    }
}

use super::ChatResult;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Status and raw body of one HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single POST with a JSON body. Backends receive this instead of a concrete client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, url: &str, headers: &[(&str, &str)], body: &Value)
    -> ChatResult<HttpResponse>;
}

/// [`HttpTransport`] over a shared reqwest client, with its default timeouts.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> ChatResult<HttpResponse> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::HttpResponse;

    #[test]
    fn success_range() {
        let ok = |status| HttpResponse {
            status,
            body: String::new(),
        };
        assert!(ok(200).is_success());
        assert!(ok(204).is_success());
        assert!(!ok(301).is_success());
        assert!(!ok(500).is_success());
    }
}

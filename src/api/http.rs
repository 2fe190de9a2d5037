//! HTTP transport for the CRM backend.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use super::{ApiRequest, Method, Transport};
use crate::auth::SessionHandle;
use crate::config::Config;
use crate::error::ApiError;

/// Sends JSON requests with the session's bearer token attached.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    session: SessionHandle,
}

impl HttpTransport {
    pub fn new(config: &Config, session: SessionHandle) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            session,
        })
    }

    /// Append the request's segments to the base URL, keeping the base's
    /// own path prefix. Each segment is percent-encoded on its own.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        if let Some(dot) = request.segments.iter().find(|s| *s == "." || *s == "..") {
            return Err(ApiError::Validation(format!("invalid identifier {:?}", dot)));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::network(format!("API URL {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(&request.segments);

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!(method = %request.method, path = %request.path(), status = status.as_u16(), "api response");

        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use crate::cache::Filter;

    fn transport(base: &str) -> HttpTransport {
        let config = Config::default().with_api_url(base).unwrap();
        HttpTransport::new(&config, Session::signed_out().handle()).unwrap()
    }

    #[test]
    fn test_url_keeps_base_path() {
        let api = transport("http://localhost:8003/api");
        let url = api.url_for(&ApiRequest::get("/companies/")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8003/api/companies/");

        let api = transport("http://localhost:8003/api/");
        let url = api
            .url_for(&ApiRequest::delete("/deals").segment("d1"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8003/api/deals/d1");

        let api = transport("http://localhost:8003");
        let url = api.url_for(&ApiRequest::get("/leads/")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8003/leads/");
    }

    #[test]
    fn test_url_keeps_id_in_one_segment() {
        let api = transport("http://localhost:8003/api");

        let url = api
            .url_for(&ApiRequest::delete("/companies").segment("../people/p1"))
            .unwrap();
        assert_eq!(url.path(), "/api/companies/..%2Fpeople%2Fp1");

        let url = api
            .url_for(&ApiRequest::delete("/companies").segment("c1?x=1#frag"))
            .unwrap();
        assert_eq!(url.path(), "/api/companies/c1%3Fx=1%23frag");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        for id in [".", ".."] {
            let request = ApiRequest::delete("/companies").segment(id);
            assert!(matches!(api.url_for(&request), Err(ApiError::Validation(_))));
        }
    }

    #[test]
    fn test_url_encodes_filter() {
        let api = transport("http://localhost:8003/api");
        let filter = Filter::new()
            .with("related_to_type", "company")
            .with("related_to_id", "c 1");
        let url = api
            .url_for(&ApiRequest::get("/notes/").with_filter(&filter))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8003/api/notes/?related_to_id=c+1&related_to_type=company"
        );
    }
}

//! HTTP GET transport for the resolution service.

use async_trait::async_trait;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::dom;
use crate::error::{Result, VisitorError};

/// Status and full text body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can issue a GET and hand back the text body.
///
/// `Err` means no response was obtained at all (network failure, CORS
/// rejection); an HTTP error status is still `Ok`.
#[async_trait(?Send)]
pub trait Transport {
    async fn get(&self, url: &str) -> Result<HttpReply>;
}

/// `window.fetch` in CORS mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn get(&self, url: &str) -> Result<HttpReply> {
        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);

        let request = Request::new_with_str_and_init(url, &opts)
            .map_err(|e| VisitorError::Transport(format!("Request::new: {:?}", e)))?;

        let window = dom::window()?;
        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| VisitorError::Transport(format!("fetch: {:?}", e)))?;

        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| VisitorError::Transport("not a Response".into()))?;

        let text = JsFuture::from(
            resp.text()
                .map_err(|e| VisitorError::Transport(format!("text(): {:?}", e)))?,
        )
        .await
        .map_err(|e| VisitorError::Transport(format!("await text: {:?}", e)))?;

        let body = text
            .as_string()
            .ok_or_else(|| VisitorError::Transport("response not a string".into()))?;

        Ok(HttpReply {
            status: resp.status(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(HttpReply::new(200, "").is_success());
        assert!(HttpReply::new(204, "").is_success());
        assert!(HttpReply::new(299, "").is_success());
        assert!(!HttpReply::new(199, "").is_success());
        assert!(!HttpReply::new(302, "").is_success());
        assert!(!HttpReply::new(404, "").is_success());
        assert!(!HttpReply::new(503, "").is_success());
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Method dispatch and the outbound request it produces.

use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderValue};

use crate::core::{HttpMethod, ProxyError};
use crate::proxy::headers::HeaderPolicy;
use crate::proxy::payload::PayloadBody;

/// An outbound request that has not been sent yet.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: HttpMethod,
    url: String,
    headers: HeaderMap,
    body: Option<PayloadBody>,
}

impl OutboundRequest {
    pub fn get(url: String) -> Self {
        Self::bare(HttpMethod::Get, url)
    }

    pub fn post(url: String) -> Self {
        Self::bare(HttpMethod::Post, url)
    }

    pub fn put(url: String) -> Self {
        Self::bare(HttpMethod::Put, url)
    }

    pub fn patch(url: String) -> Self {
        Self::bare(HttpMethod::Patch, url)
    }

    pub fn delete(url: String) -> Self {
        Self::bare(HttpMethod::Delete, url)
    }

    pub fn head(url: String) -> Self {
        Self::bare(HttpMethod::Head, url)
    }

    pub fn options(url: String) -> Self {
        Self::bare(HttpMethod::Options, url)
    }

    pub fn trace(url: String) -> Self {
        Self::bare(HttpMethod::Trace, url)
    }

    fn bare(method: HttpMethod, url: String) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&PayloadBody> {
        self.body.as_ref()
    }

    /// Copy `headers` onto the request, minus the inbound ignore-list.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in HeaderPolicy::filter_request(headers) {
            if let Some(name) = name {
                self.headers.append(name, value);
            }
        }
        self
    }

    /// Attach a body.  Empty bodies are not sent at all.
    pub fn with_body(mut self, body: PayloadBody) -> Self {
        self.body = (body.content_length() > 0).then_some(body);
        self
    }

    /// Turn this into a request on `client`.
    ///
    /// The body is streamed, so reqwest cannot size it; the known length is
    /// declared explicitly instead of falling back to chunked encoding.
    pub fn build(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        let mut builder = client
            .request(self.method.into(), &self.url)
            .headers(self.headers.clone());

        if let Some(body) = &self.body {
            builder = builder
                .header(CONTENT_LENGTH, HeaderValue::from(body.content_length()))
                .body(body.to_reqwest_body());
        }
        builder
    }
}

/// Maps a method name to the constructor of the matching outbound request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodDispatcher;

impl MethodDispatcher {
    /// Constructor for `method`.
    pub fn constructor(method: HttpMethod) -> fn(String) -> OutboundRequest {
        match method {
            HttpMethod::Get => OutboundRequest::get,
            HttpMethod::Post => OutboundRequest::post,
            HttpMethod::Put => OutboundRequest::put,
            HttpMethod::Patch => OutboundRequest::patch,
            HttpMethod::Delete => OutboundRequest::delete,
            HttpMethod::Head => OutboundRequest::head,
            HttpMethod::Options => OutboundRequest::options,
            HttpMethod::Trace => OutboundRequest::trace,
        }
    }

    /// Create an outbound request for `method_name` (any letter case).
    pub fn create(
        method_name: &str,
        url: impl Into<String>,
    ) -> Result<OutboundRequest, ProxyError> {
        let method: HttpMethod = method_name.parse()?;
        Ok(Self::constructor(method)(url.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::payload::Payload;

    const URL: &str = "http://localhost:5555";

    #[test]
    fn test_create_every_method_any_case() {
        for method in HttpMethod::ALL {
            for name in [method.as_str().to_string(), method.as_str().to_lowercase()] {
                let request = MethodDispatcher::create(&name, URL).unwrap();
                assert_eq!(request.method(), method);
                assert_eq!(request.url(), URL);
                assert!(request.body().is_none());
            }
        }
    }

    #[test]
    fn test_create_unknown_method_fails() {
        let err = MethodDispatcher::create("BLAH", URL).unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedMethod(ref m) if m == "BLAH"));
        assert!(MethodDispatcher::create("CONNECT", URL).is_err());
    }

    #[test]
    fn test_headers_are_filtered() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("front:8080"));
        headers.insert("accept-encoding", HeaderValue::from_static("br"));
        headers.insert("content-length", HeaderValue::from_static("11"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("x-waypoint-test", HeaderValue::from_static("MethodDispatcherTest"));

        let request = MethodDispatcher::create("POST", URL).unwrap().with_headers(&headers);

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.headers()["x-waypoint-test"], "MethodDispatcherTest");
    }

    #[test]
    fn test_empty_body_is_dropped() {
        let request =
            OutboundRequest::post(URL.into()).with_body(PayloadBody::new(Payload::default()));
        assert!(request.body().is_none());

        let request =
            OutboundRequest::post(URL.into()).with_body(PayloadBody::new(Payload::from("x")));
        assert_eq!(request.body().unwrap().content_length(), 1);
    }

    #[test]
    fn test_build_declares_content_length() {
        let client = reqwest::Client::new();
        let request = OutboundRequest::put(format!("{URL}/jolokia"))
            .with_body(PayloadBody::new(Payload::from("hello world")))
            .build(&client)
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::PUT);
        assert_eq!(request.url().as_str(), "http://localhost:5555/jolokia");
        assert_eq!(request.headers()[CONTENT_LENGTH], "11");
        assert!(request.body().is_some());
    }
}

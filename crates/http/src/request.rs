use crate::error::{ApiError, Result};
use crate::resolver::RequestParams;
use crate::transport::TransportOptions;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl RequestMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(ApiError::Config(format!("Invalid HTTP method '{other}'"))),
        }
    }
}

impl From<RequestMethod> for Method {
    fn from(value: RequestMethod) -> Self {
        match value {
            RequestMethod::Get => Method::GET,
            RequestMethod::Put => Method::PUT,
            RequestMethod::Post => Method::POST,
            RequestMethod::Patch => Method::PATCH,
            RequestMethod::Delete => Method::DELETE,
        }
    }
}

/// Method, headers and serialized body of one outgoing request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: RequestMethod,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// Build a JSON request descriptor, serializing `payload` when present and not `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn json(method: RequestMethod, payload: Option<&Value>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = payload
            .filter(|p| !p.is_null())
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Config(format!("failed to serialize payload: {e}")))?;
        Ok(Self {
            method,
            headers,
            body,
        })
    }
}

/// Everything one dispatch needs besides the client itself.
///
/// Defaults: `GET`, stubs enabled, default (hard) error handling, no payload.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub key: String,
    pub params: RequestParams,
    pub transport: TransportOptions,
    pub method: RequestMethod,
    pub use_mock: bool,
    pub use_custom_error_handler: bool,
    pub payload: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: RequestParams::default(),
            transport: TransportOptions::default(),
            method: RequestMethod::Get,
            use_mock: true,
            use_custom_error_handler: false,
            payload: None,
        }
    }

    #[must_use]
    pub fn params(mut self, params: RequestParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn use_mock(mut self, enabled: bool) -> Self {
        self.use_mock = enabled;
        self
    }

    #[must_use]
    pub fn custom_error_handler(mut self, enabled: bool) -> Self {
        self.use_custom_error_handler = enabled;
        self
    }

    #[must_use]
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_methods_case_insensitively() {
        assert_eq!("get".parse::<RequestMethod>().ok(), Some(RequestMethod::Get));
        assert_eq!(
            " Patch ".parse::<RequestMethod>().ok(),
            Some(RequestMethod::Patch)
        );
        assert!("PROPFIND".parse::<RequestMethod>().is_err());
        assert_eq!(Method::from(RequestMethod::Delete), Method::DELETE);
    }

    #[test]
    fn descriptor_sets_json_content_type_and_body() {
        let d = RequestDescriptor::json(RequestMethod::Post, Some(&json!({"name": "x"})))
            .expect("descriptor");
        assert_eq!(d.method, RequestMethod::Post);
        assert_eq!(
            d.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(d.body.as_deref(), Some(r#"{"name":"x"}"#));

        let d = RequestDescriptor::json(RequestMethod::Get, None).expect("descriptor");
        assert!(d.body.is_none());

        let d = RequestDescriptor::json(RequestMethod::Post, Some(&Value::Null))
            .expect("descriptor");
        assert!(d.body.is_none());
    }

    #[test]
    fn request_defaults() {
        let r = ApiRequest::new("user");
        assert_eq!(r.method, RequestMethod::Get);
        assert!(r.use_mock);
        assert!(!r.use_custom_error_handler);
        assert!(r.payload.is_none());
    }
}

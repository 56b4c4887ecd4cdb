use crate::error::EncodeError;
use crate::field::{Field, MarshalObject, ObjectEncoder};
use http::header::{REFERER, USER_AGENT};
use http::{HeaderMap, Request, Response, Version};
use http_body::Body;
use std::net::SocketAddr;
use std::time::Duration;

/// Key of the `httpRequest` special field.
pub const HTTP_REQUEST_KEY: &str = "httpRequest";

/// Payload of the `httpRequest` special field.
///
/// Every member defaults to its zero value; zero values are left out of the
/// encoded object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub request_method: String,
    pub request_url: String,
    pub request_size: u64,
    pub status: u16,
    pub response_size: u64,
    pub user_agent: String,
    pub remote_ip: String,
    pub server_ip: String,
    pub referer: String,
    pub latency: Duration,
    pub cache_lookup: bool,
    pub cache_hit: bool,
    pub cache_validated_with_origin_server: bool,
    pub cache_fill_bytes: u64,
    pub protocol: String,
}

impl HttpRequest {
    /// Build the payload from an optional request and an optional
    /// response, each inspected on its own.
    pub fn new<Req, Res>(req: Option<&Request<Req>>, res: Option<&Response<Res>>) -> Self
    where
        Req: Body,
        Res: Body,
    {
        let mut payload = HttpRequest::default();
        if let Some(req) = req {
            payload.apply_request(req);
        }
        if let Some(res) = res {
            payload.apply_response(res);
        }
        payload
    }

    pub fn from_request<B: Body>(req: &Request<B>) -> Self {
        let mut payload = HttpRequest::default();
        payload.apply_request(req);
        payload
    }

    pub fn from_response<B: Body>(res: &Response<B>) -> Self {
        let mut payload = HttpRequest::default();
        payload.apply_response(res);
        payload
    }

    /// Request-side members. The remote address is taken from a
    /// [`SocketAddr`] request extension, as set by most servers' connect
    /// info middleware.
    pub fn apply_request<B: Body>(&mut self, req: &Request<B>) {
        self.request_method = req.method().as_str().to_string();
        self.request_url = req.uri().to_string();
        self.request_size = body_size(req.body());
        self.user_agent = header(req.headers(), USER_AGENT);
        self.referer = header(req.headers(), REFERER);
        self.protocol = protocol(req.version()).to_string();
        if let Some(addr) = req.extensions().get::<SocketAddr>() {
            self.remote_ip = addr.to_string();
        }
    }

    pub fn apply_response<B: Body>(&mut self, res: &Response<B>) {
        self.status = res.status().as_u16();
        self.response_size = body_size(res.body());
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_server_ip(mut self, server_ip: impl Into<String>) -> Self {
        self.server_ip = server_ip.into();
        self
    }
}

/// Exact length reported by the body, without polling it. Streaming
/// bodies of unknown length count as zero.
fn body_size<B: Body>(body: &B) -> u64 {
    body.size_hint().exact().unwrap_or(0)
}

fn header(headers: &HeaderMap, name: http::header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn protocol(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "HTTP/0.9"
    } else if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == Version::HTTP_11 {
        "HTTP/1.1"
    } else if version == Version::HTTP_2 {
        "HTTP/2.0"
    } else if version == Version::HTTP_3 {
        "HTTP/3.0"
    } else {
        ""
    }
}

impl MarshalObject for HttpRequest {
    fn marshal(&self, enc: &mut dyn ObjectEncoder) -> Result<(), EncodeError> {
        let strings = [
            ("requestMethod", &self.request_method),
            ("requestUrl", &self.request_url),
            ("userAgent", &self.user_agent),
            ("remoteIp", &self.remote_ip),
            ("serverIp", &self.server_ip),
            ("referer", &self.referer),
            ("protocol", &self.protocol),
        ];
        for (key, value) in strings {
            if !value.is_empty() {
                enc.add_str(key, value);
            }
        }

        if self.request_size > 0 {
            enc.add_u64("requestSize", self.request_size);
        }
        if self.status > 0 {
            enc.add_u64("status", u64::from(self.status));
        }
        if self.response_size > 0 {
            enc.add_u64("responseSize", self.response_size);
        }
        if !self.latency.is_zero() {
            enc.add_str("latency", &format!("{}s", self.latency.as_secs_f64()));
        }
        if self.cache_lookup {
            enc.add_bool("cacheLookup", true);
        }
        if self.cache_hit {
            enc.add_bool("cacheHit", true);
        }
        if self.cache_validated_with_origin_server {
            enc.add_bool("cacheValidatedWithOriginServer", true);
        }
        if self.cache_fill_bytes > 0 {
            enc.add_u64("cacheFillBytes", self.cache_fill_bytes);
        }
        Ok(())
    }
}

/// `httpRequest` field for the given payload.
pub fn http_request(payload: HttpRequest) -> Field {
    Field::object(HTTP_REQUEST_KEY, payload)
}

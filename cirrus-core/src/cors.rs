//! CORS (Cross-Origin Resource Sharing) handling.
//!
//! The dashboard frontend is served from a different origin than the API,
//! so every response carries the allow headers and `OPTIONS` preflights are
//! answered without touching the router.
//!
//! ```
//! use cirrus_core::CorsConfig;
//!
//! let cors = CorsConfig::permissive();
//! let cors = CorsConfig::new()
//!     .allow_origin("http://localhost:3000")
//!     .allow_credentials(true);
//! ```

use crate::{HttpRequest, HttpResponse};
use std::collections::BTreeSet;

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Explicit origins; `None` accepts any origin.
    allowed_origins: Option<BTreeSet<String>>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    allow_credentials: bool,
    max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self::permissive()
    }
}

impl CorsConfig {
    /// Strict configuration: no origin allowed until one is added.
    pub fn new() -> Self {
        Self {
            allowed_origins: Some(BTreeSet::new()),
            allowed_methods: vec!["GET".into(), "POST".into(), "OPTIONS".into()],
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allow_credentials: false,
            max_age: Some(3600),
        }
    }

    /// Accept any origin.
    pub fn permissive() -> Self {
        Self {
            allowed_origins: None,
            ..Self::new()
        }
    }

    /// Build from a list of origins, where `*` means any origin.
    pub fn from_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        origins
            .into_iter()
            .map(Into::into)
            .fold(Self::new(), |cors, origin| {
                if origin == "*" {
                    Self {
                        allowed_origins: None,
                        ..cors
                    }
                } else {
                    cors.allow_origin(origin)
                }
            })
    }

    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        if let Some(origins) = self.allowed_origins.as_mut() {
            origins.insert(origin.into());
        }
        self
    }

    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        match &self.allowed_origins {
            None => true,
            Some(origins) => origins.contains(origin),
        }
    }

    /// Value for `Access-Control-Allow-Origin`, if the origin is accepted.
    ///
    /// Browsers reject `*` on credentialed requests, so with credentials
    /// enabled the request origin is echoed instead.
    fn allow_origin_value(&self, origin: Option<&str>) -> Option<String> {
        match (origin, &self.allowed_origins) {
            (Some(origin), None) if self.allow_credentials => Some(origin.to_string()),
            (_, None) => Some("*".to_string()),
            (Some(origin), Some(_)) if self.is_origin_allowed(origin) => Some(origin.to_string()),
            _ => None,
        }
    }

    /// Whether the request is a CORS preflight.
    pub fn is_preflight(&self, request: &HttpRequest) -> bool {
        request.method.eq_ignore_ascii_case("OPTIONS")
    }

    /// Answer a preflight request.
    pub fn preflight(&self, request: &HttpRequest) -> HttpResponse {
        let mut response = self.apply(request, HttpResponse::no_content());
        if let Some(max_age) = self.max_age {
            response = response.with_header("Access-Control-Max-Age", max_age.to_string());
        }
        response
    }

    /// Add CORS headers to a response.
    pub fn apply(&self, request: &HttpRequest, mut response: HttpResponse) -> HttpResponse {
        let Some(allow_origin) = self.allow_origin_value(request.header("origin")) else {
            return response;
        };

        if allow_origin != "*" {
            response = response.with_header("Vary", "Origin");
        }
        response = response
            .with_header("Access-Control-Allow-Origin", allow_origin)
            .with_header(
                "Access-Control-Allow-Methods",
                self.allowed_methods.join(", "),
            )
            .with_header(
                "Access-Control-Allow-Headers",
                self.allowed_headers.join(", "),
            );
        if self.allow_credentials {
            response = response.with_header("Access-Control-Allow-Credentials", "true");
        }
        response
    }
}

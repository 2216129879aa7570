//! # Cirrus Core
//!
//! The HTTP and runtime plumbing shared by Cirrus services: request and
//! response types, a small path router, a hyper-based server loop with CORS,
//! logging setup, and resilience patterns for calling remote services.
//!
//! ```rust,no_run
//! use cirrus_core::{Application, HttpResponse, Router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cirrus_core::Error> {
//!     let router = Router::new().get("/health", |_| async { HttpResponse::ok().with_json(&"ok") });
//!     Application::new(router)
//!         .listen(([0, 0, 0, 0], 8080).into())
//!         .await
//! }
//! ```

pub mod application;
pub mod cors;
pub mod error;
pub mod http;
pub mod logging;
pub mod resilience;
pub mod routing;

pub use application::Application;
pub use cors::CorsConfig;
pub use error::Error;
pub use http::{HttpRequest, HttpResponse, Json};
pub use routing::{HandlerFn, HttpMethod, Route, Router};

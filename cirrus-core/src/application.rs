// Application bootstrapper and HTTP server

use crate::{CorsConfig, Error, HttpRequest, HttpResponse, Router};
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// The main application struct
#[derive(Clone)]
pub struct Application {
    router: Arc<Router>,
    cors: Arc<CorsConfig>,
}

impl Application {
    /// Create an application with permissive CORS.
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            cors: Arc::new(CorsConfig::permissive()),
        }
    }

    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = Arc::new(cors);
        self
    }

    /// Dispatch a request: preflight, routing, error mapping, CORS headers.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        if self.cors.is_preflight(&request) {
            return self.cors.preflight(&request);
        }

        let cors_request = HttpRequest {
            body: Vec::new(),
            ..request.clone()
        };

        let response = match self.router.route(request).await {
            Ok(resp) => resp,
            Err(err) => {
                if err.is_server_error() {
                    error!(status = err.status_code(), error = %err, "request failed");
                } else {
                    debug!(status = err.status_code(), error = %err, "request rejected");
                }
                HttpResponse::from_error(&err)
            }
        };

        self.cors.apply(&cors_request, response)
    }

    /// Bind `addr` and serve until Ctrl-C.
    pub async fn listen(self, addr: SocketAddr) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve connections from `listener` until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        info!(addr = ?listener.local_addr().ok(), "server listening");
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => {
                    info!("shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            };

            let io = TokioIo::new(stream);
            let app = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let app = app.clone();
                    async move { handle_request(req, app).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(peer = %peer, error = ?err, "error serving connection");
                }
            });
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Convert between hyper and our request/response types.
async fn handle_request(
    req: Request<IncomingBody>,
    app: Application,
) -> Result<Response<Full<bytes::Bytes>>, hyper::Error> {
    let method = req.method().to_string();
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::new(method, path);
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            request
                .headers
                .insert(name.as_str().to_string(), value.to_string());
        }
    }
    request.body = req.collect().await?.to_bytes().to_vec();

    let started = std::time::Instant::now();
    let method = request.method.clone();
    let path = request.path.clone();
    let response = app.handle(request).await;
    info!(
        method = %method,
        path = %path,
        status = response.status,
        elapsed = ?started.elapsed(),
        "request completed"
    );

    let mut builder = Response::builder().status(response.status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    let body = Full::new(bytes::Bytes::from(response.body));
    Ok(builder.body(body).unwrap_or_else(|err| {
        error!(error = %err, "invalid response parts");
        let mut fallback = Response::new(Full::new(bytes::Bytes::new()));
        *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> Application {
        let router = Router::new()
            .get("/ok", |_| async { HttpResponse::ok().with_json(&"fine") })
            .get("/fail", |_| async {
                Err::<HttpResponse, _>(Error::Internal("upstream broke".into()))
            });
        Application::new(router)
    }

    #[tokio::test]
    async fn test_handle_adds_cors_headers() {
        let resp = app()
            .handle(HttpRequest::new("GET", "/ok").with_header("Origin", "http://a.test"))
            .await;
        assert_eq!(resp.status, 200);
        assert_eq!(
            resp.headers.get("Access-Control-Allow-Origin").map(String::as_str),
            Some("*")
        );
    }

    #[tokio::test]
    async fn test_handle_maps_errors_to_json() {
        let resp = app().handle(HttpRequest::new("GET", "/fail")).await;
        assert_eq!(resp.status, 500);
        let body: serde_json::Value = resp.json().unwrap();
        assert_eq!(body["error"], "Internal server error: upstream broke");
    }

    #[tokio::test]
    async fn test_handle_answers_preflight() {
        let resp = app().handle(HttpRequest::new("OPTIONS", "/anything")).await;
        assert_eq!(resp.status, 204);
    }

    #[tokio::test]
    async fn test_handle_unknown_route() {
        let resp = app().handle(HttpRequest::new("GET", "/missing")).await;
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = app().serve(listener, async {}).await;
        assert!(result.is_ok());
    }
}

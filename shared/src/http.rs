use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_http_service<S, E>(host: &str, port: u16, service: S) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, "Listening");
    serve_listener(listener, service).await
}

/// Accept loop on an already bound listener. Tests bind to port 0 and hand
/// the listener over so they know the address before serving starts.
pub async fn serve_listener<S, E>(listener: TcpListener, service: S) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let service_arc = Arc::new(service);

    loop {
        let (stream, _peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service_arc.clone();

        // Hand the connection to hyper; auto-detect h1/h2 on this socket
        tokio::spawn(async move {
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(error = %e, "Connection closed with error");
            }
        });
    }
}

/// Plain-text response carrying the canonical reason phrase of `status`.
pub fn make_boxed_error_response<E>(status: StatusCode) -> Response<BoxBody<Bytes, E>> {
    let reason = status.canonical_reason().unwrap_or("error");
    let mut response = Response::new(boxed(Bytes::from(format!("{reason}\n"))));
    *response.status_mut() = status;
    response
}

pub fn make_text_response<E>(status: StatusCode, text: &'static str) -> Response<BoxBody<Bytes, E>> {
    let mut response = Response::new(boxed(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response
}

pub fn make_json_response<T, E>(status: StatusCode, value: &T) -> Response<BoxBody<Bytes, E>>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_vec(value) {
        Ok(json) => {
            let mut response = Response::new(boxed(Bytes::from(json)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            make_boxed_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn boxed<E>(bytes: Bytes) -> BoxBody<Bytes, E> {
    Full::new(bytes).map_err(|e| match e {}).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;

    #[derive(Debug)]
    struct TestError(std::io::Error);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            self.0.fmt(f)
        }
    }

    impl std::error::Error for TestError {}

    impl From<std::io::Error> for TestError {
        fn from(e: std::io::Error) -> Self {
            TestError(e)
        }
    }

    struct JsonService;

    impl Service<Request<Incoming>> for JsonService {
        type Response = Response<BoxBody<Bytes, TestError>>;
        type Error = TestError;
        type Future =
            Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

        fn call(&self, req: Request<Incoming>) -> Self::Future {
            Box::pin(async move {
                let res = match req.uri().path() {
                    "/json" => make_json_response(StatusCode::OK, &serde_json::json!({"a": 1})),
                    "/text" => make_text_response(StatusCode::OK, "ok\n"),
                    _ => make_boxed_error_response(StatusCode::NOT_FOUND),
                };
                Ok(res)
            })
        }
    }

    #[tokio::test]
    async fn test_serve_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(serve_listener(listener, JsonService));

        let client = reqwest::Client::new();

        let response = client
            .get(format!("http://127.0.0.1:{port}/json"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(response.text().await.unwrap(), r#"{"a":1}"#);

        let response = client
            .get(format!("http://127.0.0.1:{port}/text"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "ok\n");

        let response = client
            .get(format!("http://127.0.0.1:{port}/missing"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.text().await.unwrap(), "Not Found\n");
    }
}

use crate::ServeError;
use crate::errors::EnricherError;
use crate::event::EnrichmentEvent;
use crate::handler::Enricher;
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use shared::http::{make_boxed_error_response, make_json_response, make_text_response};
use std::pin::Pin;
use std::sync::Arc;

type ServiceResponse = Response<BoxBody<Bytes, ServeError>>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl From<&EnricherError> for ErrorBody {
    fn from(e: &EnricherError) -> Self {
        ErrorBody {
            error: e.to_string(),
            kind: e.kind(),
        }
    }
}

/// `POST /invoke` runs one enrichment with the request body as the event.
/// `GET /health` answers `ok`.
pub struct InvokeService {
    enricher: Arc<Enricher>,
}

impl InvokeService {
    pub fn new(enricher: Arc<Enricher>) -> Self {
        InvokeService { enricher }
    }
}

impl Service<Request<Incoming>> for InvokeService {
    type Response = ServiceResponse;
    type Error = ServeError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let enricher = self.enricher.clone();
        Box::pin(async move { Ok(route(&enricher, req).await) })
    }
}

async fn route(enricher: &Enricher, req: Request<Incoming>) -> ServiceResponse {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => make_text_response(StatusCode::OK, "ok\n"),
        (&Method::POST, "/invoke") => invoke(enricher, req.into_body()).await,
        (_, "/health" | "/invoke") => make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED),
        _ => make_boxed_error_response(StatusCode::NOT_FOUND),
    }
}

async fn invoke(enricher: &Enricher, body: Incoming) -> ServiceResponse {
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return make_boxed_error_response(StatusCode::BAD_REQUEST);
        }
    };

    let event: EnrichmentEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            let err = EnricherError::InvalidEvent(e);
            tracing::warn!(error = %err, "Rejected invocation");
            return make_json_response(StatusCode::BAD_REQUEST, &ErrorBody::from(&err));
        }
    };

    match enricher.handle(&event).await {
        Ok(response) => make_json_response(StatusCode::OK, &response),
        Err(e) => make_json_response(StatusCode::INTERNAL_SERVER_ERROR, &ErrorBody::from(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::tests::{
        OUTPUT_BUCKET, SOURCE_BUCKET, SOURCE_KEY, scenario_event, start_graph, test_enricher,
    };
    use serde_json::{Value, json};
    use shared::http::serve_listener;
    use stores::blob::MemoryBlobStore;
    use tokio::net::TcpListener;

    async fn start_service(enricher: Enricher) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = InvokeService::new(Arc::new(enricher));
        tokio::spawn(async move {
            let _ = serve_listener::<_, ServeError>(listener, service).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_health() {
        let graph = start_graph().await;
        let url = start_service(test_enricher(&graph, Arc::new(MemoryBlobStore::new()))).await;

        let response = reqwest::get(format!("{url}/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "ok\n");

        let response = reqwest::get(format!("{url}/other")).await.unwrap();
        assert_eq!(response.status(), 404);

        let response = reqwest::get(format!("{url}/invoke")).await.unwrap();
        assert_eq!(response.status(), 405);
    }

    #[tokio::test]
    async fn test_invoke() {
        let graph = start_graph().await;
        let store = Arc::new(MemoryBlobStore::new());
        store.insert(SOURCE_BUCKET, SOURCE_KEY, "{}");
        let url = start_service(test_enricher(&graph, store.clone())).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{url}/invoke"))
            .json(&scenario_event())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.json::<Value>().await.unwrap(),
            json!({"version": "v0", "s3ObjectKey": "sp_cde_output/HR/Policy", "metadataUpdates": []})
        );
        assert!(
            store
                .object(OUTPUT_BUCKET, "sp_cde_output/HR/Policy_permissions.json")
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_invoke_errors() {
        let graph = start_graph().await;
        let url = start_service(test_enricher(&graph, Arc::new(MemoryBlobStore::new()))).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{url}/invoke"))
            .body("{\"s3Bucket\": 1}")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        assert_eq!(
            response.json::<Value>().await.unwrap()["kind"],
            "invalid_event"
        );

        // source object was never stored
        let response = client
            .post(format!("{url}/invoke"))
            .json(&scenario_event())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(
            response.json::<Value>().await.unwrap()["kind"],
            "upstream_call_failed"
        );
    }
}

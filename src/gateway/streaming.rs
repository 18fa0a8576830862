use std::sync::Arc;

use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use tokio::sync::mpsc;

use crate::core::evolution::{
    ChannelEventSink, EvolutionEngine, EvolutionEvent, StreamRequest, run_evolution_stream,
};

const EVENT_BUFFER: usize = 64;

/// `event: <name>\ndata: <json>\n\n`
pub fn format_sse_event(event: &EvolutionEvent) -> String {
    format!("event: {}\ndata: {}\n\n", event.name(), event.payload())
}

/// Run the preference stream on a background task and forward its events as
/// SSE frames. The body ends after the terminal event.
pub fn build_sse_response(engine: Arc<EvolutionEngine>, request: StreamRequest) -> Response<Body> {
    let (tx, mut rx) = mpsc::channel::<EvolutionEvent>(EVENT_BUFFER);

    tokio::spawn(async move {
        let sink = ChannelEventSink::new(tx);
        if let Err(e) = run_evolution_stream(&engine, &request, &sink).await {
            tracing::debug!("stream ended with failure: {e:#}");
        }
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok::<_, std::convert::Infallible>(format_sse_event(&event));
        }
    };

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/event-stream"),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-cache"),
    );
    response.headers_mut().insert(
        header::CONNECTION,
        header::HeaderValue::from_static("keep-alive"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvolutionConfig;
    use axum::body::to_bytes;

    #[test]
    fn frames_carry_name_and_payload() {
        let frame = format_sse_event(&EvolutionEvent::GenerationFailed {
            message: "proposer offline".to_string(),
        });
        assert_eq!(
            frame,
            "event: generation.failed\ndata: {\"message\":\"proposer offline\"}\n\n"
        );
    }

    #[tokio::test]
    async fn response_streams_until_terminal_event() {
        let engine = Arc::new(EvolutionEngine::mock(EvolutionConfig::default()));
        let response = build_sse_response(engine, StreamRequest::default());
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let names: Vec<&str> = text
            .lines()
            .filter_map(|line| line.strip_prefix("event: "))
            .collect();

        assert_eq!(names.first(), Some(&"stream.started"));
        assert_eq!(names.last(), Some(&"generation.completed"));
        assert!(!names.contains(&"generation.failed"));
        assert!(text.ends_with("\n\n"));
    }
}

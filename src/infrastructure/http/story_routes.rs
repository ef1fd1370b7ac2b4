//! Story generation API routes

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::dto::StageEvent;
use crate::application::ports::outbound::{SinkError, StageSinkPort};
use crate::application::services::{PipelineOrchestrator, StoryRequest};
use crate::infrastructure::state::AppState;

/// Forwards stage events onto the response channel as SSE frames
struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

#[async_trait]
impl StageSinkPort for ChannelSink {
    async fn on_stage_complete(&self, event: &StageEvent) -> Result<(), SinkError> {
        let frame = Event::default()
            .event("stage")
            .json_data(event)
            .map_err(|e| SinkError(e.to_string()))?;
        self.tx
            .send(frame)
            .await
            .map_err(|_| SinkError("client disconnected".to_string()))
    }
}

/// Generate a story, streaming stage events as they complete
///
/// The first frame carries the generation id. The final frame is either a
/// `story` event with the complete story or an `error` event naming the
/// failed stage and the last stage that finished. Dropping the connection
/// cancels the run before its next stage; in-flight calls finish normally.
pub async fn generate_story(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StoryRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Event>(64);
    let token = CancellationToken::new();

    let orchestrator =
        PipelineOrchestrator::new(state.client.clone(), state.pipeline_config.clone())
            .with_sink(Arc::new(ChannelSink { tx: tx.clone() }))
            .with_cancellation(token.clone());
    let generation_id = orchestrator.generation_id();

    tokio::spawn(async move {
        if let Ok(frame) = Event::default()
            .event("generation")
            .json_data(serde_json::json!({ "generation_id": generation_id }))
        {
            let _ = tx.send(frame).await;
        }

        let frame = match orchestrator.run_full_pipeline(request).await {
            Ok(story) => Event::default().event("story").json_data(&story),
            Err(failure) => Event::default().event("error").json_data(serde_json::json!({
                "error": failure.error.to_string(),
                "failed_stage": failure.error.stage(),
                "last_good_stage": failure.last_good_stage,
            })),
        };
        if let Ok(frame) = frame {
            let _ = tx.send(frame).await;
        }
    });

    // Tie the run's lifetime to the response stream: when the client goes
    // away the guard drops and cancels the token
    let guard = token.drop_guard();
    let stream = futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv()
            .await
            .map(|event| (Ok::<_, Infallible>(event), (rx, guard)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

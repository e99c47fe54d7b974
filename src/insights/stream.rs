//! Insight SSE stream
//!
//! Streams "insight ready" notifications for a check to the client. The
//! stream owns its broker subscription; when the client disconnects axum
//! drops the stream and the subscription unregisters itself.

use crate::error::ApiResult;
use crate::insights::InsightSubscription;
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use tracing::debug;
use uuid::Uuid;

/// `GET /insights/{check_id}/stream`
pub async fn stream_insights(
    State(state): State<SharedState>,
    Path(check_id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let subscription = state.broker.subscribe(check_id);

    debug!("Insight stream opened for check {}", check_id);

    let stream = futures::stream::unfold(
        subscription,
        |mut subscription: InsightSubscription| async move {
            let payload = subscription.recv().await?;
            let event = Event::default()
                .event("insight")
                .json_data(&payload)
                .unwrap_or_else(|_| Event::default().event("insight").data("{}"));
            Some((Ok(event), subscription))
        },
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

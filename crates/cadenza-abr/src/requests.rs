use std::collections::HashMap;

use web_time::Instant;

use crate::{RequestBegin, RequestEvent, RequestId, RequestProgress};

#[derive(Clone, Debug)]
struct PendingRequest {
    begin: RequestBegin,
    last_progress: Option<RequestProgress>,
}

/// In-flight segment requests of one track type.
///
/// Entries live from `Begin` to `End`. Events for unknown ids are ignored:
/// after [`clear`](Self::clear) the requests that were in flight still
/// report their progress and end.
#[derive(Clone, Debug, Default)]
pub struct PendingRequests {
    requests: HashMap<RequestId, PendingRequest>,
}

impl PendingRequests {
    pub fn apply(&mut self, event: RequestEvent) {
        match event {
            RequestEvent::Begin(begin) => {
                if self.requests.contains_key(&begin.id) {
                    tracing::warn!(id = %begin.id, "duplicate request begin");
                }
                self.requests.insert(
                    begin.id,
                    PendingRequest {
                        begin,
                        last_progress: None,
                    },
                );
            }
            RequestEvent::Progress(progress) => match self.requests.get_mut(&progress.id) {
                Some(pending) => pending.last_progress = Some(progress),
                None => tracing::trace!(id = %progress.id, "progress for unknown request"),
            },
            RequestEvent::End { id } => {
                if self.requests.remove(&id).is_none() {
                    tracing::trace!(%id, "end for unknown request");
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    /// Lowest bandwidth (bits/s) observed among in-flight requests.
    ///
    /// Each request contributes `bytes * 8 / (last_progress.at - sent_at)`;
    /// requests without progress contribute nothing.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    // positive, bounded by bytes * 8 / min elapsed
    pub fn slowest_bandwidth(&self) -> Option<u64> {
        self.requests
            .values()
            .filter_map(|pending| {
                let progress = pending.last_progress.as_ref()?;
                let elapsed = progress
                    .at
                    .saturating_duration_since(pending.begin.sent_at)
                    .as_secs_f64();
                if elapsed <= 0.0 {
                    return None;
                }
                #[expect(clippy::cast_precision_loss)]
                let bps = (progress.bytes as f64) * 8.0 / elapsed;
                Some(bps.round() as u64)
            })
            .min()
    }

    /// Requests that have been in flight for longer than the media they fetch.
    pub fn overdue(&self, now: Instant) -> impl Iterator<Item = RequestId> + '_ {
        self.requests.values().filter_map(move |pending| {
            let elapsed = now
                .saturating_duration_since(pending.begin.sent_at)
                .as_secs_f64();
            (elapsed > pending.begin.duration_secs).then_some(pending.begin.id)
        })
    }
}

use crate::{IdExchanger, ReferenceIdExchanger, SpanIdExchanger};
use apm_collector_buffer::{BufferWriter, RecordDispatcher};
use apm_collector_stream::Graph;
use apm_collector_types::{export::async_trait, Outcome, Segment};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a serialized segment comes from.
pub enum Source {
    /// Received from an agent. Segments that cannot be processed yet are buffered.
    Agent,
    /// Replayed from the buffer. Segments that cannot be processed yet stay in the buffer.
    Buffer,
}

/// Turns serialized segments into stored ones: decode, exchange identifiers, then hand the
/// segment to the segment graph.
pub struct SegmentParser {
    spans: SpanIdExchanger,
    refs: ReferenceIdExchanger,
    graph: Arc<Graph<Segment>>,
    writer: Arc<BufferWriter>,
}

impl std::fmt::Debug for SegmentParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentParser")
            .field("graph", &self.graph)
            .field("writer", &self.writer)
            .finish()
    }
}

impl SegmentParser {
    pub fn new(
        spans: SpanIdExchanger,
        refs: ReferenceIdExchanger,
        graph: Arc<Graph<Segment>>,
        writer: Arc<BufferWriter>,
    ) -> Self {
        Self {
            spans,
            refs,
            graph,
            writer,
        }
    }

    /// Process one serialized segment.
    ///
    /// From an agent, a segment that is retryable is appended to the buffer and reported as
    /// `Success`, because the buffer now owns it; only a failed append is `Retryable`.
    /// From the buffer, `Retryable` is returned as is, so the reader halts at this record.
    /// A segment that cannot be decoded is `Fatal` either way.
    pub async fn parse(&self, bytes: &[u8], source: Source) -> Outcome {
        let outcome = self.process(bytes).await;
        match (outcome, source) {
            (Outcome::Retryable(reason), Source::Agent) => {
                log::debug!("Buffering segment: {reason}");
                self.writer.append(bytes).await
            }
            (outcome, _) => outcome,
        }
    }

    async fn process(&self, bytes: &[u8]) -> Outcome {
        let mut segment = match Segment::from_bytes(bytes) {
            Ok(segment) => segment,
            Err(e) => return Outcome::fatal(format!("Failed to decode segment: {e}")),
        };

        let outcome = self.exchange(&mut segment).await;
        if !outcome.is_success() {
            return outcome;
        }

        let segment_id = segment.segment_id.clone();
        match self.graph.submit(segment).await {
            Outcome::Success => Outcome::Success,
            Outcome::Retryable(reason) => {
                Outcome::Retryable(format!("Segment {segment_id} not accepted: {reason}"))
            }
            fatal => fatal,
        }
    }

    /// Every span and reference is attempted even after a failure, so that the unknown
    /// identifiers of the segment get registered in one pass. The first failure is returned.
    async fn exchange(&self, segment: &mut Segment) -> Outcome {
        let application_id = segment.application_id;
        let mut first_failure = None;
        for span in segment.spans.iter_mut() {
            let outcome = self.spans.exchange(span, application_id).await;
            if !outcome.is_success() && first_failure.is_none() {
                first_failure = Some(outcome);
            }
            for reference in span.refs.iter_mut() {
                let outcome = self.refs.exchange(reference, application_id).await;
                if !outcome.is_success() && first_failure.is_none() {
                    first_failure = Some(outcome);
                }
            }
        }
        first_failure.unwrap_or(Outcome::Success)
    }
}

#[async_trait]
impl RecordDispatcher for SegmentParser {
    async fn dispatch(&self, record: &[u8]) -> Outcome {
        self.parse(record, Source::Buffer).await
    }
}

use serde::{Deserialize, Serialize};

use crate::{RecordType, SegmentErr, StreamRecord, SurrogateId, UNKNOWN_ID};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// A trace segment: the spans one application instance recorded for one trace.
pub struct Segment {
    pub segment_id: String,
    pub trace_ids: Vec<String>,
    pub application_id: SurrogateId,
    pub application_instance_id: SurrogateId,
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// A span. Textual fields are cleared once their numeric ids are resolved.
pub struct Span {
    pub span_id: i32,
    pub parent_span_id: i32,
    pub start_time: i64,
    pub end_time: i64,
    pub operation_name: String,
    pub operation_name_id: SurrogateId,
    pub peer: String,
    pub peer_id: SurrogateId,
    pub is_error: bool,
    pub refs: Vec<SegmentReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// A cross-process reference to the parent segment.
pub struct SegmentReference {
    pub parent_segment_id: String,
    pub parent_span_id: i32,
    pub parent_application_instance_id: SurrogateId,
    pub entry_application_instance_id: SurrogateId,
    pub entry_service_name: String,
    pub entry_service_id: SurrogateId,
    pub parent_service_name: String,
    pub parent_service_id: SurrogateId,
    pub network_address: String,
    pub network_address_id: SurrogateId,
}

impl Segment {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SegmentErr> {
        let segment: Self = serde_json::from_slice(bytes)?;
        if segment.segment_id.is_empty() {
            return Err(SegmentErr::MissingSegmentId);
        }
        Ok(segment)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SegmentErr> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Whether every textual identifier has been exchanged for its numeric id.
    pub fn is_resolved(&self) -> bool {
        self.spans.iter().all(|span| {
            span.is_resolved() && span.refs.iter().all(SegmentReference::is_resolved)
        })
    }

    /// Earliest span start, in unix milliseconds.
    pub fn start_time(&self) -> Option<i64> {
        self.spans.iter().map(|s| s.start_time).min()
    }
}

impl Span {
    pub fn is_resolved(&self) -> bool {
        is_resolved(self.operation_name_id, &self.operation_name)
            && is_resolved(self.peer_id, &self.peer)
    }
}

impl SegmentReference {
    pub fn is_resolved(&self) -> bool {
        is_resolved(self.entry_service_id, &self.entry_service_name)
            && is_resolved(self.parent_service_id, &self.parent_service_name)
            && is_resolved(self.network_address_id, &self.network_address)
    }
}

/// A field pair is resolved if its id is set, or if there was never a name to resolve.
fn is_resolved(id: SurrogateId, name: &str) -> bool {
    id != UNKNOWN_ID || name.is_empty()
}

impl StreamRecord for Segment {
    const RECORD_TYPE: RecordType = RecordType::new("segment");

    fn record_id(&self) -> String {
        self.segment_id.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_segment_bytes() {
        let segment = Segment {
            segment_id: "1.2.3".to_owned(),
            application_id: 2,
            spans: vec![Span {
                operation_name: "/users".to_owned(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let bytes = segment.to_bytes().unwrap();
        assert_eq!(Segment::from_bytes(&bytes).unwrap(), segment);
        assert!(!segment.is_resolved());

        assert!(matches!(
            Segment::from_bytes(b"{}"),
            Err(SegmentErr::MissingSegmentId)
        ));
        assert!(matches!(
            Segment::from_bytes(b"not json"),
            Err(SegmentErr::SerdeJson(_))
        ));
    }

    #[test]
    fn test_resolved() {
        let mut span = Span {
            peer: "10.0.0.1:3306".to_owned(),
            ..Default::default()
        };
        assert!(!span.is_resolved());
        span.peer_id = 7;
        span.peer.clear();
        assert!(span.is_resolved());
        assert!(SegmentReference::default().is_resolved());
    }
}

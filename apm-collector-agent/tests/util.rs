#![allow(dead_code)]
use apm_collector_types::{Segment, SegmentReference, Span, SurrogateId};
use std::{
    path::PathBuf,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> std::io::Result<PathBuf> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let path = std::env::temp_dir().join(format!("apm-collector-{name}-{nanos}"));
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

pub fn span(operation_name: &str, peer: &str) -> Span {
    Span {
        span_id: 1,
        parent_span_id: -1,
        start_time: 1_511_346_225_123,
        end_time: 1_511_346_225_456,
        operation_name: operation_name.to_owned(),
        peer: peer.to_owned(),
        ..Default::default()
    }
}

pub fn reference(instance_id: SurrogateId, entry: &str, parent: &str, address: &str) -> SegmentReference {
    SegmentReference {
        parent_segment_id: "parent".to_owned(),
        parent_span_id: 1,
        parent_application_instance_id: instance_id,
        entry_application_instance_id: instance_id,
        entry_service_name: entry.to_owned(),
        parent_service_name: parent.to_owned(),
        network_address: address.to_owned(),
        ..Default::default()
    }
}

pub fn segment(segment_id: &str, application_id: SurrogateId, spans: Vec<Span>) -> Segment {
    Segment {
        segment_id: segment_id.to_owned(),
        trace_ids: vec![format!("trace-{segment_id}")],
        application_id,
        application_instance_id: application_id,
        spans,
    }
}

pub async fn wait_until<F: Fn() -> bool>(f: F) -> bool {
    for _ in 0..500 {
        if f() {
            return true;
        }
        apm_collector_runtime::sleep(Duration::from_millis(10)).await;
    }
    f()
}

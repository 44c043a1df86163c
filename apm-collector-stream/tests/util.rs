#![allow(dead_code)]
use apm_collector_stream::Worker;
use apm_collector_types::{export::async_trait, Outcome, RecordType, StreamRecord};
use flume::{Receiver, Sender};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Num(pub u32);

impl StreamRecord for Num {
    const RECORD_TYPE: RecordType = RecordType::new("num");

    fn record_id(&self) -> String {
        self.0.to_string()
    }
}

pub struct Add(pub u32);

#[async_trait]
impl Worker<Num> for Add {
    async fn process(&mut self, record: &mut Num) -> Outcome {
        record.0 += self.0;
        Outcome::Success
    }
}

pub struct Mul(pub u32);

#[async_trait]
impl Worker<Num> for Mul {
    async fn process(&mut self, record: &mut Num) -> Outcome {
        record.0 *= self.0;
        Outcome::Success
    }
}

#[derive(Clone, Default)]
pub struct Collect {
    pub seen: Arc<Mutex<Vec<u32>>>,
    pub idle: Arc<Mutex<usize>>,
}

impl Collect {
    pub fn seen(&self) -> Vec<u32> {
        self.seen.lock().unwrap().clone()
    }

    pub fn idle(&self) -> usize {
        *self.idle.lock().unwrap()
    }
}

#[async_trait]
impl Worker<Num> for Collect {
    async fn process(&mut self, record: &mut Num) -> Outcome {
        self.seen.lock().unwrap().push(record.0);
        Outcome::Success
    }

    async fn on_idle(&mut self) {
        *self.idle.lock().unwrap() += 1;
    }
}

/// Announces each record on `started`, then waits for a permit on `gate` before
/// collecting it.
pub struct Gate {
    pub started: Sender<u32>,
    pub gate: Receiver<()>,
    pub collect: Collect,
}

#[async_trait]
impl Worker<Num> for Gate {
    async fn process(&mut self, record: &mut Num) -> Outcome {
        self.started.send_async(record.0).await.ok();
        self.gate.recv_async().await.ok();
        self.collect.process(record).await
    }
}

/// Fails each record `failures` times before accepting it.
#[derive(Clone)]
pub struct Flaky {
    pub failures: u32,
    pub attempts: Arc<Mutex<HashMap<u32, u32>>>,
    pub collect: Collect,
}

#[async_trait]
impl Worker<Num> for Flaky {
    async fn process(&mut self, record: &mut Num) -> Outcome {
        let attempts = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(record.0).or_default();
            *n += 1;
            *n
        };
        if attempts <= self.failures {
            return Outcome::retryable("flaky");
        }
        self.collect.process(record).await
    }
}

pub async fn wait_until<F: Fn() -> bool>(f: F) -> bool {
    for _ in 0..200 {
        if f() {
            return true;
        }
        apm_collector_runtime::sleep(Duration::from_millis(10)).await;
    }
    f()
}

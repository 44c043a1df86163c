use apm_collector_buffer::BufferErr;
use apm_collector_core::BootstrapErr;
use apm_collector_stream::GraphErr;
use apm_collector_types::CollectorResult;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentErr {
    #[error("BufferErr: {0}")]
    Buffer(#[from] BufferErr),
    #[error("GraphErr: {0}")]
    Graph(#[from] GraphErr),
    #[error("BootstrapErr: {0}")]
    Bootstrap(#[from] BootstrapErr),
    #[error("{0} has not been started")]
    NotStarted(&'static str),
}

pub type AgentResult<T> = CollectorResult<T, AgentErr>;

impl From<AgentErr> for BootstrapErr {
    fn from(e: AgentErr) -> Self {
        match e {
            AgentErr::Bootstrap(e) => e,
            e => BootstrapErr::Provider {
                provider: "agent".to_owned(),
                source: Box::new(e),
            },
        }
    }
}

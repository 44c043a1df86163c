pub use async_trait::async_trait;
pub use futures;

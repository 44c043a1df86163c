//! ### `apm-collector-core`: modules and bootstrap
//!
//! The collector is assembled from modules, each implemented by a [`ModuleProvider`].
//! A provider declares the modules it requires; [`BootstrapFlow`] starts providers in an
//! order consistent with those requirements, and rejects cycles.

mod error;
mod flow;
mod module;

pub use error::*;
pub use flow::*;
pub use module::*;

//! Built-in health checks for the input pipeline

pub mod config;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod state_buffers;

pub use config::ConfigCheck;
pub use pipeline::PipelineCheck;
pub use registry::RegistryCheck;
pub use resolver::ResolverCheck;
pub use state_buffers::StateBufferCheck;

pub mod factory;
pub mod gemini;
mod gemini_types;
pub mod http_client;
pub mod traits;

pub use factory::{LlmBackend, create_llm_backend, create_provider};
pub use gemini::GeminiProvider;
pub use http_client::{build_provider_client, build_provider_client_with_timeout};
pub use traits::Provider;

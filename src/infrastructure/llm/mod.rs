//! LLM provider implementations

mod http_client;
mod openai;

pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::{GROQ_BASE_URL, OPENAI_BASE_URL, OpenAiCompatibleProvider};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;

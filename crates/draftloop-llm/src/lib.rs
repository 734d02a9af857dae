mod openai;
mod output;
mod traits;

pub use openai::{OpenAiGenerator, DEFAULT_API_KEY_ENV};
pub use output::Generation;
pub use traits::{
    ChatMessage, GenerationConfig, GenerationError, ProviderType, Role, TextGenerator,
    DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};

/// Create a generator by provider, reading its API key from `api_key_env`
pub fn create_generator(
    provider: ProviderType,
    api_key_env: &str,
    endpoint: Option<&str>,
) -> Result<Box<dyn TextGenerator>, GenerationError> {
    let mut generator = OpenAiGenerator::from_env(provider, api_key_env)?;
    if let Some(endpoint) = endpoint {
        generator = generator.with_endpoint(endpoint);
    }
    Ok(Box::new(generator))
}

//! `dirflow fallback`: print the envelope a request would get offline.

use dirflow_chat::ResponseBuilder;
use dirflow_core::error::Error;

pub async fn run(
    message: &str,
    error: Option<&str>,
    reason: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config();
    let builder = ResponseBuilder::new(&config.response);

    let envelope = match error {
        Some(text) => builder.build_error(
            &Error::Internal(text.to_string()),
            Some(config.default_provider.as_str()),
            config.default_model_for(&config.default_provider),
            message,
            None,
        ),
        None => builder.build_fallback(message, None, reason),
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prints_offline_and_error_envelopes() {
        assert!(run("list files", None, "offline mode").await.is_ok());
        assert!(run("help", Some("HTTP 429"), "unused").await.is_ok());
    }
}

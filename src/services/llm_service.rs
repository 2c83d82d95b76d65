//! LLM service - capability layer
//!
//! Summarizes chunks and documents through an OpenAI-compatible chat API
//! (`async-openai`). Any OpenAI-compatible endpoint and model can be used.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::SummarizerError;
use crate::models::{ChunkSummary, DocumentSummary};
use crate::services::prompts;
use crate::services::summarizer::Summarizer;

/// LLM-backed summarizer
///
/// Handles one chunk or one document per call. Knows nothing about jobs,
/// progress or ordering.
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    /// Plain chat call, returns the trimmed response text
    ///
    /// Transport and API failures are transient; an empty answer is permanent.
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, SummarizerError> {
        debug!(
            "calling LLM, model: {}, user message: {} chars",
            self.model_name,
            user_message.len()
        );

        let build_err = |e: async_openai::error::OpenAIError| {
            SummarizerError::permanent(format!("invalid LLM request: {e}"))
        };

        let mut messages = Vec::new();
        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(build_err)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_err)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(build_err)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API call failed: {}", e);
            SummarizerError::transient(format!("LLM API call failed: {e}"))
        })?;

        debug!("LLM API call succeeded");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| SummarizerError::permanent("LLM returned empty content"))?;

        Ok(content)
    }
}

#[async_trait]
impl Summarizer for LlmService {
    async fn summarize_chunk(
        &self,
        start_page: u32,
        end_page: u32,
        text: &str,
    ) -> Result<ChunkSummary, SummarizerError> {
        let user_message = prompts::chunk_user_message(start_page, end_page, text);
        let response = self
            .send_to_llm(&user_message, Some(prompts::CHUNK_SYSTEM_PROMPT))
            .await?;
        parse_json_response(&response)
    }

    async fn summarize_document(
        &self,
        chunk_summaries: &[ChunkSummary],
        ranked_topics: &[String],
    ) -> Result<DocumentSummary, SummarizerError> {
        let user_message = prompts::document_user_message(chunk_summaries, ranked_topics);
        let response = self
            .send_to_llm(&user_message, Some(prompts::DOCUMENT_SYSTEM_PROMPT))
            .await?;
        parse_json_response(&response)
    }
}

/// Decode the JSON object in an LLM answer
///
/// Accepts a bare object, a fenced code block, or an object surrounded by prose.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Result<T, SummarizerError> {
    let fence = Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```")
        .map_err(|e| SummarizerError::permanent(e.to_string()))?;

    let candidate = if let Some(captures) = fence.captures(response) {
        captures.get(1).map_or(response, |m| m.as_str())
    } else {
        match (response.find('{'), response.rfind('}')) {
            (Some(start), Some(end)) if start < end => &response[start..=end],
            _ => response,
        }
    };

    serde_json::from_str(candidate).map_err(|e| {
        warn!(
            "could not parse LLM response as JSON: {} ({})",
            e,
            crate::utils::logging::truncate_text(response, 120)
        );
        SummarizerError::permanent(format!("unparsable LLM response: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_object() {
        let parsed: DocumentSummary =
            parse_json_response(r#"{"document_summary": "Rivers.", "primary_topics": ["water"]}"#)
                .unwrap();
        assert_eq!(parsed.document_summary, "Rivers.");
        assert_eq!(parsed.primary_topics, vec!["water"]);
    }

    #[test]
    fn test_parse_fenced_block() {
        let response = "Here you go:\n```json\n{\"summary\": \"About floods.\", \"topics\": [\"floods\"]}\n```\nDone.";
        let parsed: ChunkSummary = parse_json_response(response).unwrap();
        assert_eq!(parsed.summary, "About floods.");
        assert_eq!(parsed.topics, vec!["floods"]);
    }

    #[test]
    fn test_parse_object_inside_prose() {
        let response = "Sure! {\"summary\": \"x\"} Hope that helps.";
        let parsed: ChunkSummary = parse_json_response(response).unwrap();
        assert_eq!(parsed.summary, "x");
    }

    #[test]
    fn test_unparsable_response_is_permanent() {
        let err = parse_json_response::<ChunkSummary>("I cannot help with that.").unwrap_err();
        assert!(!err.is_transient());

        let err = parse_json_response::<ChunkSummary>(r#"{"topics": []}"#).unwrap_err();
        assert!(!err.is_transient());
    }

    /// Needs LLM_API_KEY (and optionally LLM_API_BASE_URL / LLM_MODEL_NAME)
    #[tokio::test]
    #[ignore]
    async fn test_summarize_chunk_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env().unwrap();
        let service = LlmService::new(&config);

        let summary = service
            .summarize_chunk(
                1,
                1,
                "Hurricane Katrina struck the Gulf Coast in 2005, flooding New Orleans.",
            )
            .await
            .unwrap();

        println!("{:#?}", summary);
        assert!(!summary.summary.is_empty());
    }
}

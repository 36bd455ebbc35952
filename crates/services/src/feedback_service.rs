use std::env;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use lingua_core::model::{LessonId, NewConversation, UserId};
use storage::repository::ConversationRepository;

use crate::Clock;
use crate::error::FeedbackError;

const COACH_PROMPT: &str = "You are a friendly language coach helping a learner practice English \
numbers 1-10. Give short, encouraging feedback on their pronunciation and correctness. If they \
miss numbers, suggest the correct form.";

/// Chat-completion endpoint settings.
#[derive(Clone, Debug)]
pub struct FeedbackConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl FeedbackConfig {
    /// Reads `LINGUA_AI_API_KEY`, `LINGUA_AI_BASE_URL` and `LINGUA_AI_MODEL`.
    /// `None` when no key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("LINGUA_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("LINGUA_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("LINGUA_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// A spoken practice attempt, already transcribed on the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedbackRequest {
    pub lesson_id: Option<LessonId>,
    pub transcript: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackReply {
    pub feedback: String,
}

/// Canned reply used whenever the coach model is unavailable.
#[must_use]
pub fn fallback_feedback(transcript: &str) -> String {
    format!(
        "Thanks! I heard: \"{transcript}\". Try to pronounce numbers clearly and steadily. \
         Say them one by one: one, two, three..."
    )
}

/// Coaching feedback on practice transcripts, logged to the conversation history.
#[derive(Clone)]
pub struct FeedbackService {
    clock: Clock,
    client: Client,
    config: Option<FeedbackConfig>,
    conversations: Arc<dyn ConversationRepository>,
}

impl FeedbackService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: Option<FeedbackConfig>,
        conversations: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            clock,
            client: Client::new(),
            config,
            conversations,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Produce feedback for a transcript and append the exchange to the
    /// learner's conversation history.
    ///
    /// Neither model nor log failures surface. The fallback text stands in for
    /// the model and a failed log write is only reported through tracing.
    pub async fn feedback(&self, request: FeedbackRequest) -> FeedbackReply {
        let mut feedback = fallback_feedback(&request.transcript);

        if self.enabled() && !request.transcript.is_empty() {
            match self.ask_coach(&request.transcript).await {
                Ok(reply) => feedback = reply,
                Err(err) => {
                    tracing::warn!(user_id = %request.user_id, error = %err, "coach request failed, using fallback");
                }
            }
        }

        let FeedbackRequest {
            lesson_id,
            transcript,
            user_id,
        } = request;
        let logged = self
            .conversations
            .append_conversation(NewConversation {
                user_id,
                lesson_id,
                user_input: Some(transcript),
                model_response: Some(feedback.clone()),
                created_at: self.clock.now(),
            })
            .await;
        if let Err(err) = logged {
            tracing::warn!(%user_id, ?lesson_id, error = %err, "conversation log failed");
        }

        FeedbackReply { feedback }
    }

    /// # Errors
    ///
    /// Returns `FeedbackError` when the service is disabled, the request fails,
    /// or the response is empty.
    async fn ask_coach(&self, transcript: &str) -> Result<String, FeedbackError> {
        let config = self.config.as_ref().ok_or(FeedbackError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: COACH_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Learner said: {transcript}"),
                },
            ],
            temperature: 0.4,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedbackError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(FeedbackError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

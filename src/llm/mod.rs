//! Chat-completion module.
//!
//! This module provides:
//! * [`ChatGateway`] — async trait implemented by chat backends.
//! * [`OpenAiChat`] — OpenAI-compatible REST implementation.
//! * [`ModelChoice`] — user-facing model selection and its service model id.
//! * [`ChatServiceError`] — error variants for chat calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_assistant::config::AppConfig;
//! use voice_assistant::conversation::ConversationState;
//! use voice_assistant::credential::Credential;
//! use voice_assistant::llm::{ChatGateway, OpenAiChat};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let key = Credential::parse("sk-...").unwrap();
//!     let chat = OpenAiChat::from_config(&config.chat, key);
//!
//!     let mut state = ConversationState::new(config.chat.system_prompt.clone());
//!     state.append_user_turn("안녕", voice_assistant::conversation::Timestamp::now());
//!
//!     let reply = chat
//!         .complete(state.history(), config.chat.model.service_model_id())
//!         .await
//!         .unwrap();
//!     println!("{reply}");
//! }
//! ```

pub mod chat;
pub mod model;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use chat::{ChatGateway, ChatServiceError, OpenAiChat};
pub use model::ModelChoice;

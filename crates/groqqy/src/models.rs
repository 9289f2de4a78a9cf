//! These models represent the objects passed around by the agent
//!
//! Internally the conversation is kept in the same shape the OpenAI-compatible
//! chat-completion endpoints expect, so the stored message list is exactly the
//! payload sent on every call and can be replayed without any other state:
//! - user / assistant messages carry plain text
//! - assistant messages may also carry tool call requests
//! - tool messages carry the result text and the id of the call they answer
//!
//! Tool schemas are a tagged variant: function tools are executed locally,
//! platform tools are executed by the model's backend and only declared.
pub mod message;
pub mod role;
pub mod tool;

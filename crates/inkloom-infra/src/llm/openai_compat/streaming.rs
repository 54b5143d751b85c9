//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] chunks to the
//! provider-agnostic [`StreamEvent`] enum defined in `inkloom-types`. Only
//! text deltas are surfaced; finish reasons and usage chunks carry nothing
//! the invocation contract needs.

use std::pin::Pin;

use futures_util::{Stream, StreamExt};

use async_openai::types::chat::ChatCompletionResponseStream;

use inkloom_types::llm::{LlmError, StreamEvent};

/// Map an async-openai [`ChatCompletionResponseStream`] to a stream of
/// [`StreamEvent`]s.
///
/// The returned stream emits a [`StreamEvent::TextDelta`] per non-empty
/// content chunk and a single [`StreamEvent::Done`] when the upstream
/// stream ends. A mid-stream error is terminal.
pub fn map_openai_stream(
    stream: ChatCompletionResponseStream,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        let mut stream = stream;

        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream {
                message: e.to_string(),
            })?;

            // Typically one choice; usage-only final chunks have none.
            for choice in &chunk.choices {
                if let Some(text) = &choice.delta.content {
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta { text: text.clone() };
                    }
                }
            }
        }

        yield StreamEvent::Done;
    })
}

//! The completion driver seam.

use crate::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;
use impresario_error::ImpresarioResult;

/// Core trait every reasoning backend must implement.
///
/// A driver turns one request into one freeform text response. The engine
/// treats the backend as a black box: prompts go in, text comes out, and
/// every structural expectation (JSON arrays of drafts, JSON worker output)
/// is enforced by lenient extraction on the calling side. Swapping a hosted
/// API for a scripted stand-in changes nothing above this trait.
#[async_trait]
pub trait CompletionDriver: Send + Sync {
    /// Generate model output for a single-turn request.
    async fn complete(&self, req: &CompletionRequest) -> ImpresarioResult<CompletionResponse>;

    /// Provider name (e.g., "openai", "scripted").
    fn provider_name(&self) -> &'static str;

    /// Model identifier (e.g., "gpt-4o-mini").
    fn model_name(&self) -> &str;
}

//! Request, response, and summary types shared across the interface.

use serde::{Deserialize, Serialize};

/// A single-turn completion request.
///
/// Both the decision engine and the worker executor speak this shape: an
/// optional system framing plus one user prompt. The driver decides how it
/// maps onto the provider's wire format.
///
/// # Examples
///
/// ```
/// use impresario_interface::CompletionRequest;
///
/// let request = CompletionRequest::new("List three rivals for the diva.")
///     .with_system("You are the lore keeper of a variety show.")
///     .with_temperature(0.8);
/// assert!(request.system.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CompletionRequest {
    /// Optional system framing
    pub system: Option<String>,
    /// The user prompt
    pub prompt: String,
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Model identifier to use
    pub model: Option<String>,
}

impl CompletionRequest {
    /// Request with only a user prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Set the system framing.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token ceiling.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Freeform text back from the driver.
///
/// Callers never assume structure here; anything JSON-shaped is recovered
/// by lenient extraction on the caller's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub text: String,
}

impl CompletionResponse {
    /// Wrap generated text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Row counts per domain table, assembled for the blackboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShowCounts {
    /// Rows in `entities`
    pub entities: i64,
    /// Rows in `canon_facts`
    pub canon_facts: i64,
    /// Rows in `canon_rules`
    pub canon_rules: i64,
    /// Rows in `conflicts`
    pub conflicts: i64,
    /// Rows in `blueprints`
    pub blueprints: i64,
    /// Rows in `teasers`
    pub teasers: i64,
    /// Rows in `scripts`
    pub scripts: i64,
    /// Rows in `episodes`
    pub episodes: i64,
}

use std::sync::Arc;

use lexdoc_core::error::AppError;

/// A chat-completion capable model endpoint.
pub trait GenerativeProvider: Send + Sync {
    /// Short label used in logs and error details.
    fn name(&self) -> &str;

    fn complete(&self, prompt: &str) -> Result<String, AppError>;
}

/// Successful completion together with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub provider: String,
    pub text: String,
}

/// Prioritized generative providers with first-success semantics.
#[derive(Clone, Default)]
pub struct GenerationChain {
    providers: Vec<Arc<dyn GenerativeProvider>>,
}

impl GenerationChain {
    pub fn new(providers: Vec<Arc<dyn GenerativeProvider>>) -> Self {
        Self { providers }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Try each provider in order; the first non-empty answer wins.
    pub fn complete(&self, prompt: &str) -> Result<Completion, AppError> {
        if self.providers.is_empty() {
            return Err(AppError::new(
                "AI_GENERATION_UNCONFIGURED",
                "No generative provider is configured",
            ));
        }

        let mut failures: Vec<String> = Vec::new();
        let mut retryable = false;
        for p in self.providers.iter() {
            match p.complete(prompt) {
                Ok(text) if !text.trim().is_empty() => {
                    if !failures.is_empty() {
                        tracing::info!(provider = p.name(), "generation succeeded on fallback provider");
                    }
                    return Ok(Completion {
                        provider: p.name().to_string(),
                        text,
                    });
                }
                Ok(_) => {
                    tracing::warn!(provider = p.name(), "generative provider returned empty text");
                    failures.push(format!("{}: empty response", p.name()));
                }
                Err(e) => {
                    tracing::warn!(provider = p.name(), error = %e, "generative provider failed");
                    retryable |= e.retryable;
                    failures.push(format!("{}: {}", p.name(), e));
                }
            }
        }

        Err(
            AppError::new("AI_GENERATION_FAILED", "All generative providers failed")
                .with_details(failures.join("; "))
                .with_retryable(retryable),
        )
    }
}

impl std::fmt::Debug for GenerationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

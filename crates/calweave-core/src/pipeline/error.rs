use calweave_textgen::GenerationError;

use crate::domain::{CalendarError, StepId};
use crate::prompt::PromptError;

/// Why a pipeline step produced no result.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("{step} requires a non-empty result from {upstream}")]
    MissingUpstream { step: StepId, upstream: StepId },

    #[error("generation failed for {step}: {error}")]
    Generation {
        step: StepId,
        #[source]
        error: GenerationError,
    },

    #[error("{step} produced a non-object result")]
    MalformedResult { step: StepId },

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

//! Shared helpers for the pipeline stages.

use crate::ports::llm_transport::GatewayError;
use consensus_domain::{ExpertError, ExpertErrorKind};

/// Convert a gateway failure into the error recorded on a response.
pub(crate) fn expert_error(error: &GatewayError) -> ExpertError {
    let kind = match error {
        GatewayError::Timeout => ExpertErrorKind::Timeout,
        GatewayError::RateLimited => ExpertErrorKind::RateLimited,
        GatewayError::TransportFailure(_) => ExpertErrorKind::TransportFailure,
        GatewayError::InvalidResponse(_) | GatewayError::EmptyPrompt => {
            ExpertErrorKind::InvalidResponse
        }
    };
    ExpertError::new(kind, error.to_string())
}

//! Error types for splitfire-client

use splitfire_core::SyncError;
use thiserror::Error;

/// Client-side error, converted into the core taxonomy at the port boundary
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status} during {operation}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Could not decode response: {message}")]
    Decode { message: String },
}

impl ClientError {
    /// Build a decode error from any display-able cause
    pub fn decode(message: impl std::fmt::Display) -> Self {
        ClientError::Decode {
            message: message.to_string(),
        }
    }
}

impl From<ClientError> for SyncError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Http(e) => SyncError::Transport {
                message: e.to_string(),
            },
            ClientError::Api {
                operation,
                status,
                body,
            } => {
                // Rejected writes carry the body back for the audit trail;
                // everything else is a transport-level failure.
                if operation == "create" || operation == "update" {
                    SyncError::RemoteWrite {
                        operation,
                        message: format!("{}: {}", status, body),
                    }
                } else {
                    SyncError::Transport {
                        message: format!("{} failed with {}: {}", operation, status, body),
                    }
                }
            }
            ClientError::Decode { message } => SyncError::Transport { message },
        }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use splitfire_core::ErrorCode;

    #[test]
    fn test_rejected_write_maps_to_remote_write_error() {
        let error = ClientError::Api {
            operation: "create".to_string(),
            status: 422,
            body: "{\"message\":\"Duplicate of transaction #10\"}".to_string(),
        };
        let sync: SyncError = error.into();
        assert_eq!(sync.code(), ErrorCode::RemoteWriteError);
        assert!(sync.to_string().contains("Duplicate of transaction #10"));
    }

    #[test]
    fn test_rejected_read_maps_to_transport_error() {
        let error = ClientError::Api {
            operation: "accounts".to_string(),
            status: 500,
            body: "server error".to_string(),
        };
        let sync: SyncError = error.into();
        assert_eq!(sync.code(), ErrorCode::TransportError);
    }

    #[test]
    fn test_decode_maps_to_transport_error() {
        let sync: SyncError = ClientError::decode("missing field `id`").into();
        assert_eq!(sync.code(), ErrorCode::TransportError);
    }
}

// Error taxonomy shared by every layer that talks to the workspace
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("missing resource: {0}")]
    MissingResource(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("{}", transport_message(.status, .message))]
    Transport { status: Option<u16>, message: String },

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("unexpected status code {}: {}", code, message),
        None => format!("transport error: {}", message),
    }
}

impl BootstrapError {
    pub fn parse(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Map a platform `error_code` onto the taxonomy.
    /// Codes with no matching kind hand the message back.
    pub fn from_error_code(error_code: &str, message: String) -> Result<Self, String> {
        match error_code {
            "RESOURCE_ALREADY_EXISTS" | "ALREADY_EXISTS" => Ok(Self::Conflict(message)),
            "RESOURCE_DOES_NOT_EXIST" | "NOT_FOUND" => Ok(Self::NotFound(message)),
            "PERMISSION_DENIED" | "UNAUTHENTICATED" | "INSUFFICIENT_PERMISSIONS" => {
                Ok(Self::AccessDenied(message))
            }
            _ => Err(message),
        }
    }

    /// Classify a non-success platform response.
    /// The `error_code` reported by the platform wins over the bare status.
    pub fn from_response(status: u16, error_code: Option<&str>, message: String) -> Self {
        let message = match error_code {
            Some(code) => match Self::from_error_code(code, message) {
                Ok(err) => return err,
                Err(message) => message,
            },
            None => message,
        };

        match status {
            401 | 403 => Self::AccessDenied(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Transport {
                status: Some(status),
                message,
            },
        }
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;

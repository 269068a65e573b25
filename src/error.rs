use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum DashboardError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Payload contained no samples")]
    EmptyPayload,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown dashboard view: {0}")]
    UnknownView(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl DashboardError {
    /// Transport failures are retried on the next natural cycle and never
    /// surface as anything but a connectivity change.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DashboardError::Http(_) | DashboardError::HttpStatus { .. } | DashboardError::Mqtt(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

use serde_json::Value;
use thiserror::Error;

/// Node-level errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Referenced node {0} no longer exists")]
    DanglingReference(String),
    #[error("Node \"{0}\" has no output yet")]
    MissingOutput(String),
    #[error("Path \"{path}\" not found in output of \"{source_name}\"")]
    PathNotFound { source_name: String, path: String },
    #[error("Invalid raw params JSON: {0}")]
    InvalidRawParams(String),
    #[error("Missing path parameter: {0}")]
    MissingPathToken(String),
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("{message}")]
    HttpStatus {
        status: u16,
        message: String,
        body: Value,
    },
    #[error("RPC error: {message}")]
    RpcError { message: String, body: Value },
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl NodeError {
    /// Whether this error arose while resolving parameter bindings.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            NodeError::DanglingReference(_)
                | NodeError::MissingOutput(_)
                | NodeError::PathNotFound { .. }
                | NodeError::InvalidRawParams(_)
                | NodeError::MissingPathToken(_)
        )
    }

    /// Response body carried by the error, recorded as the node's output.
    pub fn body(&self) -> Option<&Value> {
        match self {
            NodeError::HttpStatus { body, .. } | NodeError::RpcError { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn into_body(self) -> Option<Value> {
        match self {
            NodeError::HttpStatus { body, .. } | NodeError::RpcError { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_error_display() {
        assert_eq!(
            NodeError::MissingOutput("Get slot".into()).to_string(),
            "Node \"Get slot\" has no output yet"
        );
        assert_eq!(
            NodeError::PathNotFound {
                source_name: "A".into(),
                path: "result.value".into()
            }
            .to_string(),
            "Path \"result.value\" not found in output of \"A\""
        );
        assert_eq!(
            NodeError::HttpStatus {
                status: 500,
                message: "HTTP 500".into(),
                body: json!(null)
            }
            .to_string(),
            "HTTP 500"
        );
    }

    #[test]
    fn test_parameter_error_classification() {
        assert!(NodeError::DanglingReference("x".into()).is_parameter_error());
        assert!(NodeError::MissingPathToken("id".into()).is_parameter_error());
        assert!(!NodeError::HttpError("down".into()).is_parameter_error());
    }

    #[test]
    fn test_error_body() {
        let err = NodeError::RpcError {
            message: "bad".into(),
            body: json!({"error": {"message": "bad"}}),
        };
        assert_eq!(err.body(), Some(&json!({"error": {"message": "bad"}})));
        assert!(NodeError::HttpError("x".into()).into_body().is_none());
    }

    #[test]
    fn test_from_serde_json_error() {
        let err: NodeError = serde_json::from_str::<Value>("{").unwrap_err().into();
        assert!(matches!(err, NodeError::SerializationError(_)));
    }
}

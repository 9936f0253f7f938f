/// Failure of a single task-count query against the remote service.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteQueryError {
    Network(String),
    Status { status: u16, message: String },
    Parse(String),
}

impl std::fmt::Display for RemoteQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteQueryError::Network(msg) => write!(f, "Network error: {}", msg),
            RemoteQueryError::Status { status, message } => {
                write!(f, "HTTP {}: {}", status, message)
            }
            RemoteQueryError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for RemoteQueryError {}

impl RemoteQueryError {
    /// Short label used in log fields
    pub fn category(&self) -> &'static str {
        match self {
            RemoteQueryError::Network(_) => "Offline",
            RemoteQueryError::Status { status, .. } if *status == 401 || *status == 403 => {
                "Authentication Error"
            }
            RemoteQueryError::Status { .. } => "Service Error",
            RemoteQueryError::Parse(_) => "Parse Error",
        }
    }
}

impl From<wreq::header::InvalidHeaderValue> for RemoteQueryError {
    fn from(e: wreq::header::InvalidHeaderValue) -> Self {
        RemoteQueryError::Network(format!("Invalid header value: {}", e))
    }
}

impl From<wreq::Error> for RemoteQueryError {
    fn from(e: wreq::Error) -> Self {
        RemoteQueryError::Network(format!("Request failed: {}", e))
    }
}

/// Failure talking to the host application that owns the keys.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    Disconnected,
    Timeout { instance_id: String },
    Protocol(String),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostError::Disconnected => write!(f, "Host connection closed"),
            HostError::Timeout { instance_id } => {
                write!(f, "Host did not answer settings request for {}", instance_id)
            }
            HostError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

impl From<serde_json::Error> for HostError {
    fn from(e: serde_json::Error) -> Self {
        HostError::Protocol(format!("Invalid message: {}", e))
    }
}

/// Why one refresh of a key did not end in a new icon.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshError {
    /// No API token has been configured yet
    MissingCredentials,
    Query(RemoteQueryError),
    Host(HostError),
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshError::MissingCredentials => write!(f, "API token is not configured"),
            RefreshError::Query(e) => write!(f, "Task query failed: {}", e),
            RefreshError::Host(e) => write!(f, "Host request failed: {}", e),
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefreshError::MissingCredentials => None,
            RefreshError::Query(e) => Some(e),
            RefreshError::Host(e) => Some(e),
        }
    }
}

impl From<RemoteQueryError> for RefreshError {
    fn from(e: RemoteQueryError) -> Self {
        RefreshError::Query(e)
    }
}

impl From<HostError> for RefreshError {
    fn from(e: HostError) -> Self {
        RefreshError::Host(e)
    }
}

/// Startup failure: bad launch arguments or no connection to the host.
#[derive(Debug)]
pub enum LaunchError {
    MissingArgument(&'static str),
    InvalidArgument { name: &'static str, value: String },
    Connect(String),
    Client(RemoteQueryError),
    Runtime(std::io::Error),
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchError::MissingArgument(name) => write!(f, "Missing launch argument -{}", name),
            LaunchError::InvalidArgument { name, value } => {
                write!(f, "Invalid value for -{}: {}", name, value)
            }
            LaunchError::Connect(msg) => write!(f, "Failed to connect to host: {}", msg),
            LaunchError::Client(e) => write!(f, "Failed to create API client: {}", e),
            LaunchError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
        }
    }
}

impl std::error::Error for LaunchError {}

impl From<tokio_tungstenite::tungstenite::Error> for LaunchError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        LaunchError::Connect(e.to_string())
    }
}

impl From<RemoteQueryError> for LaunchError {
    fn from(e: RemoteQueryError) -> Self {
        LaunchError::Client(e)
    }
}

impl From<std::io::Error> for LaunchError {
    fn from(e: std::io::Error) -> Self {
        LaunchError::Runtime(e)
    }
}

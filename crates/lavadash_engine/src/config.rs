//! Configuration for dashboard clients.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Mount point suffix appended to a dashboard URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointStyle {
    /// `/RPC2/`, used by the shared LAVA server.
    Rpc2,
    /// `/xml-rpc/`, used by standalone dashboard deployments.
    #[default]
    XmlRpc,
}

impl EndpointStyle {
    /// Path suffix for this style, with both slashes.
    pub fn suffix(self) -> &'static str {
        match self {
            EndpointStyle::Rpc2 => "/RPC2/",
            EndpointStyle::XmlRpc => "/xml-rpc/",
        }
    }
}

impl fmt::Display for EndpointStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointStyle::Rpc2 => "rpc2",
            EndpointStyle::XmlRpc => "xml-rpc",
        })
    }
}

impl FromStr for EndpointStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rpc2" => Ok(EndpointStyle::Rpc2),
            "xml-rpc" | "xmlrpc" => Ok(EndpointStyle::XmlRpc),
            other => Err(format!("unknown endpoint style {other:?}")),
        }
    }
}

/// Configuration shared by every client created for one command.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Suffix variant used when normalizing endpoints.
    pub endpoint_style: EndpointStyle,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Response read timeout; bundles can be large.
    pub read_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Log full XML-RPC request and response bodies at debug level.
    pub verbose_xml_rpc: bool,
}

impl ClientConfig {
    /// Creates a configuration with default timeouts.
    pub fn new(endpoint_style: EndpointStyle) -> Self {
        Self {
            endpoint_style,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(300),
            user_agent: format!("lava-dashboard/{}", env!("CARGO_PKG_VERSION")),
            verbose_xml_rpc: false,
        }
    }

    /// Sets the endpoint style.
    pub fn with_endpoint_style(mut self, style: EndpointStyle) -> Self {
        self.endpoint_style = style;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enables or disables XML-RPC body logging.
    pub fn with_verbose_xml_rpc(mut self, verbose: bool) -> Self {
        self.verbose_xml_rpc = verbose;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(EndpointStyle::default())
    }
}

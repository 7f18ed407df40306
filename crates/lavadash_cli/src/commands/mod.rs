//! CLI command implementations.
//!
//! Every command writes regular output to [`Console::out`] and
//! diagnostics to [`Console::err`], and reports how the process should
//! exit through [`Status`]. Errors a command does not phrase itself are
//! left to [`safety_net::report`].

pub mod auth;
pub mod bundle;
pub mod data_views;
pub mod replicate;
pub mod safety_net;
pub mod streams;

use clap::Args;
use lavadash_engine::{
    ClientConfig, EndpointStyle, EngineError, EngineResult, KeyringTokenStore, ServerProxy, UreqClient,
};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Exit 0.
    Success,
    /// Exit 1, after a diagnostic.
    Failure,
    /// Exit -1: `get` refused to overwrite a file.
    Refused,
}

impl Status {
    /// Numeric status as the shell sees it before truncation.
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Failure => 1,
            Status::Refused => -1,
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failure => ExitCode::FAILURE,
            Status::Refused => ExitCode::from(255),
        }
    }
}

/// Output handles for one command run.
pub struct Console<'a> {
    /// Regular output.
    pub out: &'a mut dyn Write,
    /// Diagnostics.
    pub err: &'a mut dyn Write,
}

impl<'a> Console<'a> {
    /// Wraps the two handles.
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write) -> Self {
        Self { out, err }
    }

    /// Writes one line of regular output.
    pub fn line(&mut self, text: impl AsRef<str>) -> EngineResult<()> {
        writeln!(self.out, "{}", text.as_ref())?;
        Ok(())
    }

    /// Writes one diagnostic line.
    pub fn error(&mut self, text: impl AsRef<str>) -> EngineResult<()> {
        writeln!(self.err, "{}", text.as_ref())?;
        Ok(())
    }
}

/// Arguments shared by every command that talks to a dashboard.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// URL of your validation dashboard
    #[arg(long, value_name = "URL", env = "DASHBOARD_URL")]
    pub dashboard_url: String,

    /// Show XML-RPC data
    #[arg(long)]
    pub verbose_xml_rpc: bool,

    /// Mount point appended to dashboard URLs (rpc2 or xml-rpc)
    #[arg(long, value_name = "STYLE", default_value_t = EndpointStyle::XmlRpc)]
    pub endpoint_style: EndpointStyle,
}

impl ServerArgs {
    /// Client configuration for these arguments.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.endpoint_style).with_verbose_xml_rpc(self.verbose_xml_rpc)
    }

    /// Connects to `url` and selects the API namespace.
    pub fn connect_to(&self, url: &str) -> EngineResult<ServerProxy<UreqClient>> {
        let config = self.config();
        let endpoint = lavadash_engine::Endpoint::parse(url, config.endpoint_style)?;
        let mut proxy = ServerProxy::connect(endpoint, Arc::new(KeyringTokenStore::new()), config);
        proxy.negotiate_namespace()?;
        Ok(proxy)
    }

    /// Connects to `--dashboard-url`.
    pub fn connect(&self) -> EngineResult<ServerProxy<UreqClient>> {
        self.connect_to(&self.dashboard_url)
    }
}

/// Replaces the fault `code` of `err` with a command-specific message.
pub(crate) fn rephrase(err: EngineError, code: i32, message: impl FnOnce(&str) -> String) -> EngineError {
    match err {
        EngineError::Fault { code: c, message: fault } if c == code => EngineError::command(message(&fault)),
        other => other,
    }
}

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use url::Url;

use super::Dispatcher;
use crate::instruction::{Instruction, WireFormat};

#[derive(Clone, Debug)]
pub struct HttpDispatcherConfig {
    /// Vehicle command endpoint; receives one POST per instruction.
    pub url: String,
    /// Hard bound on one attempt (connect + send + response).
    pub timeout: Duration,
    pub wire_format: WireFormat,
}

impl Default for HttpDispatcherConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:80/command".to_string(),
            timeout: Duration::from_millis(100),
            wire_format: WireFormat::Standard,
        }
    }
}

/// POSTs the instruction's wire string as a plain-text body.
///
/// The response body is never read beyond the status line.
pub struct HttpDispatcher {
    config: HttpDispatcherConfig,
    agent: ureq::Agent,
}

impl HttpDispatcher {
    pub fn new(config: HttpDispatcherConfig) -> Result<Self> {
        let url = Url::parse(&config.url).context("parse command url")?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported command scheme '{}'; expected http(s)",
                url.scheme()
            ));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.timeout)
            .timeout(config.timeout)
            .redirects(0)
            .build();
        Ok(Self { config, agent })
    }
}

impl Dispatcher for HttpDispatcher {
    fn dispatch(&mut self, instruction: Instruction) -> Result<()> {
        let body = instruction.wire(self.config.wire_format);
        self.agent
            .post(&self.config.url)
            .set("Content-Type", "text/plain")
            .send_string(body)
            .with_context(|| format!("post '{}' to {}", body, self.config.url))?;
        Ok(())
    }
}

//! Tool builder and contract for PageFetch

use crate::client::{fetch_with_options, FetchOptions};
use crate::error::FetchError;
use crate::types::{FetchRequest, FetchResponse, ToolOutput};
use crate::{TOOL_DESCRIPTION, TOOL_LLMTXT};
use schemars::schema_for;
use std::time::Duration;
use tracing::debug;

/// Builder for configuring the fetch tool
#[derive(Debug, Clone, Default)]
pub struct ToolBuilder {
    enable_raw: bool,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    allow_prefixes: Vec<String>,
    block_prefixes: Vec<String>,
}

impl ToolBuilder {
    /// Create a new tool builder with raw passthrough enabled
    pub fn new() -> Self {
        Self {
            enable_raw: true,
            ..Default::default()
        }
    }

    /// Expose the `raw` request option
    pub fn enable_raw(mut self, enable: bool) -> Self {
        self.enable_raw = enable;
        self
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set the fetch deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add URL prefix to allow list
    pub fn allow_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.allow_prefixes.push(prefix.into());
        self
    }

    /// Add URL prefix to block list
    pub fn block_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.block_prefixes.push(prefix.into());
        self
    }

    /// Build the tool
    pub fn build(self) -> Tool {
        Tool {
            options: FetchOptions {
                user_agent: self.user_agent,
                timeout: self.timeout,
                allow_prefixes: self.allow_prefixes,
                block_prefixes: self.block_prefixes,
                enable_raw: self.enable_raw,
            },
        }
    }
}

/// Configured fetch tool
///
/// Holds no per-call state; clones share nothing mutable.
#[derive(Debug, Clone)]
pub struct Tool {
    options: FetchOptions,
}

impl Default for Tool {
    fn default() -> Self {
        ToolBuilder::new().build()
    }
}

impl Tool {
    /// Create a new tool builder
    pub fn builder() -> ToolBuilder {
        ToolBuilder::new()
    }

    /// Get tool description
    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    /// Get full documentation (llmtxt)
    pub fn llmtxt(&self) -> &'static str {
        TOOL_LLMTXT
    }

    /// Get input schema as JSON
    pub fn input_schema(&self) -> serde_json::Value {
        let schema = schema_for!(FetchRequest);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        if !self.options.enable_raw {
            if let Some(props) = value.get_mut("properties").and_then(|p| p.as_object_mut()) {
                props.remove("raw");
            }
        }

        value
    }

    /// Get output schema as JSON
    pub fn output_schema(&self) -> serde_json::Value {
        let schema = schema_for!(FetchResponse);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Execute the tool with the given request
    pub async fn execute(&self, req: FetchRequest) -> Result<FetchResponse, FetchError> {
        fetch_with_options(req, self.options.clone()).await
    }

    /// Execute and fold the result into a single tool-call outcome
    pub async fn call(&self, req: FetchRequest) -> ToolOutput {
        match self.execute(req).await {
            Ok(response) => ToolOutput::success(response.content),
            Err(e) => {
                debug!(kind = ?e.kind(), "Fetch failed: {}", e);
                ToolOutput::failure(e.to_string())
            }
        }
    }
}

//! Operation registry: the four lookup tools exposed over MCP.
//!
//! The descriptor set is fixed at startup and shared by every session and
//! both transports.

mod validate;

pub use validate::FieldRule;

use crate::lookup::{LookupInvoker, LookupKind};
use crate::{Result, WhoisError};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

/// Static description of one tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    /// Name of the single input field.
    pub field: &'static str,
    pub rule: FieldRule,
    pub kind: LookupKind,
}

impl ToolDescriptor {
    /// MCP tool definition as returned by `tools/list`.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": {
                "type": "object",
                "properties": { self.field: self.rule.json_schema() },
                "required": [self.field],
                "additionalProperties": false,
            }
        })
    }
}

pub static TOOLS: [ToolDescriptor; 4] = [
    ToolDescriptor {
        name: "whois_domain",
        description: "Looks up whois information about the domain",
        field: "domain",
        rule: FieldRule::Domain,
        kind: LookupKind::Domain,
    },
    ToolDescriptor {
        name: "whois_tld",
        description: "Looks up whois information about the Top Level Domain (TLD)",
        field: "tld",
        rule: FieldRule::Tld,
        kind: LookupKind::Tld,
    },
    ToolDescriptor {
        name: "whois_ip",
        description: "Looks up whois information about the IP",
        field: "ip",
        rule: FieldRule::Ip,
        kind: LookupKind::Ip,
    },
    ToolDescriptor {
        name: "whois_as",
        description: "Looks up whois information about the Autonomous System Number (ASN)",
        field: "asn",
        rule: FieldRule::Asn,
        kind: LookupKind::Asn,
    },
];

/// One content item of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Result of a `tools/call`, serialized as an MCP `CallToolResult`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    pub content: Vec<TextContent>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn text(text: String) -> Self {
        Self {
            content: vec![TextContent { kind: "text", text }],
            is_error: false,
        }
    }

    pub fn error(err: &WhoisError) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: format!("Error: {}", err),
            }],
            is_error: true,
        }
    }
}

/// Binds the tool descriptors to the lookup invoker.
#[derive(Clone)]
pub struct ToolRegistry {
    invoker: LookupInvoker,
}

impl ToolRegistry {
    pub fn new(invoker: LookupInvoker) -> Self {
        Self { invoker }
    }

    pub fn descriptor(name: &str) -> Option<&'static ToolDescriptor> {
        TOOLS.iter().find(|t| t.name == name)
    }

    /// Payload for `tools/list`.
    pub fn list(&self) -> Value {
        json!({ "tools": TOOLS.iter().map(ToolDescriptor::definition).collect::<Vec<_>>() })
    }

    /// Run a tool by name.
    ///
    /// Only an unknown tool name is an `Err`; validation, timeout and upstream
    /// failures come back as an outcome flagged with `is_error`.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<ToolOutcome> {
        let tool = Self::descriptor(name).ok_or_else(|| WhoisError::InvalidParams {
            message: format!("Tool {} not found", name),
        })?;

        let request = match extract_field(tool, arguments) {
            Ok(raw) => match tool.rule.validate(tool.field, raw) {
                Ok(request) => request,
                Err(e) => return Ok(ToolOutcome::error(&e)),
            },
            Err(e) => return Ok(ToolOutcome::error(&e)),
        };

        debug!("Calling tool {} for {}", tool.name, request);

        match self.invoker.invoke(&request).await {
            Ok(result) => {
                let serialized = serde_json::to_string(&result)?;
                Ok(ToolOutcome::text(format!(
                    "{} whois lookup for: \n{}",
                    tool.kind.label(),
                    serialized
                )))
            }
            Err(e) => Ok(ToolOutcome::error(&e)),
        }
    }
}

fn extract_field<'a>(tool: &ToolDescriptor, arguments: &'a Value) -> Result<&'a str> {
    match arguments.get(tool.field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(WhoisError::validation(tool.field, "Expected string")),
        None => Err(WhoisError::validation(tool.field, "Required")),
    }
}

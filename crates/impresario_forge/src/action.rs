//! Privileged actions the forge can be asked to perform.

use impresario_error::{ForgeError, ForgeErrorKind, ImpresarioResult};
use serde::{Deserialize, Serialize};

/// A privileged effect awaiting authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForgeAction {
    /// Deploy generated code to the code host.
    DeployCode {
        /// Deployment target name
        name: String,
        /// Source text to deploy
        code: String,
    },
    /// Run a DDL statement against the show database.
    ExecuteDdl {
        /// The statement to run
        statement: String,
    },
    /// Call an external HTTP API.
    CallApi {
        /// Full request URL
        url: String,
        /// HTTP method
        method: String,
        /// Optional request body
        body: Option<String>,
    },
}

impl ForgeAction {
    /// Interpret a worker-produced JSON payload as an action.
    ///
    /// The payload must carry a `kind` field naming the variant. An
    /// uninterpretable payload is an error here, before the gate is ever
    /// consulted.
    pub fn from_value(value: &serde_json::Value) -> ImpresarioResult<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| ForgeError::new(ForgeErrorKind::InvalidAction(e.to_string())).into())
    }

    /// Audit category for this action.
    pub fn category(&self) -> &'static str {
        match self {
            ForgeAction::DeployCode { .. } => "deploy",
            ForgeAction::ExecuteDdl { .. } => "ddl",
            ForgeAction::CallApi { .. } => "api_call",
        }
    }

    /// Short description recorded in the audit trail.
    pub fn describe(&self) -> String {
        match self {
            ForgeAction::DeployCode { name, code } => {
                format!("deploy '{}' ({} bytes)", name, code.len())
            }
            ForgeAction::ExecuteDdl { statement } => {
                let first_line = statement.lines().next().unwrap_or("").trim();
                format!("ddl: {first_line}")
            }
            ForgeAction::CallApi { url, method, .. } => format!("{method} {url}"),
        }
    }
}

//! Effect targets the forge can drive once an action clears the gate.

use async_trait::async_trait;
use impresario_error::ImpresarioResult;

/// Opaque result of a privileged effect: success flag plus a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ForgeOutcome {
    /// Whether the backend reported success
    pub success: bool,
    /// Backend-provided detail (deploy location, row count, response summary)
    pub message: String,
}

impl ForgeOutcome {
    /// A successful outcome with the given detail.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed outcome with the given detail.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A target for privileged effects. Implementations only ever see actions
/// the safety gate has already permitted.
#[async_trait]
pub trait ForgeBackend: Send + Sync {
    /// Backend identity for logs.
    fn name(&self) -> &str;

    /// Deploy source text to the code host under the given name.
    async fn deploy_code(&self, name: &str, code: &str) -> ImpresarioResult<ForgeOutcome>;

    /// Run a DDL statement against the show database.
    async fn execute_ddl(&self, statement: &str) -> ImpresarioResult<ForgeOutcome>;

    /// Perform an outbound HTTP call.
    async fn call_api(
        &self,
        url: &str,
        method: &str,
        body: Option<&str>,
    ) -> ImpresarioResult<ForgeOutcome>;
}

/// Backend that logs what it would do and fabricates success.
///
/// Useful for dry runs and wiring tests where real deploys, DDL, or API
/// calls are unwanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopForgeBackend;

#[async_trait]
impl ForgeBackend for NoopForgeBackend {
    fn name(&self) -> &str {
        "noop"
    }

    async fn deploy_code(&self, name: &str, code: &str) -> ImpresarioResult<ForgeOutcome> {
        tracing::info!(
            deploy_name = %name,
            code_bytes = code.len(),
            "Noop forge: would deploy code"
        );
        Ok(ForgeOutcome::ok(format!("noop: would deploy '{name}'")))
    }

    async fn execute_ddl(&self, statement: &str) -> ImpresarioResult<ForgeOutcome> {
        let first_line = statement.lines().next().unwrap_or("").trim();
        tracing::info!(statement = %first_line, "Noop forge: would run DDL");
        Ok(ForgeOutcome::ok("noop: would run DDL"))
    }

    async fn call_api(
        &self,
        url: &str,
        method: &str,
        body: Option<&str>,
    ) -> ImpresarioResult<ForgeOutcome> {
        tracing::info!(
            url = %url,
            method = %method,
            has_body = body.is_some(),
            "Noop forge: would call API"
        );
        Ok(ForgeOutcome::ok(format!("noop: would call {method} {url}")))
    }
}

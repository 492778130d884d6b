//! Gated execution of privileged effects.

use crate::action::ForgeAction;
use crate::backend::{ForgeBackend, ForgeOutcome};
use crate::gate::SafetyGate;
use impresario_error::{ForgeError, ForgeErrorKind, ImpresarioResult};
use impresario_interface::CycleObserver;
use std::sync::Arc;

/// Runs forge actions through the safety gate before the backend ever sees
/// them. Every ruling, permit or deny, reaches the observer; denials return
/// a structured error and never touch the backend.
pub struct ForgeExecutor {
    gate: SafetyGate,
    backend: Arc<dyn ForgeBackend>,
    observer: Arc<dyn CycleObserver>,
}

impl ForgeExecutor {
    /// Assemble an executor from its gate, effect target, and observer.
    pub fn new(
        gate: SafetyGate,
        backend: Arc<dyn ForgeBackend>,
        observer: Arc<dyn CycleObserver>,
    ) -> Self {
        Self {
            gate,
            backend,
            observer,
        }
    }

    /// The gate this executor consults.
    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    /// Authorize and, if permitted, perform the action.
    #[tracing::instrument(
        skip(self, action),
        fields(category = action.category(), backend = self.backend.name())
    )]
    pub async fn perform(&self, action: &ForgeAction) -> ImpresarioResult<ForgeOutcome> {
        let decision = self.gate.authorize(action);
        self.observer
            .on_safety_decision(&decision.audit_entry())
            .await;
        if !decision.allowed {
            let reason = decision
                .reason
                .unwrap_or_else(|| "Denied by policy".to_string());
            return Err(ForgeError::new(ForgeErrorKind::Blocked {
                category: decision.category,
                reason,
            })
            .into());
        }
        match action {
            ForgeAction::DeployCode { name, code } => self.backend.deploy_code(name, code).await,
            ForgeAction::ExecuteDdl { statement } => self.backend.execute_ddl(statement).await,
            ForgeAction::CallApi { url, method, body } => {
                self.backend.call_api(url, method, body.as_deref()).await
            }
        }
    }
}

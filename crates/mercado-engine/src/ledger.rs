//! # Client Credit Ledger
//!
//! Debt payments. A payment reads the client's current debt and writes
//! `max(0, debt - amount)` together with an immutable [`ClientPayment`]
//! history record, in one conditional commit. A credit sale racing the
//! payment on the same client makes one of them retry against fresh state.
//!
//! Overpayment is absorbed: the debt stops at zero and the surplus is not
//! carried as a credit balance.

use chrono::Utc;
use mercado_core::decimal;
use mercado_core::validation::validate_payment_amount;
use mercado_core::{Capability, Client, ClientPayment, CoreError, WALK_IN_CLIENT_ID};
use mercado_store::{list_records, Collection, CommitReceipt, Transaction};
use mercado_sync::{SessionContext, Severity};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::retry::with_conflict_retry;

#[derive(Debug, Clone)]
pub struct CreditLedger {
    ctx: SessionContext,
}

impl CreditLedger {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Registers a payment against a client's debt.
    pub async fn register_payment(&self, client_id: &str, amount: f64) -> EngineResult<ClientPayment> {
        match self.try_register(client_id, amount).await {
            Ok(payment) => {
                self.ctx.notify(
                    Severity::Success,
                    format!(
                        "Abono de {:.2} registrado. Deuda restante: {:.2}",
                        payment.amount, payment.new_debt
                    ),
                );
                Ok(payment)
            }
            Err(e) => {
                warn!(client_id, amount, code = e.code(), error = %e, "Payment failed");
                self.ctx
                    .notify(Severity::Error, format!("No se pudo registrar el abono: {e}"));
                Err(e)
            }
        }
    }

    async fn try_register(&self, client_id: &str, amount: f64) -> EngineResult<ClientPayment> {
        self.ctx.require(Capability::ManageClients).await?;
        validate_payment_amount(amount)?;

        if client_id == WALK_IN_CLIENT_ID {
            return Err(CoreError::ProtectedClient {
                action: "charged or credited".to_string(),
            }
            .into());
        }

        let (payment, receipt) = with_conflict_retry(self.ctx.engine(), "payment", || {
            self.attempt(client_id, amount)
        })
        .await?;

        self.ctx.after_commit(&receipt).await;
        info!(
            client_id,
            amount,
            old_debt = payment.old_debt,
            new_debt = payment.new_debt,
            "Payment registered"
        );
        Ok(payment)
    }

    async fn attempt(&self, client_id: &str, amount: f64) -> EngineResult<(ClientPayment, CommitReceipt)> {
        let mut tx = Transaction::new(self.ctx.store());
        let client: Client = tx
            .get_record(Collection::Clients, client_id)
            .await?
            .ok_or_else(|| CoreError::ClientNotFound(client_id.to_string()))?;

        let new_debt = decimal::sub(client.debt, amount).max(0.0);
        let payment = ClientPayment {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            amount,
            date: Utc::now(),
            old_debt: client.debt,
            new_debt,
        };

        tx.update_field(Collection::Clients, client_id, "debt", new_debt);
        tx.set_record(Collection::ClientPayments, payment.id.clone(), &payment)?;
        let receipt = tx.commit().await?;
        Ok((payment, receipt))
    }

    /// Payment history of one client, newest first.
    pub async fn history(&self, client_id: &str) -> EngineResult<Vec<ClientPayment>> {
        let mut payments: Vec<ClientPayment> =
            list_records(self.ctx.store(), Collection::ClientPayments).await?;
        payments.retain(|p| p.client_id == client_id);
        payments.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(payments)
    }
}

//! In-memory CRM tables with the same session semantics as the Postgres
//! backend: a session works on a private copy that replaces the shared tables
//! only on commit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use propsync_core::{
    OpportunityOutcome, OpportunityRecord, OpportunityStage, ProposalNumber, ProposalRecord,
    ProposalStatus, SalespersonRecord, UserAccount,
};
use tokio::sync::Mutex;

use crate::{
    order_pipeline_rows, CrmBackend, CrmStore, LinkedTotals, NewSalesperson, NewUser,
    PipelineRow, ProposalRef, SalespersonTotals, StatusCount, StoreError,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    pub proposals: BTreeMap<i64, ProposalRecord>,
    pub opportunities: BTreeMap<i64, OpportunityRecord>,
    pub salespeople: BTreeMap<i64, SalespersonRecord>,
    pub users: BTreeMap<i64, UserAccount>,
    /// Proposal numbers whose writes fail, to exercise rollback.
    pub failing_proposals: BTreeSet<ProposalNumber>,
    next_id: i64,
}

impl MemoryTables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn proposal_by_number(&self, number: ProposalNumber) -> Option<&ProposalRecord> {
        self.proposals.values().find(|p| p.number == number)
    }

    pub fn salesperson_by_name(&self, name: &str) -> Vec<&SalespersonRecord> {
        self.salespeople.values().filter(|s| s.name == name).collect()
    }

    fn ensure_writable(&self, proposal_id: i64) -> Result<(), StoreError> {
        match self.proposals.get(&proposal_id) {
            Some(p) if self.failing_proposals.contains(&p.number) => Err(StoreError::Message(
                format!("simulated write failure for proposal {}", p.number),
            )),
            Some(_) => Ok(()),
            None => Err(StoreError::Message(format!("no proposal with id {proposal_id}"))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<Mutex<MemoryTables>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_opportunity(&self, estimated_value: Option<f64>) -> i64 {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        tables.opportunities.insert(
            id,
            OpportunityRecord {
                id,
                stage: Some(OpportunityStage::Proposta.as_str().to_string()),
                outcome: Some(OpportunityOutcome::Aberta.as_str().to_string()),
                salesperson_id: None,
                estimated_value,
                updated_at: Utc::now(),
            },
        );
        id
    }

    pub async fn insert_proposal(
        &self,
        number: ProposalNumber,
        opportunity_id: Option<i64>,
        total_value: Option<f64>,
    ) -> i64 {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        tables.proposals.insert(
            id,
            ProposalRecord {
                id,
                number,
                status: Some(ProposalStatus::Rascunho.as_str().to_string()),
                salesperson_id: None,
                opportunity_id,
                total_value,
                updated_at: Utc::now(),
            },
        );
        id
    }

    pub async fn insert_salesperson(&self, name: &str, email: Option<&str>) -> i64 {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        tables.salespeople.insert(
            id,
            SalespersonRecord {
                id,
                user_id: None,
                name: name.to_string(),
                email: email.map(str::to_string),
                active: true,
            },
        );
        id
    }

    pub async fn insert_user(&self, name: &str, login: &str) -> i64 {
        let mut tables = self.tables.lock().await;
        let id = tables.allocate_id();
        tables.users.insert(
            id,
            UserAccount {
                id,
                name: name.to_string(),
                login: login.to_string(),
                email: None,
                active: true,
            },
        );
        id
    }

    pub async fn fail_writes_for(&self, number: ProposalNumber) {
        self.tables.lock().await.failing_proposals.insert(number);
    }

    /// Committed state.
    pub async fn snapshot(&self) -> MemoryTables {
        self.tables.lock().await.clone()
    }
}

#[async_trait]
impl CrmBackend for MemoryBackend {
    type Session = MemorySession;

    async fn begin(&self) -> Result<MemorySession, StoreError> {
        let working = self.tables.lock().await.clone();
        Ok(MemorySession {
            shared: Arc::clone(&self.tables),
            working,
        })
    }
}

pub struct MemorySession {
    shared: Arc<Mutex<MemoryTables>>,
    working: MemoryTables,
}

#[async_trait]
impl CrmStore for MemorySession {
    async fn salespeople(&mut self) -> Result<Vec<SalespersonRecord>, StoreError> {
        Ok(self.working.salespeople.values().cloned().collect())
    }

    async fn salesperson_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<SalespersonRecord>, StoreError> {
        Ok(self
            .working
            .salespeople
            .values()
            .find(|s| s.email.as_deref() == Some(email))
            .cloned())
    }

    async fn user_by_login(&mut self, login: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.login == login)
            .cloned())
    }

    async fn upsert_user(&mut self, user: NewUser<'_>) -> Result<i64, StoreError> {
        if let Some(existing) = self.working.users.values_mut().find(|u| u.login == user.login) {
            existing.name = user.name.to_string();
            return Ok(existing.id);
        }
        let id = self.working.allocate_id();
        self.working.users.insert(
            id,
            UserAccount {
                id,
                name: user.name.to_string(),
                login: user.login.to_string(),
                email: Some(user.email.to_string()),
                active: true,
            },
        );
        Ok(id)
    }

    async fn upsert_salesperson(
        &mut self,
        salesperson: NewSalesperson<'_>,
    ) -> Result<i64, StoreError> {
        if let Some(existing) = self
            .working
            .salespeople
            .values_mut()
            .find(|s| s.email.as_deref() == Some(salesperson.email))
        {
            existing.name = salesperson.name.to_string();
            return Ok(existing.id);
        }
        let id = self.working.allocate_id();
        self.working.salespeople.insert(
            id,
            SalespersonRecord {
                id,
                user_id: Some(salesperson.user_id),
                name: salesperson.name.to_string(),
                email: Some(salesperson.email.to_string()),
                active: true,
            },
        );
        Ok(id)
    }

    async fn proposal_by_number(
        &mut self,
        number: ProposalNumber,
    ) -> Result<Option<ProposalRef>, StoreError> {
        Ok(self.working.proposal_by_number(number).map(|p| ProposalRef {
            id: p.id,
            opportunity_id: p.opportunity_id,
            status: p.status.clone(),
        }))
    }

    async fn set_proposal_status(
        &mut self,
        proposal_id: i64,
        status: ProposalStatus,
    ) -> Result<(), StoreError> {
        self.working.ensure_writable(proposal_id)?;
        if let Some(proposal) = self.working.proposals.get_mut(&proposal_id) {
            proposal.status = Some(status.as_str().to_string());
            proposal.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_opportunity_stage(
        &mut self,
        opportunity_id: i64,
        stage: OpportunityStage,
        outcome: OpportunityOutcome,
    ) -> Result<(), StoreError> {
        if let Some(opportunity) = self.working.opportunities.get_mut(&opportunity_id) {
            opportunity.stage = Some(stage.as_str().to_string());
            opportunity.outcome = Some(outcome.as_str().to_string());
            opportunity.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_proposal_salesperson(
        &mut self,
        proposal_id: i64,
        salesperson_id: i64,
    ) -> Result<(), StoreError> {
        self.working.ensure_writable(proposal_id)?;
        if let Some(proposal) = self.working.proposals.get_mut(&proposal_id) {
            proposal.salesperson_id = Some(salesperson_id);
            proposal.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_opportunity_salesperson(
        &mut self,
        opportunity_id: i64,
        salesperson_id: i64,
    ) -> Result<(), StoreError> {
        if let Some(opportunity) = self.working.opportunities.get_mut(&opportunity_id) {
            opportunity.salesperson_id = Some(salesperson_id);
            opportunity.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn proposal_status_breakdown(&mut self) -> Result<Vec<StatusCount>, StoreError> {
        let mut counts: BTreeMap<Option<String>, i64> = BTreeMap::new();
        for proposal in self.working.proposals.values() {
            *counts.entry(proposal.status.clone()).or_default() += 1;
        }
        let mut rows = counts
            .into_iter()
            .map(|(status, total)| StatusCount { status, total })
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.status.cmp(&b.status)));
        Ok(rows)
    }

    async fn pipeline_breakdown(&mut self) -> Result<Vec<PipelineRow>, StoreError> {
        let mut groups: BTreeMap<(Option<String>, Option<String>), (i64, f64)> = BTreeMap::new();
        for opportunity in self.working.opportunities.values() {
            let entry = groups
                .entry((opportunity.stage.clone(), opportunity.outcome.clone()))
                .or_default();
            entry.0 += 1;
            entry.1 += opportunity.estimated_value.unwrap_or_default();
        }
        let mut rows = groups
            .into_iter()
            .map(|((stage, outcome), (total, estimated_value))| PipelineRow {
                stage,
                outcome,
                total,
                estimated_value,
            })
            .collect::<Vec<_>>();
        order_pipeline_rows(&mut rows);
        Ok(rows)
    }

    async fn salesperson_breakdown(&mut self) -> Result<Vec<SalespersonTotals>, StoreError> {
        let mut rows = self
            .working
            .salespeople
            .values()
            .filter_map(|s| {
                let owned = self
                    .working
                    .proposals
                    .values()
                    .filter(|p| p.salesperson_id == Some(s.id))
                    .collect::<Vec<_>>();
                (!owned.is_empty()).then(|| SalespersonTotals {
                    name: s.name.clone(),
                    proposals: owned.len() as i64,
                    total_value: owned.iter().filter_map(|p| p.total_value).sum(),
                })
            })
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| b.proposals.cmp(&a.proposals).then_with(|| a.name.cmp(&b.name)));
        Ok(rows)
    }

    async fn linked_proposal_totals(&mut self) -> Result<LinkedTotals, StoreError> {
        let total = self.working.proposals.len() as i64;
        let linked = self
            .working
            .proposals
            .values()
            .filter(|p| p.salesperson_id.is_some())
            .count() as i64;
        Ok(LinkedTotals { linked, total })
    }

    async fn commit(self) -> Result<(), StoreError> {
        *self.shared.lock().await = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uncommitted_sessions_leave_shared_tables_alone() {
        let backend = MemoryBackend::new();
        let proposal_id = backend.insert_proposal(10, None, None).await;

        let mut session = backend.begin().await.expect("begin");
        session
            .set_proposal_status(proposal_id, ProposalStatus::Fechada)
            .await
            .expect("update");
        session.rollback().await.expect("rollback");

        let tables = backend.snapshot().await;
        assert_eq!(
            tables.proposal_by_number(10).unwrap().status.as_deref(),
            Some("RASCUNHO")
        );

        let mut session = backend.begin().await.expect("begin");
        session
            .set_proposal_status(proposal_id, ProposalStatus::Fechada)
            .await
            .expect("update");
        session.commit().await.expect("commit");
        let tables = backend.snapshot().await;
        assert_eq!(
            tables.proposal_by_number(10).unwrap().status.as_deref(),
            Some("FECHADA")
        );
    }

    #[tokio::test]
    async fn upserts_reuse_rows_on_conflicting_keys() {
        let backend = MemoryBackend::new();
        let mut session = backend.begin().await.expect("begin");
        let first = session
            .upsert_user(NewUser {
                name: "Ana Souza",
                login: "ana.souza",
                email: "ana.souza@pili.ind.br",
                password_hash: crate::DEFAULT_PASSWORD_HASH,
            })
            .await
            .expect("insert");
        let second = session
            .upsert_user(NewUser {
                name: "ANA SOUZA",
                login: "ana.souza",
                email: "ana.souza@pili.ind.br",
                password_hash: crate::DEFAULT_PASSWORD_HASH,
            })
            .await
            .expect("upsert");
        assert_eq!(first, second);

        let s1 = session
            .upsert_salesperson(NewSalesperson {
                user_id: first,
                name: "Ana Souza",
                email: "ana.souza@pili.ind.br",
            })
            .await
            .expect("insert");
        let s2 = session
            .upsert_salesperson(NewSalesperson {
                user_id: first,
                name: "Ana Souza",
                email: "ana.souza@pili.ind.br",
            })
            .await
            .expect("upsert");
        assert_eq!(s1, s2);
        assert_eq!(session.salespeople().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn failing_proposals_reject_writes() {
        let backend = MemoryBackend::new();
        let id = backend.insert_proposal(5, None, None).await;
        backend.fail_writes_for(5).await;
        let mut session = backend.begin().await.expect("begin");
        let err = session
            .set_proposal_status(id, ProposalStatus::Perdida)
            .await
            .expect_err("write should fail");
        assert!(err.to_string().contains("proposal 5"));
    }
}

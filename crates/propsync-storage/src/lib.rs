//! CRM persistence seam for the sync jobs: one transaction-scoped session per
//! run, backed by Postgres or by in-memory tables.

use std::time::Duration;

use async_trait::async_trait;
use propsync_core::{
    OpportunityOutcome, OpportunityStage, ProposalNumber, ProposalStatus, SalespersonRecord,
    UserAccount,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use thiserror::Error;
use tracing::debug;

pub mod memory;

pub use memory::{MemoryBackend, MemorySession, MemoryTables};

pub const CRATE_NAME: &str = "propsync-storage";

/// Placeholder stored in `usuarios.senha` for generated accounts. It is not a
/// valid bcrypt digest, so the account cannot log in until a reset.
pub const DEFAULT_PASSWORD_HASH: &str = "$2b$10$defaulthashforvendedor";

/// Profile assigned to generated salesperson accounts.
pub const SALESPERSON_PROFILE: &str = "vendedor";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Message(String),
}

/// The columns of a proposal the update passes need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalRef {
    pub id: i64,
    pub opportunity_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub login: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSalesperson<'a> {
    pub user_id: i64,
    pub name: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: Option<String>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRow {
    pub stage: Option<String>,
    pub outcome: Option<String>,
    pub total: i64,
    pub estimated_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalespersonTotals {
    pub name: String,
    pub proposals: i64,
    pub total_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedTotals {
    pub linked: i64,
    pub total: i64,
}

/// Pipeline stages in board order; unknown stages sort last.
pub const PIPELINE_STAGE_ORDER: [&str; 10] = [
    "PROSPECCAO",
    "QUALIFICACAO",
    "PROPOSTA",
    "EM_ANALISE",
    "EM_NEGOCIACAO",
    "FECHADA",
    "PERDIDA",
    "SUSPENSO",
    "SUBSTITUIDO",
    "TESTE",
];

pub fn pipeline_stage_rank(stage: Option<&str>) -> usize {
    stage
        .and_then(|s| PIPELINE_STAGE_ORDER.iter().position(|known| *known == s))
        .unwrap_or(PIPELINE_STAGE_ORDER.len())
}

pub fn order_pipeline_rows(rows: &mut [PipelineRow]) {
    rows.sort_by(|a, b| {
        pipeline_stage_rank(a.stage.as_deref())
            .cmp(&pipeline_stage_rank(b.stage.as_deref()))
            .then_with(|| a.stage.cmp(&b.stage))
            .then_with(|| a.outcome.cmp(&b.outcome))
    });
}

/// One unit of work against the CRM tables. Nothing is visible to other
/// sessions until [`CrmStore::commit`]; dropping or rolling back discards it.
#[async_trait]
pub trait CrmStore: Send + Sized {
    async fn salespeople(&mut self) -> Result<Vec<SalespersonRecord>, StoreError>;

    async fn salesperson_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<SalespersonRecord>, StoreError>;

    async fn user_by_login(&mut self, login: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Insert a user, or rename the existing one holding `login`.
    async fn upsert_user(&mut self, user: NewUser<'_>) -> Result<i64, StoreError>;

    /// Insert a salesperson, or rename the existing one holding `email`.
    async fn upsert_salesperson(&mut self, salesperson: NewSalesperson<'_>)
        -> Result<i64, StoreError>;

    async fn proposal_by_number(
        &mut self,
        number: ProposalNumber,
    ) -> Result<Option<ProposalRef>, StoreError>;

    async fn set_proposal_status(
        &mut self,
        proposal_id: i64,
        status: ProposalStatus,
    ) -> Result<(), StoreError>;

    async fn set_opportunity_stage(
        &mut self,
        opportunity_id: i64,
        stage: OpportunityStage,
        outcome: OpportunityOutcome,
    ) -> Result<(), StoreError>;

    async fn set_proposal_salesperson(
        &mut self,
        proposal_id: i64,
        salesperson_id: i64,
    ) -> Result<(), StoreError>;

    async fn set_opportunity_salesperson(
        &mut self,
        opportunity_id: i64,
        salesperson_id: i64,
    ) -> Result<(), StoreError>;

    async fn proposal_status_breakdown(&mut self) -> Result<Vec<StatusCount>, StoreError>;

    async fn pipeline_breakdown(&mut self) -> Result<Vec<PipelineRow>, StoreError>;

    async fn salesperson_breakdown(&mut self) -> Result<Vec<SalespersonTotals>, StoreError>;

    async fn linked_proposal_totals(&mut self) -> Result<LinkedTotals, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

/// Opens sessions. A run begins one session for its writes and, after commit,
/// another for the read-only verification report.
#[async_trait]
pub trait CrmBackend: Send + Sync {
    type Session: CrmStore;

    async fn begin(&self) -> Result<Self::Session, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Connect with a single-connection pool; the jobs never run statements
    /// concurrently.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CrmBackend for PgBackend {
    type Session = PgSession;

    async fn begin(&self) -> Result<PgSession, StoreError> {
        let tx = self.pool.begin().await?;
        debug!("postgres transaction opened");
        Ok(PgSession { tx })
    }
}

pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

fn salesperson_from_row(row: &PgRow) -> Result<SalespersonRecord, sqlx::Error> {
    Ok(SalespersonRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("usuario_id")?,
        name: row.try_get::<Option<String>, _>("nome")?.unwrap_or_default(),
        email: row.try_get("email")?,
        active: row.try_get::<Option<bool>, _>("ativo")?.unwrap_or(true),
    })
}

const SALESPERSON_COLUMNS: &str =
    "id::bigint AS id, usuario_id::bigint AS usuario_id, nome, email, ativo";

#[async_trait]
impl CrmStore for PgSession {
    async fn salespeople(&mut self) -> Result<Vec<SalespersonRecord>, StoreError> {
        let sql = format!("SELECT {SALESPERSON_COLUMNS} FROM crm_vendedores ORDER BY id");
        let rows = sqlx::query(&sql).fetch_all(&mut *self.tx).await?;
        rows.iter()
            .map(|row| salesperson_from_row(row).map_err(StoreError::from))
            .collect()
    }

    async fn salesperson_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<SalespersonRecord>, StoreError> {
        let sql = format!("SELECT {SALESPERSON_COLUMNS} FROM crm_vendedores WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.as_ref().map(salesperson_from_row).transpose()?)
    }

    async fn user_by_login(&mut self, login: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(
            "SELECT id::bigint AS id, nome, login, email, ativo FROM usuarios WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&mut *self.tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(UserAccount {
            id: row.try_get("id")?,
            name: row.try_get::<Option<String>, _>("nome")?.unwrap_or_default(),
            login: row.try_get("login")?,
            email: row.try_get("email")?,
            active: row.try_get::<Option<bool>, _>("ativo")?.unwrap_or(true),
        }))
    }

    async fn upsert_user(&mut self, user: NewUser<'_>) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO usuarios (nome, login, email, senha, perfil, ativo)
            VALUES ($1, $2, $3, $4, $5, true)
            ON CONFLICT (login) DO UPDATE SET nome = EXCLUDED.nome
            RETURNING id::bigint AS id
            "#,
        )
        .bind(user.name)
        .bind(user.login)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(SALESPERSON_PROFILE)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.try_get("id")?)
    }

    async fn upsert_salesperson(
        &mut self,
        salesperson: NewSalesperson<'_>,
    ) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO crm_vendedores (usuario_id, nome, email, ativo)
            VALUES ($1, $2, $3, true)
            ON CONFLICT (email) DO UPDATE SET nome = EXCLUDED.nome
            RETURNING id::bigint AS id
            "#,
        )
        .bind(salesperson.user_id)
        .bind(salesperson.name)
        .bind(salesperson.email)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.try_get("id")?)
    }

    async fn proposal_by_number(
        &mut self,
        number: ProposalNumber,
    ) -> Result<Option<ProposalRef>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id::bigint AS id, oportunidade_id::bigint AS oportunidade_id, situacao
            FROM crm_propostas
            WHERE numero_proposta = $1
            "#,
        )
        .bind(number)
        .fetch_optional(&mut *self.tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ProposalRef {
            id: row.try_get("id")?,
            opportunity_id: row.try_get("oportunidade_id")?,
            status: row.try_get("situacao")?,
        }))
    }

    async fn set_proposal_status(
        &mut self,
        proposal_id: i64,
        status: ProposalStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE crm_propostas SET situacao = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(proposal_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn set_opportunity_stage(
        &mut self,
        opportunity_id: i64,
        stage: OpportunityStage,
        outcome: OpportunityOutcome,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE crm_oportunidades SET estagio = $1, status = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(stage.as_str())
        .bind(outcome.as_str())
        .bind(opportunity_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn set_proposal_salesperson(
        &mut self,
        proposal_id: i64,
        salesperson_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE crm_propostas SET vendedor_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(salesperson_id)
            .bind(proposal_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn set_opportunity_salesperson(
        &mut self,
        opportunity_id: i64,
        salesperson_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE crm_oportunidades SET vendedor_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(salesperson_id)
        .bind(opportunity_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn proposal_status_breakdown(&mut self) -> Result<Vec<StatusCount>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT situacao, COUNT(*)::bigint AS total
            FROM crm_propostas
            GROUP BY situacao
            ORDER BY total DESC, situacao
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter()
            .map(|row| -> Result<StatusCount, StoreError> {
                Ok(StatusCount {
                    status: row.try_get("situacao")?,
                    total: row.try_get("total")?,
                })
            })
            .collect()
    }

    async fn pipeline_breakdown(&mut self) -> Result<Vec<PipelineRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT estagio, status, COUNT(*)::bigint AS total,
                   COALESCE(SUM(valor_estimado), 0)::float8 AS valor
            FROM crm_oportunidades
            GROUP BY estagio, status
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        let mut pipeline = rows
            .iter()
            .map(|row| -> Result<PipelineRow, StoreError> {
                Ok(PipelineRow {
                    stage: row.try_get("estagio")?,
                    outcome: row.try_get("status")?,
                    total: row.try_get("total")?,
                    estimated_value: row.try_get("valor")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        order_pipeline_rows(&mut pipeline);
        Ok(pipeline)
    }

    async fn salesperson_breakdown(&mut self) -> Result<Vec<SalespersonTotals>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT v.nome, COUNT(p.id)::bigint AS total,
                   COALESCE(SUM(p.valor_total), 0)::float8 AS valor
            FROM crm_vendedores v
            LEFT JOIN crm_propostas p ON p.vendedor_id = v.id
            GROUP BY v.id, v.nome
            HAVING COUNT(p.id) > 0
            ORDER BY total DESC, v.nome
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter()
            .map(|row| -> Result<SalespersonTotals, StoreError> {
                Ok(SalespersonTotals {
                    name: row.try_get::<Option<String>, _>("nome")?.unwrap_or_default(),
                    proposals: row.try_get("total")?,
                    total_value: row.try_get("valor")?,
                })
            })
            .collect()
    }

    async fn linked_proposal_totals(&mut self) -> Result<LinkedTotals, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(vendedor_id)::bigint AS linked, COUNT(*)::bigint AS total FROM crm_propostas",
        )
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(LinkedTotals {
            linked: row.try_get("linked")?,
            total: row.try_get("total")?,
        })
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        debug!("postgres transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        debug!("postgres transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(stage: Option<&str>, outcome: &str) -> PipelineRow {
        PipelineRow {
            stage: stage.map(str::to_string),
            outcome: Some(outcome.to_string()),
            total: 1,
            estimated_value: 0.0,
        }
    }

    #[test]
    fn pipeline_rows_follow_board_order() {
        let mut rows = vec![
            row(Some("TESTE"), "ABERTA"),
            row(None, "ABERTA"),
            row(Some("FECHADA"), "GANHA"),
            row(Some("PROPOSTA"), "ABERTA"),
            row(Some("FECHADA"), "ABERTA"),
        ];
        order_pipeline_rows(&mut rows);
        let order = rows
            .iter()
            .map(|r| (r.stage.as_deref(), r.outcome.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                (Some("PROPOSTA"), Some("ABERTA")),
                (Some("FECHADA"), Some("ABERTA")),
                (Some("FECHADA"), Some("GANHA")),
                (Some("TESTE"), Some("ABERTA")),
                (None, Some("ABERTA")),
            ]
        );
    }

    #[test]
    fn unknown_stages_rank_last() {
        assert_eq!(pipeline_stage_rank(Some("PROSPECCAO")), 0);
        assert_eq!(pipeline_stage_rank(Some("NEGOCIACAO")), PIPELINE_STAGE_ORDER.len());
        assert_eq!(pipeline_stage_rank(None), PIPELINE_STAGE_ORDER.len());
    }
}

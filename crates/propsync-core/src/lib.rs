//! Core vocabulary for the CRM extract sync: canonical statuses, text
//! normalization and salesperson identity derivation.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use encoding_rs::WINDOWS_1252;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const CRATE_NAME: &str = "propsync-core";

/// Business key shared by extract rows and `crm_propostas.numero_proposta`.
pub type ProposalNumber = i64;

/// Status written to `crm_propostas.situacao`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    EmNegociacao,
    EmAnalise,
    Fechada,
    Perdida,
    Suspenso,
    Substituida,
    Teste,
    Rascunho,
    Enviada,
    Aprovada,
    Cancelada,
    Rejeitada,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmNegociacao => "EM_NEGOCIACAO",
            Self::EmAnalise => "EM_ANALISE",
            Self::Fechada => "FECHADA",
            Self::Perdida => "PERDIDA",
            Self::Suspenso => "SUSPENSO",
            Self::Substituida => "SUBSTITUIDA",
            Self::Teste => "TESTE",
            Self::Rascunho => "RASCUNHO",
            Self::Enviada => "ENVIADA",
            Self::Aprovada => "APROVADA",
            Self::Cancelada => "CANCELADA",
            Self::Rejeitada => "REJEITADA",
        }
    }
}

/// Pipeline stage written to `crm_oportunidades.estagio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityStage {
    Proposta,
    EmAnalise,
    EmNegociacao,
    Fechada,
    Perdida,
    Suspenso,
    Substituido,
    Teste,
}

impl OpportunityStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposta => "PROPOSTA",
            Self::EmAnalise => "EM_ANALISE",
            Self::EmNegociacao => "EM_NEGOCIACAO",
            Self::Fechada => "FECHADA",
            Self::Perdida => "PERDIDA",
            Self::Suspenso => "SUSPENSO",
            Self::Substituido => "SUBSTITUIDO",
            Self::Teste => "TESTE",
        }
    }
}

/// Outcome written to `crm_oportunidades.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityOutcome {
    Aberta,
    Ganha,
    Perdida,
    Cancelada,
}

impl OpportunityOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aberta => "ABERTA",
            Self::Ganha => "GANHA",
            Self::Perdida => "PERDIDA",
            Self::Cancelada => "CANCELADA",
        }
    }
}

/// The three values a canonical status fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTarget {
    pub proposal: ProposalStatus,
    pub stage: OpportunityStage,
    pub outcome: OpportunityOutcome,
}

/// Closed set of statuses accepted from the extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    EmNegociacao,
    EmAnalise,
    Fechada,
    Perdida,
    Suspenso,
    Substituido,
    Teste,
    Rascunho,
    Enviada,
    Aprovada,
    Cancelada,
    Rejeitada,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 12] = [
        Self::EmNegociacao,
        Self::EmAnalise,
        Self::Fechada,
        Self::Perdida,
        Self::Suspenso,
        Self::Substituido,
        Self::Teste,
        Self::Rascunho,
        Self::Enviada,
        Self::Aprovada,
        Self::Cancelada,
        Self::Rejeitada,
    ];

    /// Normalized spelling that identifies this status.
    pub fn canonical_key(&self) -> &'static str {
        match self {
            Self::EmNegociacao => "EM NEGOCIACAO",
            Self::EmAnalise => "EM ANALISE",
            Self::Fechada => "FECHADA",
            Self::Perdida => "PERDIDA",
            Self::Suspenso => "SUSPENSO",
            Self::Substituido => "SUBSTITUIDO",
            Self::Teste => "TESTE",
            Self::Rascunho => "RASCUNHO",
            Self::Enviada => "ENVIADA",
            Self::Aprovada => "APROVADA",
            Self::Cancelada => "CANCELADA",
            Self::Rejeitada => "REJEITADA",
        }
    }

    pub fn from_canonical_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.canonical_key() == key)
    }

    pub fn target(&self) -> StatusTarget {
        use OpportunityOutcome as O;
        use OpportunityStage as S;
        use ProposalStatus as P;

        let (proposal, stage, outcome) = match self {
            Self::EmNegociacao => (P::EmNegociacao, S::EmNegociacao, O::Aberta),
            Self::EmAnalise => (P::EmAnalise, S::EmAnalise, O::Aberta),
            Self::Fechada => (P::Fechada, S::Fechada, O::Ganha),
            Self::Perdida => (P::Perdida, S::Perdida, O::Perdida),
            Self::Suspenso => (P::Suspenso, S::Suspenso, O::Aberta),
            Self::Substituido => (P::Substituida, S::Substituido, O::Aberta),
            Self::Teste => (P::Teste, S::Teste, O::Aberta),
            Self::Rascunho => (P::Rascunho, S::Proposta, O::Aberta),
            Self::Enviada => (P::Enviada, S::EmAnalise, O::Aberta),
            Self::Aprovada => (P::Aprovada, S::Fechada, O::Aberta),
            Self::Cancelada => (P::Cancelada, S::Suspenso, O::Cancelada),
            Self::Rejeitada => (P::Rejeitada, S::Perdida, O::Perdida),
        };
        StatusTarget {
            proposal,
            stage,
            outcome,
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_key())
    }
}

/// Undo UTF-8 text that was decoded as Windows-1252 somewhere upstream
/// (`NEGOCIAÃ‡ÃƒO` -> `NEGOCIAÇÃO`).
///
/// Only text carrying the `Ã`/`Â` lead characters is considered, and only when
/// re-encoding yields valid UTF-8. Folded output never contains those leads,
/// which keeps [`normalize_text`] idempotent.
pub fn repair_mojibake(input: &str) -> Cow<'_, str> {
    if input.is_ascii() || !input.contains(['Ã', 'Â']) {
        return Cow::Borrowed(input);
    }
    let (bytes, _, had_unmappable) = WINDOWS_1252.encode(input);
    if had_unmappable {
        return Cow::Borrowed(input);
    }
    match std::str::from_utf8(&bytes) {
        Ok(repaired) if repaired != input => Cow::Owned(repaired.to_string()),
        _ => Cow::Borrowed(input),
    }
}

/// Comparison form of free text: mojibake repaired, uppercased, accents
/// dropped, whitespace trimmed and collapsed.
pub fn normalize_text(input: &str) -> String {
    repair_mojibake(input)
        .to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comparison key for a person name. Matching only; never stored.
pub fn normalize_name(input: &str) -> String {
    normalize_text(input)
}

/// Normalized status text. Underscores count as spaces so stored codes such
/// as `EM_NEGOCIACAO` fold onto the same key as the spreadsheet wording.
pub fn normalize_status_text(input: &str) -> String {
    normalize_text(&input.replace('_', " "))
}

/// Map free-text status onto the closed canonical set; `None` means invalid.
pub fn normalize_status(input: &str) -> Option<CanonicalStatus> {
    CanonicalStatus::from_canonical_key(&normalize_status_text(input))
}

const FALLBACK_LOGIN: &str = "vendedor";

/// `first.last` login derived from a display name.
pub fn derive_login(name: &str) -> String {
    let folded = normalize_text(name).to_lowercase();
    let cleaned = folded
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect::<String>();
    let parts = cleaned.split_whitespace().collect::<Vec<_>>();
    match parts.as_slice() {
        [] => FALLBACK_LOGIN.to_string(),
        [only] => (*only).to_string(),
        [first, .., last] => format!("{first}.{last}"),
    }
}

pub fn derive_email(name: &str, domain: &str) -> String {
    format!("{}@{}", derive_login(name), domain)
}

/// Append a collision counter to a login (`ana.souza` -> `ana.souza2`).
pub fn disambiguate_login(login: &str, counter: u32) -> String {
    format!("{login}{counter}")
}

/// Append a collision counter to the local part of an email.
pub fn disambiguate_email(email: &str, counter: u32) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}{counter}@{domain}"),
        None => format!("{email}{counter}"),
    }
}

/// Persisted proposal, as far as the sync jobs care.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: i64,
    pub number: ProposalNumber,
    pub status: Option<String>,
    pub salesperson_id: Option<i64>,
    pub opportunity_id: Option<i64>,
    pub total_value: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// Pipeline opportunity owned by at most one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRecord {
    pub id: i64,
    pub stage: Option<String>,
    pub outcome: Option<String>,
    pub salesperson_id: Option<i64>,
    pub estimated_value: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalespersonRecord {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub active: bool,
}

/// Login account backing a salesperson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub name: String,
    pub login: String,
    pub email: Option<String>,
    pub active: bool,
}

//! Spreadsheet extract loading: decoding, declared column mappings and typed
//! rows for the sync jobs.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use anyhow::Context;
use encoding_rs::WINDOWS_1252;
use propsync_core::{normalize_name, ProposalNumber};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "propsync-extract";

/// Config file looked up under the workspace root.
pub const CONFIG_RELATIVE_PATH: &str = "config/extract.yaml";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("reading extract {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing extract csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("no header matches {field} (tried: {})", aliases.join(", "))]
    MissingColumn {
        field: LogicalField,
        aliases: Vec<String>,
    },
    #[error("column mapping for {0} declares no aliases")]
    EmptyAliases(LogicalField),
}

/// Fields the jobs read from the extract, independent of header wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    ProposalNumber,
    Status,
    Salesperson,
    SalespersonEmail,
}

impl std::fmt::Display for LogicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ProposalNumber => "proposal_number",
            Self::Status => "status",
            Self::Salesperson => "salesperson",
            Self::SalespersonEmail => "salesperson_email",
        };
        f.write_str(name)
    }
}

/// Accepted header spellings per logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAliases {
    pub proposal_number: Vec<String>,
    pub status: Vec<String>,
    pub salesperson: Vec<String>,
    #[serde(default)]
    pub salesperson_email: Vec<String>,
}

impl Default for ColumnAliases {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            proposal_number: owned(&[
                "Número da proposta",
                "Numero da proposta",
                "Nº da proposta",
                "Numero proposta",
            ]),
            status: owned(&["Situação", "Situacao", "Status"]),
            salesperson: owned(&[
                "Vendedor/Representante",
                "Vendedor / Representante",
                "Nome do vendedor/representante",
                "Vendedor ou representante",
                "Vendedor",
            ]),
            salesperson_email: owned(&[
                "E-mail do vendedor",
                "Email do vendedor",
                "E-mail do vendedor/representante",
            ]),
        }
    }
}

impl ColumnAliases {
    pub fn aliases(&self, field: LogicalField) -> &[String] {
        match field {
            LogicalField::ProposalNumber => &self.proposal_number,
            LogicalField::Status => &self.status,
            LogicalField::Salesperson => &self.salesperson,
            LogicalField::SalespersonEmail => &self.salesperson_email,
        }
    }

    /// Match headers against the declared aliases. Comparison ignores case and
    /// accents but is otherwise exact; the first matching header wins.
    /// Every field in `required` must resolve.
    pub fn resolve(
        &self,
        headers: &[String],
        required: &[LogicalField],
    ) -> Result<ResolvedColumns, ExtractError> {
        for field in required {
            if self.aliases(*field).is_empty() {
                return Err(ExtractError::EmptyAliases(*field));
            }
        }

        let normalized_headers = headers.iter().map(|h| normalize_name(h)).collect::<Vec<_>>();
        let mut columns = BTreeMap::new();
        for field in [
            LogicalField::ProposalNumber,
            LogicalField::Status,
            LogicalField::Salesperson,
            LogicalField::SalespersonEmail,
        ] {
            let wanted = self
                .aliases(field)
                .iter()
                .map(|a| normalize_name(a))
                .collect::<Vec<_>>();
            let hit = normalized_headers
                .iter()
                .position(|header| wanted.iter().any(|alias| alias == header));
            if let Some(index) = hit {
                columns.insert(
                    field,
                    ResolvedColumn {
                        index,
                        header: headers[index].clone(),
                    },
                );
            }
        }

        for field in required {
            if !columns.contains_key(field) {
                return Err(ExtractError::MissingColumn {
                    field: *field,
                    aliases: self.aliases(*field).to_vec(),
                });
            }
        }

        Ok(ResolvedColumns { columns })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub index: usize,
    pub header: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedColumns {
    columns: BTreeMap<LogicalField, ResolvedColumn>,
}

impl ResolvedColumns {
    pub fn get(&self, field: LogicalField) -> Option<&ResolvedColumn> {
        self.columns.get(&field)
    }

    /// Header text per resolved field, for reports.
    pub fn headers(&self) -> BTreeMap<LogicalField, String> {
        self.columns
            .iter()
            .map(|(field, column)| (*field, column.header.clone()))
            .collect()
    }

    fn index_of(&self, field: LogicalField) -> Result<usize, ExtractError> {
        self.columns
            .get(&field)
            .map(|c| c.index)
            .ok_or_else(|| ExtractError::MissingColumn {
                field,
                aliases: Vec::new(),
            })
    }
}

/// Rules for dropping salesperson cells that are clearly not a person's name
/// (free-text notes, prices, dates, links).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameFilter {
    pub min_len: usize,
    pub max_len: usize,
    pub max_single_token_len: usize,
    /// Accepted before any other rule runs, matched as a substring in either
    /// direction after name normalization.
    pub known_names: Vec<String>,
    /// Rejected when found anywhere in the cell.
    pub reject_keywords: Vec<String>,
    /// Rejected when a word equals or ends with one of these (`5mm`, `5 cv`).
    pub reject_tokens: Vec<String>,
}

impl Default for NameFilter {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            min_len: 3,
            max_len: 50,
            max_single_token_len: 15,
            known_names: Vec::new(),
            reject_keywords: owned(&[
                "http",
                "drive.google",
                "eixos",
                "metros",
                "acessorios",
                "equipamento",
                "cliente",
                "proposta",
                "tombador",
                "moega",
                "plataforma",
                "coletor",
                "venda",
                "pedido",
                "entrega",
                "pagamento",
                "frete",
                "contrato",
                "instalacao",
                "montagem",
                "kg",
            ]),
            reject_tokens: owned(&["mm", "cv"]),
        }
    }
}

impl NameFilter {
    pub fn is_plausible(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if self.is_known(trimmed) {
            return true;
        }
        let len = trimmed.chars().count();
        if len < self.min_len || len > self.max_len {
            return false;
        }
        if trimmed.split_whitespace().count() == 1 && len > self.max_single_token_len {
            return false;
        }
        if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
            return false;
        }
        if trimmed.contains('@') || trimmed.contains("R$") || looks_like_date(trimmed) {
            return false;
        }

        let folded = normalize_name(trimmed).to_lowercase();
        if self
            .reject_keywords
            .iter()
            .any(|k| folded.contains(&normalize_name(k).to_lowercase()))
        {
            return false;
        }
        let tokens = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>();
        !self.reject_tokens.iter().any(|bad| {
            let bad = bad.to_lowercase();
            tokens.iter().any(|t| t.ends_with(&bad))
        })
    }

    fn is_known(&self, trimmed: &str) -> bool {
        let key = normalize_name(trimmed);
        if key.chars().count() < self.min_len {
            return false;
        }
        self.known_names.iter().any(|known| {
            let known = normalize_name(known);
            !known.is_empty() && (key.contains(&known) || known.contains(&key))
        })
    }
}

fn looks_like_date(text: &str) -> bool {
    text.as_bytes().windows(5).any(|w| {
        w[0].is_ascii_digit()
            && w[1].is_ascii_digit()
            && w[2] == b'/'
            && w[3].is_ascii_digit()
            && w[4].is_ascii_digit()
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub version: u32,
    pub columns: ColumnAliases,
    #[serde(default)]
    pub name_filter: NameFilter,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            version: 1,
            columns: ColumnAliases::default(),
            name_filter: NameFilter::default(),
        }
    }
}

impl ExtractConfig {
    /// Load `config/extract.yaml` under `root`, or the built-in mapping when the
    /// file is absent.
    pub fn from_workspace_root(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_RELATIVE_PATH);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("decoding extract config yaml")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRecord {
    /// 1-based line in the source file.
    pub line: u64,
    pub fields: Vec<String>,
}

/// Decoded, header-split spreadsheet export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extract {
    pub headers: Vec<String>,
    pub records: Vec<ExtractRecord>,
}

/// Decode extract bytes: UTF-8 (BOM stripped) with a Windows-1252 fallback
/// for spreadsheet tools that still export legacy code pages.
pub fn decode_extract(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

impl Extract {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractError> {
        Self::parse(&decode_extract(bytes))
    }

    pub fn parse(text: &str) -> Result<Self, ExtractError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            records.push(ExtractRecord {
                line,
                fields: record.iter().map(|f| f.to_string()).collect(),
            });
        }

        Ok(Self { headers, records })
    }

    pub fn resolve_columns(
        &self,
        aliases: &ColumnAliases,
        required: &[LogicalField],
    ) -> Result<ResolvedColumns, ExtractError> {
        aliases.resolve(&self.headers, required)
    }

    pub fn status_rows(
        &self,
        columns: &ResolvedColumns,
    ) -> Result<RowBatch<StatusRow>, ExtractError> {
        let number_idx = columns.index_of(LogicalField::ProposalNumber)?;
        let status_idx = columns.index_of(LogicalField::Status)?;

        let mut batch = RowBatch::default();
        for record in &self.records {
            batch.rows_read += 1;
            let Some(proposal_number) = parse_proposal_number(cell(record, number_idx)) else {
                batch.missing_key += 1;
                continue;
            };
            let raw_status = cell(record, status_idx).trim();
            if raw_status.is_empty() {
                batch.missing_value += 1;
                continue;
            }
            batch.rows.push(StatusRow {
                line: record.line,
                proposal_number,
                raw_status: raw_status.to_string(),
            });
        }
        Ok(batch)
    }

    pub fn salesperson_rows(
        &self,
        columns: &ResolvedColumns,
    ) -> Result<RowBatch<SalespersonRow>, ExtractError> {
        let number_idx = columns.index_of(LogicalField::ProposalNumber)?;
        let name_idx = columns.index_of(LogicalField::Salesperson)?;
        let email_idx = columns.get(LogicalField::SalespersonEmail).map(|c| c.index);

        let mut batch = RowBatch::default();
        for record in &self.records {
            batch.rows_read += 1;
            let Some(proposal_number) = parse_proposal_number(cell(record, number_idx)) else {
                batch.missing_key += 1;
                continue;
            };
            let raw_name = cell(record, name_idx).trim();
            if raw_name.is_empty() {
                batch.missing_value += 1;
                continue;
            }
            let email = email_idx
                .map(|idx| cell(record, idx).trim())
                .filter(|e| !e.is_empty())
                .map(|e| e.to_ascii_lowercase());
            batch.rows.push(SalespersonRow {
                line: record.line,
                proposal_number,
                raw_name: raw_name.to_string(),
                email,
            });
        }
        Ok(batch)
    }
}

fn cell(record: &ExtractRecord, idx: usize) -> &str {
    record.fields.get(idx).map(String::as_str).unwrap_or_default()
}

/// Rows of one kind plus the counts of rows that never became one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBatch<T> {
    pub rows: Vec<T>,
    pub rows_read: usize,
    pub missing_key: usize,
    pub missing_value: usize,
}

impl<T> Default for RowBatch<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            rows_read: 0,
            missing_key: 0,
            missing_value: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub line: u64,
    pub proposal_number: ProposalNumber,
    pub raw_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalespersonRow {
    pub line: u64,
    pub proposal_number: ProposalNumber,
    pub raw_name: String,
    pub email: Option<String>,
}

/// Parse a proposal number cell. Spreadsheet exports sometimes render
/// integers as `12.0`; anything non-integral or non-positive is rejected.
pub fn parse_proposal_number(raw: &str) -> Option<ProposalNumber> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let number = match trimmed.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            let float = trimmed.parse::<f64>().ok()?;
            if !float.is_finite() || float.fract() != 0.0 || float.abs() > i64::MAX as f64 {
                return None;
            }
            float as i64
        }
    };
    (number > 0).then_some(number)
}

/// Keep only the last row per key, in the order those last rows appear.
/// Returns the survivors and how many earlier rows were collapsed.
pub fn last_occurrence_wins<T, K, F>(rows: Vec<T>, key: F) -> (Vec<T>, usize)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut last_index = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        last_index.insert(key(row), idx);
    }
    let total = rows.len();
    let survivors = rows
        .into_iter()
        .enumerate()
        .filter(|(idx, row)| last_index.get(&key(row)) == Some(idx))
        .map(|(_, row)| row)
        .collect::<Vec<_>>();
    let collapsed = total - survivors.len();
    (survivors, collapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
Situação,Carimbo,Número da proposta,Situação da proposta,Vendedor/Representante,E-mail do vendedor
EM NEGOCIAÇÃO,2025-01-02,1,x,Ana Souza,ANA@EXEMPLO.COM
FECHADA,2025-01-03,1.0,y,ANA SOUZA,
PERDIDA,2025-01-04,abc,z,Carlos Lima,
,2025-01-05,2,,Carlos Lima,
";

    #[test]
    fn first_exact_alias_match_wins_over_longer_headers() {
        let extract = Extract::parse(SAMPLE).expect("parse");
        let columns = extract
            .resolve_columns(
                &ColumnAliases::default(),
                &[LogicalField::ProposalNumber, LogicalField::Status],
            )
            .expect("resolve");
        assert_eq!(columns.get(LogicalField::Status).unwrap().index, 0);
        assert_eq!(columns.get(LogicalField::ProposalNumber).unwrap().index, 2);
        assert_eq!(columns.get(LogicalField::Salesperson).unwrap().index, 4);
        assert_eq!(columns.get(LogicalField::SalespersonEmail).unwrap().index, 5);
    }

    #[test]
    fn header_matching_ignores_case_and_accents() {
        let headers = vec!["NUMERO DA PROPOSTA".to_string(), "situacao".to_string()];
        let columns = ColumnAliases::default()
            .resolve(&headers, &[LogicalField::ProposalNumber, LogicalField::Status])
            .expect("resolve");
        assert_eq!(columns.get(LogicalField::Status).unwrap().header, "situacao");
    }

    #[test]
    fn missing_required_column_names_the_aliases() {
        let headers = vec!["Número da proposta".to_string(), "Observações".to_string()];
        let err = ColumnAliases::default()
            .resolve(&headers, &[LogicalField::ProposalNumber, LogicalField::Status])
            .expect_err("status column is absent");
        match &err {
            ExtractError::MissingColumn { field, aliases } => {
                assert_eq!(*field, LogicalField::Status);
                assert!(aliases.iter().any(|a| a == "Situação"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn status_rows_skip_bad_keys_and_blank_values() {
        let extract = Extract::parse(SAMPLE).expect("parse");
        let columns = extract
            .resolve_columns(
                &ColumnAliases::default(),
                &[LogicalField::ProposalNumber, LogicalField::Status],
            )
            .expect("resolve");
        let batch = extract.status_rows(&columns).expect("rows");
        assert_eq!(batch.rows_read, 4);
        assert_eq!(batch.missing_key, 1);
        assert_eq!(batch.missing_value, 1);
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.rows[1].proposal_number, 1);
        assert_eq!(batch.rows[1].raw_status, "FECHADA");
        assert_eq!(batch.rows[0].line, 2);
    }

    #[test]
    fn salesperson_rows_carry_lowercased_emails() {
        let extract = Extract::parse(SAMPLE).expect("parse");
        let columns = extract
            .resolve_columns(
                &ColumnAliases::default(),
                &[LogicalField::ProposalNumber, LogicalField::Salesperson],
            )
            .expect("resolve");
        let batch = extract.salesperson_rows(&columns).expect("rows");
        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.rows[0].email.as_deref(), Some("ana@exemplo.com"));
        assert_eq!(batch.rows[1].email, None);
        assert_eq!(batch.rows[2].proposal_number, 2);
    }

    #[test]
    fn windows_1252_and_bom_inputs_decode() {
        let (latin, _, _) = WINDOWS_1252.encode("Situação,Número da proposta\nFECHADA,7\n");
        let extract = Extract::from_bytes(&latin).expect("latin1");
        assert_eq!(extract.headers[0], "Situação");

        let mut with_bom = b"\xEF\xBB\xBF".to_vec();
        with_bom.extend_from_slice("Situação,Número da proposta\nFECHADA,7\n".as_bytes());
        let extract = Extract::from_bytes(&with_bom).expect("bom");
        assert_eq!(extract.headers[0], "Situação");
        assert_eq!(extract.records.len(), 1);
    }

    #[test]
    fn proposal_numbers_accept_integral_floats_only() {
        assert_eq!(parse_proposal_number("12"), Some(12));
        assert_eq!(parse_proposal_number(" 12.0 "), Some(12));
        assert_eq!(parse_proposal_number("12.5"), None);
        assert_eq!(parse_proposal_number("0"), None);
        assert_eq!(parse_proposal_number("-3"), None);
        assert_eq!(parse_proposal_number("NaN"), None);
        assert_eq!(parse_proposal_number(""), None);
    }

    #[test]
    fn last_occurrence_wins_keeps_the_final_row_per_key() {
        let rows = vec![(1, "a"), (2, "b"), (1, "c"), (3, "d"), (2, "e")];
        let (kept, collapsed) = last_occurrence_wins(rows, |r| r.0);
        assert_eq!(kept, vec![(1, "c"), (3, "d"), (2, "e")]);
        assert_eq!(collapsed, 2);
    }

    #[test]
    fn name_filter_rejects_notes_prices_and_dates() {
        let filter = NameFilter::default();
        assert!(filter.is_plausible("Ana Souza"));
        assert!(filter.is_plausible("Miro"));
        assert!(filter.is_plausible("Éderson Rodrigues da Silva"));
        assert!(!filter.is_plausible("Al"));
        assert!(!filter.is_plausible("Tombador 30 metros"));
        assert!(!filter.is_plausible("R$ 150.000,00"));
        assert!(!filter.is_plausible("Entregue em 12/05"));
        assert!(!filter.is_plausible("ana@pili.ind.br"));
        assert!(!filter.is_plausible("2 eixos"));
        assert!(!filter.is_plausible("Motor 5 cv"));
        assert!(!filter.is_plausible("Instalação inclusa"));
        assert!(!filter.is_plausible("Supercalifragilistic"));
        assert!(!filter.is_plausible("https://drive.google.com/x"));
        assert!(!filter.is_plausible("Motor 500kg"));
        assert!(!filter.is_plausible("Balanca 80KG"));
        assert!(!filter.is_plausible("Chapa 5mm"));
        assert!(!filter.is_plausible("Motor 5cv"));
        assert!(filter.is_plausible("Marcos Suligo"));
    }

    #[test]
    fn known_names_bypass_the_reject_rules() {
        let filter = NameFilter {
            known_names: vec!["Miro".to_string(), "Neto Bello".to_string()],
            reject_keywords: vec!["venda".to_string()],
            ..NameFilter::default()
        };
        assert!(filter.is_plausible("MIRO (venda direta)"));
        assert!(filter.is_plausible("neto bello"));
        assert!(filter.is_plausible("Bello"));
        assert!(!filter.is_plausible("Venda balcão"));
        assert!(!filter.is_plausible("Mi"));
    }

    #[test]
    fn config_falls_back_to_defaults_and_reads_yaml() {
        let dir = tempdir().expect("tempdir");
        let config = ExtractConfig::from_workspace_root(dir.path()).expect("defaults");
        assert_eq!(config, ExtractConfig::default());

        std::fs::create_dir_all(dir.path().join("config")).expect("mkdir");
        std::fs::write(
            dir.path().join(CONFIG_RELATIVE_PATH),
            "version: 1\n\
             columns:\n  proposal_number: [\"Proposta\"]\n  status: [\"Estado\"]\n\
             \x20 salesperson: [\"Responsável\"]\n\
             name_filter:\n  min_len: 4\n",
        )
        .expect("write config");
        let config = ExtractConfig::from_workspace_root(dir.path()).expect("yaml");
        assert_eq!(config.columns.status, vec!["Estado".to_string()]);
        assert!(config.columns.salesperson_email.is_empty());
        assert_eq!(config.name_filter.min_len, 4);
        assert_eq!(config.name_filter.max_len, 50);
    }

    #[test]
    fn checked_in_config_matches_builtin_defaults() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let config = ExtractConfig::from_workspace_root(&root).expect("load config");
        assert_eq!(config, ExtractConfig::default());
    }
}

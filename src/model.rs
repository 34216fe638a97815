//! Records passed between the pipeline stages.
//!
//! Field names on the wire follow the web service (`ideCadastro`, `nomeParlamentar`, ...),
//! so the JSON artifacts keep the keys downstream consumers already know.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// One entry of the `ObterDeputados` list. Drives exactly one detail fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeputyStub {
    #[serde(rename = "ideCadastro")]
    pub id: String,
    #[serde(rename = "nome")]
    pub civil_name: Option<String>,
    #[serde(rename = "nomeParlamentar")]
    pub display_name: Option<String>,
    #[serde(rename = "partido")]
    pub party: Option<String>,
    #[serde(rename = "uf")]
    pub state: Option<String>,
    #[serde(rename = "urlFoto")]
    pub photo_url: Option<String>,
    #[serde(rename = "condicao")]
    pub status: Option<String>,
    #[serde(rename = "gabinete")]
    pub office_room: Option<String>,
    #[serde(rename = "anexo")]
    pub office_building: Option<String>,
    #[serde(rename = "fone")]
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "sexo")]
    pub sex: Option<String>,
}

impl DeputyStub {
    /// Name used in log lines: parliamentary name, then civil name, then the id.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.civil_name.as_deref())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentParty {
    #[serde(rename = "sigla", skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfficeDetail {
    #[serde(rename = "numero", skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(rename = "anexo", skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Fields extracted from an `ObterDetalhesDeputado` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeputyDetail {
    pub email: Option<String>,
    pub profession: Option<String>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub current_state: Option<String>,
    pub current_status: Option<String>,
    pub current_display_name: Option<String>,
    pub civil_name: Option<String>,
    pub sex: Option<String>,
    pub current_party: CurrentParty,
    pub office: OfficeDetail,
    pub committee_count: usize,
    pub term_count: usize,
    pub leadership_count: usize,
}

/// A stub with its detail page merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDeputy {
    #[serde(flatten)]
    pub stub: DeputyStub,
    #[serde(rename = "nomeProfissao")]
    pub profession: Option<String>,
    #[serde(rename = "dataNascimento")]
    pub birth_date: Option<String>,
    #[serde(rename = "dataFalecimento")]
    pub death_date: Option<String>,
    #[serde(rename = "ufRepresentacaoAtual")]
    pub current_state: Option<String>,
    #[serde(rename = "situacaoNaLegislaturaAtual")]
    pub current_status: Option<String>,
    #[serde(rename = "nomeParlamentarAtual")]
    pub current_display_name: Option<String>,
    #[serde(rename = "nomeCivil")]
    pub full_civil_name: Option<String>,
    #[serde(rename = "partidoAtual")]
    pub current_party: CurrentParty,
    #[serde(rename = "gabinete_detalhes")]
    pub office: OfficeDetail,
    #[serde(rename = "num_comissoes")]
    pub committee_count: usize,
    #[serde(rename = "num_periodos_exercicio")]
    pub term_count: usize,
    #[serde(rename = "num_liderancas")]
    pub leadership_count: usize,
}

impl EnrichedDeputy {
    /// Overlays `detail` on `stub`. Where both carry the same field (email, sex) a detail
    /// value replaces the stub's. A field the detail document omits does not erase the
    /// list value: the list is the only other source for it, so the stub's stays in place.
    /// The stub id is kept as the identity key.
    pub fn overlay(stub: DeputyStub, detail: DeputyDetail) -> Self {
        let mut stub = stub;
        if detail.email.is_some() {
            stub.email = detail.email;
        }
        if detail.sex.is_some() {
            stub.sex = detail.sex;
        }

        EnrichedDeputy {
            stub,
            profession: detail.profession,
            birth_date: detail.birth_date,
            death_date: detail.death_date,
            current_state: detail.current_state,
            current_status: detail.current_status,
            current_display_name: detail.current_display_name,
            full_civil_name: detail.civil_name,
            current_party: detail.current_party,
            office: detail.office,
            committee_count: detail.committee_count,
            term_count: detail.term_count,
            leadership_count: detail.leadership_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    HttpError,
    EmptyResponse,
    ParseError,
    XmlParseError,
    UrlError,
    UnexpectedError,
    FutureException,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::HttpError => "http_error",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::XmlParseError => "xml_parse_error",
            ErrorKind::UrlError => "url_error",
            ErrorKind::UnexpectedError => "unexpected_error",
            ErrorKind::FutureException => "future_exception",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one detail fetch. Every dispatched stub yields exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success {
        deputy: EnrichedDeputy,
        worker: String,
    },
    Failure {
        stub: DeputyStub,
        kind: ErrorKind,
        message: String,
    },
}

impl FetchResult {
    pub fn failure(stub: DeputyStub, kind: ErrorKind, message: impl Into<String>) -> Self {
        FetchResult::Failure {
            stub,
            kind,
            message: message.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            FetchResult::Success { deputy, .. } => &deputy.stub.id,
            FetchResult::Failure { stub, .. } => &stub.id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    pub fn as_success(&self) -> Option<&EnrichedDeputy> {
        match self {
            FetchResult::Success { deputy, .. } => Some(deputy),
            FetchResult::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            FetchResult::Success { .. } => None,
            FetchResult::Failure { kind, .. } => Some(*kind),
        }
    }
}

#[derive(Serialize)]
struct SuccessRecord<'a> {
    #[serde(flatten)]
    deputy: &'a EnrichedDeputy,
    detalhes_success: bool,
    processed_by_thread: &'a str,
}

#[derive(Serialize)]
struct FailureRecord<'a> {
    #[serde(flatten)]
    stub: &'a DeputyStub,
    detalhes_success: bool,
    detalhes_error: &'a str,
    error_type: ErrorKind,
}

impl Serialize for FetchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FetchResult::Success { deputy, worker } => SuccessRecord {
                deputy,
                detalhes_success: true,
                processed_by_thread: worker,
            }
            .serialize(serializer),
            FetchResult::Failure {
                stub,
                kind,
                message,
            } => FailureRecord {
                stub,
                detalhes_success: false,
                detalhes_error: message,
                error_type: *kind,
            }
            .serialize(serializer),
        }
    }
}

/// One entry of the `ObterPartidosCD` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "idPartido")]
    pub id: Option<String>,
    #[serde(rename = "siglaPartido")]
    pub abbreviation: Option<String>,
    #[serde(rename = "nomePartido")]
    pub name: Option<String>,
    #[serde(rename = "dataCriacao")]
    pub created_on: Option<String>,
    #[serde(rename = "dataExtincao")]
    pub extinct_on: Option<String>,
}

impl Party {
    pub fn is_active(&self) -> bool {
        self.extinct_on.is_none()
    }
}

/// The four JSON documents written by a detail run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Unified,
    Successes,
    Errors,
    Summary,
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::Unified,
        Artifact::Successes,
        Artifact::Errors,
        Artifact::Summary,
    ];

    /// File name prefix, completed with `_<timestamp>.json`.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Artifact::Unified => "deputados_unificado",
            Artifact::Successes => "deputados_sucessos",
            Artifact::Errors => "deputados_erros",
            Artifact::Summary => "deputados_resumo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Written,
    /// Nothing to write; counts as a successful write.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub worker_limit: usize,
    pub requested_count: usize,
    pub limit_applied: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCounts {
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub success_rate: String,
}

impl ResultCounts {
    pub fn new(total: usize, success: usize) -> Self {
        let success_rate = if total == 0 {
            "0%".to_string()
        } else {
            format!("{:.1}%", success as f64 / total as f64 * 100.0)
        };
        ResultCounts {
            total,
            success,
            error: total - success,
            success_rate,
        }
    }
}

/// Run-level summary handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunManifest {
    pub timestamp: String,
    pub config: RunConfig,
    pub result_counts: ResultCounts,
    pub error_type_histogram: BTreeMap<ErrorKind, usize>,
    pub written_artifact_locations: BTreeMap<Artifact, Option<String>>,
    pub artifact_status: BTreeMap<Artifact, ArtifactStatus>,
    pub fetch_elapsed_secs: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub success_examples: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_examples: Vec<String>,
}

//! Turns a classified result set into the four artifacts of a detail run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::Classification;
use crate::model::{Artifact, ArtifactStatus, CurrentParty, EnrichedDeputy, FetchResult};
use crate::store::{put_json, ArtifactStore};

/// Compact projection of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord<'a> {
    #[serde(rename = "ideCadastro")]
    pub id: &'a str,
    #[serde(rename = "nome")]
    pub civil_name: Option<&'a str>,
    #[serde(rename = "nomeParlamentar")]
    pub display_name: Option<&'a str>,
    #[serde(rename = "nomeParlamentarAtual")]
    pub current_display_name: Option<&'a str>,
    #[serde(rename = "partido")]
    pub party: Option<&'a str>,
    #[serde(rename = "partidoAtual")]
    pub current_party: &'a CurrentParty,
    #[serde(rename = "uf")]
    pub state: Option<&'a str>,
    #[serde(rename = "ufRepresentacaoAtual")]
    pub current_state: Option<&'a str>,
    #[serde(rename = "condicao")]
    pub status: Option<&'a str>,
    #[serde(rename = "situacaoNaLegislaturaAtual")]
    pub current_status: Option<&'a str>,
    pub email: Option<&'a str>,
    #[serde(rename = "sexo")]
    pub sex: Option<&'a str>,
    #[serde(rename = "dataNascimento")]
    pub birth_date: Option<&'a str>,
    #[serde(rename = "num_comissoes")]
    pub committee_count: usize,
    #[serde(rename = "num_periodos_exercicio")]
    pub term_count: usize,
    #[serde(rename = "num_liderancas")]
    pub leadership_count: usize,
}

impl<'a> From<&'a EnrichedDeputy> for SummaryRecord<'a> {
    fn from(d: &'a EnrichedDeputy) -> Self {
        SummaryRecord {
            id: &d.stub.id,
            civil_name: d.stub.civil_name.as_deref(),
            display_name: d.stub.display_name.as_deref(),
            current_display_name: d.current_display_name.as_deref(),
            party: d.stub.party.as_deref(),
            current_party: &d.current_party,
            state: d.stub.state.as_deref(),
            current_state: d.current_state.as_deref(),
            status: d.stub.status.as_deref(),
            current_status: d.current_status.as_deref(),
            email: d.stub.email.as_deref(),
            sex: d.stub.sex.as_deref(),
            birth_date: d.birth_date.as_deref(),
            committee_count: d.committee_count,
            term_count: d.term_count,
            leadership_count: d.leadership_count,
        }
    }
}

pub fn summarize<'a>(successes: &[&'a FetchResult]) -> Vec<SummaryRecord<'a>> {
    successes
        .iter()
        .filter_map(|&r| r.as_success())
        .map(SummaryRecord::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Written(String),
    Skipped,
    Failed,
}

impl ArtifactOutcome {
    pub fn status(&self) -> ArtifactStatus {
        match self {
            ArtifactOutcome::Written(_) => ArtifactStatus::Written,
            ArtifactOutcome::Skipped => ArtifactStatus::Skipped,
            ArtifactOutcome::Failed => ArtifactStatus::Failed,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            ArtifactOutcome::Written(location) => Some(location.as_str()),
            _ => None,
        }
    }
}

/// What happened to each artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    outcomes: BTreeMap<Artifact, ArtifactOutcome>,
}

impl ArtifactReport {
    pub fn outcome(&self, artifact: Artifact) -> Option<&ArtifactOutcome> {
        self.outcomes.get(&artifact)
    }

    /// True unless some attempted write failed. Skipped artifacts count as written.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes
            .values()
            .all(|o| !matches!(o, ArtifactOutcome::Failed))
    }

    pub fn locations(&self) -> BTreeMap<Artifact, Option<String>> {
        self.outcomes
            .iter()
            .map(|(a, o)| (*a, o.location().map(str::to_owned)))
            .collect()
    }

    pub fn statuses(&self) -> BTreeMap<Artifact, ArtifactStatus> {
        self.outcomes.iter().map(|(a, o)| (*a, o.status())).collect()
    }
}

pub fn artifact_key(base_key: &str, artifact: Artifact, timestamp: &str) -> String {
    format!(
        "{}/{}_{timestamp}.json",
        base_key.trim_end_matches('/'),
        artifact.file_stem()
    )
}

/// Writes every artifact independently; one failing write never stops the others.
/// The successes and errors artifacts are skipped when there is nothing to put in them.
pub async fn persist_artifacts(
    store: &dyn ArtifactStore,
    base_key: &str,
    timestamp: &str,
    results: &[FetchResult],
    classification: &Classification<'_>,
) -> ArtifactReport {
    let mut outcomes = BTreeMap::new();

    for artifact in Artifact::ALL {
        let key = artifact_key(base_key, artifact, timestamp);
        let written = match artifact {
            Artifact::Unified => put_json(store, &key, results).await,
            Artifact::Successes if classification.successes.is_empty() => {
                outcomes.insert(artifact, ArtifactOutcome::Skipped);
                continue;
            }
            Artifact::Successes => put_json(store, &key, &classification.successes).await,
            Artifact::Errors if classification.failures.is_empty() => {
                outcomes.insert(artifact, ArtifactOutcome::Skipped);
                continue;
            }
            Artifact::Errors => put_json(store, &key, &classification.failures).await,
            Artifact::Summary => {
                put_json(store, &key, &summarize(&classification.successes)).await
            }
        };

        let outcome = match written {
            Some(location) => ArtifactOutcome::Written(location),
            None => ArtifactOutcome::Failed,
        };
        outcomes.insert(artifact, outcome);
    }

    ArtifactReport { outcomes }
}

use tokio::task::spawn_blocking;
use tracing::warn;

use crate::model::{CurrentParty, DeputyDetail, DeputyStub, OfficeDetail, Party};
use crate::xml::{parse_document, Element};
use crate::{FetchError, Result};

const DETAIL_ELEMENT: &str = "Deputado";

/// Parses a list document off the async runtime and extracts its entries.
/// The deputy list is a few hundred entries, big enough to keep off the reactor threads.
pub(crate) async fn parse_list<T, F>(content: String, extract: F) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: FnOnce(&Element) -> Vec<T> + Send + 'static,
{
    let entries = spawn_blocking(move || -> Result<Vec<T>> {
        let root = parse_document(&content)?;
        Ok(extract(&root))
    })
    .await??;

    Ok(entries)
}

/// Extracts every `<deputado>` entry of an `ObterDeputados` document.
/// Entries without an `ideCadastro` can't drive a detail fetch and are skipped.
pub fn parse_deputy_list(root: &Element) -> Vec<DeputyStub> {
    root.descendants("deputado")
        .into_iter()
        .filter_map(|entry| {
            let Some(id) = entry.child_text("ideCadastro") else {
                warn!(
                    name = ?entry.child_text("nomeParlamentar"),
                    "skipping deputy without ideCadastro"
                );
                return None;
            };
            Some(DeputyStub {
                id,
                civil_name: entry.child_text("nome"),
                display_name: entry.child_text("nomeParlamentar"),
                party: entry.child_text("partido"),
                state: entry.child_text("uf"),
                photo_url: entry.child_text("urlFoto"),
                status: entry.child_text("condicao"),
                office_room: entry.child_text("gabinete"),
                office_building: entry.child_text("anexo"),
                phone: entry.child_text("fone"),
                email: entry.child_text("email"),
                sex: entry.child_text("sexo"),
            })
        })
        .collect()
}

/// Extracts every `<partido>` entry of an `ObterPartidosCD` document.
pub fn parse_party_list(root: &Element) -> Vec<Party> {
    root.descendants("partido")
        .into_iter()
        .map(|entry| Party {
            id: entry.child_text("idPartido"),
            abbreviation: entry.child_text("siglaPartido"),
            name: entry.child_text("nomePartido"),
            created_on: entry.child_text("dataCriacao"),
            extinct_on: entry.child_text("dataExtincao"),
        })
        .collect()
}

/// Extracts the fixed detail schema from an `ObterDetalhesDeputado` document.
/// The `Deputado` element has to sit somewhere below the document root.
pub fn parse_deputy_detail(root: &Element) -> core::result::Result<DeputyDetail, FetchError> {
    let deputy = root
        .find_descendant(DETAIL_ELEMENT)
        .ok_or(FetchError::MissingElement(DETAIL_ELEMENT))?;

    let current_party = deputy
        .child("partidoAtual")
        .map(|party| CurrentParty {
            abbreviation: party.child_text("sigla"),
            name: party.child_text("nome"),
        })
        .unwrap_or_default();

    let office = deputy
        .child("gabinete")
        .map(|office| OfficeDetail {
            number: office.child_text("numero"),
            building: office.child_text("anexo"),
            phone: office.child_text("telefone"),
        })
        .unwrap_or_default();

    Ok(DeputyDetail {
        email: deputy.child_text("email"),
        profession: deputy.child_text("nomeProfissao"),
        birth_date: deputy.child_text("dataNascimento"),
        death_date: deputy.child_text("dataFalecimento"),
        current_state: deputy.child_text("ufRepresentacaoAtual"),
        current_status: deputy.child_text("situacaoNaLegislaturaAtual"),
        current_display_name: deputy.child_text("nomeParlamentarAtual"),
        civil_name: deputy.child_text("nomeCivil"),
        sex: deputy.child_text("sexo"),
        current_party,
        office,
        committee_count: deputy.child_count("comissoes"),
        term_count: deputy.child_count("periodosExercicio"),
        leadership_count: deputy.child_count("historicoLider"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{detail_xml, DEPUTY_LIST_XML, PARTY_LIST_XML};

    #[test]
    fn deputy_list_skips_entries_without_id() {
        let root = parse_document(DEPUTY_LIST_XML).unwrap();
        let stubs = parse_deputy_list(&root);

        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].id, "141428");
        assert_eq!(stubs[0].display_name.as_deref(), Some("MARIA SILVA"));
        assert_eq!(stubs[0].office_building.as_deref(), Some("4"));
        assert_eq!(stubs[1].id, "204554");
        assert_eq!(stubs[1].email, None);
    }

    #[test]
    fn party_list_keeps_extinction_dates() {
        let root = parse_document(PARTY_LIST_XML).unwrap();
        let parties = parse_party_list(&root);

        assert_eq!(parties.len(), 2);
        assert!(parties[0].is_active());
        assert_eq!(parties[1].extinct_on.as_deref(), Some("01/03/2007"));
    }

    #[test]
    fn detail_extracts_fields_and_counts() {
        let root = parse_document(&detail_xml("141428")).unwrap();
        let detail = parse_deputy_detail(&root).unwrap();

        assert_eq!(detail.profession.as_deref(), Some("Professora"));
        assert_eq!(detail.current_party.abbreviation.as_deref(), Some("PT"));
        assert_eq!(detail.current_party.name.as_deref(), Some("Partido dos Trabalhadores"));
        assert_eq!(detail.office.number.as_deref(), Some("401"));
        assert_eq!(detail.death_date, None);
        assert_eq!(detail.committee_count, 2);
        assert_eq!(detail.term_count, 1);
        assert_eq!(detail.leadership_count, 0);
    }

    #[test]
    fn detail_without_sub_trees_defaults_to_empty() {
        let root =
            parse_document("<Deputados><Deputado><sexo>M</sexo></Deputado></Deputados>").unwrap();
        let detail = parse_deputy_detail(&root).unwrap();

        assert_eq!(detail.sex.as_deref(), Some("M"));
        assert_eq!(detail.current_party, CurrentParty::default());
        assert_eq!(detail.office, OfficeDetail::default());
        assert_eq!(detail.committee_count, 0);
    }

    #[test]
    fn detail_without_deputy_element_is_a_parse_error() {
        let root = parse_document("<erro><mensagem>nada</mensagem></erro>").unwrap();
        let err = parse_deputy_detail(&root).unwrap_err();
        assert!(matches!(err, FetchError::MissingElement("Deputado")));
    }
}

//! Fixtures and fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::fetch::{interpret_detail_body, DetailSource};
use crate::model::{DeputyDetail, DeputyStub};
use crate::store::ArtifactStore;
use crate::{Error, FetchError, Result};

pub(crate) const DEPUTY_LIST_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<deputados>
  <deputado>
    <ideCadastro>141428</ideCadastro>
    <condicao>Titular</condicao>
    <nome>MARIA DA SILVA</nome>
    <nomeParlamentar>MARIA SILVA</nomeParlamentar>
    <urlFoto>http://www.camara.gov.br/internet/deputado/bandep/141428.jpg</urlFoto>
    <sexo>feminino</sexo>
    <uf>SP</uf>
    <partido>PT</partido>
    <gabinete>401</gabinete>
    <anexo>4</anexo>
    <fone>3215-5401</fone>
    <email>dep.mariasilva@camara.leg.br</email>
  </deputado>
  <deputado>
    <ideCadastro>204554</ideCadastro>
    <condicao>Titular</condicao>
    <nome>JOSÉ PEREIRA</nome>
    <nomeParlamentar>ZÉ PEREIRA</nomeParlamentar>
    <uf>MG</uf>
    <partido>PSD</partido>
    <email></email>
  </deputado>
  <deputado>
    <nome>SEM IDENTIFICADOR</nome>
  </deputado>
</deputados>"#;

pub(crate) const PARTY_LIST_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<partidos>
  <partido>
    <idPartido>PT</idPartido>
    <siglaPartido>PT</siglaPartido>
    <nomePartido>Partido dos Trabalhadores</nomePartido>
    <dataCriacao>10/02/1980</dataCriacao>
    <dataExtincao/>
  </partido>
  <partido>
    <idPartido>PFL</idPartido>
    <siglaPartido>PFL</siglaPartido>
    <nomePartido>Partido da Frente Liberal</nomePartido>
    <dataCriacao>24/01/1985</dataCriacao>
    <dataExtincao>01/03/2007</dataExtincao>
  </partido>
</partidos>"#;

pub(crate) fn detail_xml(id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<Deputados>
  <Deputado>
    <numLegislatura>57</numLegislatura>
    <email>dep.{id}@camara.leg.br</email>
    <nomeProfissao>Professora</nomeProfissao>
    <dataNascimento>12/5/1970</dataNascimento>
    <dataFalecimento></dataFalecimento>
    <ufRepresentacaoAtual>SP</ufRepresentacaoAtual>
    <situacaoNaLegislaturaAtual>Em Exercício</situacaoNaLegislaturaAtual>
    <ideCadastro>{id}</ideCadastro>
    <nomeParlamentarAtual>DEPUTADA {id}</nomeParlamentarAtual>
    <nomeCivil>Maria da Silva</nomeCivil>
    <sexo>F</sexo>
    <partidoAtual>
      <idPartido>PT</idPartido>
      <sigla>PT</sigla>
      <nome>Partido dos Trabalhadores</nome>
    </partidoAtual>
    <gabinete>
      <numero>401</numero>
      <anexo>4</anexo>
      <telefone>3215-5401</telefone>
    </gabinete>
    <comissoes>
      <comissao><siglaComissao>CE</siglaComissao></comissao>
      <comissao><siglaComissao>CCJC</siglaComissao></comissao>
    </comissoes>
    <periodosExercicio>
      <periodoExercicio><siglaUFRepresentacao>SP</siglaUFRepresentacao></periodoExercicio>
    </periodosExercicio>
    <historicoLider/>
  </Deputado>
</Deputados>"#
    )
}

pub(crate) fn stub(id: &str) -> DeputyStub {
    DeputyStub {
        id: id.to_string(),
        civil_name: Some(format!("DEPUTADO CIVIL {id}")),
        display_name: Some(format!("DEPUTADO {id}")),
        party: Some("PT".into()),
        state: Some("SP".into()),
        status: Some("Titular".into()),
        ..Default::default()
    }
}

pub(crate) fn stubs(n: usize) -> Vec<DeputyStub> {
    (0..n).map(|i| stub(&i.to_string())).collect()
}

type ErrorFactory = Box<dyn Fn() -> FetchError + Send + Sync>;

/// A [`DetailSource`] answering from the detail fixture, with per-id scripted misbehaviour.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    failures: HashMap<String, ErrorFactory>,
    fail_all: Option<ErrorFactory>,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
}

impl ScriptedSource {
    pub(crate) fn failing(
        mut self,
        id: &str,
        error: impl Fn() -> FetchError + Send + Sync + 'static,
    ) -> Self {
        self.failures.insert(id.to_string(), Box::new(error));
        self
    }

    pub(crate) fn failing_all(mut self, error: impl Fn() -> FetchError + Send + Sync + 'static) -> Self {
        self.fail_all = Some(Box::new(error));
        self
    }

    pub(crate) fn delayed(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub(crate) fn panicking(mut self, id: &str) -> Self {
        self.panics.insert(id.to_string());
        self
    }
}

#[async_trait]
impl DetailSource for ScriptedSource {
    async fn fetch_detail(&self, id: &str) -> core::result::Result<DeputyDetail, FetchError> {
        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        }
        if self.panics.contains(id) {
            panic!("scripted panic for {id}");
        }
        if let Some(error) = self.failures.get(id).or(self.fail_all.as_ref()) {
            return Err(error());
        }
        interpret_detail_body(detail_xml(id).as_bytes())
    }
}

/// An [`ArtifactStore`] keeping everything in memory. Keys containing a rejected
/// fragment fail to store.
#[derive(Default)]
pub(crate) struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    rejected: Vec<String>,
}

impl MemoryStore {
    pub(crate) fn rejecting(mut self, fragment: &str) -> Self {
        self.rejected.push(fragment.to_string());
        self
    }

    pub(crate) fn json(&self, key: &str) -> Option<Value> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(key)
            .map(|body| serde_json::from_slice(body).unwrap())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<String> {
        let location = format!("memory://{key}");
        if self.rejected.iter().any(|f| key.contains(f.as_str())) {
            return Err(Error::StoreRejected {
                location,
                status: 503,
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(location)
    }
}

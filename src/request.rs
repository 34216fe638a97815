use async_trait::async_trait;
use chrono::Local;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::config::ApiConfig;
use crate::fetch::{interpret_detail_body, DetailSource};
use crate::model::{DeputyDetail, DeputyStub, Party};
use crate::parse::{parse_deputy_list, parse_list, parse_party_list};
use crate::xml::Element;
use crate::{info_time, Error, FetchError, Result};

/// HTTP client for the `Deputados.asmx` service.
#[derive(Debug, Clone)]
pub struct CamaraClient {
    // Client uses Arc so we can clone cheaply
    client: Client,
    config: ApiConfig,
}

impl CamaraClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("pt-BR,pt;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(CamaraClient { client, config })
    }

    /// Requests the list of deputies in office.
    pub async fn list_deputies(&self) -> Result<Vec<DeputyStub>> {
        self.list_with_fallback("deputies", ApiConfig::deputies_url, parse_deputy_list)
            .await
    }

    /// Requests the list of parties, active and extinct.
    pub async fn list_parties(&self) -> Result<Vec<Party>> {
        self.list_with_fallback("parties", ApiConfig::parties_url, parse_party_list)
            .await
    }

    /// Tries the primary base URL first. Errors and empty lists fall through to the
    /// fallback base, when one is configured.
    async fn list_with_fallback<T, F>(
        &self,
        what: &str,
        url_for: fn(&str) -> String,
        extract: F,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(&Element) -> Vec<T> + Copy + Send + 'static,
    {
        let primary_url = url_for(&self.config.base_url);
        let primary = self.request_list(&primary_url, extract).await;

        let Some(fallback) = self.config.fallback_base_url.as_deref() else {
            return non_empty(primary, &primary_url);
        };
        match primary {
            Ok(entries) if !entries.is_empty() => return Ok(entries),
            Ok(_) => warn!(url = %primary_url, "{what} list is empty, trying fallback URL"),
            Err(e) => warn!(url = %primary_url, error = %e, "{what} list failed, trying fallback URL"),
        }

        let fallback_url = url_for(fallback);
        non_empty(
            self.request_list(&fallback_url, extract).await,
            &fallback_url,
        )
    }

    async fn request_list<T, F>(&self, url: &str, extract: F) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Element) -> Vec<T> + Send + 'static,
    {
        let start_time = Local::now();
        let res = self.client.get(url).send().await?.error_for_status()?;
        let content = res.text().await?;
        let entries = parse_list(content, extract).await?;
        info_time!(start_time, "Fetched {} entries from {url}", entries.len());
        Ok(entries)
    }
}

fn non_empty<T>(outcome: Result<Vec<T>>, url: &str) -> Result<Vec<T>> {
    match outcome {
        Ok(entries) if entries.is_empty() => Err(Error::EmptyList(url.to_string())),
        other => other,
    }
}

#[async_trait]
impl DetailSource for CamaraClient {
    /// Requests `ObterDetalhesDeputado` for one id. Only a `200 OK` is read further.
    async fn fetch_detail(&self, id: &str) -> core::result::Result<DeputyDetail, FetchError> {
        let res = self
            .client
            .get(self.config.detail_url())
            .query(&[("ideCadastro", id), ("numLegislatura", "")])
            .send()
            .await?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = res.bytes().await?;
        interpret_detail_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::model::ErrorKind;
    use crate::test_helpers::{detail_xml, DEPUTY_LIST_XML, PARTY_LIST_XML};

    async fn client_for(server: &MockServer) -> CamaraClient {
        CamaraClient::new(ApiConfig::with_base_url(server.uri())).unwrap()
    }

    async fn mount_detail(server: &MockServer, id: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/ObterDetalhesDeputado"))
            .and(query_param("ideCadastro", id))
            .and(query_param("numLegislatura", ""))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn detail_success() {
        let server = MockServer::start().await;
        mount_detail(
            &server,
            "141428",
            ResponseTemplate::new(200).set_body_string(detail_xml("141428")),
        )
        .await;

        let detail = client_for(&server)
            .await
            .fetch_detail("141428")
            .await
            .unwrap();
        assert_eq!(detail.current_party.abbreviation.as_deref(), Some("PT"));
        assert_eq!(detail.term_count, 1);
    }

    #[tokio::test]
    async fn detail_not_found_is_http_error() {
        let server = MockServer::start().await;
        mount_detail(&server, "1", ResponseTemplate::new(404)).await;

        let err = client_for(&server).await.fetch_detail("1").await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
        assert_eq!(err.kind(), ErrorKind::HttpError);
    }

    #[tokio::test]
    async fn detail_malformed_and_rootless_bodies() {
        let server = MockServer::start().await;
        mount_detail(
            &server,
            "1",
            ResponseTemplate::new(200).set_body_string("<Deputados><Deputado></Deputados>"),
        )
        .await;
        mount_detail(
            &server,
            "2",
            ResponseTemplate::new(200).set_body_string("<Deputados></Deputados>"),
        )
        .await;
        mount_detail(&server, "3", ResponseTemplate::new(200)).await;

        let client = client_for(&server).await;
        let kind = |r: core::result::Result<DeputyDetail, FetchError>| r.unwrap_err().kind();
        assert_eq!(kind(client.fetch_detail("1").await), ErrorKind::XmlParseError);
        assert_eq!(kind(client.fetch_detail("2").await), ErrorKind::ParseError);
        assert_eq!(kind(client.fetch_detail("3").await), ErrorKind::EmptyResponse);
    }

    #[tokio::test]
    async fn detail_timeout_is_url_error() {
        let server = MockServer::start().await;
        mount_detail(
            &server,
            "1",
            ResponseTemplate::new(200)
                .set_body_string(detail_xml("1"))
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let config =
            ApiConfig::with_base_url(server.uri()).with_timeout(Duration::from_millis(200));
        let err = CamaraClient::new(config)
            .unwrap()
            .fetch_detail("1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UrlError);
    }

    #[tokio::test]
    async fn detail_connection_refused_is_url_error() {
        // Nothing listens on port 9 of localhost in the test environment.
        let client = CamaraClient::new(ApiConfig::with_base_url("http://127.0.0.1:9")).unwrap();
        let err = client.fetch_detail("1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UrlError);
    }

    #[tokio::test]
    async fn lists_deputies_and_parties() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ObterDeputados"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DEPUTY_LIST_XML))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ObterPartidosCD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PARTY_LIST_XML))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.list_deputies().await.unwrap().len(), 2);
        assert_eq!(client.list_parties().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_falls_back_when_primary_fails() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ObterDeputados"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/ObterDeputados"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DEPUTY_LIST_XML))
            .expect(1)
            .mount(&fallback)
            .await;

        let config =
            ApiConfig::with_base_url(primary.uri()).with_fallback_base_url(format!("{}/", fallback.uri()));
        let stubs = CamaraClient::new(config).unwrap().list_deputies().await.unwrap();
        assert_eq!(stubs[0].id, "141428");
    }

    #[tokio::test]
    async fn empty_list_without_fallback_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ObterDeputados"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<deputados/>"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.list_deputies().await.unwrap_err();
        assert!(matches!(err, Error::EmptyList(_)));
    }
}

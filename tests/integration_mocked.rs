/// Integration tests with mocked external APIs
/// Exercises the service clients and the enrichment loop without hitting real
/// external services.
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rust_leadgen_api::circuit_breaker::create_research_circuit_breaker;
use rust_leadgen_api::config::Config;
use rust_leadgen_api::config_model::{EnrichmentConfig, JobRolesConfig, LocationConfig};
use rust_leadgen_api::enrichment::{
    EnrichmentRetryController, EnrichmentState, ResearchProvider,
};
use rust_leadgen_api::models::{Lead, RawLead};
use rust_leadgen_api::services::{ApolloService, PerplexityService};

fn create_test_config(base_url: &str) -> Config {
    Config {
        database_url: "postgresql://test".to_string(),
        port: 8080,
        apollo_base_url: base_url.to_string(),
        perplexity_base_url: base_url.to_string(),
    }
}

const GOOD_RESEARCH: &str = "Acme Corp is a mid-sized logistics firm based in Austin. \
     They operate forty warehouses across Texas. \
     Revenue has grown steadily since 2019 and headcount doubled.";

#[tokio::test]
async fn apollo_search_parses_people_and_drops_invalid_emails() {
    let mock_server = MockServer::start().await;

    let mock_response = json!({
        "people": [
            {
                "id": "p1",
                "email": "jane.doe@acme.com",
                "name": "Jane Doe",
                "title": "Office Manager",
                "organization": {"name": "Acme Inc", "estimated_num_employees": 40}
            },
            {
                "id": "p2",
                "email": "not-an-email",
                "name": "Broken Record",
                "organization": {"name": "Globex"}
            },
            {
                "id": "p3",
                "name": "No Email At All"
            }
        ],
        "pagination": {"page": 1, "total_entries": 3}
    });

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .and(header("x-api-key", "test-apollo-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let service = ApolloService::new(&config, "test-apollo-key".to_string());

    let location = LocationConfig {
        raw_location: "Austin, TX".to_string(),
        provider_location_ids: vec![],
        use_llm_parsing: true,
    };
    let candidates = service
        .search_people(&JobRolesConfig::default(), &location, 25)
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].email, "jane.doe@acme.com");
    assert_eq!(candidates[0].company, "Acme Inc");
    assert_eq!(
        candidates[0].raw_data["organization"]["estimated_num_employees"],
        40
    );
}

#[tokio::test]
async fn apollo_error_status_surfaces_as_external_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let service = ApolloService::new(&config, "bad-key".to_string());

    let result = service
        .search_people(
            &JobRolesConfig::default(),
            &LocationConfig::default(),
            10,
        )
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn perplexity_extracts_message_content() {
    let mock_server = MockServer::start().await;

    let mock_response = json!({
        "id": "resp-1",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": GOOD_RESEARCH}}
        ]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-pplx-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let breaker = Arc::new(create_research_circuit_breaker());
    let service = PerplexityService::new(&config, "test-pplx-key".to_string(), breaker);

    let text = service
        .research("Tell me about Acme", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(text, GOOD_RESEARCH);
}

#[tokio::test]
async fn enrichment_loop_retries_low_quality_responses_over_http() {
    let mock_server = MockServer::start().await;

    // First call returns an unusable answer, second call a good one
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "I cannot find anything."}}]
        })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": GOOD_RESEARCH}}]
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let breaker = Arc::new(create_research_circuit_breaker());
    let service = PerplexityService::new(&config, "test-pplx-key".to_string(), breaker);

    let enrichment = EnrichmentConfig {
        timeout_seconds: 5,
        ..Default::default()
    };
    let controller = EnrichmentRetryController::new(&service, &enrichment);

    let lead = Lead::from_candidate(
        RawLead {
            email: "jane@acme.com".to_string(),
            name: "Jane Doe".to_string(),
            company: "Acme Corp".to_string(),
            title: Some("Office Manager".to_string()),
            source: "Apollo.io".to_string(),
            raw_data: json!({}),
        },
        "proj-1",
    );

    let state = controller.run(&lead).await;
    match state {
        EnrichmentState::Enriched { research, attempts } => {
            assert_eq!(research, GOOD_RESEARCH);
            assert_eq!(attempts, 2);
        }
        other => panic!("expected Enriched, got {:?}", other),
    }
}

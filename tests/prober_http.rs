use std::time::{Duration, Instant};

use quantum_studio::models::{Credentials, HealthStatus};
use quantum_studio::providers::{
    ApiFlavor, ProviderDescriptor, ProviderRegistry, API_KEY_PLACEHOLDER,
};
use quantum_studio::services::{ProbeConfig, StatusProber};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> ProbeConfig {
    ProbeConfig {
        timeout: Duration::from_millis(300),
        retry_delay: Duration::from_millis(50),
    }
}

fn fast_prober() -> StatusProber {
    StatusProber::new(fast_config())
}

fn acme(name: &str, base: &str) -> ProviderDescriptor {
    ProviderDescriptor::builder(name, ApiFlavor::OpenAiCompatible, format!("{}/v1", base))
        .bearer_auth()
        .model("acme-large", "Acme Large", 128_000)
        .build()
}

fn keyed(name: &str) -> Credentials {
    Credentials::new().with_api_key(name, "sk-test")
}

#[tokio::test]
async fn test_healthy_model_listing_is_operational() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "acme-large" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let health = fast_prober()
        .probe_provider(&acme("Acme", &server.uri()), &keyed("Acme"))
        .await;

    assert_eq!(health.status, HealthStatus::Operational);
    assert_eq!(health.message, None);
    assert!(health.response_time_ms.is_some());
}

#[tokio::test]
async fn test_hanging_provider_is_degraded_within_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let started = Instant::now();
    let health = fast_prober()
        .probe_provider(&acme("Acme", &server.uri()), &keyed("Acme"))
        .await;

    assert_eq!(health.status, HealthStatus::Degraded);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_transient_failure_recovers_after_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "acme-large" }] })),
        )
        .mount(&server)
        .await;

    let health = fast_prober()
        .probe_provider(&acme("Acme", &server.uri()), &keyed("Acme"))
        .await;

    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(health.message.as_deref(), Some("recovered after retry"));
}

#[tokio::test]
async fn test_persistent_failure_keeps_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let health = fast_prober()
        .probe_provider(&acme("Acme", &server.uri()), &keyed("Acme"))
        .await;

    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(health.message.as_deref(), Some("HTTP 502"));
}

#[tokio::test]
async fn test_rejected_key_is_retried_then_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let health = fast_prober()
        .probe_provider(&acme("Acme", &server.uri()), &keyed("Acme"))
        .await;

    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(health.message.as_deref(), Some("HTTP 401: API key rejected"));
}

#[tokio::test]
async fn test_forbidden_key_recovers_after_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "acme-large" }] })),
        )
        .mount(&server)
        .await;

    let health = fast_prober()
        .probe_provider(&acme("Acme", &server.uri()), &keyed("Acme"))
        .await;

    assert_eq!(health.status, HealthStatus::Degraded);
    assert_eq!(health.message.as_deref(), Some("recovered after retry"));
}

#[tokio::test]
async fn test_missing_test_model_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "acme-other" }] })),
        )
        .mount(&server)
        .await;

    let health = fast_prober()
        .probe_provider(&acme("Acme", &server.uri()), &keyed("Acme"))
        .await;

    assert_eq!(health.status, HealthStatus::Degraded);
    assert!(health.message.unwrap().contains("acme-large"));
}

#[tokio::test]
async fn test_gemini_listing_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(header("x-goog-api-key", "g-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "models/gemini-1.5-flash" }, { "name": "models/gemini-1.5-pro" }]
        })))
        .mount(&server)
        .await;

    let google = ProviderDescriptor::builder("Google", ApiFlavor::Gemini, format!("{}/v1beta", server.uri()))
        .header("x-goog-api-key", API_KEY_PLACEHOLDER)
        .model("gemini-1.5-pro", "Gemini 1.5 Pro", 2_000_000)
        .build();
    let health = fast_prober()
        .probe_provider(&google, &Credentials::new().with_api_key("Google", "g-key"))
        .await;

    assert_eq!(health.status, HealthStatus::Operational);
}

#[tokio::test]
async fn test_public_status_page_needs_no_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let status_url = format!("{}/", server.uri());
    let descriptor = ProviderDescriptor::builder("Acme", ApiFlavor::OpenAiCompatible, "https://api.acme.test/v1")
        .bearer_auth()
        .model("acme-large", "Acme Large", 128_000)
        .status_page(status_url.clone(), true)
        .build();

    let health = fast_prober().probe_provider(&descriptor, &Credentials::new()).await;

    assert_eq!(health.status, HealthStatus::Operational);
    assert_eq!(health.status_url.as_deref(), Some(status_url.as_str()));
}

#[tokio::test]
async fn test_probe_all_is_sorted_with_one_entry_per_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": "acme-large" }])),
        )
        .mount(&server)
        .await;

    let registry = ProviderRegistry::from_descriptors(vec![
        acme("Zeta", &server.uri()),
        acme("Alpha", &server.uri()),
        acme("Mid", &server.uri()),
    ])
    .unwrap();
    let credentials = Credentials::new()
        .with_api_key("Zeta", "sk-z")
        .with_api_key("Alpha", "sk-a");

    let results = fast_prober().probe_all(&registry, &credentials).await;

    let names: Vec<&str> = results.iter().map(|h| h.provider.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
    assert_eq!(results[0].status, HealthStatus::Operational);
    assert_eq!(results[1].message.as_deref(), Some("credentials not configured"));
}

#[tokio::test]
async fn test_hanging_provider_does_not_hold_up_the_others() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&slow)
        .await;
    let fast = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "acme-large" }] })),
        )
        .mount(&fast)
        .await;

    let registry = ProviderRegistry::from_descriptors(vec![
        acme("Slow", &slow.uri()),
        acme("Fast1", &fast.uri()),
        acme("Fast2", &fast.uri()),
    ])
    .unwrap();
    let credentials = Credentials::new()
        .with_api_key("Slow", "sk-test")
        .with_api_key("Fast1", "sk-test")
        .with_api_key("Fast2", "sk-test");

    let started = Instant::now();
    let results = fast_prober().probe_all(&registry, &credentials).await;

    assert_eq!(results.len(), 3);
    assert!(started.elapsed() < fast_config().deadline() + Duration::from_secs(1));
    for health in &results {
        let expected = if health.provider == "Slow" {
            HealthStatus::Degraded
        } else {
            HealthStatus::Operational
        };
        assert_eq!(health.status, expected, "{}", health.provider);
    }
}

#[tokio::test]
async fn test_api_key_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("Authorization", "Bearer sk-good"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "acme-large" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let descriptor = acme("Acme", &server.uri());
    let prober = fast_prober();

    let good = prober.test_api_key(&descriptor, "sk-good", &Credentials::new()).await;
    assert_eq!(good.status, HealthStatus::Operational);

    let bad = prober.test_api_key(&descriptor, "sk-bad", &Credentials::new()).await;
    assert_eq!(bad.status, HealthStatus::Down);
    assert_eq!(bad.message.as_deref(), Some("API key rejected"));
}

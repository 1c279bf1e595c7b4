use ratekeeper::core::config::{AppConfig, StoreBackend};
use ratekeeper::core::RateError;
use ratekeeper::{App, AppCommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod test_utils {
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const APP_ID: &str = "integration-app";

    pub const MOCK_RESPONSE: &str = r#"{
        "disclaimer": "Usage subject to terms",
        "timestamp": 1700000000,
        "base": "USD",
        "rates": {
            "USD": 1,
            "EUR": 0.9,
            "GBP": 0.8,
            "JPY": 150.0
        }
    }"#;

    pub async fn create_mock_server(delay: Duration) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .and(query_param("app_id", APP_ID))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(MOCK_RESPONSE)
                    .set_delay(delay),
            )
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn memory_config(base_url: &str) -> ratekeeper::core::config::AppConfig {
        let mut config = ratekeeper::core::config::AppConfig::default();
        config.store.backend = ratekeeper::core::config::StoreBackend::Memory;
        config.provider.base_url = base_url.to_string();
        config.provider.app_id = APP_ID.to_string();
        config
    }
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_mock_server(Duration::ZERO).await;
    let app = App::build(test_utils::memory_config(&mock_server.uri()))
        .await
        .unwrap();

    // Nothing is known before the first sync
    let err = app.resolver.resolve("EUR", "GBP").await.unwrap_err();
    assert!(err.is_not_found());

    let report = app.synchronizer().unwrap().sync_once().await.unwrap();
    info!(?report, "Sync finished");
    assert_eq!(report.fetched, 4);
    assert_eq!(report.cached, 4);
    assert_eq!(report.stored, 4);
    assert_eq!(report.failed, 0);

    let direct = app.resolver.resolve("usd", "eur").await.unwrap();
    assert_eq!(direct.rate, 0.9);

    let cross = app.resolver.resolve("EUR", "GBP").await.unwrap();
    assert_eq!(cross.base.as_str(), "EUR");
    assert_eq!(cross.target.as_str(), "GBP");
    assert_eq!(cross.rate, 0.89);

    let identity = app.resolver.resolve("USD", "USD").await.unwrap();
    assert_eq!(identity.rate, 1.0);

    let err = app.resolver.resolve("EUR", "XYZ").await.unwrap_err();
    assert!(matches!(err, RateError::NotFound(ref code) if code.as_str() == "XYZ"));
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_disk_store() {
    let mock_server = test_utils::create_mock_server(Duration::ZERO).await;
    let data_dir = tempfile::tempdir().unwrap();

    let mut config = test_utils::memory_config(&mock_server.uri());
    config.store.backend = StoreBackend::Disk;
    config.store.path = Some(data_dir.path().join("rates").display().to_string());

    let app = App::build(config).await.unwrap();
    app.synchronizer().unwrap().sync_once().await.unwrap();

    let usd = ratekeeper::core::CurrencyCode::new("USD").unwrap();
    let jpy = ratekeeper::core::CurrencyCode::new("JPY").unwrap();
    let stored = app.store.find_direct(&usd, &jpy).await.unwrap().unwrap();
    assert_eq!(stored.rate, 150.0);

    let quote = app.resolver.resolve("EUR", "JPY").await.unwrap();
    assert_eq!(quote.rate, 166.67);
}

#[test_log::test(tokio::test)]
async fn test_sync_against_failing_provider() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let app = App::build(test_utils::memory_config(&mock_server.uri()))
        .await
        .unwrap();
    let err = app.synchronizer().unwrap().sync_once().await.unwrap_err();

    assert!(matches!(err, RateError::ProviderUnavailable(_)));
    assert!(app.resolver.resolve("USD", "EUR").await.is_err());
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_parallel_resolves_during_sync() {
    let mock_server = test_utils::create_mock_server(Duration::from_millis(50)).await;
    let app = App::build(test_utils::memory_config(&mock_server.uri()))
        .await
        .unwrap();
    let synchronizer = app.synchronizer().unwrap();
    synchronizer.sync_once().await.unwrap();

    let resolver = Arc::clone(&app.resolver);
    let sync_task = {
        let synchronizer = Arc::clone(&synchronizer);
        tokio::spawn(async move { synchronizer.sync_once().await })
    };

    let pairs = [("EUR", "GBP"), ("USD", "JPY"), ("GBP", "USD"), ("EUR", "ABC")];
    let mut handles = Vec::new();
    for i in 0..100 {
        let resolver = Arc::clone(&resolver);
        let (base, target) = pairs[i % pairs.len()];
        handles.push(tokio::spawn(async move {
            (target, resolver.resolve(base, target).await)
        }));
    }

    for handle in handles {
        let (target, result) = handle.await.unwrap();
        match target {
            "GBP" => assert_eq!(result.unwrap().rate, 0.89),
            "JPY" => assert_eq!(result.unwrap().rate, 150.0),
            "USD" => assert_eq!(result.unwrap().rate, 1.25),
            _ => assert!(result.unwrap_err().is_not_found()),
        }
    }

    let report = sync_task.await.unwrap().unwrap();
    assert_eq!(report.stored, 4);
}

#[test_log::test(tokio::test)]
async fn test_background_sync_populates_tiers() {
    let mock_server = test_utils::create_mock_server(Duration::ZERO).await;
    let app = App::build(test_utils::memory_config(&mock_server.uri()))
        .await
        .unwrap();

    let handle = app.synchronizer().unwrap().start(Duration::from_secs(3600));

    let mut quote = None;
    for _ in 0..50 {
        if let Ok(found) = app.resolver.resolve("GBP", "JPY").await {
            quote = Some(found);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.shutdown().await;

    // 150 / 0.8
    assert_eq!(quote.unwrap().rate, 187.5);
}

#[test_log::test(tokio::test)]
async fn test_run_command_rate_reports_unsupported_currency() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        "pivot: USD\nstore:\n  backend: memory\nprovider:\n  app_id: \"x\"\n",
    )
    .unwrap();

    let result = ratekeeper::run_command(
        AppCommand::Rate {
            base: "EUR".to_string(),
            target: "GBP".to_string(),
        },
        config_path.to_str(),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Failed to resolve EUR to GBP"));
    let rate_error = err.downcast_ref::<RateError>().unwrap();
    assert!(rate_error.is_not_found());
}

#[test_log::test(tokio::test)]
async fn test_synchronizer_requires_app_id() {
    let mut config = AppConfig::default();
    config.store.backend = StoreBackend::Memory;

    let app = App::build(config).await.unwrap();
    let err = app.synchronizer().err().unwrap();

    assert!(err.to_string().contains("provider.app_id is not set"));
}

#[test_log::test(tokio::test)]
async fn test_run_command_sync_against_mock() {
    let mock_server = test_utils::create_mock_server(Duration::ZERO).await;
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        format!(
            "store:\n  backend: memory\nprovider:\n  base_url: \"{}\"\n  app_id: \"{}\"\n",
            mock_server.uri(),
            test_utils::APP_ID
        ),
    )
    .unwrap();

    ratekeeper::run_command(AppCommand::Sync, config_path.to_str())
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

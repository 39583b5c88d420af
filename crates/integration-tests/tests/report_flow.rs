use configs::Settings;
use paw_core::{
    AnimalStatus, AppError, Coordinate, NotificationPrefs, NotificationPrefsStore, Report, ReportCategory,
    ReportClient,
};
use paw_db_sqlite::SqliteStore;
use paw_reports_rest::PostgrestReportClient;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> PostgrestReportClient {
    let settings = Settings::from_toml(&format!(
        "[remote]\nurl = \"{}\"\nanon_key = \"flow-key\"\ntimeout_secs = 5\n",
        server.uri()
    ))
    .unwrap();
    let remote = &settings.remote;
    PostgrestReportClient::new(&remote.base_url().unwrap(), remote.api_key().unwrap(), remote.timeout()).unwrap()
}

#[tokio::test]
async fn configured_client_hits_reports_endpoint() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    assert_eq!(client.endpoint(), format!("{}/rest/v1/public_reports", server.uri()));

    Mock::given(method("POST"))
        .and(path("/rest/v1/public_reports"))
        .and(header("apikey", "flow-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut report = Report::draft(ReportCategory::Injured);
    report.animal_type = "Fox".into();
    report.status = AnimalStatus::Injured;
    report.nearest_landmark = "Elm St bridge".into();
    report.set_coordinate(Some(Coordinate {
        latitude: 51.5,
        longitude: -0.12,
    }));
    client.create_report(&report).await.unwrap();
}

#[tokio::test]
async fn map_listing_fetches_all_categories_and_pins_located_reports() {
    let server = MockServer::start().await;
    let rows = serde_json::json!([
        { "id": uuid::Uuid::new_v4(), "category": "Lost Animal", "animalType": "Cat",
          "status": "Other", "latitude": 10.0, "longitude": 20.0 },
        { "id": uuid::Uuid::new_v4(), "category": "Found Animal", "animalType": "Dog",
          "status": "Safe/Contained", "latitude": null, "longitude": null },
        { "id": uuid::Uuid::new_v4(), "category": "Wild Animal", "animalType": "Deer",
          "status": "Injured", "latitude": 11.0, "longitude": 21.0 }
    ]);
    Mock::given(method("GET"))
        .and(path("/rest/v1/public_reports"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(&server)
        .await;

    let reports = client_for(&server).list_reports(None).await.unwrap();
    assert_eq!(reports.len(), 3);

    let pinned: Vec<_> = reports.iter().filter_map(Report::coordinate).collect();
    assert_eq!(pinned.len(), 2);

    let received = server.received_requests().await.unwrap();
    assert!(!received[0].url.query().unwrap_or_default().contains("category="));
}

#[tokio::test]
async fn server_error_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .update_status(uuid::Uuid::new_v4(), AnimalStatus::Safe)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Remote { status: 500, ref body } if body == "boom"));
    assert_eq!(err.to_string(), "remote returned HTTP 500: boom");
}

#[tokio::test]
async fn saved_alert_radius_selects_nearby_reports() {
    let store = SqliteStore::new("sqlite::memory:").await.unwrap();
    let mut prefs = NotificationPrefs::default();
    prefs.enabled = true;
    prefs.set_radius(10.0);
    prefs.set_center(Some(Coordinate {
        latitude: 40.0,
        longitude: -75.0,
    }));
    store.save_prefs("jane@example.com", &prefs).await.unwrap();

    let server = MockServer::start().await;
    let rows = serde_json::json!([
        { "id": uuid::Uuid::new_v4(), "category": "Lost Animal", "animalType": "Cat",
          "nearestLandmark": "Main St", "status": "Other", "latitude": 40.05, "longitude": -75.0 },
        { "id": uuid::Uuid::new_v4(), "category": "Wild Animal", "animalType": "Deer",
          "status": "Injured", "latitude": 41.0, "longitude": -75.0 },
        { "id": uuid::Uuid::new_v4(), "category": "Found Animal", "animalType": "Dog",
          "status": "Safe/Contained" }
    ]);
    Mock::given(method("GET"))
        .and(path("/rest/v1/public_reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(&server)
        .await;

    let saved = store.load_prefs("Jane@Example.com").await.unwrap();
    let reports = client_for(&server).list_reports(None).await.unwrap();
    let alerts: Vec<String> = reports
        .iter()
        .filter_map(|r| saved.alert_distance(r).map(|miles| r.nearby_summary(miles)))
        .collect();

    assert_eq!(alerts, vec!["Cat reported near Main St, 3.5 mi away".to_string()]);
}

use hourpot::AppCommand;
use hourpot::core::store::{Session, TrackerStore};
use hourpot::store::disk::LocalStore;
use rust_decimal_macros::dec;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_supabase_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt",
                "refresh_token": "refresh",
                "expires_in": 3600,
                "user": {"id": "user-1", "email": "me@example.com"}
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Work", "rate": 50.0, "description": "Professional work activities"},
                {"id": 5, "name": "Social Media", "rate": -15.0, "description": null}
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/logs"))
            .and(query_param("user_id", "eq.user-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "user_id": "user-1", "date": "2024-01-01", "hours": 2.0,
                 "category_id": 1, "note": "deep work", "value": 100.0},
                {"id": 2, "user_id": "user-1", "date": "2024-01-02", "hours": 1.0,
                 "category_id": 5, "note": null, "value": -15.0}
            ])))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"user_id": "user-1", "savings_goal": 1000.0, "currency": "EUR",
                 "goal_date": "2024-12-31"}
            ])))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn write_config(dir: &Path, backend: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
backend:
{backend}
recent_limit: 5
data_path: "{}"
"#,
        dir.join("data").display()
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_string_lossy().into_owned()
}

#[test_log::test(tokio::test)]
async fn test_demo_backend_flow() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), "  type: demo");

    for command in [
        AppCommand::Dashboard {
            today: None,
            goal_date: None,
        },
        AppCommand::HabitList,
        AppCommand::ActivityList { limit: None },
        AppCommand::SettingsShow,
        AppCommand::Log {
            hours: dec!(1.5),
            category: "work".to_string(),
            note: Some("demo".to_string()),
            date: None,
        },
    ] {
        let result = hourpot::run_command(command, Some(&config_path)).await;
        assert!(result.is_ok(), "Command failed with: {:?}", result.err());
    }

    // Demo data never reaches the data directory.
    assert!(!dir.path().join("data").join("store").exists());
}

#[test_log::test(tokio::test)]
async fn test_local_backend_flow() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), "  type: local");

    let config = hourpot::core::config::AppConfig::load_from_path(&config_path).unwrap();
    let seeded = hourpot::cli::setup::seed_local_store(&config).await.unwrap();
    assert_eq!(seeded, 5);

    let result = hourpot::run_command(
        AppCommand::Log {
            hours: dec!(2),
            category: "Personal Development".to_string(),
            note: None,
            date: None,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Log failed with: {:?}", result.err());

    let result = hourpot::run_command(
        AppCommand::SettingsSet(hourpot::core::models::SettingsUpdate {
            savings_goal: Some(dec!(500)),
            ..Default::default()
        }),
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Settings failed with: {:?}", result.err());

    let result = hourpot::run_command(
        AppCommand::Dashboard {
            today: None,
            goal_date: None,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Dashboard failed with: {:?}", result.err());

    // Habit 3 is now referenced by an activity.
    let result = hourpot::run_command(AppCommand::HabitDelete { id: 3 }, Some(&config_path)).await;
    assert!(result.is_err());

    let store = LocalStore::open(&dir.path().join("data").join("store")).unwrap();
    let session = Session::local();
    let logs = store.list_logs(&session).await.unwrap();
    info!(?logs, "Stored activities");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].value, dec!(60));
    assert_eq!(
        store.get_settings(&session).await.unwrap().savings_goal,
        dec!(500)
    );
}

#[test_log::test(tokio::test)]
async fn test_supabase_flow_with_mock() {
    let mock_server = test_utils::create_supabase_mock_server().await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(
        dir.path(),
        &format!(
            "  type: supabase\n  url: \"{}\"\n  key: \"anon-key\"",
            mock_server.uri()
        ),
    );

    let result = hourpot::run_command(
        AppCommand::Dashboard {
            today: None,
            goal_date: None,
        },
        Some(&config_path),
    )
    .await;
    let err = result.expect_err("dashboard needs a login first");
    assert!(err.to_string().contains("Not logged in"));

    let result = hourpot::run_command(
        AppCommand::Login {
            email: Some("me@example.com".to_string()),
            password: Some("secret".to_string()),
            sign_up: false,
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Login failed with: {:?}", result.err());
    assert!(dir.path().join("data").join("session.json").exists());

    let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 2);
    let result = hourpot::run_command(
        AppCommand::Dashboard {
            today,
            goal_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 30),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Dashboard failed with: {:?}", result.err());

    let result =
        hourpot::run_command(AppCommand::ActivityList { limit: None }, Some(&config_path)).await;
    assert!(result.is_ok(), "Activity list failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_guide_needs_no_config() {
    let result = hourpot::run_command(
        AppCommand::Guide {
            currency: None,
            hours_per_week: Some(dec!(3)),
        },
        Some("/nonexistent/config.yaml"),
    )
    .await;
    assert!(result.is_ok(), "Guide failed with: {:?}", result.err());
}

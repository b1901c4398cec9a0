//! Hosted backend: PostgREST tables and GoTrue auth of a Supabase project.
use super::util::{status_error, with_retry};
use crate::core::error::{Result, TrackerError};
use crate::core::models::{
    Category, CategoryDraft, CategoryId, Currency, LogEntry, LogId, PricedLog, Settings,
    SettingsUpdate, default_goal_date,
};
use crate::core::store::{Authenticator, Session, TrackerStore};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::{Method, RequestBuilder, Response, Url};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info};

const RETRIES: usize = 3;
const RETRY_DELAY_MS: u64 = 500;

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";

#[derive(Serialize)]
struct CategoryBody<'a> {
    name: &'a str,
    rate: Decimal,
    description: Option<&'a str>,
}

impl<'a> From<&'a Category> for CategoryBody<'a> {
    fn from(category: &'a Category) -> Self {
        Self {
            name: &category.name,
            rate: category.rate,
            description: category.description.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct LogBody<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    log: &'a PricedLog,
}

/// Settings rows written before goal dates existed have no `goal_date`.
#[derive(Deserialize)]
struct SettingsRow {
    user_id: String,
    savings_goal: Decimal,
    currency: Currency,
    #[serde(default)]
    goal_date: Option<NaiveDate>,
}

impl From<SettingsRow> for Settings {
    fn from(row: SettingsRow) -> Self {
        Self {
            user_id: row.user_id,
            savings_goal: row.savings_goal,
            currency: row.currency,
            goal_date: row.goal_date.unwrap_or_else(default_goal_date),
        }
    }
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

impl AuthResponse {
    fn into_session(self) -> Result<Session> {
        let (Some(access_token), Some(user)) = (self.access_token, self.user) else {
            return Err(TrackerError::Auth(
                "account created; confirm your email address, then log in".to_string(),
            ));
        };
        Ok(Session {
            user_id: user.id,
            email: user.email,
            access_token: Some(access_token),
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
        })
    }
}

pub struct SupabaseClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}/rest/v1/{table}", self.base_url), params)
            .map_err(|e| TrackerError::invalid(format!("bad Supabase url {}: {e}", self.base_url)))
    }

    fn auth_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}/auth/v1/{path}", self.base_url), params)
            .map_err(|e| TrackerError::invalid(format!("bad Supabase url {}: {e}", self.base_url)))
    }

    fn request(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "Supabase response");
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn select<T: DeserializeOwned>(&self, url: Url, token: &str) -> Result<Vec<T>> {
        debug!(%url, "Supabase select");
        let response = with_retry(
            || self.request(Method::GET, url.clone(), token).send(),
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await?;
        Self::parse(response).await
    }

    async fn write<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        token: &str,
        prefer: &str,
        body: Option<&B>,
    ) -> Result<Vec<T>> {
        debug!(%method, %url, "Supabase write");
        let mut request = self
            .request(method, url, token)
            .header("Prefer", prefer);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::parse(request.send().await?).await
    }

    /// First row of a write that must touch exactly one record.
    fn single<T>(rows: Vec<T>, what: impl FnOnce() -> String) -> Result<T> {
        rows.into_iter()
            .next()
            .ok_or_else(|| TrackerError::not_found(what()))
    }

    fn log_filter(session: &Session, id: LogId) -> [(&'static str, String); 2] {
        [
            ("id", format!("eq.{id}")),
            ("user_id", format!("eq.{}", session.user_id)),
        ]
    }

    async fn save_settings(&self, session: &Session, settings: &Settings) -> Result<Settings> {
        let url = self.table_url("settings", &[("on_conflict", "user_id".to_string())])?;
        let rows: Vec<SettingsRow> = self
            .write(
                Method::POST,
                url,
                session.bearer()?,
                MERGE_DUPLICATES,
                Some(settings),
            )
            .await?;
        Ok(Self::single(rows, || format!("settings for user {}", session.user_id))?.into())
    }

    async fn auth_call<B: Serialize>(&self, url: Url, body: &B) -> Result<Session> {
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            // GoTrue answers bad credentials with 400 or 422.
            return match status_error(status.as_u16(), &text) {
                TrackerError::Backend { status, message } if status < 500 => {
                    Err(TrackerError::Auth(message))
                }
                other => Err(other),
            };
        }
        serde_json::from_str::<AuthResponse>(&text)?.into_session()
    }
}

#[async_trait]
impl TrackerStore for SupabaseClient {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let url = self.table_url(
            "categories",
            &[("select", "*".to_string()), ("order", "id.asc".to_string())],
        )?;
        self.select(url, &self.api_key).await
    }

    async fn add_category(&self, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let category = draft.into_category(0);
        let url = self.table_url("categories", &[])?;
        let rows = self
            .write(
                Method::POST,
                url,
                &self.api_key,
                RETURN_REPRESENTATION,
                Some(&CategoryBody::from(&category)),
            )
            .await?;
        let category: Category = Self::single(rows, || "inserted habit".to_string())?;
        info!(id = category.id, "Created habit");
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        draft.validate()?;
        let category = draft.into_category(id);
        let url = self.table_url("categories", &[("id", format!("eq.{id}"))])?;
        let rows = self
            .write(
                Method::PATCH,
                url,
                &self.api_key,
                RETURN_REPRESENTATION,
                Some(&CategoryBody::from(&category)),
            )
            .await?;
        Self::single(rows, || format!("habit with id {id}"))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let url = self.table_url("categories", &[("id", format!("eq.{id}"))])?;
        let rows: Vec<Category> = self
            .write::<_, ()>(Method::DELETE, url, &self.api_key, RETURN_REPRESENTATION, None)
            .await?;
        Self::single(rows, || format!("habit with id {id}")).map(|_| ())
    }

    async fn list_logs(&self, session: &Session) -> Result<Vec<LogEntry>> {
        let url = self.table_url(
            "logs",
            &[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", session.user_id)),
                ("order", "date.asc,id.asc".to_string()),
            ],
        )?;
        self.select(url, session.bearer()?).await
    }

    async fn get_log(&self, session: &Session, id: LogId) -> Result<LogEntry> {
        let mut params = Self::log_filter(session, id).to_vec();
        params.push(("select", "*".to_string()));
        let url = self.table_url("logs", &params)?;
        let rows = self.select(url, session.bearer()?).await?;
        Self::single(rows, || format!("activity with id {id}"))
    }

    async fn insert_log(&self, session: &Session, log: PricedLog) -> Result<LogEntry> {
        let url = self.table_url("logs", &[])?;
        let body = LogBody {
            user_id: &session.user_id,
            log: &log,
        };
        let rows = self
            .write(
                Method::POST,
                url,
                session.bearer()?,
                RETURN_REPRESENTATION,
                Some(&body),
            )
            .await?;
        Self::single(rows, || "inserted activity".to_string())
    }

    async fn update_log(&self, session: &Session, id: LogId, log: PricedLog) -> Result<LogEntry> {
        let url = self.table_url("logs", &Self::log_filter(session, id))?;
        let rows = self
            .write(
                Method::PATCH,
                url,
                session.bearer()?,
                RETURN_REPRESENTATION,
                Some(&log),
            )
            .await?;
        Self::single(rows, || format!("activity with id {id}"))
    }

    async fn delete_log(&self, session: &Session, id: LogId) -> Result<()> {
        let url = self.table_url("logs", &Self::log_filter(session, id))?;
        let rows: Vec<LogEntry> = self
            .write::<_, ()>(
                Method::DELETE,
                url,
                session.bearer()?,
                RETURN_REPRESENTATION,
                None,
            )
            .await?;
        Self::single(rows, || format!("activity with id {id}")).map(|_| ())
    }

    async fn get_settings(&self, session: &Session) -> Result<Settings> {
        let url = self.table_url(
            "settings",
            &[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", session.user_id)),
            ],
        )?;
        let rows: Vec<SettingsRow> = self.select(url, session.bearer()?).await?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(row.into());
        }
        debug!(user_id = %session.user_id, "No settings yet, creating defaults");
        self.save_settings(session, &Settings::defaults_for(&session.user_id))
            .await
    }

    async fn upsert_settings(&self, session: &Session, update: SettingsUpdate) -> Result<Settings> {
        update.validate()?;
        let mut settings = self.get_settings(session).await?;
        settings.apply(&update);
        self.save_settings(session, &settings).await
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[async_trait]
impl Authenticator for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.auth_url("token", &[("grant_type", "password")])?;
        let session = self.auth_call(url, &Credentials { email, password }).await?;
        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.auth_url("signup", &[])?;
        self.auth_call(url, &Credentials { email, password }).await
    }

    async fn refresh(&self, session: &Session) -> Result<Session> {
        let refresh_token = session
            .refresh_token
            .as_deref()
            .ok_or_else(|| TrackerError::Auth("session expired, please log in again".to_string()))?;
        let url = self.auth_url("token", &[("grant_type", "refresh_token")])?;
        self.auth_call(url, &RefreshBody { refresh_token }).await
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let url = self.auth_url("logout", &[])?;
        let response = self
            .request(Method::POST, url, session.bearer()?)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{
        body_partial_json, header, header_exists, method, path, query_param,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "anon-key";

    fn session() -> Session {
        Session {
            user_id: "user-1".to_string(),
            email: Some("me@example.com".to_string()),
            access_token: Some("jwt".to_string()),
            refresh_token: Some("refresh".to_string()),
            expires_at: None,
        }
    }

    fn log_row(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "user_id": "user-1",
            "date": "2024-01-02",
            "hours": 1.5,
            "category_id": 1,
            "note": null,
            "value": 75.0
        })
    }

    #[tokio::test]
    async fn test_list_logs_filters_by_user_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/logs"))
            .and(query_param("user_id", "eq.user-1"))
            .and(header("apikey", KEY))
            .and(header("authorization", "Bearer jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([log_row(7)])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), KEY);
        let logs = client.list_logs(&session()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, 7);
        assert_eq!(logs[0].hours, dec!(1.5));
        assert_eq!(logs[0].value, dec!(75));
        assert_eq!(logs[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[tokio::test]
    async fn test_insert_log_asks_for_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/logs"))
            .and(header("prefer", RETURN_REPRESENTATION))
            .and(body_partial_json(json!({
                "user_id": "user-1",
                "date": "2024-01-02",
                "category_id": 1,
                "hours": "1.5",
                "value": "75"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([log_row(8)])))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), KEY);
        let entry = client
            .insert_log(
                &session(),
                PricedLog {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    hours: dec!(1.5),
                    category_id: 1,
                    note: None,
                    value: dec!(75),
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.id, 8);
        assert_eq!(entry.user_id, "user-1");
    }

    #[tokio::test]
    async fn test_missing_settings_are_upserted_with_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/settings"))
            .and(query_param("on_conflict", "user_id"))
            .and(header_exists("prefer"))
            .and(body_partial_json(json!({"user_id": "user-1", "currency": "USD"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "user_id": "user-1",
                "savings_goal": 100000.0,
                "currency": "USD"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), KEY);
        let settings = client.get_settings(&session()).await.unwrap();
        assert_eq!(settings.savings_goal, dec!(100000));
        assert_eq!(settings.currency, Currency::Usd);
        assert_eq!(settings.goal_date, default_goal_date());
    }

    #[tokio::test]
    async fn test_update_of_missing_log_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/logs"))
            .and(query_param("id", "eq.404"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), KEY);
        let err = client
            .update_log(
                &session(),
                404,
                PricedLog {
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    hours: dec!(1),
                    category_id: 1,
                    note: None,
                    value: dec!(50),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_status_codes_map_to_error_kinds() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/categories"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23503",
                "message": "update or delete on table \"categories\" violates foreign key constraint"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/logs"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "JWT expired"})))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), KEY);
        assert!(matches!(
            client.delete_category(1).await,
            Err(TrackerError::Conflict(_))
        ));
        match client.list_logs(&session()).await {
            Err(TrackerError::Auth(message)) => assert_eq!(message, "JWT expired"),
            other => panic!("expected auth error, got {other:?}"),
        }
        assert!(matches!(
            client.list_logs(&Session::local()).await,
            Err(TrackerError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_builds_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_partial_json(json!({"email": "me@example.com"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt",
                "refresh_token": "refresh",
                "expires_in": 3600,
                "token_type": "bearer",
                "user": {"id": "user-1", "email": "me@example.com"}
            })))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), KEY);
        let session = client.sign_in("me@example.com", "secret").await.unwrap();
        assert_eq!(session.user_id, "user-1");
        assert_eq!(session.access_token.as_deref(), Some("jwt"));
        assert!(!session.is_expired(Utc::now()));
        assert!(session.is_expired(Utc::now() + Duration::hours(2)));
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_auth_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-2",
                "email": "new@example.com"
            })))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&server.uri(), KEY);
        match client.sign_in("me@example.com", "wrong").await {
            Err(TrackerError::Auth(message)) => assert_eq!(message, "Invalid login credentials"),
            other => panic!("expected auth error, got {other:?}"),
        }
        // Sign-up without an immediate session means email confirmation is pending.
        assert!(matches!(
            client.sign_up("new@example.com", "secret").await,
            Err(TrackerError::Auth(_))
        ));
    }
}

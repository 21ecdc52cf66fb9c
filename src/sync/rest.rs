//! PostgREST client (Supabase REST API).

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::{RemoteError, RemoteStore};

#[derive(Debug, Clone)]
pub struct RestRemote {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestRemote {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// `base_url` is the project URL, without the `/rest/v1` suffix.
    pub fn new(base_url: &str, api_key: String) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("sitetrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder, prefer: &'static str) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", prefer)
    }

    async fn send(&self, request: RequestBuilder, prefer: &'static str) -> Result<Response, RemoteError> {
        let res = self.authorized(request, prefer).send().await.map_err(map_reqwest_error)?;
        match res.status() {
            s if s.is_success() => Ok(res),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(RemoteError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Transport(e.to_string())
    }
}

fn id_filter(id: i64) -> [(&'static str, String); 1] {
    [("id", format!("eq.{}", id))]
}

const RETURN_MINIMAL: &str = "return=minimal";
const RETURN_ROWS: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=minimal";

impl RemoteStore for RestRemote {
    async fn select(&self, table: &str) -> Result<Vec<Value>, RemoteError> {
        let request = self.http.get(self.table_url(table)).query(&[("select", "*")]);
        self.send(request, RETURN_MINIMAL)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), RemoteError> {
        self.send(self.http.post(self.table_url(table)).json(&row), RETURN_MINIMAL).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, row: Value) -> Result<(), RemoteError> {
        let request = self.http.post(self.table_url(table)).json(&row);
        self.send(request, MERGE_DUPLICATES).await?;
        Ok(())
    }

    async fn update(&self, table: &str, id: i64, row: Value) -> Result<(), RemoteError> {
        let request = self.http.patch(self.table_url(table)).query(&id_filter(id)).json(&row);
        // A PATCH matching no row still succeeds; the returned rows tell.
        let updated = self
            .send(request, RETURN_ROWS)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        if updated.is_empty() {
            return Err(RemoteError::Missing {
                table: table.to_string(),
                id,
            });
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: i64) -> Result<(), RemoteError> {
        let request = self.http.delete(self.table_url(table)).query(&id_filter(id));
        self.send(request, RETURN_MINIMAL).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let remote = RestRemote::new("https://abc.supabase.co/", "key".to_string()).unwrap();
        assert_eq!(remote.table_url("milestones"), "https://abc.supabase.co/rest/v1/milestones");
    }

    #[test]
    fn test_requests_carry_credentials_and_filters() {
        let remote = RestRemote::new("https://abc.supabase.co", "secret".to_string()).unwrap();
        let request = remote
            .authorized(remote.http.delete(remote.table_url("tasks")).query(&id_filter(12)), RETURN_MINIMAL)
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "https://abc.supabase.co/rest/v1/tasks?id=eq.12");
        assert_eq!(request.headers()["apikey"], "secret");
        assert_eq!(request.headers()["authorization"], "Bearer secret");
    }

    #[test]
    fn test_upsert_and_patch_preferences() {
        let remote = RestRemote::new("https://abc.supabase.co", "secret".to_string()).unwrap();
        let upsert = remote
            .authorized(remote.http.post(remote.table_url("milestones")), MERGE_DUPLICATES)
            .build()
            .unwrap();
        assert_eq!(upsert.headers()["prefer"], "resolution=merge-duplicates,return=minimal");

        let patch = remote
            .authorized(remote.http.patch(remote.table_url("milestones")).query(&id_filter(3)), RETURN_ROWS)
            .build()
            .unwrap();
        assert_eq!(patch.url().as_str(), "https://abc.supabase.co/rest/v1/milestones?id=eq.3");
        assert_eq!(patch.headers()["prefer"], "return=representation");
    }
}

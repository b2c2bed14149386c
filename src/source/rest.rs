// restmigrate/src/source/rest.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use url::Url;

use super::{Record, RowSource};
use crate::config::SourceConfig;
use crate::errors::AppError;

/// `RowSource` backed by the store's `/rest/v1` data API.
pub struct RestSource {
    client: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Deserialize)]
struct CountRow {
    count: u64,
}

impl RestSource {
    pub fn new(source_config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(source_config.request_timeout)
            .connect_timeout(source_config.connect_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: source_config.base_url.clone(),
            api_key: source_config.api_key.clone(),
        })
    }

    /// `{base}/rest/v1/{table}` with the given query pairs. Any path on the
    /// base URL is kept, with or without a trailing slash.
    fn table_url(&self, table: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Source URL {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get(&self, url: Url, exact_count: bool) -> Result<Response> {
        let mut request = self
            .client
            .get(url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);
        if exact_count {
            request = request.header("Prefer", "count=exact");
        }

        let response = request.send().await.map_err(AppError::from)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::HttpStatus {
                url: redact_query(&url),
                status,
                body,
            }
            .into());
        }
        Ok(response)
    }
}

#[async_trait]
impl RowSource for RestSource {
    async fn fetch_page(&self, table: &str, limit: usize, offset: usize) -> Result<Vec<Record>> {
        let url = self.table_url(
            table,
            &[
                ("select", "*".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ],
        )?;
        tracing::debug!(%url, "fetching page");

        let response = self.get(url, false).await?;
        let rows: Vec<Record> = response
            .json()
            .await
            .with_context(|| format!("Failed to decode rows for table {}", table))?;
        Ok(rows)
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let url = self.table_url(table, &[("select", "count".to_string())])?;
        let response = self.get(url, true).await?;
        let rows: Vec<CountRow> = response
            .json()
            .await
            .with_context(|| format!("Failed to decode row count for table {}", table))?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }
}

// Only the path goes into errors; query strings are noise in diagnostics.
fn redact_query(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::classify;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn source(base: &str) -> RestSource {
        let config = SourceConfig {
            base_url: Url::parse(base).unwrap(),
            api_key: "key".into(),
            page_size: 100,
            request_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
        };
        RestSource::new(&config).unwrap()
    }

    #[test]
    fn test_page_url_layout() -> anyhow::Result<()> {
        let source = source("https://abc.supabase.co");
        let url = source.table_url(
            "users",
            &[
                ("select", "*".to_string()),
                ("limit", "1000".to_string()),
                ("offset", "2000".to_string()),
            ],
        )?;
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/users?select=*&limit=1000&offset=2000"
        );
        Ok(())
    }

    #[test]
    fn test_count_url_layout() -> anyhow::Result<()> {
        let source = source("http://127.0.0.1:54321/");
        let url = source.table_url("daily_rates", &[("select", "count".to_string())])?;
        assert_eq!(url.as_str(), "http://127.0.0.1:54321/rest/v1/daily_rates?select=count");
        assert_eq!(redact_query(&url), "http://127.0.0.1:54321/rest/v1/daily_rates");
        Ok(())
    }

    /// Answers one connection per canned `(status, body)` pair, in order, and
    /// records each request head lowercased.
    async fn serve(responses: Vec<(u16, &'static str)>) -> anyhow::Result<(String, Arc<Mutex<Vec<String>>>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base = format!("http://{}", listener.local_addr()?);
        let heads = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&heads);

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                recorded
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).to_lowercase());
                let response = format!(
                    "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Ok((base, heads))
    }

    #[tokio::test]
    async fn test_fetch_page_sends_auth_headers_and_decodes_rows() -> anyhow::Result<()> {
        let (base, heads) = serve(vec![(200, r#"[{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]"#)]).await?;

        let rows = source(&base).fetch_page("users", 2, 0).await?;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "a");
        assert_eq!(rows[1]["id"], 2);
        let heads = heads.lock().unwrap();
        let head = &heads[0];
        assert!(head.starts_with("get /rest/v1/users?select=*&limit=2&offset=0 "));
        assert!(head.contains("apikey: key\r\n"));
        assert!(head.contains("authorization: bearer key\r\n"));
        assert!(!head.contains("prefer:"));
        Ok(())
    }

    #[tokio::test]
    async fn test_count_rows_asks_for_exact_count() -> anyhow::Result<()> {
        let (base, heads) = serve(vec![(200, r#"[{"count": 42}]"#), (200, "[]")]).await?;
        let source = source(&base);

        assert_eq!(source.count_rows("daily_rates").await?, 42);
        assert_eq!(source.count_rows("daily_rates").await?, 0);

        let heads = heads.lock().unwrap();
        assert!(heads[0].starts_with("get /rest/v1/daily_rates?select=count "));
        assert!(heads[0].contains("prefer: count=exact\r\n"));
        assert!(heads[0].contains("apikey: key\r\n"));
        Ok(())
    }

    #[tokio::test]
    async fn test_error_status_becomes_http_status_error() -> anyhow::Result<()> {
        let (base, _heads) = serve(vec![(404, r#"{"message":"relation \"public.users\" does not exist"}"#)]).await?;

        let err = source(&base).fetch_page("users", 10, 0).await.unwrap_err();

        match classify(&err) {
            Some(AppError::HttpStatus { url, status, body }) => {
                assert_eq!(*status, 404);
                assert!(body.contains("does not exist"));
                assert_eq!(url, &format!("{}/rest/v1/users", base));
            }
            other => panic!("expected HttpStatus, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_base_path_is_kept() -> anyhow::Result<()> {
        for base in ["http://gw.local/supabase", "http://gw.local/supabase/"] {
            let url = source(base).table_url("users", &[])?;
            assert_eq!(url.as_str(), "http://gw.local/supabase/rest/v1/users");
        }
        Ok(())
    }
}

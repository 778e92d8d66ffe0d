//! Live-database source: four read queries against an OOREP Postgres instance.
//!
//! The locale filter is pushed down to the server to cut transfer volume;
//! the transformers still enforce it on their own.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use super::retry::{is_transient_sqlx, retry_async, RetryPolicy};
use super::{Extraction, ScanStats, SourceAdapter, SourceError, SourceTable};
use crate::models::{RawChapter, RawDataset, RawMapping, RawRemedy, RawRubric, TARGET_REPERTORY};

pub const ENV_PG_HOST: &str = "OOREP_PG_HOST";
pub const ENV_PG_PORT: &str = "OOREP_PG_PORT";
pub const ENV_PG_DATABASE: &str = "OOREP_PG_DATABASE";
pub const ENV_PG_USER: &str = "OOREP_PG_USER";
pub const ENV_PG_PASSWORD: &str = "OOREP_PG_PASSWORD";

const DEFAULT_PG_PORT: u16 = 5432;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const CHAPTERS_SQL: &str = "SELECT id::bigint, COALESCE(textt, '') FROM chapter";

const RUBRICS_SQL: &str = "SELECT r.abbrev, r.id::bigint, r.chapterid::bigint, r.fullpath, r.path, r.textt
     FROM rubric r
     LEFT JOIN chapter c ON c.id = r.chapterid
     WHERE r.abbrev = $1";

const REMEDIES_SQL: &str = "SELECT id::bigint, COALESCE(nameabbrev, ''), namelong FROM remedy";

const MAPPINGS_SQL: &str = "SELECT abbrev, rubricid::bigint, remedyid::bigint, weight::bigint
     FROM rubricremedy
     WHERE abbrev = $1";

/// Connection parameters for the OOREP source database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgSourceConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub connect_timeout: Duration,
}

impl PgSourceConfig {
    /// Read `OOREP_PG_*` from the process environment.
    pub fn from_env() -> Result<Self, SourceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Host, database and user are required;
    /// blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SourceError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| SourceError::Config(format!("{key} is not set")))
        };

        let port = match get(ENV_PG_PORT) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| SourceError::Config(format!("{ENV_PG_PORT} is not a valid port: {raw}")))?,
            None => DEFAULT_PG_PORT,
        };

        Ok(Self {
            host: require(ENV_PG_HOST)?,
            port,
            database: require(ENV_PG_DATABASE)?,
            user: require(ENV_PG_USER)?,
            password: lookup(ENV_PG_PASSWORD).filter(|p| !p.is_empty()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user);
        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }

    /// `postgres://user@host:port/database`, never including the password.
    pub fn display_url(&self) -> String {
        format!("postgres://{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// Relational-mode source adapter.
pub struct RelationalSource {
    config: PgSourceConfig,
    retry: RetryPolicy,
}

impl RelationalSource {
    pub fn new(config: PgSourceConfig, retry: RetryPolicy) -> Self {
        Self { config, retry }
    }

    async fn connect(&self) -> Result<PgPool, SourceError> {
        let options = self.config.connect_options();
        let timeout = self.config.connect_timeout;

        let pool = retry_async(&self.retry, "connect", is_transient_sqlx, || {
            PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(timeout)
                .connect_with(options.clone())
        })
        .await?;
        Ok(pool)
    }

    async fn read_all(&self, pool: &PgPool) -> Result<RawDataset, SourceError> {
        let target = TARGET_REPERTORY.as_str();
        let retry = &self.retry;

        let chapters = retry_async(retry, "read chapters", is_transient_sqlx, move || {
            sqlx::query_as::<_, (i64, String)>(CHAPTERS_SQL).fetch_all(pool)
        })
        .await?;

        let rubrics = retry_async(retry, "read rubrics", is_transient_sqlx, move || {
            sqlx::query_as::<
                _,
                (String, i64, Option<i64>, Option<String>, Option<String>, Option<String>),
            >(RUBRICS_SQL)
            .bind(target)
            .fetch_all(pool)
        })
        .await?;

        let remedies = retry_async(retry, "read remedies", is_transient_sqlx, move || {
            sqlx::query_as::<_, (i64, String, Option<String>)>(REMEDIES_SQL).fetch_all(pool)
        })
        .await?;

        let mappings = retry_async(retry, "read mappings", is_transient_sqlx, move || {
            sqlx::query_as::<_, (String, i64, i64, i64)>(MAPPINGS_SQL)
                .bind(target)
                .fetch_all(pool)
        })
        .await?;

        Ok(RawDataset {
            chapters: chapters
                .into_iter()
                .map(|(external_id, text)| RawChapter { external_id, text })
                .collect(),
            remedies: remedies
                .into_iter()
                .map(|(external_id, abbrev, long_name)| RawRemedy {
                    external_id,
                    abbrev,
                    long_name,
                    kingdom: None,
                })
                .collect(),
            rubrics: rubrics
                .into_iter()
                .map(|(repertory_abbrev, external_id, chapter_external_id, fullpath, path, text)| {
                    RawRubric {
                        external_id,
                        repertory_abbrev,
                        chapter_external_id,
                        fullpath,
                        path,
                        text,
                    }
                })
                .collect(),
            mappings: mappings
                .into_iter()
                .map(|(repertory_abbrev, rubric_external_id, remedy_external_id, weight)| {
                    RawMapping {
                        repertory_abbrev,
                        rubric_external_id,
                        remedy_external_id,
                        weight,
                    }
                })
                .collect(),
        })
    }
}

#[async_trait]
impl SourceAdapter for RelationalSource {
    async fn extract(&mut self) -> Result<Extraction, SourceError> {
        tracing::info!(source = %self.config.display_url(), "Connecting to OOREP database");
        let pool = self.connect().await?;

        let result = self.read_all(&pool).await;
        pool.close().await;
        let data = result?;

        let mut stats = ScanStats::default();
        stats.rows.insert(SourceTable::Chapter, data.chapters.len());
        stats.rows.insert(SourceTable::Remedy, data.remedies.len());
        stats.rows.insert(SourceTable::Rubric, data.rubrics.len());
        stats.rows.insert(SourceTable::RubricRemedy, data.mappings.len());

        tracing::info!(
            chapters = data.chapters.len(),
            remedies = data.remedies.len(),
            rubrics = data.rubrics.len(),
            mappings = data.mappings.len(),
            "Relational extraction complete"
        );
        Ok(Extraction { data, stats })
    }

    fn source_name(&self) -> String {
        self.config.display_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn full_environment_parses() {
        let config = PgSourceConfig::from_lookup(lookup_from(&[
            (ENV_PG_HOST, "db.internal"),
            (ENV_PG_PORT, "6543"),
            (ENV_PG_DATABASE, "oorep"),
            (ENV_PG_USER, "reader"),
            (ENV_PG_PASSWORD, "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.database, "oorep");
        assert_eq!(config.user, "reader");
        assert_eq!(config.password.as_deref(), Some("s3cret"));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn port_and_password_are_optional() {
        let config = PgSourceConfig::from_lookup(lookup_from(&[
            (ENV_PG_HOST, "localhost"),
            (ENV_PG_DATABASE, "oorep"),
            (ENV_PG_USER, "reader"),
        ]))
        .unwrap();
        assert_eq!(config.port, 5432);
        assert!(config.password.is_none());
    }

    #[test]
    fn missing_required_values_are_config_errors() {
        let err = PgSourceConfig::from_lookup(lookup_from(&[
            (ENV_PG_HOST, "localhost"),
            (ENV_PG_USER, "reader"),
        ]))
        .unwrap_err();
        assert!(matches!(err, SourceError::Config(ref msg) if msg.contains(ENV_PG_DATABASE)));

        let blank_host = PgSourceConfig::from_lookup(lookup_from(&[
            (ENV_PG_HOST, "  "),
            (ENV_PG_DATABASE, "oorep"),
            (ENV_PG_USER, "reader"),
        ]));
        assert!(matches!(blank_host, Err(SourceError::Config(_))));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = PgSourceConfig::from_lookup(lookup_from(&[
            (ENV_PG_HOST, "localhost"),
            (ENV_PG_PORT, "not-a-port"),
            (ENV_PG_DATABASE, "oorep"),
            (ENV_PG_USER, "reader"),
        ]));
        assert!(matches!(err, Err(SourceError::Config(_))));
    }

    #[test]
    fn rubrics_without_known_chapter_are_still_read() {
        assert!(RUBRICS_SQL.contains("LEFT JOIN chapter"));
        assert!(!RUBRICS_SQL.contains("\n     JOIN chapter"));
    }

    #[test]
    fn display_url_omits_password() {
        let config = PgSourceConfig::from_lookup(lookup_from(&[
            (ENV_PG_HOST, "localhost"),
            (ENV_PG_DATABASE, "oorep"),
            (ENV_PG_USER, "reader"),
            (ENV_PG_PASSWORD, "hunter2"),
        ]))
        .unwrap();
        let url = config.display_url();
        assert_eq!(url, "postgres://reader@localhost:5432/oorep");
        assert!(!url.contains("hunter2"));
    }
}

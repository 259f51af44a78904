use crate::schema::Jurisdiction;
use crate::snapshot::SourceKind;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_archive_db")]
    pub archive_db: PathBuf,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Optional `categories.yaml` replacing the built-in category rules.
    #[serde(default)]
    pub categories: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            archive_db: default_archive_db(),
            cache_ttl_secs: default_cache_ttl(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
            rows: default_rows(),
            keywords: default_keywords(),
            categories: None,
        }
    }
}

impl GeneralConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub jurisdiction: Jurisdiction,
    pub url: String,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Per-source keyword override; falls back to `general.keywords`.
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub rows: Option<u32>,
}

impl SourceConfig {
    fn new(name: &str, kind: SourceKind, jurisdiction: Jurisdiction, url: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            jurisdiction,
            url: url.to_string(),
            province: None,
            city: None,
            keywords: None,
            rows: None,
        }
    }

    fn in_province(mut self, province: &str) -> Self {
        self.province = Some(province.to_string());
        self
    }

    fn in_city(mut self, province: &str, city: &str) -> Self {
        self.province = Some(province.to_string());
        self.city = Some(city.to_string());
        self
    }
}

impl Config {
    /// Reads `path` when it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.request_timeout_secs == 0 {
            return Err(anyhow!("general.request_timeout_secs must be greater than zero"));
        }
        if self.general.rows == 0 {
            return Err(anyhow!("general.rows must be greater than zero"));
        }
        for source in &self.sources {
            if !(source.url.starts_with("http://") || source.url.starts_with("https://")) {
                return Err(anyhow!(
                    "source `{}` has a non-http url: {}",
                    source.name,
                    source.url
                ));
            }
        }
        Ok(())
    }

    /// Configured sources, or the built-in table when none are configured.
    pub fn effective_sources(&self) -> Vec<SourceConfig> {
        if self.sources.is_empty() {
            default_sources()
        } else {
            self.sources.clone()
        }
    }

    pub fn keywords_for<'a>(&'a self, source: &'a SourceConfig) -> &'a [String] {
        source
            .keywords
            .as_deref()
            .unwrap_or(self.general.keywords.as_slice())
    }

    pub fn rows_for(&self, source: &SourceConfig) -> u32 {
        source.rows.unwrap_or(self.general.rows)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("public/data")
}

fn default_archive_db() -> PathBuf {
    PathBuf::from("eye-oracle.db")
}

fn default_cache_ttl() -> u64 {
    30 * 60
}

fn default_request_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    concat!("eye-oracle/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_rows() -> u32 {
    10
}

fn default_keywords() -> Vec<String> {
    [
        "workers compensation",
        "WSIB",
        "workplace injury",
        "occupational health",
        "disability",
        "accessibility",
        "social assistance",
        "poverty",
        "mental health",
        "housing",
    ]
    .iter()
    .map(|kw| kw.to_string())
    .collect()
}

pub fn default_sources() -> Vec<SourceConfig> {
    use Jurisdiction::*;
    use SourceKind::*;
    vec![
        SourceConfig::new(
            "Open Government Canada",
            Ckan,
            Federal,
            "https://open.canada.ca/data/api/3/action/package_search",
        ),
        SourceConfig::new(
            "Ontario Data Catalogue",
            Ckan,
            Provincial,
            "https://data.ontario.ca/api/3/action/package_search",
        )
        .in_province("ON"),
        SourceConfig::new(
            "BC Data Catalogue",
            Ckan,
            Provincial,
            "https://catalogue.data.gov.bc.ca/api/3/action/package_search",
        )
        .in_province("BC"),
        SourceConfig::new(
            "Alberta Open Government",
            Ckan,
            Provincial,
            "https://open.alberta.ca/api/3/action/package_search",
        )
        .in_province("AB"),
        SourceConfig::new(
            "Données Québec",
            Ckan,
            Provincial,
            "https://www.donneesquebec.ca/recherche/api/3/action/package_search",
        )
        .in_province("QC"),
        SourceConfig::new(
            "Saskatchewan Open Data",
            Ckan,
            Provincial,
            "https://data.gov.sk.ca/api/3/action/package_search",
        )
        .in_province("SK"),
        SourceConfig::new(
            "Manitoba Open Data",
            Ckan,
            Provincial,
            "https://open.manitoba.ca/api/3/action/package_search",
        )
        .in_province("MB"),
        SourceConfig::new(
            "New Brunswick Open Data",
            Ckan,
            Provincial,
            "https://open.gnb.ca/api/3/action/package_search",
        )
        .in_province("NB"),
        SourceConfig::new(
            "Nova Scotia Open Data",
            Ckan,
            Provincial,
            "https://data.novascotia.ca/api/3/action/package_search",
        )
        .in_province("NS"),
        SourceConfig::new(
            "Newfoundland and Labrador Open Data",
            Ckan,
            Provincial,
            "https://opendata.gov.nl.ca/api/3/action/package_search",
        )
        .in_province("NL"),
        SourceConfig::new(
            "Yukon Open Data",
            Ckan,
            Territorial,
            "https://open.yukon.ca/api/3/action/package_search",
        )
        .in_province("YT"),
        SourceConfig::new(
            "Northwest Territories Open Data",
            Ckan,
            Territorial,
            "https://opendata.gov.nt.ca/api/3/action/package_search",
        )
        .in_province("NT"),
        SourceConfig::new(
            "City of Toronto Open Data",
            Ckan,
            Municipal,
            "https://ckan0.cf.opendata.inter.prod-toronto.ca/api/3/action/package_search",
        )
        .in_city("ON", "Toronto"),
        SourceConfig::new(
            "Données Montréal",
            Ckan,
            Municipal,
            "https://donnees.montreal.ca/api/3/action/package_search",
        )
        .in_city("QC", "Montréal"),
        SourceConfig::new(
            "City of Ottawa Open Data",
            Ckan,
            Municipal,
            "https://open.ottawa.ca/api/3/action/package_search",
        )
        .in_city("ON", "Ottawa"),
        SourceConfig::new(
            "City of Hamilton Open Data",
            Ckan,
            Municipal,
            "https://open.hamilton.ca/api/3/action/package_search",
        )
        .in_city("ON", "Hamilton"),
        SourceConfig::new(
            "City of Winnipeg Open Data",
            Ckan,
            Municipal,
            "https://data.winnipeg.ca/api/3/action/package_search",
        )
        .in_city("MB", "Winnipeg"),
        SourceConfig::new(
            "LEGISinfo",
            Bills,
            Federal,
            "https://www.parl.ca/legisinfo/en/bills/json",
        ),
        SourceConfig::new(
            "Ontario Newsroom",
            Rss,
            Provincial,
            "https://news.ontario.ca/newsroom/en/rss/allnews.rss",
        )
        .in_province("ON"),
        SourceConfig::new(
            "Employment and Social Development Canada News",
            Rss,
            Federal,
            "https://www.canada.ca/en/employment-social-development/news.rss",
        ),
    ]
}

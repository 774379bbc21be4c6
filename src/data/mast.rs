//! MAST archive integration for TESS light-curve products.
//!
//! Searching is two requests against the MAST `invoke` API: a name lookup to
//! get coordinates, then a CAOM position query restricted to TESS time series.
//! Products are downloaded once into a local cache directory.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::data::read_product;
use crate::domain::{Cadence, FetchConfig, LightCurve};
use crate::error::AppError;
use crate::preprocess::stitch;

pub const DEFAULT_MAST_URL: &str = "https://mast.stsci.edu";
pub const DEFAULT_CACHE_DIR: &str = "mastDownload";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Cone radius (degrees) around the resolved target position.
const SEARCH_RADIUS_DEG: f64 = 0.0006;

/// Connection settings, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct MastSettings {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub timeout: Duration,
}

impl Default for MastSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MAST_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl MastSettings {
    /// `SLC_MAST_URL`, `SLC_CACHE_DIR`, `SLC_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let base_url = lookup("SLC_MAST_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let cache_dir = lookup("SLC_CACHE_DIR").map(PathBuf::from).unwrap_or(defaults.cache_dir);
        let timeout = match lookup("SLC_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| AppError::usage(format!("Invalid SLC_HTTP_TIMEOUT_SECS '{raw}'.")))?;
                Duration::from_secs(secs)
            }
            None => defaults.timeout,
        };
        Ok(Self {
            base_url,
            cache_dir,
            timeout,
        })
    }
}

/// One downloadable light-curve product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub obs_id: String,
    pub target_name: Option<String>,
    pub sector: Option<u32>,
    pub author: Option<String>,
    pub exptime_s: Option<f64>,
    pub data_uri: String,
}

impl ProductRow {
    /// File name used in the local cache.
    pub fn file_name(&self) -> String {
        self.data_uri
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.fits", self.obs_id))
    }
}

pub struct MastClient {
    client: Client,
    settings: MastSettings,
}

impl MastClient {
    pub fn from_env() -> Result<Self, AppError> {
        Self::new(MastSettings::from_env()?)
    }

    pub fn new(settings: MastSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    /// Light-curve products for `target`, sorted by sector.
    ///
    /// Author `"any"` disables the author filter. When the cadence filter
    /// removes every product, the unfiltered list is used instead.
    pub fn search_result(&self, target: &str, author: &str, cadence: Cadence) -> Result<Vec<ProductRow>, AppError> {
        let (ra, dec) = self.resolve_target(target)?;
        let rows = self.query_position(ra, dec, author)?;
        debug!(object = target, n_rows = rows.len(), "MAST position query");
        Ok(select_rows(rows, cadence))
    }

    /// Download a product into the cache, reusing an existing file.
    pub fn download(&self, row: &ProductRow) -> Result<PathBuf, AppError> {
        let path = cache_path(&self.settings.cache_dir, row);
        if path.exists() {
            debug!(path = %path.display(), "using cached product");
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| AppError::runtime(format!("Failed to create cache dir '{}': {e}", dir.display())))?;
        }

        let url = format!("{}/api/v0.1/Download/file", self.settings.base_url);
        let mut resp = self
            .client
            .get(url)
            .query(&[("uri", row.data_uri.as_str())])
            .send()
            .map_err(|e| AppError::runtime(format!("MAST download failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::runtime(format!(
                "MAST download of {} failed with status {}.",
                row.data_uri,
                resp.status()
            )));
        }

        // Write to a temporary name first so an interrupted download is not cached.
        let partial = path.with_extension("part");
        let mut file = File::create(&partial)
            .map_err(|e| AppError::runtime(format!("Failed to create '{}': {e}", partial.display())))?;
        resp.copy_to(&mut file)
            .map_err(|e| AppError::runtime(format!("Failed to save {}: {e}", row.data_uri)))?;
        fs::rename(&partial, &path)
            .map_err(|e| AppError::runtime(format!("Failed to finalize '{}': {e}", path.display())))?;
        info!(path = %path.display(), "downloaded product");
        Ok(path)
    }

    fn resolve_target(&self, target: &str) -> Result<(f64, f64), AppError> {
        let request = json!({
            "service": "Mast.Name.Lookup",
            "params": { "input": target, "format": "json" },
            "format": "json",
        });
        let body: NameLookupResponse = self.invoke(&request)?;
        let coord = body
            .resolved_coordinate
            .into_iter()
            .next()
            .ok_or_else(|| AppError::no_data(format!("Could not resolve target '{target}'.")))?;
        debug!(object = target, ra = coord.ra, dec = coord.decl, "resolved target");
        Ok((coord.ra, coord.decl))
    }

    fn query_position(&self, ra: f64, dec: f64, author: &str) -> Result<Vec<ProductRow>, AppError> {
        let mut filters = vec![
            json!({ "paramName": "obs_collection", "values": ["TESS"] }),
            json!({ "paramName": "dataproduct_type", "values": ["timeseries"] }),
        ];
        if !author.trim().eq_ignore_ascii_case("any") {
            filters.push(json!({ "paramName": "provenance_name", "values": [author] }));
        }
        let request = json!({
            "service": "Mast.Caom.Filtered.Position",
            "params": {
                "columns": "*",
                "filters": filters,
                "position": format!("{ra}, {dec}, {SEARCH_RADIUS_DEG}"),
            },
            "format": "json",
            "pagesize": 2000,
            "page": 1,
        });
        let body: CaomResponse = self.invoke(&request)?;
        Ok(parse_caom_rows(body))
    }

    fn invoke<T: DeserializeOwned>(&self, request: &serde_json::Value) -> Result<T, AppError> {
        let url = format!("{}/api/v0/invoke", self.settings.base_url);
        let resp = self
            .client
            .post(url)
            .form(&[("request", request.to_string())])
            .send()
            .map_err(|e| AppError::runtime(format!("MAST request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::runtime(format!(
                "MAST request failed with status {}.",
                resp.status()
            )));
        }
        resp.json()
            .map_err(|e| AppError::runtime(format!("Failed to parse MAST response: {e}")))
    }
}

/// Download every product for the configured target and stitch them.
///
/// Returns the stitched light curve and the sectors that went into it.
pub fn search_and_stitch(client: &MastClient, fetch: &FetchConfig) -> Result<(LightCurve, Vec<u32>), AppError> {
    let rows = client.search_result(&fetch.target, &fetch.author, fetch.cadence)?;
    if rows.is_empty() {
        return Err(AppError::no_data("No light curves found."));
    }
    info!(object = %fetch.target, n_products = rows.len(), "found light curves");

    let mut segments = Vec::with_capacity(rows.len());
    let mut sectors = Vec::new();
    for row in &rows {
        let path = client.download(row)?;
        let mut lc = read_product(&path, fetch.quality_bitmask)?;
        if lc.meta.sector.is_none() {
            lc.meta.sector = row.sector;
        }
        if lc.meta.target.is_none() {
            lc.meta.target = Some(fetch.target.clone());
        }
        lc.meta.author = row.author.clone();
        lc.meta.exptime_s = row.exptime_s;
        if let Some(sector) = lc.meta.sector {
            sectors.push(sector);
        }
        segments.push(lc);
    }

    let mut stitched = stitch(&segments)?;
    stitched.meta.target = Some(fetch.target.clone());
    Ok((stitched, sectors))
}

/// Apply the cadence filter (with fallback) and sort by sector.
pub fn select_rows(rows: Vec<ProductRow>, cadence: Cadence) -> Vec<ProductRow> {
    let mut selected = if cadence.is_filter() {
        let filtered: Vec<ProductRow> = rows
            .iter()
            .filter(|r| r.exptime_s.is_some_and(|e| cadence.matches(e)))
            .cloned()
            .collect();
        if filtered.is_empty() && !rows.is_empty() {
            warn!(?cadence, n_rows = rows.len(), "no products match cadence; retrying without exptime filter");
            rows
        } else {
            filtered
        }
    } else {
        rows
    };
    selected.sort_by_key(|r| r.sector.unwrap_or(u32::MAX));
    selected
}

#[derive(Debug, Deserialize)]
struct NameLookupResponse {
    #[serde(rename = "resolvedCoordinate", default)]
    resolved_coordinate: Vec<ResolvedCoordinate>,
}

#[derive(Debug, Deserialize)]
struct ResolvedCoordinate {
    ra: f64,
    decl: f64,
}

#[derive(Debug, Deserialize)]
struct CaomResponse {
    #[serde(default)]
    data: Vec<CaomRow>,
}

#[derive(Debug, Deserialize)]
struct CaomRow {
    #[serde(default)]
    obsid: Option<serde_json::Value>,
    #[serde(default)]
    obs_id: Option<String>,
    #[serde(default)]
    target_name: Option<String>,
    #[serde(default)]
    sequence_number: Option<i64>,
    #[serde(default)]
    provenance_name: Option<String>,
    #[serde(default)]
    t_exptime: Option<f64>,
    #[serde(rename = "dataURL", default)]
    data_url: Option<String>,
}

fn parse_caom_rows(body: CaomResponse) -> Vec<ProductRow> {
    body.data
        .into_iter()
        .filter_map(|row| {
            let data_uri = row.data_url.filter(|u| !u.is_empty())?;
            let obs_id = row
                .obs_id
                .or_else(|| row.obsid.map(|v| v.to_string().trim_matches('"').to_string()))
                .unwrap_or_else(|| "unknown".to_string());
            Some(ProductRow {
                obs_id,
                target_name: row.target_name,
                sector: row.sequence_number.and_then(|s| u32::try_from(s).ok()),
                author: row.provenance_name,
                exptime_s: row.t_exptime,
                data_uri,
            })
        })
        .collect()
}

/// Cache location of a product: `<cache_dir>/<obs_id>/<file name>`.
pub fn cache_path(cache_dir: &Path, row: &ProductRow) -> PathBuf {
    cache_dir.join(&row.obs_id).join(row.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sector: u32, exptime: f64) -> ProductRow {
        ProductRow {
            obs_id: format!("tess-s{sector:04}"),
            target_name: Some("WASP-52".to_string()),
            sector: Some(sector),
            author: Some("SPOC".to_string()),
            exptime_s: Some(exptime),
            data_uri: format!("mast:TESS/product/tess-s{sector:04}_lc.fits"),
        }
    }

    #[test]
    fn cadence_filter_keeps_matching_rows_sorted_by_sector() {
        let rows = vec![row(56, 120.0), row(42, 20.0), row(29, 120.0), row(70, 1800.0)];
        let selected = select_rows(rows, Cadence::Short);
        let sectors: Vec<u32> = selected.iter().filter_map(|r| r.sector).collect();
        assert_eq!(sectors, vec![29, 56]);
    }

    #[test]
    fn empty_cadence_match_falls_back_to_all_rows() {
        let rows = vec![row(70, 1800.0), row(42, 600.0)];
        let selected = select_rows(rows, Cadence::Fast);
        let sectors: Vec<u32> = selected.iter().filter_map(|r| r.sector).collect();
        assert_eq!(sectors, vec![42, 70]);
    }

    #[test]
    fn any_cadence_keeps_everything() {
        let selected = select_rows(vec![row(2, 20.0), row(1, 1800.0)], Cadence::Any);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].sector, Some(1));
    }

    #[test]
    fn caom_rows_parse_and_skip_missing_urls() {
        let body: CaomResponse = serde_json::from_str(
            r#"{"data": [
                {"obsid": 123, "obs_id": "tess2019-s0042", "target_name": "1234", "sequence_number": 42,
                 "provenance_name": "SPOC", "t_exptime": 120.0,
                 "dataURL": "mast:TESS/product/tess2019-s0042_lc.fits"},
                {"obsid": 124, "sequence_number": 43, "dataURL": null}
            ]}"#,
        )
        .unwrap();
        let rows = parse_caom_rows(body);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sector, Some(42));
        assert_eq!(rows[0].file_name(), "tess2019-s0042_lc.fits");
        assert_eq!(rows[0].author.as_deref(), Some("SPOC"));
    }

    #[test]
    fn settings_come_from_environment_lookup() {
        let settings = MastSettings::from_lookup(|key| match key {
            "SLC_MAST_URL" => Some("http://localhost:8080/".to_string()),
            "SLC_HTTP_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.base_url, "http://localhost:8080");
        assert_eq!(settings.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(settings.timeout, Duration::from_secs(5));

        let err = MastSettings::from_lookup(|key| (key == "SLC_HTTP_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn cache_lookup_uses_obs_id_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let r = row(42, 120.0);
        let path = cache_path(dir.path(), &r);
        assert_eq!(path, dir.path().join("tess-s0042").join("tess-s0042_lc.fits"));
    }
}

use crate::{
    commission::CommissionRule,
    tariff::{Provider, Tariff},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Statutory electricity tax rate (5.11269632 %).
pub const ELECTRICITY_TAX_RATE: f64 = 0.0511269632;

/// Statutory VAT rate (21 %).
pub const VAT_RATE: f64 = 0.21;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_electricity_tax_rate")]
    pub electricity_tax_rate: f64,
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
    /// Power prices are quoted per month; this converts them to a year.
    #[serde(default = "default_months_per_year")]
    pub months_per_year: f64,
}

fn default_electricity_tax_rate() -> f64 { ELECTRICITY_TAX_RATE }
fn default_vat_rate() -> f64 { VAT_RATE }
fn default_months_per_year() -> f64 { 12.0 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            electricity_tax_rate: ELECTRICITY_TAX_RATE,
            vat_rate:             VAT_RATE,
            months_per_year:      12.0,
        }
    }
}

impl EngineConfig {
    /// Load from `{data_dir}/engine_config.json`.
    /// Fields missing from the file fall back to the statutory defaults.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = read_json(&format!("{data_dir}/engine_config.json"))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> anyhow::Result<()> {
        for (name, rate) in [
            ("electricity_tax_rate", self.electricity_tax_rate),
            ("vat_rate", self.vat_rate),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                anyhow::bail!("{name} must be a non-negative number, got {rate}");
            }
        }
        if !self.months_per_year.is_finite() || self.months_per_year <= 0.0 {
            anyhow::bail!("months_per_year must be positive, got {}", self.months_per_year);
        }
        Ok(())
    }
}

// ── Catalog seed files ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct ProvidersFile {
    providers: Vec<Provider>,
}

#[derive(Debug, Clone, Deserialize)]
struct TariffsFile {
    tariffs: Vec<Tariff>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommissionsFile {
    commissions: Vec<CommissionRule>,
}

/// The full tariff/commission catalog as shipped under `data/catalog/`.
#[derive(Debug, Clone, Default)]
pub struct CatalogFile {
    pub providers:   Vec<Provider>,
    pub tariffs:     Vec<Tariff>,
    pub commissions: Vec<CommissionRule>,
}

impl CatalogFile {
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let providers: ProvidersFile = read_json(&format!("{data_dir}/catalog/providers.json"))?;
        let tariffs: TariffsFile = read_json(&format!("{data_dir}/catalog/tariffs.json"))?;
        let commissions: CommissionsFile =
            read_json(&format!("{data_dir}/catalog/commissions.json"))?;

        Ok(Self {
            providers:   providers.providers,
            tariffs:     tariffs.tariffs,
            commissions: commissions.commissions,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}

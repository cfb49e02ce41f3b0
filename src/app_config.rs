use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Settings for a localization run, read from `conf.json`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// How the Spanish working copy is obtained
    #[serde(default)]
    pub mode: ProcessingMode,

    /// Honorific transfer settings
    #[serde(default)]
    pub honorifics: HonorificConfig,

    /// Labels that mark translator/editor credit lines
    #[serde(default = "default_credit_labels")]
    pub credit_labels: Vec<String>,

    /// Track scoring table per language bucket
    #[serde(default)]
    pub priority_table: PriorityTable,

    /// Demuxing tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Name inversion oracle settings
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Language buckets a subtitle track can be assigned to
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LanguageBucket {
    /// Spanish, the track being rewritten
    Spanish,
    /// English, the preferred honorific source
    English,
    /// Malay, the fallback honorific source
    Malay,
}

impl LanguageBucket {
    /// All buckets, target first
    pub const ALL: [LanguageBucket; 3] = [Self::Spanish, Self::English, Self::Malay];

    // @returns: ISO 639-2/B key used to match track metadata
    pub fn key(&self) -> &'static str {
        match self {
            Self::Spanish => "spa",
            Self::English => "eng",
            Self::Malay => "may",
        }
    }

    /// Look up a bucket by its key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.key() == key)
    }
}

impl std::fmt::Display for LanguageBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A named title/language pattern set with the score it awards
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VariantRule {
    // @field: Variant name, for logging
    pub name: String,

    // @field: Substrings searched in the lowercased track title
    #[serde(default)]
    pub title_patterns: Vec<String>,

    // @field: Substrings searched in the lowercased track language
    #[serde(default)]
    pub language_patterns: Vec<String>,

    // @field: Score awarded on match
    pub score: u32,
}

impl VariantRule {
    pub fn new(name: &str, title_patterns: &[&str], language_patterns: &[&str], score: u32) -> Self {
        Self {
            name: name.to_string(),
            title_patterns: title_patterns.iter().map(|s| s.to_string()).collect(),
            language_patterns: language_patterns.iter().map(|s| s.to_string()).collect(),
            score,
        }
    }

    /// Whether the lowercased title or language contains any of the patterns
    pub fn matches(&self, title: &str, language: &str) -> bool {
        self.title_patterns.iter().any(|p| title.contains(p.as_str()))
            || self.language_patterns.iter().any(|p| language.contains(p.as_str()))
    }
}

/// Ordered scoring rules for one bucket
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BucketPriority {
    pub bucket: LanguageBucket,

    /// Checked in order, first match wins
    #[serde(default)]
    pub variants: Vec<VariantRule>,

    /// Score for a track of this bucket that matches no variant
    #[serde(default = "default_bucket_score")]
    pub default_score: u32,
}

/// Scoring table for all buckets.
///
/// The order of `buckets` is also the priority order used when a track's
/// language tags could belong to more than one bucket.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PriorityTable {
    pub buckets: Vec<BucketPriority>,
}

impl PriorityTable {
    /// Rules for a given bucket
    pub fn get(&self, bucket: LanguageBucket) -> Option<&BucketPriority> {
        self.buckets.iter().find(|b| b.bucket == bucket)
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self {
            buckets: vec![
                BucketPriority {
                    bucket: LanguageBucket::Malay,
                    variants: vec![VariantRule::new(
                        "malay",
                        &["cr_malay", "malay"],
                        &["may", "malay", "bahasa melayu"],
                        1,
                    )],
                    default_score: 1,
                },
                BucketPriority {
                    bucket: LanguageBucket::English,
                    variants: Vec::new(),
                    default_score: 1,
                },
                BucketPriority {
                    bucket: LanguageBucket::Spanish,
                    variants: vec![
                        VariantRule::new(
                            "latam",
                            &["latin_america", "latam", "cr_spanish(latin_america)"],
                            &["latin america", "spanish (latin america)"],
                            3,
                        ),
                        VariantRule::new("es", &["español", "spanish"], &["español", "spanish"], 2),
                    ],
                    default_score: 1,
                },
            ],
        }
    }
}

/// Honorific transfer settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HonorificConfig {
    /// Suffixes in priority order
    #[serde(default = "default_honorifics")]
    pub honorifics: Vec<String>,

    /// Spanish politeness phrases removed before a suffix is injected
    #[serde(default = "default_redundant_phrases")]
    pub redundant_phrases: Vec<String>,

    /// Maximum start-time distance between a source and a target line
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for HonorificConfig {
    fn default() -> Self {
        Self {
            honorifics: default_honorifics(),
            redundant_phrases: default_redundant_phrases(),
            window_secs: default_window_secs(),
        }
    }
}

/// How the Spanish working copy is obtained
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// External Spanish file if present, embedded Spanish track otherwise
    #[default]
    Multi,
    /// External Spanish file required
    Extra,
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Multi => write!(f, "multi-sub"),
            Self::Extra => write!(f, "extra-sub"),
        }
    }
}

/// Paths and limits for the MKVToolNix binaries
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolsConfig {
    #[serde(default = "default_mkvmerge_path")]
    pub mkvmerge_path: String,

    #[serde(default = "default_mkvextract_path")]
    pub mkvextract_path: String,

    /// Timeout for each tool invocation in seconds
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            mkvmerge_path: default_mkvmerge_path(),
            mkvextract_path: default_mkvextract_path(),
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// Oracle provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    // @provider: Google Gemini
    #[default]
    Gemini,
    // @provider: Ollama
    Ollama,
    // @provider: Anthropic
    Anthropic,
}

impl OracleProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Gemini => "Gemini",
            Self::Ollama => "Ollama",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Gemini => "gemini".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }

    /// Local providers do not need a key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl std::fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for OracleProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Name inversion oracle configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleConfig {
    /// Set to false to skip name normalization entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub provider: OracleProvider,

    /// Model name, empty for the provider default
    #[serde(default = "String::new")]
    pub model: String,

    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL, empty for the provider default
    #[serde(default = "String::new")]
    pub endpoint: String,

    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Instructions sent ahead of the candidate list
    #[serde(default = "default_name_inversion_prompt")]
    pub name_inversion_prompt: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: OracleProvider::default(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_oracle_timeout_secs(),
            temperature: default_temperature(),
            name_inversion_prompt: default_name_inversion_prompt(),
        }
    }
}

impl OracleConfig {
    /// Get the model, falling back to the provider default
    pub fn get_model(&self) -> String {
        if !self.model.is_empty() {
            return self.model.clone();
        }

        match self.provider {
            OracleProvider::Gemini => default_gemini_model(),
            OracleProvider::Ollama => default_ollama_model(),
            OracleProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the endpoint, falling back to the provider default
    pub fn get_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }

        match self.provider {
            OracleProvider::Gemini => default_gemini_endpoint(),
            OracleProvider::Ollama => default_ollama_endpoint(),
            OracleProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Whether the oracle can be called at all
    pub fn is_usable(&self) -> bool {
        self.enabled && (!self.provider.requires_api_key() || !self.api_key.trim().is_empty())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_honorifics() -> Vec<String> {
    ["-san", "-chan", "-kun", "-sama", "-sensei", "-senpai", "-nee", "-nii", "-dono"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_redundant_phrases() -> Vec<String> {
    [
        "la señorita",
        "el señorito",
        "señorita",
        "señorito",
        "señor",
        "señora",
        "La señorita",
        "El señorito",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_credit_labels() -> Vec<String> {
    vec![
        "Traducción".to_string(),
        "Edición".to_string(),
        "Control de calidad".to_string(),
    ]
}

fn default_window_secs() -> u64 {
    5
}

fn default_bucket_score() -> u32 {
    1
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_oracle_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.2
}

fn default_true() -> bool {
    true
}

#[cfg(windows)]
fn default_mkvmerge_path() -> String {
    r"C:\Program Files\MKVToolNix\mkvmerge.exe".to_string()
}

#[cfg(not(windows))]
fn default_mkvmerge_path() -> String {
    "mkvmerge".to_string()
}

#[cfg(windows)]
fn default_mkvextract_path() -> String {
    r"C:\Program Files\MKVToolNix\mkvextract.exe".to_string()
}

#[cfg(not(windows))]
fn default_mkvextract_path() -> String {
    "mkvextract".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

/// Default instructions for the name inversion oracle
pub fn default_name_inversion_prompt() -> String {
    concat!(
        "De la siguiente lista de pares de palabras, donde cada palabra inicia con mayúscula, ",
        "identifica aquellos que son probablemente 'Nombre Apellido' de personas y cámbialos a 'Apellido Nombre'.\n",
        "Si un par de palabras no parece ser un nombre de persona (por ejemplo, 'Autos Locos', 'Casa Azul', 'Perro Azul'), ",
        "omítelo y no lo incluyas en la respuesta. Si detectas palabras en español o inglés junto a un nombre OMÍTELO, ",
        "ya que esta lista se obtuvo de una pista de subtítulos, por lo que podría por error contener palabras capitalizadas ",
        "junto a un nombre; por ejemplo 'Soy Hisoka', 'Eres Naruto'.\n",
        "Si un par parece ser 'Título Nombre' (ej. 'Doctor Luis'), trátalo como 'Nombre Apellido' si 'Doctor' no es un ",
        "nombre propio común; si 'Doctor' es el nombre, inviértelo. Usa tu mejor juicio para nombres comunes.\n",
        "Devuelve ÚNICAMENTE la lista con los cambios realizados, un par por línea. No incluyas los pares omitidos.\n\n",
        "Ejemplo de entrada:\n",
        "Naruto Uzumaki\nMaría García\nAutos Locos\nPerro Azul\nEl Pepe\nAna López\nJuan Pabro\nDoctor Luis\n",
        "Javier Rodríguez\nCasa Azul\n\n",
        "Ejemplo de salida esperada para la entrada anterior:\n",
        "Uzumaki Naruto\nGarcía María\nLópez Ana\nPabro Juan\nLuis Doctor\nRodríguez Javier",
    )
    .to_string()
}

impl Config {
    /// Read a JSON configuration file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Load the file, or create it with defaults when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        log::warn!("Config file not found at {:?}, creating default config.", path);
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.honorifics.honorifics.iter().all(|h| h.trim().is_empty()) {
            return Err(anyhow!("At least one honorific suffix must be configured"));
        }

        if self.honorifics.window_secs == 0 {
            return Err(anyhow!("The alignment window must be at least one second"));
        }

        let mut seen = HashSet::new();
        for entry in &self.priority_table.buckets {
            if !seen.insert(entry.bucket) {
                return Err(anyhow!("Language bucket '{}' appears twice in the priority table", entry.bucket));
            }
        }
        if self.priority_table.get(LanguageBucket::Spanish).is_none() {
            return Err(anyhow!("The priority table must contain the Spanish bucket"));
        }

        if self.oracle.enabled && self.oracle.name_inversion_prompt.trim().is_empty() {
            return Err(anyhow!("The name inversion prompt cannot be empty"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            mode: ProcessingMode::default(),
            honorifics: HonorificConfig::default(),
            credit_labels: default_credit_labels(),
            priority_table: PriorityTable::default(),
            tools: ToolsConfig::default(),
            oracle: OracleConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

//! Cache configuration structures.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::constants::{
    DEFAULT_MAX_NUM_PAGES, DEFAULT_PAGE_SIZE, LRU_POLICY_CODE, MAX_HASH_BUCKETS, MIN_HASH_BUCKETS,
};
use crate::types::PageSize;

/// Page replacement policy.
///
/// Only LRU is implemented. Other numeric codes are rejected by
/// [`ReplacementPolicy::from_code`] rather than mapped to a default.
/// Configuration files may name the policy (`"lru"`) or give its code (`0`);
/// it is always written back by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "PolicyRepr")]
pub enum ReplacementPolicy {
    /// Least recently used.
    #[default]
    Lru,
}

impl ReplacementPolicy {
    /// Maps a numeric policy code to a policy.
    pub fn from_code(code: u32) -> ConfigResult<Self> {
        match code {
            LRU_POLICY_CODE => Ok(Self::Lru),
            other => Err(ConfigError::UnsupportedPolicy { code: other }),
        }
    }

    /// Returns the numeric code of this policy.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Lru => LRU_POLICY_CODE,
        }
    }
}

impl TryFrom<u32> for ReplacementPolicy {
    type Error = ConfigError;

    fn try_from(code: u32) -> ConfigResult<Self> {
        Self::from_code(code)
    }
}

impl std::str::FromStr for ReplacementPolicy {
    type Err = ConfigError;

    fn from_str(name: &str) -> ConfigResult<Self> {
        match name {
            "lru" => Ok(Self::Lru),
            other => Err(ConfigError::UnknownPolicy {
                name: other.to_string(),
            }),
        }
    }
}

/// A replacement policy as written in a configuration file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PolicyRepr {
    Code(u32),
    Name(String),
}

impl TryFrom<PolicyRepr> for ReplacementPolicy {
    type Error = ConfigError;

    fn try_from(repr: PolicyRepr) -> ConfigResult<Self> {
        match repr {
            PolicyRepr::Code(code) => Self::from_code(code),
            PolicyRepr::Name(name) => name.parse(),
        }
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lru => write!(f, "lru"),
        }
    }
}

/// Configuration for a page buffer cache.
///
/// # Example
///
/// ```rust
/// use pagebuf_common::config::{CacheConfig, ReplacementPolicy};
///
/// let config = CacheConfig::from_toml_str(
///     r#"
///     page_size = 8192
///     max_num_pages = 32
///     replacement_policy = "lru"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.page_size, 8192);
/// assert_eq!(config.replacement_policy, ReplacementPolicy::Lru);
/// assert_eq!(config.bucket_count(), 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCacheConfig")]
pub struct CacheConfig {
    /// Page size in bytes. Must be a power of two.
    pub page_size: usize,

    /// Maximum number of resident pages. Must be at least 1.
    pub max_num_pages: usize,

    /// Replacement policy.
    pub replacement_policy: ReplacementPolicy,

    /// Number of hash index buckets. Derived from `max_num_pages` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_buckets: Option<usize>,

    /// Length, in pages, from which a run of whole pages skips the cache.
    /// Defaults to `max_num_pages`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_pages: Option<usize>,
}

/// On-disk form of [`CacheConfig`], before the policy is resolved.
#[derive(Debug, Deserialize)]
struct RawCacheConfig {
    #[serde(default = "default_page_size")]
    page_size: usize,
    #[serde(default = "default_max_num_pages")]
    max_num_pages: usize,
    #[serde(default)]
    replacement_policy: Option<PolicyRepr>,
    #[serde(default)]
    hash_buckets: Option<usize>,
    #[serde(default)]
    bypass_pages: Option<usize>,
}

impl TryFrom<RawCacheConfig> for CacheConfig {
    type Error = ConfigError;

    fn try_from(raw: RawCacheConfig) -> ConfigResult<Self> {
        let replacement_policy = match raw.replacement_policy {
            Some(repr) => ReplacementPolicy::try_from(repr)?,
            None => ReplacementPolicy::default(),
        };
        Ok(Self {
            page_size: raw.page_size,
            max_num_pages: raw.max_num_pages,
            replacement_policy,
            hash_buckets: raw.hash_buckets,
            bypass_pages: raw.bypass_pages,
        })
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_max_num_pages() -> usize {
    DEFAULT_MAX_NUM_PAGES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_MAX_NUM_PAGES)
    }
}

impl CacheConfig {
    /// Creates a configuration with the given geometry and the LRU policy.
    #[must_use]
    pub fn new(page_size: usize, max_num_pages: usize) -> Self {
        Self {
            page_size,
            max_num_pages,
            replacement_policy: ReplacementPolicy::Lru,
            hash_buckets: None,
            bypass_pages: None,
        }
    }

    /// Sets the replacement policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ReplacementPolicy) -> Self {
        self.replacement_policy = policy;
        self
    }

    /// Sets the replacement policy from its numeric code.
    pub fn with_policy_code(self, code: u32) -> ConfigResult<Self> {
        Ok(self.with_policy(ReplacementPolicy::from_code(code)?))
    }

    /// Sets an explicit hash bucket count.
    #[must_use]
    pub fn with_hash_buckets(mut self, buckets: usize) -> Self {
        self.hash_buckets = Some(buckets);
        self
    }

    /// Sets the run length from which whole pages skip the cache.
    #[must_use]
    pub fn with_bypass_pages(mut self, pages: usize) -> Self {
        self.bypass_pages = Some(pages);
        self
    }

    /// Parses a configuration from TOML text.
    ///
    /// An unsupported policy code fails with
    /// [`ConfigError::UnsupportedPolicy`] rather than a parse error.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let raw: RawCacheConfig = toml::from_str(content)?;
        let config = Self::try_from(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Writes the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::io(path, e))
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the validated page size.
    pub fn page_size(&self) -> ConfigResult<PageSize> {
        PageSize::new(self.page_size)
    }

    /// Returns the number of hash buckets the cache will use.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.hash_buckets.unwrap_or_else(|| {
            self.max_num_pages
                .checked_next_power_of_two()
                .unwrap_or(MAX_HASH_BUCKETS)
                .clamp(MIN_HASH_BUCKETS, MAX_HASH_BUCKETS)
        })
    }

    /// Returns the number of whole pages from which a run is transferred
    /// directly between client and backing store. Never less than 1.
    #[must_use]
    pub fn bypass_threshold(&self) -> usize {
        self.bypass_pages.unwrap_or(self.max_num_pages).max(1)
    }

    /// Returns the memory taken by page buffers when the cache is full.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.max_num_pages.saturating_mul(self.page_size)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        PageSize::new(self.page_size)?;
        if self.max_num_pages == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if let Some(buckets) = self.hash_buckets {
            if !buckets.is_power_of_two() || buckets > MAX_HASH_BUCKETS {
                return Err(ConfigError::InvalidBucketCount { buckets });
            }
        }
        Ok(())
    }
}

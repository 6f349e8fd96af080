//! Index strategy: build-time and search-time parameters per index family.
//!
//! All family-specific branching lives here. [`IndexFamily::build_spec`] and
//! [`IndexFamily::search_spec`] are the only places that switch on the family;
//! the string-keyed [`build_params`] and [`search_params`] entry points parse the
//! caller's identifier first and fail with
//! [`SearchError::UnsupportedIndexFamily`] for anything unknown.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config;
use crate::error::{Result, SearchError};

/// Index structure used to accelerate nearest-neighbour search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFamily {
    /// Graph-based (HNSW).
    Hnsw,
    /// Inverted file with flat (uncompressed) vectors.
    IvfFlat,
    /// Inverted file with 8-bit scalar-quantized vectors.
    IvfSq8,
    /// Scalable nearest neighbours (quantized clusters).
    Scann,
}

impl IndexFamily {
    /// All supported families.
    pub const ALL: [IndexFamily; 4] = [
        IndexFamily::Hnsw,
        IndexFamily::IvfFlat,
        IndexFamily::IvfSq8,
        IndexFamily::Scann,
    ];

    /// Store-side identifier of the family.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexFamily::Hnsw => "HNSW",
            IndexFamily::IvfFlat => "IVF_FLAT",
            IndexFamily::IvfSq8 => "IVF_SQ8",
            IndexFamily::Scann => "SCANN",
        }
    }

    /// Index-build parameters for this family.
    pub fn build_spec(self, metric: MetricType) -> IndexBuildSpec {
        let params = match self {
            IndexFamily::Hnsw => BuildParams::Hnsw {
                m: config::HNSW_M,
                ef_construction: config::HNSW_EF_CONSTRUCTION,
            },
            IndexFamily::IvfFlat | IndexFamily::IvfSq8 => BuildParams::Ivf {
                nlist: config::IVF_NLIST,
            },
            IndexFamily::Scann => BuildParams::Scann {
                nlist: config::IVF_NLIST,
                with_raw_data: config::SCANN_WITH_RAW_DATA,
            },
        };
        IndexBuildSpec {
            family: self,
            metric,
            params,
        }
    }

    /// Search-time parameters for this family.
    ///
    /// SCANN couples its re-ranking depth to the number of results wanted, so
    /// `top_k` is carried into its parameters.
    pub fn search_spec(self, top_k: usize) -> IndexSearchSpec {
        let params = match self {
            IndexFamily::Hnsw => SearchParams::Hnsw {
                ef: config::HNSW_EF_SEARCH,
            },
            IndexFamily::IvfFlat | IndexFamily::IvfSq8 => SearchParams::Ivf {
                nprobe: config::IVF_NPROBE,
            },
            IndexFamily::Scann => SearchParams::Scann {
                nprobe: config::IVF_NPROBE,
                reorder_k: top_k,
            },
        };
        IndexSearchSpec {
            family: self,
            params,
        }
    }
}

impl FromStr for IndexFamily {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        IndexFamily::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SearchError::UnsupportedIndexFamily(s.to_string()))
    }
}

impl fmt::Display for IndexFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Similarity metric used to compare vectors.
///
/// `Ip` and `Cosine` scores are larger-is-better; `L2` is a distance where
/// smaller is better. Ranking is the store's job either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    /// Euclidean distance.
    L2,
    /// Inner product.
    Ip,
    /// Cosine similarity.
    Cosine,
}

impl MetricType {
    /// Store-side identifier of the metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::L2 => "L2",
            MetricType::Ip => "IP",
            MetricType::Cosine => "COSINE",
        }
    }
}

impl FromStr for MetricType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        [MetricType::L2, MetricType::Ip, MetricType::Cosine]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SearchError::UnsupportedMetric(s.to_string()))
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Family-specific index-build parameters, serialized as the store's flat map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BuildParams {
    Hnsw {
        #[serde(rename = "M")]
        m: u32,
        #[serde(rename = "efConstruction")]
        ef_construction: u32,
    },
    Ivf {
        nlist: u32,
    },
    Scann {
        nlist: u32,
        with_raw_data: bool,
    },
}

/// Family-specific search parameters, serialized as the store's flat map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SearchParams {
    Hnsw { ef: u32 },
    Ivf { nprobe: u32 },
    Scann { nprobe: u32, reorder_k: usize },
}

/// Everything needed to build an index on the vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBuildSpec {
    pub family: IndexFamily,
    pub metric: MetricType,
    pub params: BuildParams,
}

/// Everything needed to tune one search against an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSearchSpec {
    pub family: IndexFamily,
    pub params: SearchParams,
}

/// Resolves the build spec for a raw family identifier.
pub fn build_params(family: &str, metric: MetricType) -> Result<IndexBuildSpec> {
    Ok(family.parse::<IndexFamily>()?.build_spec(metric))
}

/// Resolves the search spec for a raw family identifier and result count.
pub fn search_params(family: &str, top_k: usize) -> Result<IndexSearchSpec> {
    Ok(family.parse::<IndexFamily>()?.search_spec(top_k))
}

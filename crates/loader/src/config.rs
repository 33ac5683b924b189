//! Loader configuration types and builders

use leafpress_content::{Filter, IncludeSpec, StatusLevel, TypeRegistry};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use service_builder::builder;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{LoaderError, LoaderResult};

/// Maximum depth to which an association is hydrated automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HydrateDepth {
    Limited(u32),
    Unlimited,
}

impl HydrateDepth {
    /// Whether the association is expanded on objects loaded at `depth`
    pub fn allows(&self, depth: u32) -> bool {
        match self {
            HydrateDepth::Unlimited => true,
            HydrateDepth::Limited(max) => *max > depth,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, HydrateDepth::Unlimited)
    }
}

impl fmt::Display for HydrateDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HydrateDepth::Limited(depth) => write!(f, "{}", depth),
            HydrateDepth::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl std::str::FromStr for HydrateDepth {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") || s == "-1" {
            return Ok(HydrateDepth::Unlimited);
        }
        s.parse::<u32>()
            .map(HydrateDepth::Limited)
            .map_err(|_| LoaderError::invalid(format!("invalid hydrate depth '{}'", s)))
    }
}

impl Serialize for HydrateDepth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HydrateDepth::Limited(depth) => serializer.serialize_u32(*depth),
            HydrateDepth::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for HydrateDepth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(-1) => Ok(HydrateDepth::Unlimited),
            Raw::Number(n) => u32::try_from(n)
                .map(HydrateDepth::Limited)
                .map_err(|_| de::Error::custom(format!("invalid hydrate depth {}", n))),
            Raw::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

/// Association name to maximum hydration depth
pub type AutoHydrate = BTreeMap<String, HydrateDepth>;

/// Default load options of one object type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeOptions {
    /// Include spec, e.g. `"poster|1,has_media"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Filter::is_empty")]
    pub filter: Filter,
}

impl TypeOptions {
    pub fn new(include: &str) -> Self {
        Self {
            include: Some(include.to_string()),
            filter: Filter::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Configuration for [`crate::ObjectsLoader`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[builder]
pub struct LoaderConfig {
    /// Default options per object type, inherited by descendant types
    #[builder(default, getter)]
    pub objects: BTreeMap<String, TypeOptions>,

    /// Associations expanded automatically, with their maximum depth
    #[builder(default, getter)]
    pub auto_hydrate: AutoHydrate,

    /// Statuses visible to loads that do not override it
    #[builder(default = "StatusLevel::On", getter)]
    pub status_level: StatusLevel,

    /// Maximum number of ids per batched fetch
    #[builder(default = "1000", getter)]
    pub max_batch_size: usize,

    /// Depth at which unlimited associations stop expanding
    #[builder(default = "32", getter, setter)]
    pub unlimited_depth_cap: u32,

    /// Uname of the publication root folder
    #[builder(optional, getter, setter)]
    pub root_folder: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            auto_hydrate: AutoHydrate::new(),
            status_level: StatusLevel::On,
            max_batch_size: 1000,
            unlimited_depth_cap: 32,
            root_folder: None,
        }
    }
}

impl LoaderConfig {
    pub fn from_yaml(yaml: &str) -> LoaderResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> LoaderResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LoaderError::invalid(format!("cannot read loader config {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn with_type(mut self, object_type: &str, options: TypeOptions) -> Self {
        self.objects.insert(object_type.to_string(), options);
        self
    }

    pub fn with_auto_hydrate(mut self, association: &str, depth: HydrateDepth) -> Self {
        self.auto_hydrate.insert(association.to_string(), depth);
        self
    }

    /// Reject unknown types, malformed include specs and unknown filter strategies
    pub fn validate(&self, registry: &TypeRegistry) -> LoaderResult<()> {
        if self.max_batch_size == 0 {
            return Err(LoaderError::invalid("max_batch_size must be at least 1"));
        }
        for (name, options) in &self.objects {
            if !registry.contains(name) {
                return Err(LoaderError::invalid(format!(
                    "loader options configured for unknown object type '{}'",
                    name
                )));
            }
            if let Some(include) = &options.include {
                IncludeSpec::parse(include)?;
            }
            options.filter.conditions()?;
        }
        Ok(())
    }
}

//! Per-type default load options with inheritance along the type hierarchy

use leafpress_content::{Filter, IncludeSpec, ObjectType, TypeRegistry};
use std::collections::HashMap;

use crate::config::LoaderConfig;
use crate::error::LoaderResult;

/// Include spec and filter applied to a load
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    pub include: IncludeSpec,
    pub filter: Filter,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, include: &str) -> LoaderResult<Self> {
        self.include = IncludeSpec::parse(include)?;
        Ok(self)
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.filter.is_empty()
    }
}

/// Resolves the default options of a type from the loader configuration
#[derive(Debug, Clone, Default)]
pub struct TypeConfigResolver {
    defaults: HashMap<String, LoadOptions>,
}

impl TypeConfigResolver {
    /// Parse every configured entry, keyed by canonical type name
    pub fn new(config: &LoaderConfig, registry: &TypeRegistry) -> LoaderResult<Self> {
        config.validate(registry)?;

        let mut defaults = HashMap::new();
        for (name, options) in config.get_objects() {
            let object_type = registry.get(name)?;
            let include = match &options.include {
                Some(include) => IncludeSpec::parse(include)?,
                None => IncludeSpec::default(),
            };
            defaults.insert(
                object_type.name.clone(),
                LoadOptions {
                    include,
                    filter: options.filter.clone(),
                },
            );
        }
        Ok(Self { defaults })
    }

    /// Options configured for the type, else for its nearest configured ancestor
    pub fn default_options(&self, registry: &TypeRegistry, object_type: &ObjectType) -> LoadOptions {
        registry
            .lineage(object_type)
            .find_map(|t| self.defaults.get(&t.name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_configured(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypeOptions;
    use leafpress_content::Contain;

    fn resolver(registry: &TypeRegistry) -> TypeConfigResolver {
        let config = LoaderConfig::default()
            .with_type("media", TypeOptions::new("poster|1"))
            .with_type("objects", TypeOptions::new("parents"))
            .with_type(
                "documents",
                TypeOptions::new("has_media").with_filter(Filter::new().with("status", "on")),
            );
        TypeConfigResolver::new(&config, registry).unwrap()
    }

    #[test]
    fn test_literal_entry_wins() {
        let registry = TypeRegistry::standard();
        let options = resolver(&registry).default_options(&registry, registry.get("documents").unwrap());
        assert_eq!(options.include.contains(), &[Contain::new("has_media")]);
        assert!(options.filter.contains_key("status"));
    }

    #[test]
    fn test_inherited_from_nearest_ancestor() {
        let registry = TypeRegistry::standard();
        let resolver = resolver(&registry);

        let images = resolver.default_options(&registry, registry.get("images").unwrap());
        assert_eq!(images.include.contains(), &[Contain::limited("poster", 1)]);

        let folders = resolver.default_options(&registry, registry.get("folders").unwrap());
        assert_eq!(folders.include.contains(), &[Contain::new("parents")]);
    }

    #[test]
    fn test_unconfigured_hierarchy_is_empty() {
        let registry = TypeRegistry::standard();
        let resolver = TypeConfigResolver::new(&LoaderConfig::default(), &registry).unwrap();
        assert!(resolver
            .default_options(&registry, registry.get("videos").unwrap())
            .is_empty());
    }

    #[test]
    fn test_singular_names_are_canonicalised() {
        let registry = TypeRegistry::standard();
        let config = LoaderConfig::default().with_type("image", TypeOptions::new("children"));
        let resolver = TypeConfigResolver::new(&config, &registry).unwrap();
        assert!(resolver.is_configured("images"));
    }
}

// src/config/validate.rs

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetdagError, Result};
use crate::types::UnitKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.config, raw.server, raw.reload, raw.unit,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_units(cfg)?;
    validate_global_config(cfg)?;
    validate_unit_dependencies(cfg)?;
    validate_dag(cfg)?;
    validate_unit_options(cfg)?;
    validate_globs(cfg)?;
    Ok(())
}

fn ensure_has_units(cfg: &RawConfigFile) -> Result<()> {
    if cfg.unit.is_empty() {
        return Err(AssetdagError::ConfigError(
            "config must contain at least one [unit.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(AssetdagError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_unit_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, unit) in cfg.unit.iter() {
        for dep in unit.after.iter() {
            let Some(dep_unit) = cfg.unit.get(dep) else {
                return Err(AssetdagError::ConfigError(format!(
                    "unit '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            };
            if dep == name {
                return Err(AssetdagError::ConfigError(format!(
                    "unit '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if unit.build && !dep_unit.build {
                return Err(AssetdagError::ConfigError(format!(
                    "build unit '{}' depends on '{}', which is not part of the build",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> unit.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.unit.keys() {
        graph.add_node(name.as_str());
    }

    for (name, unit) in cfg.unit.iter() {
        for dep in unit.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetdagError::DagCycle(format!(
            "cycle detected in build graph involving unit '{}'",
            cycle.node_id()
        ))),
    }
}

fn validate_unit_options(cfg: &RawConfigFile) -> Result<()> {
    for (name, unit) in cfg.unit.iter() {
        if unit.kind != UnitKind::Clean && unit.src.is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "unit '{}' ({}) needs at least one `src` pattern",
                name, unit.kind
            )));
        }

        if unit.dest.as_os_str().is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "unit '{}' has an empty `dest`",
                name
            )));
        }

        match unit.kind {
            UnitKind::Templates
                if unit.renderer.as_deref().map(str::trim).unwrap_or("").is_empty() =>
            {
                return Err(AssetdagError::ConfigError(format!(
                    "templates unit '{}' needs a `renderer` command",
                    name
                )));
            }
            UnitKind::Styles => {
                let languages = unit.style_languages();
                for ext in unit.compilers.keys() {
                    if !languages.contains(ext) {
                        return Err(AssetdagError::ConfigError(format!(
                            "styles unit '{}' has a compiler for '{}', which is not in `languages`",
                            name, ext
                        )));
                    }
                }
            }
            _ => {}
        }

        if let Some(bundle) = &unit.bundle {
            if bundle.is_empty() || bundle.contains('/') || bundle.contains('\\') {
                return Err(AssetdagError::ConfigError(format!(
                    "unit '{}' has an invalid `bundle` name '{}'",
                    name, bundle
                )));
            }
        }
    }
    Ok(())
}

fn validate_globs(cfg: &RawConfigFile) -> Result<()> {
    let unit_patterns = cfg.unit.iter().flat_map(|(name, unit)| {
        unit.src
            .iter()
            .chain(unit.exclude.iter())
            .map(move |pat| (name.as_str(), pat))
    });
    let reload_patterns = cfg.reload.watch.iter().map(|pat| ("[reload]", pat));

    for (owner, pat) in unit_patterns.chain(reload_patterns) {
        if let Err(err) = Glob::new(pat) {
            return Err(AssetdagError::ConfigError(format!(
                "invalid glob pattern '{}' in {}: {}",
                pat, owner, err
            )));
        }
    }
    Ok(())
}

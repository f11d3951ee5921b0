#![allow(dead_code)]

use std::collections::BTreeMap;

use assetdag::config::{
    ConfigFile, ConfigSection, RawConfigFile, ReloadSection, ServerSection, UnitConfig,
};
use assetdag::errors::Result;
use assetdag::types::{NotifySetting, TriggerWhileRunningBehaviour, UnitKind};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                server: ServerSection::default(),
                reload: ReloadSection::default(),
                unit: BTreeMap::new(),
            },
        }
    }

    pub fn with_unit(mut self, name: &str, unit: UnitConfig) -> Self {
        self.config.unit.insert(name.to_string(), unit);
        self
    }

    pub fn with_reload_watch(mut self, pattern: &str) -> Self {
        self.config.reload.watch.push(pattern.to_string());
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn with_queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn without_server(mut self) -> Self {
        self.config.server.enabled = false;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `UnitConfig`.
pub struct UnitConfigBuilder {
    unit: UnitConfig,
}

impl UnitConfigBuilder {
    pub fn new(kind: UnitKind, dest: &str) -> Self {
        Self {
            unit: UnitConfig::new(kind, dest),
        }
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.unit.src.push(pattern.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.unit.after.push(dep.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.unit.exclude.push(pattern.to_string());
        self
    }

    pub fn preserve(mut self, sub: &str) -> Self {
        self.unit.preserve.push(sub.to_string());
        self
    }

    pub fn build_graph(mut self, val: bool) -> Self {
        self.unit.build = val;
        self
    }

    pub fn watch(mut self, val: bool) -> Self {
        self.unit.watch = Some(val);
        self
    }

    pub fn notify(mut self, setting: NotifySetting) -> Self {
        self.unit.notify = Some(setting);
        self
    }

    pub fn bundle(mut self, name: &str) -> Self {
        self.unit.bundle = Some(name.to_string());
        self
    }

    pub fn languages(mut self, langs: &[&str]) -> Self {
        self.unit.languages = langs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn renderer(mut self, cmd: &str) -> Self {
        self.unit.renderer = Some(cmd.to_string());
        self
    }

    pub fn build(self) -> UnitConfig {
        self.unit
    }
}

/// Shorthand for a unit that passes validation, useful when only the graph
/// matters. Non-clean units get `src/**`; templates get `cat` as renderer.
pub fn unit(kind: UnitKind) -> UnitConfigBuilder {
    let builder = UnitConfigBuilder::new(kind, "public");
    match kind {
        UnitKind::Clean => builder,
        UnitKind::Templates => builder.src("src/**").renderer("cat"),
        _ => builder.src("src/**"),
    }
}

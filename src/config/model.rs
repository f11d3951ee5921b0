// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{NotifyKind, NotifySetting, TriggerWhileRunningBehaviour, UnitKind};

/// Built-in pipeline: the fixed source/output layout.
pub const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// Top-level configuration as read from TOML, before validation.
///
/// ```toml
/// [config]
/// queue_length = 1
///
/// [server]
/// root = "public"
///
/// [unit.styles]
/// kind = "styles"
/// src = ["src/styles/**/*.scss"]
/// dest = "public/css"
/// after = ["html"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub reload: ReloadSection,

    /// All units from `[unit.<name>]`, keyed by unit name.
    #[serde(default)]
    pub unit: BTreeMap<String, UnitConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    server: ServerSection,
    reload: ReloadSection,
    unit: BTreeMap<String, UnitConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        server: ServerSection,
        reload: ReloadSection,
        unit: BTreeMap<String, UnitConfig>,
    ) -> Self {
        Self {
            config,
            server,
            reload,
            unit,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn reload(&self) -> &ReloadSection {
        &self.reload
    }

    pub fn units(&self) -> &BTreeMap<String, UnitConfig> {
        &self.unit
    }

    pub fn unit(&self, name: &str) -> Option<&UnitConfig> {
        self.unit.get(name)
    }

    /// Units that take part in the default build graph.
    pub fn build_units(&self) -> Vec<String> {
        self.unit
            .iter()
            .filter(|(_, u)| u.build)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Units of the given kind, in name order.
    pub fn units_of_kind(&self, kind: UnitKind) -> Vec<String> {
        self.unit
            .iter()
            .filter(|(_, u)| u.kind == kind)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// `[config]` section: trigger handling while a run is active.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued runs to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// `[server]` section: the static preview server and its reload channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_server_root")]
    pub root: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_reload_port")]
    pub reload_port: u16,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_server_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reload_port() -> u16 {
    35729
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            root: default_server_root(),
            host: default_host(),
            port: default_port(),
            reload_port: default_reload_port(),
            enabled: true,
        }
    }
}

/// `[reload]` section: generated files whose change only reloads clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReloadSection {
    #[serde(default)]
    pub watch: Vec<String>,
}

/// `[unit.<name>]` section.
///
/// Fields that only make sense for one kind are ignored by the others.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    pub kind: UnitKind,

    /// Glob patterns relative to the project root.
    #[serde(default)]
    pub src: Vec<String>,

    /// Output directory relative to the project root.
    pub dest: PathBuf,

    /// Units that must finish first when they run in the same build.
    #[serde(default)]
    pub after: Vec<String>,

    /// Part of the default build graph.
    #[serde(default = "default_true")]
    pub build: bool,

    /// Bind to the change watcher; defaults by kind.
    #[serde(default)]
    pub watch: Option<bool>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub notify: Option<NotifySetting>,

    /// clean: subpaths of `dest` to keep.
    #[serde(default)]
    pub preserve: Vec<String>,

    /// styles/scripts: output file name.
    #[serde(default)]
    pub bundle: Option<String>,

    /// styles: accepted source extensions.
    #[serde(default)]
    pub languages: Vec<String>,

    /// styles: external compiler command per extension (source on stdin,
    /// CSS on stdout). Extensions without one are read as CSS.
    #[serde(default)]
    pub compilers: BTreeMap<String, String>,

    /// scripts: language target, e.g. `"es2015"`.
    #[serde(default)]
    pub target: Option<String>,

    /// templates: render command (source on stdin, markup on stdout).
    #[serde(default)]
    pub renderer: Option<String>,
}

impl UnitConfig {
    pub fn new(kind: UnitKind, dest: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            src: Vec::new(),
            dest: dest.into(),
            after: Vec::new(),
            build: true,
            watch: None,
            exclude: Vec::new(),
            notify: None,
            preserve: Vec::new(),
            bundle: None,
            languages: Vec::new(),
            compilers: BTreeMap::new(),
            target: None,
            renderer: None,
        }
    }

    pub fn effective_watch(&self) -> bool {
        self.watch.unwrap_or_else(|| self.kind.watched_by_default())
    }

    pub fn effective_notify(&self) -> Option<NotifyKind> {
        match self.notify {
            Some(setting) => setting.resolve(),
            None => self.kind.default_notify(),
        }
    }

    pub fn bundle_name(&self) -> String {
        match (&self.bundle, self.kind) {
            (Some(name), _) => name.clone(),
            (None, UnitKind::Scripts) => "main.min.js".to_string(),
            (None, _) => "main.min.css".to_string(),
        }
    }

    pub fn style_languages(&self) -> Vec<String> {
        if self.languages.is_empty() {
            vec!["scss".to_string(), "sass".to_string(), "css".to_string()]
        } else {
            self.languages.clone()
        }
    }

    pub fn script_target(&self) -> String {
        self.target.clone().unwrap_or_else(|| "es2015".to_string())
    }
}

use std::str::FromStr;
use serde::Deserialize;

/// Behaviour when a unit is triggered again while it is already part of the
/// active run.
///
/// - `Queue`: remember the trigger and start a new run for it when the current
///   one finishes (default behaviour).
/// - `Cancel`: drop any previously queued triggers and only keep the latest
///   one. The running unit itself is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// The transformation capability a unit wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Delete prior output (except preserved subpaths).
    Clean,
    /// Whitespace-collapsed markup.
    Markup,
    /// Template-language sources rendered to markup by an external renderer.
    Templates,
    /// Re-encoded images, skipping sources whose output is newer.
    Images,
    /// Style sources compiled into one minified, prefixed bundle.
    Styles,
    /// Script sources transpiled and minified into one bundle.
    Scripts,
}

impl UnitKind {
    /// Notification sent to browser clients after a successful run, unless
    /// the unit overrides it.
    pub fn default_notify(self) -> Option<NotifyKind> {
        match self {
            UnitKind::Markup | UnitKind::Templates | UnitKind::Scripts => Some(NotifyKind::Reload),
            UnitKind::Styles => Some(NotifyKind::Inject),
            UnitKind::Images | UnitKind::Clean => None,
        }
    }

    /// Whether units of this kind are bound to the change watcher by default.
    pub fn watched_by_default(self) -> bool {
        !matches!(self, UnitKind::Clean)
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitKind::Clean => "clean",
            UnitKind::Markup => "markup",
            UnitKind::Templates => "templates",
            UnitKind::Images => "images",
            UnitKind::Styles => "styles",
            UnitKind::Scripts => "scripts",
        };
        f.write_str(s)
    }
}

/// What connected browser clients are told after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    /// Full page reload.
    Reload,
    /// Swap stylesheets in place without reloading.
    Inject,
}

/// `notify = "..."` as written in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifySetting {
    Reload,
    Inject,
    None,
}

impl NotifySetting {
    pub fn resolve(self) -> Option<NotifyKind> {
        match self {
            NotifySetting::Reload => Some(NotifyKind::Reload),
            NotifySetting::Inject => Some(NotifyKind::Inject),
            NotifySetting::None => None,
        }
    }
}

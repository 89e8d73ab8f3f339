use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::{Context as _, bail};
use serde::{Deserialize, Serialize};
use tracing::{error, trace, warn};

use crate::common::collections::HashMap;
use crate::gateway::CommandOutcome;
use crate::model::{
    AppQuery, LayoutKind, LayoutPlan, SpacePlan, TitleMatch, resolve_space_index,
};
use crate::opener::OpenerConfig;

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap().join(".arrange.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Path of the manager's command socket. The conventional per-user path
    /// is used when unset.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
    /// Space unclaimed windows are parked on (1-based, negative from the
    /// end). No parking when unset.
    #[serde(default)]
    pub holding_space: Option<i32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            socket_path: None,
            poll_interval_ms: default_poll_interval_ms(),
            open_timeout_ms: default_open_timeout_ms(),
            holding_space: None,
        }
    }
}

impl Settings {
    pub fn opener_config(&self) -> OpenerConfig {
        OpenerConfig {
            poll_interval: std::time::Duration::from_millis(self.poll_interval_ms),
            timeout: std::time::Duration::from_millis(self.open_timeout_ms),
        }
    }
}

/// One named application query.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AppEntry {
    pub app: String,
    /// Exact title match.
    #[serde(default)]
    pub title: Option<String>,
    /// Title pattern; mutually exclusive with `title`.
    #[serde(default)]
    pub title_regex: Option<String>,
    /// Command line that launches the application, e.g.
    /// `["open", "-a", "Slack"]`.
    #[serde(default)]
    pub open: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SpaceEntry {
    /// 1-based declared space index; negative counts from the end.
    pub index: i32,
    #[serde(default)]
    pub layout: LayoutKind,
    /// Keys into the `[apps]` table, in intended left-to-right order.
    pub windows: Vec<String>,
    #[serde(default)]
    pub sizes: Option<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SchemeEntry {
    pub spaces: Vec<SpaceEntry>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub apps: HashMap<String, AppEntry>,
    #[serde(default)]
    pub layouts: HashMap<String, SchemeEntry>,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_open_timeout_ms() -> u64 {
    10000
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn default() -> Config {
        Self::parse(include_str!("../../arrange.default.toml")).unwrap()
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(buf)?)
    }

    /// Validates the configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.poll_interval().is_zero() {
            issues.push("poll_interval_ms must be at least 1".to_string());
        }

        for (key, entry) in &self.apps {
            if entry.app.is_empty() {
                issues.push(format!("App '{}' has an empty application name", key));
            }
            if entry.title.is_some() && entry.title_regex.is_some() {
                issues.push(format!(
                    "App '{}' sets both title and title_regex; pick one",
                    key
                ));
            }
            if let Some(pattern) = &entry.title_regex {
                if let Err(err) = regex::Regex::new(pattern) {
                    issues.push(format!("App '{}' has an invalid title_regex: {}", key, err));
                }
            }
            if let Some(open) = &entry.open {
                if open.is_empty() {
                    issues.push(format!("App '{}' has an empty open command", key));
                }
            }
        }

        for (name, scheme) in &self.layouts {
            if scheme.spaces.is_empty() {
                issues.push(format!("Layout '{}' declares no spaces", name));
            }
            for (position, space) in scheme.spaces.iter().enumerate() {
                if space.index == 0 {
                    issues.push(format!(
                        "Layout '{}' space {} has index 0; indices are 1-based",
                        name, position
                    ));
                }
                for key in &space.windows {
                    if !self.apps.contains_key(key) {
                        issues.push(format!(
                            "Layout '{}' references unknown app '{}'",
                            name, key
                        ));
                    }
                }
                if let Some(sizes) = &space.sizes {
                    if sizes.len() != space.windows.len() {
                        issues.push(format!(
                            "Layout '{}' space {} declares {} sizes for {} windows",
                            name,
                            position,
                            sizes.len(),
                            space.windows.len()
                        ));
                    }
                    let sum: f64 = sizes.iter().sum();
                    if (sum - 1.0).abs() > 1e-9 {
                        issues.push(format!(
                            "Layout '{}' space {} sizes sum to {}, not 1",
                            name, position, sum
                        ));
                    }
                }
            }
        }

        issues
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.settings.poll_interval_ms)
    }

    /// Compile one `[apps]` entry into a query.
    pub fn query_for(&self, key: &str) -> anyhow::Result<AppQuery> {
        let Some(entry) = self.apps.get(key) else {
            bail!("unknown app '{key}'");
        };
        let mut query = AppQuery::app(&entry.app);
        if let Some(title) = &entry.title {
            query = query.with_title(title);
        } else if let Some(pattern) = &entry.title_regex {
            let matcher = TitleMatch::regex(pattern)
                .with_context(|| format!("app '{key}' has an invalid title_regex"))?;
            query = query.with_title_match(matcher);
        }
        if let Some(open) = &entry.open {
            if open.is_empty() {
                bail!("app '{key}' has an empty open command");
            }
            let argv = open.clone();
            query = query.with_open(move || spawn_open_command(&argv));
        }
        Ok(query)
    }

    /// Every query a scheme mentions, deduplicated, in first-mention order.
    pub fn scheme_queries(&self, scheme: &str) -> anyhow::Result<Vec<AppQuery>> {
        let Some(entry) = self.layouts.get(scheme) else {
            bail!("unknown layout '{scheme}'");
        };
        let mut seen = Vec::new();
        let mut queries = Vec::new();
        for space in &entry.spaces {
            for key in &space.windows {
                if seen.contains(key) {
                    continue;
                }
                seen.push(key.clone());
                queries.push(self.query_for(key)?);
            }
        }
        Ok(queries)
    }

    /// Compile a named scheme into an executable plan. The holding-space
    /// setting, when present, becomes the plan's fallback handler.
    pub fn plan_for(&self, scheme: &str) -> anyhow::Result<LayoutPlan> {
        let Some(entry) = self.layouts.get(scheme) else {
            bail!("unknown layout '{scheme}'");
        };
        let mut spaces = Vec::with_capacity(entry.spaces.len());
        for space in &entry.spaces {
            let windows = space
                .windows
                .iter()
                .map(|key| self.query_for(key))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let mut plan = SpacePlan::new(space.index, space.layout, windows);
            if let Some(sizes) = &space.sizes {
                plan = plan.with_sizes(sizes.clone());
            }
            spaces.push(plan);
        }

        let mut plan = LayoutPlan::new(spaces);
        if let Some(holding) = self.settings.holding_space {
            plan = plan.with_fallback(Box::new(move |windows, ctx, gateway| {
                Box::pin(async move {
                    let Some(space) = resolve_space_index(ctx.spaces, holding) else {
                        warn!(index = holding, "holding space does not resolve, leaving leftovers");
                        return;
                    };
                    for window in windows {
                        if window.space == space.index {
                            continue;
                        }
                        trace!(window = window.id, app = %window.app, "parking leftover window");
                        let result = gateway.move_window_to_space(window.id, space.index).await;
                        let _ = CommandOutcome::note(
                            format_args!("park window {} on space {}", window.id, space.index),
                            result,
                        );
                    }
                })
            }));
        }
        Ok(plan)
    }
}

fn spawn_open_command(argv: &[String]) {
    let Some((program, args)) = argv.split_first() else {
        return;
    };
    trace!(program = %program, "launching");
    match Command::new(program).args(args).spawn() {
        Ok(_) => {}
        Err(err) => error!(program = %program, error = %err, "could not launch application"),
    }
}

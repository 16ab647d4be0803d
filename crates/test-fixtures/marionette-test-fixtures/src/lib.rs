//! Shared JSON fixtures for marionette tests and benches.
//!
//! Every fixture is listed by name in `fixtures/manifest.json` at the workspace root, grouped
//! by kind: viseme timelines, motion catalogs, parameter layouts and engine configs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Result<Manifest, String>> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).map_err(|e| e.to_string())
});

#[derive(Debug, Deserialize)]
struct Manifest {
    timelines: HashMap<String, String>,
    catalogs: HashMap<String, String>,
    layouts: HashMap<String, String>,
    configs: HashMap<String, String>,
}

#[derive(Copy, Clone, Debug)]
enum Kind {
    Timeline,
    Catalog,
    Layout,
    Config,
}

impl Kind {
    fn label(self) -> &'static str {
        match self {
            Kind::Timeline => "timeline",
            Kind::Catalog => "catalog",
            Kind::Layout => "layout",
            Kind::Config => "config",
        }
    }

    fn entries(self) -> Result<&'static HashMap<String, String>> {
        let manifest = MANIFEST
            .as_ref()
            .map_err(|e| anyhow!("fixtures manifest failed to parse: {e}"))?;
        Ok(match self {
            Kind::Timeline => &manifest.timelines,
            Kind::Catalog => &manifest.catalogs,
            Kind::Layout => &manifest.layouts,
            Kind::Config => &manifest.configs,
        })
    }

    fn rel(self, name: &str) -> Result<&'static str> {
        self.entries()?
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("unknown {} fixture '{name}'", self.label()))
    }

    fn keys(self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn json(self, name: &str) -> Result<String> {
        read_to_string(self.rel(name)?)
    }

    fn load<T: DeserializeOwned>(self, name: &str) -> Result<T> {
        let rel = self.rel(name)?;
        let text = read_to_string(rel)?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {} fixture {rel}", self.label()))
    }

    fn path(self, name: &str) -> Result<PathBuf> {
        Ok(fixtures_root().join(self.rel(name)?))
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = fixtures_root().join(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

macro_rules! fixture_kind {
    ($(#[$doc:meta])* $module:ident, $kind:expr) => {
        $(#[$doc])*
        pub mod $module {
            use super::*;

            pub fn keys() -> Vec<String> {
                $kind.keys()
            }

            pub fn json(name: &str) -> Result<String> {
                $kind.json(name)
            }

            pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
                $kind.load(name)
            }

            pub fn path(name: &str) -> Result<PathBuf> {
                $kind.path(name)
            }
        }
    };
}

fixture_kind!(
    /// Viseme timelines in the speech collaborator's wire format.
    timelines,
    Kind::Timeline
);
fixture_kind!(
    /// Motion clip lists as a puppet runtime would report them.
    catalogs,
    Kind::Catalog
);
fixture_kind!(
    /// Parameter declarations (`[{ id, min, max, default }]`) of sample puppet models.
    layouts,
    Kind::Layout
);
fixture_kind!(
    /// Partial engine configurations.
    configs,
    Kind::Config
);

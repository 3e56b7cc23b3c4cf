//! Input harness for the analytics CLI and integration tests.
//!
//! This module discovers synthetic fixture specs on disk, loads JSON channel
//! bundles and WAV recordings, and reads the optional session parameters
//! stored next to a fixture. It stands in for the container-file parser so
//! the engine can be exercised end to end without clinical recordings.

pub mod bundle;
pub mod synthetic;
pub mod wav;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::channels::ChannelSet;
use crate::session::SessionParameters;

pub use bundle::{ChannelBundle, ChannelRecord};
pub use synthetic::{BurstSpec, FixtureSpec, SyntheticChannelSpec};
pub use wav::read_wav_channels;

/// Default location for fixture specs
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

const SPEC_SUFFIX: &str = ".fixture.json";
const PARAMS_SUFFIX: &str = ".params.json";

/// Metadata describing an available fixture
#[derive(Clone, Debug, PartialEq)]
pub struct FixtureMetadata {
    pub name: String,
    pub spec_path: PathBuf,
    pub params_path: Option<PathBuf>,
}

/// A recording ready for analysis
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub source: String,
    pub attributes: BTreeMap<String, String>,
    pub channels: ChannelSet,
    /// Session parameters shipped with the input, if any
    pub params: Option<SessionParameters>,
}

/// Where to read a recording from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Synthetic fixture by catalog name or spec path
    Fixture(String),
    /// JSON channel bundle
    Bundle(PathBuf),
    /// WAV file with optional per-channel labels
    Wav { path: PathBuf, labels: Vec<String> },
}

impl InputSource {
    pub fn load(&self, catalog: &FixtureCatalog) -> Result<LoadedInput> {
        match self {
            InputSource::Fixture(name) => catalog.load(name),
            InputSource::Bundle(path) => {
                let bundle = ChannelBundle::from_json_file(path)?;
                let channels = bundle
                    .to_channel_set()
                    .with_context(|| format!("invalid channel in {}", path.display()))?;
                Ok(LoadedInput {
                    source: bundle.source,
                    attributes: bundle.metadata,
                    channels,
                    params: None,
                })
            }
            InputSource::Wav { path, labels } => Ok(LoadedInput {
                source: file_name(path),
                attributes: BTreeMap::new(),
                channels: read_wav_channels(path, labels)?,
                params: None,
            }),
        }
    }
}

/// Catalog responsible for discovering fixtures on disk
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all fixtures, sorted by name
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if fixture_name(&path).is_some() {
                    fixtures.push(self.metadata_for_path(&path)?);
                }
            }
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Load and render a fixture by name or spec path
    pub fn load(&self, fixture: &str) -> Result<LoadedInput> {
        let spec_path = self.resolve_fixture_path(fixture)?;
        let metadata = self.metadata_for_path(&spec_path)?;

        let json = fs::read_to_string(&spec_path)
            .with_context(|| format!("reading fixture {}", spec_path.display()))?;
        let spec: FixtureSpec = serde_json::from_str(&json)
            .with_context(|| format!("parsing {}", spec_path.display()))?;
        let channels = spec
            .generate()
            .with_context(|| format!("generating fixture {}", metadata.name))?;

        let params = match &metadata.params_path {
            Some(path) => Some(load_session_parameters(path)?),
            None => None,
        };

        Ok(LoadedInput {
            source: spec.id,
            attributes: spec.metadata,
            channels,
            params,
        })
    }

    fn resolve_fixture_path(&self, fixture: &str) -> Result<PathBuf> {
        let as_path = Path::new(fixture);
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self.root.join(format!("{fixture}{SPEC_SUFFIX}"));
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }

    fn metadata_for_path(&self, spec_path: &Path) -> Result<FixtureMetadata> {
        let name = fixture_name(spec_path)
            .ok_or_else(|| anyhow!("Invalid fixture name for {}", spec_path.display()))?;
        let params_path = spec_path.with_file_name(format!("{name}{PARAMS_SUFFIX}"));
        Ok(FixtureMetadata {
            name,
            spec_path: spec_path.to_path_buf(),
            params_path: params_path.exists().then_some(params_path),
        })
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

/// Read a SessionParameters JSON file
pub fn load_session_parameters<P: AsRef<Path>>(path: P) -> Result<SessionParameters> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading session parameters {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn fixture_name(path: &Path) -> Option<String> {
    path.file_name()?
        .to_str()?
        .strip_suffix(SPEC_SUFFIX)
        .map(str::to_string)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

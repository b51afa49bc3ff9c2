//! TOML job files and the user defaults file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use copycull_core::{CopyCullJob, CullMode, StageOptions};
use copycull_engine::engine::{Combinator, FormulaSet, PatternTemplate, PredicateSet};
use copycull_engine::script::{RhaiPredicate, RhaiTemplate};
use directories::ProjectDirs;
use rhai::Engine;
use serde::Deserialize;
use thiserror::Error;

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("refusing to read {path}: file too large ({size} bytes, max {max})")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("job {index}: {message}")]
    Job { index: usize, message: String },
}

/// A job file: one source workbook, any number of culled copies.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    pub source: PathBuf,
    pub output_dir: Option<PathBuf>,
    #[serde(default, rename = "job")]
    pub jobs: Vec<JobSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    pub output: PathBuf,
    pub sheet: String,
    #[serde(default = "default_header_row")]
    pub header_row: u32,
    pub first_modifiable_row: Option<u32>,
    #[serde(default)]
    pub protected_rows: Vec<u32>,
    pub rename: Option<String>,
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub mode: CullMode,
    /// Header label -> Rhai expression over `value`.
    #[serde(default)]
    pub conditions: BTreeMap<String, String>,
    /// Column letters -> formula. A value starting with `=` is a pattern with
    /// `{row}` placeholders; anything else is a Rhai expression over `row`.
    #[serde(default)]
    pub formulas: BTreeMap<String, String>,
    #[serde(default)]
    pub number_formats: BTreeMap<String, String>,
    pub target_rows: Option<Vec<u32>>,
}

fn default_header_row() -> u32 {
    1
}

/// Per-user defaults, read from `copycull.toml` in the platform config directory.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub output_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

pub fn user_defaults_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "copycull")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("copycull.toml");
    Some(path)
}

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = std::fs::metadata(path).map_err(io_err)?;
    if meta.len() > MAX_CONFIG_FILE_BYTES {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max: MAX_CONFIG_FILE_BYTES,
        });
    }
    std::fs::read_to_string(path).map_err(io_err)
}

fn parse_toml<T: for<'de> Deserialize<'de>>(path: &Path, content: &str) -> Result<T, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

impl Defaults {
    /// Load `path`, or the user defaults file when `None`. A missing user
    /// defaults file yields empty defaults; an explicit `path` must exist.
    pub fn load(path: Option<&Path>) -> Result<Defaults, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match user_defaults_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Defaults::default()),
            },
        };
        parse_toml(&path, &read_config_file(&path)?)
    }
}

impl JobFile {
    /// Load a job file. Relative `source` and `output_dir` paths are taken
    /// relative to the job file's directory.
    pub fn load(path: &Path) -> Result<JobFile, ConfigError> {
        let mut file: JobFile = parse_toml(path, &read_config_file(path)?)?;
        let base = path.parent().unwrap_or(Path::new(""));
        file.source = base.join(&file.source);
        file.output_dir = file.output_dir.map(|dir| base.join(dir));
        Ok(file)
    }
}

impl JobSpec {
    pub fn stage_options(&self) -> StageOptions {
        let mut options = StageOptions::default()
            .with_header_row(self.header_row)
            .with_protected_rows(self.protected_rows.iter().copied());
        if let Some(row) = self.first_modifiable_row {
            options = options.with_first_modifiable_row(row);
        }
        if let Some(name) = &self.rename {
            options = options.with_rename(name.clone());
        }
        options
    }

    /// Compile conditions and formulas into a runnable job.
    pub fn to_job(
        &self,
        index: usize,
        source: &Path,
        output_dir: Option<&Path>,
        engine: &Arc<Engine>,
    ) -> Result<CopyCullJob, ConfigError> {
        let job_err = |message: String| ConfigError::Job { index, message };

        let mut predicates = PredicateSet::new();
        for (column, expr) in &self.conditions {
            let predicate = RhaiPredicate::compile(engine.clone(), expr)
                .map_err(|e| job_err(format!("condition on {:?}: {}", column, e)))?;
            predicates.insert(column.clone(), predicate);
        }

        let formulas = build_formulas(&self.formulas, &self.number_formats, engine)
            .map_err(job_err)?;

        let mut job = CopyCullJob::new(source, &self.output, &self.sheet)
            .with_options(self.stage_options())
            .with_predicates(predicates, self.combinator)
            .with_mode(self.mode)
            .with_formulas(formulas);
        if let Some(dir) = output_dir {
            job = job.with_copy_to_dir(dir);
        }
        if let Some(rows) = &self.target_rows {
            job = job.with_target_rows(rows.clone());
        }
        Ok(job)
    }
}

/// Build a formula set from column -> formula and column -> number format maps.
pub fn build_formulas(
    formulas: &BTreeMap<String, String>,
    number_formats: &BTreeMap<String, String>,
    engine: &Arc<Engine>,
) -> Result<FormulaSet, String> {
    let mut set = FormulaSet::new();
    for (column, source) in formulas {
        let inserted = if source.trim_start().starts_with('=') {
            set.insert(column, PatternTemplate::new(source.trim()))
        } else {
            let template = RhaiTemplate::compile(engine.clone(), source)
                .map_err(|e| format!("formula for {}: {}", column, e))?;
            set.insert(column, template)
        };
        inserted.map_err(|e| e.to_string())?;
    }
    for (column, format) in number_formats {
        if !formulas.contains_key(column) {
            return Err(format!("number format for {} has no formula", column));
        }
        set.set_number_format(column, format.clone())
            .map_err(|e| e.to_string())?;
    }
    Ok(set)
}

//! Keyed CSV store for model results.
//!
//! A run writes its result rows once under a [`RunKey`] and later runs with the
//! same key read them back instead of recomputing. The file name is derived
//! from the key alone, so the same parameters always map to the same path.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::MrpResult;

/// Number of digest bytes kept in a key fingerprint.
const FINGERPRINT_BYTES: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunKey {
    parts: Vec<(String, String)>,
    fingerprint: Option<String>,
}

impl RunKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a labelled value to the readable part of the key.
    pub fn with(mut self, name: &str, value: impl Display) -> Self {
        self.parts.push((name.to_string(), value.to_string()));
        self
    }

    /// Fingerprints the full record the result depends on.
    ///
    /// Two records that differ anywhere produce different file names even when
    /// their labelled parts agree.
    pub fn with_fingerprint<T: Serialize>(mut self, record: &T) -> MrpResult<Self> {
        let bytes = serde_json::to_vec(record)?;
        let digest = Sha256::digest(&bytes);
        self.fingerprint = Some(hex::encode(&digest[..FINGERPRINT_BYTES]));
        Ok(self)
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn file_stem(&self) -> String {
        let mut stem = self
            .parts
            .iter()
            .map(|(name, value)| format!("{}-{}", sanitize(name), sanitize(value)))
            .collect::<Vec<_>>()
            .join("_");
        if let Some(fingerprint) = &self.fingerprint {
            if !stem.is_empty() {
                stem.push('_');
            }
            stem.push_str(fingerprint);
        }
        if stem.is_empty() {
            stem.push_str("result");
        }
        stem
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '+'
            }
        })
        .collect()
}

pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &RunKey) -> PathBuf {
        self.dir.join(format!("{}.csv", key.file_stem()))
    }

    pub fn contains(&self, key: &RunKey) -> bool {
        self.path_for(key).is_file()
    }

    pub fn save<T: Serialize>(&self, key: &RunKey, rows: &[T]) -> MrpResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let mut wtr = csv::Writer::from_path(&path)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "saved result rows");
        Ok(path)
    }

    /// Reads the rows stored under `key`, or `None` when nothing was saved yet.
    pub fn load<T: DeserializeOwned>(&self, key: &RunKey) -> MrpResult<Option<Vec<T>>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let mut rdr = csv::Reader::from_path(&path)?;
        let rows = rdr.deserialize().collect::<Result<Vec<T>, _>>()?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "loaded result rows");
        Ok(Some(rows))
    }
}

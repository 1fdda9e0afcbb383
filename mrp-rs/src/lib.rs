use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod error;
pub mod store;

pub use error::{MrpError, MrpResult};
pub use store::{ResultStore, RunKey};

pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: Option<I>,
    pub seed: Option<u64>,
    pub replicate: u64,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

impl Environment {
    pub fn from_json(data: Value) -> Self {
        let mut input_json = data
            .get("input")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let seed = input_json.remove("seed").and_then(|v| v.as_u64());

        let replicate = input_json
            .remove("replicate")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        let files = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(|f| f.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), PathBuf::from(s))))
                    .collect()
            })
            .unwrap_or_default();

        let output = data.get("output").cloned().unwrap_or(Value::Null);

        Self {
            input_json,
            input: None,
            seed,
            replicate,
            files,
            output,
        }
    }

    /// Parses a run record written as TOML (`[input]`, `[model.files]`, `[output]`).
    pub fn from_toml_str(raw: &str) -> MrpResult<Self> {
        let table: toml::Value = toml::from_str(raw)?;
        let data = serde_json::to_value(table)?;
        Ok(Self::from_json(data))
    }

    pub fn from_reader(mut reader: impl Read) -> MrpResult<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(MrpError::EmptyInput);
        }
        let data: Value = serde_json::from_str(&raw)?;
        Ok(Self::from_json(data))
    }

    pub fn from_stdin() -> MrpResult<Self> {
        Self::from_reader(io::stdin())
    }

    /// Reads a run record from a file: TOML when the extension is `.toml`,
    /// JSON otherwise.
    pub fn from_path(path: impl AsRef<Path>) -> MrpResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            Self::from_toml_str(&raw)
        } else {
            Self::from_reader(raw.as_bytes())
        }
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> MrpResult<Environment<I>> {
        let input_value = Value::Object(self.input_json.clone());
        let input = serde_json::from_value(input_value).map_err(MrpError::Input)?;
        Ok(Environment {
            input_json: self.input_json,
            input: Some(input),
            seed: self.seed,
            replicate: self.replicate,
            files: self.files,
            output: self.output,
        })
    }
}

impl<I: DeserializeOwned> Environment<I> {
    /// Loads the run record from the file named by the first argument, or
    /// from stdin when no argument is given.
    pub fn load() -> MrpResult<Self> {
        Self::load_from(std::env::args_os().nth(1))
    }

    pub fn load_from(path: Option<OsString>) -> MrpResult<Self> {
        let env = match path {
            Some(path) => Environment::from_path(path)?,
            None => Environment::from_stdin()?,
        };
        env.with_input_type::<I>()
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        // Check flat output
        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            if let Some(dir) = output.get("dir").and_then(|v| v.as_str()) {
                return Some(PathBuf::from(dir));
            }
            return None;
        }

        // Check profiled output, resolving the default profile
        if let Some(profiles) = output.get("profile").and_then(|v| v.as_object()) {
            let selected = profiles
                .get("default")
                .or_else(|| profiles.values().next());
            if let Some(profile) = selected {
                if profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
                    if let Some(dir) = profile.get("dir").and_then(|v| v.as_str()) {
                        return Some(PathBuf::from(dir));
                    }
                }
            }
        }

        None
    }

    /// Store for intermediate results. Uses the `results` model file when one
    /// is configured, otherwise a `results` directory under the output dir.
    pub fn result_store(&self) -> Option<ResultStore> {
        self.files
            .get("results")
            .cloned()
            .or_else(|| self.output_dir().map(|dir| dir.join("results")))
            .map(ResultStore::new)
    }

    pub fn write_csv(
        &self,
        filename: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> MrpResult<()> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            let file = fs::File::create(dir.join(filename))?;
            write_rows(file, headers, rows)
        } else {
            write_rows(io::stdout(), headers, rows)
        }
    }
}

fn write_rows<W: Write>(writer: W, headers: &[&str], rows: &[Vec<String>]) -> MrpResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

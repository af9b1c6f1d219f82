//! Describes allow-listed PHP functions: signature, literal defaults and
//! the exact source text of each declaration.

mod reflect;
mod source;
mod value;

use log::debug;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

pub use reflect::{FunctionDescriptor, ParamDescriptor, Registry};
pub use source::extract_source;
pub use value::DefaultValue;

use crate::config::Config;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub default: Option<DefaultValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub return_type: String,
    pub params: Vec<ParamRecord>,
    pub source: String,
}

impl From<&ParamDescriptor> for ParamRecord {
    fn from(param: &ParamDescriptor) -> Self {
        Self {
            name: param.name.clone(),
            typ: param.typ.clone(),
            default: param.default.clone(),
        }
    }
}

impl FunctionRecord {
    /// Reads the declaration back from disk; fails if the file is gone.
    pub fn describe(function: &FunctionDescriptor) -> Result<Self> {
        Ok(Self {
            name: function.name.clone(),
            return_type: function.return_type.clone(),
            params: function.params.iter().map(ParamRecord::from).collect(),
            source: extract_source(&function.file, function.body_line, function.end_line)?,
        })
    }
}

/// Records for every defined function whose name is allow-listed, in
/// declaration order. The first failure aborts the whole run.
pub fn build_catalog(config: &Config) -> Result<Vec<FunctionRecord>> {
    let registry = Registry::load(&config.sources)?;
    for name in &config.allow_list {
        if !registry.defined().iter().any(|f| &f.name == name) {
            debug!("{} is allow-listed but not defined", name);
        }
    }
    registry
        .defined()
        .iter()
        .filter(|f| config.allows(&f.name))
        .map(FunctionRecord::describe)
        .collect()
}

/// Pretty JSON with four-space indentation.
pub fn to_json(records: &[FunctionRecord]) -> Result<String> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    records.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fs, io, path::Path};
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::document::MAX_DESCRIPTION_LENGTH;

pub const DEFAULT_DESCRIPTION: &str = "Service VPC";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

/// Values handed to a template at render time.
///
/// `environment` is the only required key. Keys that are not recognised here
/// are kept in `extra` and exposed to text templates untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Parameters {
    #[validate(length(min = 1), custom = "validate_environment")]
    pub environment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 128))]
    pub stack_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_description")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Parameters {
    pub fn new(environment: &str) -> Self {
        return Self {
            environment: String::from(environment),
            stack_name: None,
            description: None,
            extra: Map::new(),
        };
    }

    pub fn stack_name(&self) -> String {
        return match &self.stack_name {
            Some(name) => name.clone(),
            None => format!("{}-VPC", self.environment),
        };
    }

    pub fn description(&self) -> String {
        return match &self.description {
            Some(description) => description.clone(),
            None => String::from(DEFAULT_DESCRIPTION),
        };
    }

    pub fn with_environment(mut self, environment: &str) -> Result<Self, Error> {
        self.environment = String::from(environment);
        check(&self)?;

        return Ok(self);
    }

    /// Rendering context for text templates: every key from the parameter file
    /// plus the resolved defaults.
    pub fn context(&self) -> Value {
        let mut context = self.extra.clone();
        context.insert(
            String::from("environment"),
            Value::String(self.environment.clone()),
        );
        context.insert(String::from("stack_name"), Value::String(self.stack_name()));
        context.insert(
            String::from("description"),
            Value::String(self.description()),
        );

        return Value::Object(context);
    }
}

pub fn parse(path: &Path) -> Result<Parameters, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let parameters: Parameters = match serde_json::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    check(&parameters)?;
    debug!(
        environment = %parameters.environment,
        extra_keys = parameters.extra.len(),
        "loaded parameters from {}",
        path.display()
    );

    return Ok(parameters);
}

fn check(parameters: &Parameters) -> Result<(), Error> {
    return match parameters.validate() {
        Ok(_) => Ok(()),
        Err(error) => Err(Error::ValidationError(error.to_string())),
    };
}

fn validate_environment(environment: &str) -> Result<(), ValidationError> {
    let valid = environment
        .chars()
        .all(|character| character.is_ascii_alphanumeric() || character == '-');
    if !valid {
        return Err(ValidationError::new(
            "The environment may only contain ASCII letters, digits and `-`",
        ));
    }

    return Ok(());
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.len() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::new(
            "The description may be at most 1024 bytes long",
        ));
    }

    return Ok(());
}

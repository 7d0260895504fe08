use minijinja::{path_loader, AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde::Deserialize;
use std::{fs, io, path::Path};
use tracing::{debug, info};

use crate::config::Parameters;
use crate::templates;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Template file {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Undefined template parameter: {0}")]
    UndefinedParameter(String),

    #[error("Template rendering failed: {0}")]
    RenderError(String),

    #[error("Template is missing the execute entry: {0}")]
    MissingEntryPoint(String),

    #[error("Unknown code template `{name}`, available templates: {available}")]
    UnknownTemplate { name: String, available: String },

    #[error("Code template `{name}` failed: {message}")]
    ExecutionError { name: String, message: String },

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

/// Contents of a `.cft` unit file.
#[derive(Debug, Deserialize)]
struct UnitFile {
    execute: Option<String>,
}

/// Renders a Jinja template. Includes, imports and macros are looked up
/// relative to the template's own directory and any undefined parameter is a
/// hard failure.
pub fn render_text(template_file: &Path, parameters: &Parameters) -> Result<String, Error> {
    let directory = match template_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let file_name = match template_file.file_name().and_then(|name| name.to_str()) {
        Some(name) => name,
        None => {
            return Err(Error::FileNotFound(
                template_file.display().to_string(),
            ))
        }
    };

    let mut env = Environment::new();
    env.set_loader(path_loader(&directory));
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);

    debug!("rendering {} from {}", file_name, directory.display());
    let rendered = env
        .get_template(file_name)
        .and_then(|template| template.render(parameters.context()));

    return match rendered {
        Ok(text) => Ok(text),
        Err(error) => Err(match error.kind() {
            ErrorKind::UndefinedError => Error::UndefinedParameter(error.to_string()),
            ErrorKind::TemplateNotFound => Error::FileNotFound(error.to_string()),
            _ => Error::RenderError(error.to_string()),
        }),
    };
}

/// Runs the registered code template named by a `.cft` unit file.
pub fn render_code(unit_file: &Path, parameters: &Parameters) -> Result<String, Error> {
    let contents = match fs::read_to_string(unit_file) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(unit_file.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let unit: UnitFile = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    let name = match unit.execute {
        Some(name) => name,
        None => return Err(Error::MissingEntryPoint(unit_file.display().to_string())),
    };

    let template = match templates::find(&name) {
        Some(template) => template,
        None => {
            return Err(Error::UnknownTemplate {
                name,
                available: templates::names().join(", "),
            })
        }
    };

    info!("executing code template {}", template.name());
    return match template.execute(parameters) {
        Ok(json) => Ok(json),
        Err(error) => Err(Error::ExecutionError {
            name,
            message: error.to_string(),
        }),
    };
}

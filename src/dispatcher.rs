use std::path::{Path, PathBuf};
use tracing::info;

use crate::compare::{self, Verdict};
use crate::config::{self, Parameters};
use crate::render;
use crate::writer;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Template file {0} not found")]
    TemplateNotFound(String),

    #[error("Unrecognised file extension `{0}`. Only .j2 and .cft are supported")]
    UnrecognizedExtension(String),

    #[error(transparent)]
    Parameters(#[from] config::Error),

    #[error(transparent)]
    Render(#[from] render::Error),

    #[error(transparent)]
    Write(#[from] writer::Error),

    #[error(transparent)]
    Compare(#[from] compare::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Jinja text template
    Text,
    /// `.cft` unit naming a compiled code template
    Code,
}

impl Mode {
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or("");

        match extension {
            "j2" => Ok(Mode::Text),
            "cft" => Ok(Mode::Code),
            other => Err(Error::UnrecognizedExtension(String::from(other))),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Mode::Text => "Jinja2",
            Mode::Code => "Code",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub template: PathBuf,
    pub outfile: PathBuf,
    pub paramfile: PathBuf,
    pub compare_file: Option<PathBuf>,
    pub environment: Option<String>,
}

/// Loads the parameters, renders the template, writes the document and, when
/// asked to, compares the written document with a reference file.
pub fn run(options: &Options) -> Result<Option<Verdict>, Error> {
    println!("CloudFormation Templating - cftest");
    println!("----------------------------------");
    println!("Template File: {}", options.template.display());
    println!("Writing Config: {}", options.outfile.display());

    let mut parameters = config::parse(&options.paramfile)?;
    if let Some(environment) = &options.environment {
        parameters = parameters.with_environment(environment)?;
    }
    println!("Environment: {}", parameters.environment);

    let document = render_template(&options.template, &parameters)?;

    println!("Writing Configuration...");
    writer::write(&options.outfile, &document)?;
    println!("Done...");

    let compare_file = match &options.compare_file {
        Some(compare_file) => compare_file,
        None => return Ok(None),
    };
    let verdict = compare::compare(&options.outfile, compare_file)?;
    println!("Comparison: {}", verdict);

    return Ok(Some(verdict));
}

pub fn render_template(template: &Path, parameters: &Parameters) -> Result<String, Error> {
    if !template.is_file() {
        return Err(Error::TemplateNotFound(template.display().to_string()));
    }

    let mode = Mode::from_path(template)?;
    println!("Template Format: {}", mode.label());
    info!(mode = ?mode, "rendering {}", template.display());

    let document = match mode {
        Mode::Text => render::render_text(template, parameters)?,
        Mode::Code => render::render_code(template, parameters)?,
    };

    return Ok(document);
}

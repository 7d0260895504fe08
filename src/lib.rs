//! Renders AWS CloudFormation JSON documents from Jinja text templates or
//! compiled code templates and optionally compares the result with a
//! reference document.

pub mod compare;
pub mod config;
pub mod dispatcher;
pub mod document;
pub mod render;
pub mod templates;
pub mod writer;

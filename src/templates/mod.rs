use crate::config::Parameters;
use crate::document;

pub mod service_vpc;

/// A template whose document is assembled in code rather than rendered from
/// text. Registered templates are selected by name from a `.cft` unit file.
pub trait CodeTemplate: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, parameters: &Parameters) -> Result<String, document::Error>;
}

static REGISTRY: &[&dyn CodeTemplate] = &[&service_vpc::ServiceVpcTemplate];

pub fn find(name: &str) -> Option<&'static dyn CodeTemplate> {
    return REGISTRY
        .iter()
        .find(|template| template.name() == name)
        .copied();
}

pub fn names() -> Vec<&'static str> {
    return REGISTRY.iter().map(|template| template.name()).collect();
}

//! In-process CloudFormation document builder.
//!
//! Resources and outputs are declared in order; every `Ref` and `DependsOn`
//! target has to name a resource that was declared before it (or an `AWS::`
//! pseudo parameter). Serialization sorts keys and indents with four spaces.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{json, Map, Value};

pub const MAX_RESOURCES: usize = 500;
pub const MAX_OUTPUTS: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 1024;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Invalid logical name `{0}`: only ASCII letters and digits are allowed")]
    InvalidName(String),

    #[error("Duplicate {kind} name `{name}`")]
    Duplicate { kind: &'static str, name: String },

    #[error("Reference to undeclared resource `{0}`")]
    UnresolvedReference(String),

    #[error("Template exceeds the maximum of {max} {kind}")]
    LimitExceeded { kind: &'static str, max: usize },

    #[error("Description is longer than {0} bytes")]
    DescriptionTooLong(usize),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// `{"Ref": "<name>"}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref(String);

impl Ref {
    pub fn new(name: &str) -> Self {
        return Self(String::from(name));
    }

    pub fn name(&self) -> &str {
        return &self.0;
    }
}

impl From<Ref> for Value {
    fn from(reference: Ref) -> Self {
        return json!({ "Ref": reference.0 });
    }
}

impl From<&Ref> for Value {
    fn from(reference: &Ref) -> Self {
        return json!({ "Ref": reference.0 });
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.0.insert(String::from(key), String::from(value));
        return self;
    }
}

impl From<Tags> for Value {
    fn from(tags: Tags) -> Self {
        let entries = tags
            .0
            .into_iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect();

        return Value::Array(entries);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(skip)]
    name: String,

    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,

    #[serde(rename = "Properties", skip_serializing_if = "Map::is_empty")]
    properties: Map<String, Value>,

    #[serde(rename = "Type")]
    kind: String,
}

impl Resource {
    pub fn new(name: &str, kind: &str) -> Self {
        return Self {
            name: String::from(name),
            depends_on: Vec::new(),
            properties: Map::new(),
            kind: String::from(kind),
        };
    }

    pub fn property<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.properties.insert(String::from(key), value.into());
        return self;
    }

    pub fn tags(self, tags: Tags) -> Self {
        return self.property("Tags", tags);
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.depends_on.push(String::from(name));
        return self;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Export {
    #[serde(rename = "Name")]
    name: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    #[serde(skip)]
    name: String,

    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(rename = "Export", skip_serializing_if = "Option::is_none")]
    export: Option<Export>,

    #[serde(rename = "Value")]
    value: Value,
}

impl Output {
    pub fn new<V: Into<Value>>(name: &str, value: V) -> Self {
        return Self {
            name: String::from(name),
            description: None,
            export: None,
            value: value.into(),
        };
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(String::from(description));
        return self;
    }

    pub fn export<V: Into<Value>>(mut self, name: V) -> Self {
        self.export = Some(Export { name: name.into() });
        return self;
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Template {
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(rename = "Metadata", skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,

    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, Output>,

    #[serde(rename = "Resources")]
    resources: BTreeMap<String, Resource>,
}

impl Template {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn add_description(&mut self, description: &str) -> Result<(), Error> {
        if description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(Error::DescriptionTooLong(MAX_DESCRIPTION_LENGTH));
        }
        self.description = Some(String::from(description));

        return Ok(());
    }

    pub fn add_metadata<V: Serialize>(&mut self, metadata: &V) -> Result<(), Error> {
        let value = match serde_json::to_value(metadata) {
            Ok(value) => value,
            Err(error) => return Err(Error::SerializationError(error.to_string())),
        };
        match value {
            Value::Object(entries) => self.metadata.extend(entries),
            other => {
                return Err(Error::SerializationError(format!(
                    "metadata must be a JSON object, got `{}`",
                    other
                )))
            }
        }

        return Ok(());
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<Ref, Error> {
        validate_name(&resource.name)?;
        if self.resources.contains_key(&resource.name) {
            return Err(Error::Duplicate {
                kind: "resource",
                name: resource.name,
            });
        }
        if self.resources.len() >= MAX_RESOURCES {
            return Err(Error::LimitExceeded {
                kind: "resources",
                max: MAX_RESOURCES,
            });
        }

        for target in &resource.depends_on {
            self.resolve(target)?;
        }
        let mut references = BTreeSet::new();
        for value in resource.properties.values() {
            collect_references(value, &mut references);
        }
        for target in &references {
            self.resolve(target)?;
        }

        let reference = Ref::new(&resource.name);
        self.resources.insert(resource.name.clone(), resource);

        return Ok(reference);
    }

    pub fn add_output(&mut self, output: Output) -> Result<(), Error> {
        validate_name(&output.name)?;
        if self.outputs.contains_key(&output.name) {
            return Err(Error::Duplicate {
                kind: "output",
                name: output.name,
            });
        }
        if self.outputs.len() >= MAX_OUTPUTS {
            return Err(Error::LimitExceeded {
                kind: "outputs",
                max: MAX_OUTPUTS,
            });
        }

        let mut references = BTreeSet::new();
        collect_references(&output.value, &mut references);
        for target in &references {
            self.resolve(target)?;
        }

        self.outputs.insert(output.name.clone(), output);

        return Ok(());
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        return match serde_json::to_value(self) {
            Ok(value) => Ok(value),
            Err(error) => Err(Error::SerializationError(error.to_string())),
        };
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        if let Err(error) = self.serialize(&mut serializer) {
            return Err(Error::SerializationError(error.to_string()));
        }

        return match String::from_utf8(buffer) {
            Ok(json) => Ok(json),
            Err(error) => Err(Error::SerializationError(error.to_string())),
        };
    }

    fn resolve(&self, target: &str) -> Result<(), Error> {
        if target.starts_with("AWS::") || self.resources.contains_key(target) {
            return Ok(());
        }

        return Err(Error::UnresolvedReference(String::from(target)));
    }
}

fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || !name.chars().all(|character| character.is_ascii_alphanumeric()) {
        return Err(Error::InvalidName(String::from(name)));
    }

    return Ok(());
}

fn collect_references(value: &Value, references: &mut BTreeSet<String>) {
    match value {
        Value::Object(entries) => {
            if entries.len() == 1 {
                if let Some(Value::String(target)) = entries.get("Ref") {
                    references.insert(target.clone());
                    return;
                }
            }
            for nested in entries.values() {
                collect_references(nested, references);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, references);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Output, Ref, Resource, Tags, Template};
    use serde_json::json;

    #[test]
    fn serializes_resources_and_outputs() {
        let mut template = Template::new();
        template.add_description("Queue stack").unwrap();
        let queue = template
            .add_resource(
                Resource::new("Queue", "AWS::SQS::Queue")
                    .property("DelaySeconds", 5)
                    .tags(Tags::new().tag("Name", "queue").tag("Environment", "test")),
            )
            .unwrap();
        template
            .add_output(Output::new("QueueUrl", &queue).description("Queue URL"))
            .unwrap();

        assert_eq!(
            json!({
                "Description": "Queue stack",
                "Resources": {
                    "Queue": {
                        "Type": "AWS::SQS::Queue",
                        "Properties": {
                            "DelaySeconds": 5,
                            "Tags": [
                                { "Key": "Environment", "Value": "test" },
                                { "Key": "Name", "Value": "queue" }
                            ]
                        }
                    }
                },
                "Outputs": {
                    "QueueUrl": { "Description": "Queue URL", "Value": { "Ref": "Queue" } }
                }
            }),
            template.to_value().unwrap()
        );
    }

    #[test]
    fn json_is_sorted_and_indented_with_four_spaces() {
        let mut template = Template::new();
        template
            .add_resource(Resource::new("Topic", "AWS::SNS::Topic"))
            .unwrap();
        template.add_description("Topics").unwrap();

        let expected = "{\n    \"Description\": \"Topics\",\n    \"Resources\": {\n        \"Topic\": {\n            \"Type\": \"AWS::SNS::Topic\"\n        }\n    }\n}";
        assert_eq!(expected, template.to_json().unwrap());
    }

    #[test]
    fn rejects_invalid_and_duplicate_names() {
        let mut template = Template::new();

        let result = template.add_resource(Resource::new("my-bucket", "AWS::S3::Bucket"));
        assert_eq!(Err(Error::InvalidName(String::from("my-bucket"))), result);

        template
            .add_resource(Resource::new("Bucket", "AWS::S3::Bucket"))
            .unwrap();
        let result = template.add_resource(Resource::new("Bucket", "AWS::S3::Bucket"));
        assert_eq!(
            Err(Error::Duplicate {
                kind: "resource",
                name: String::from("Bucket")
            }),
            result
        );
    }

    #[test]
    fn rejects_references_to_undeclared_resources() {
        let mut template = Template::new();

        let result = template.add_resource(
            Resource::new("Attachment", "AWS::EC2::VPCGatewayAttachment")
                .property("VpcId", Ref::new("VPC")),
        );
        assert_eq!(
            Err(Error::UnresolvedReference(String::from("VPC"))),
            result
        );

        let result = template.add_resource(
            Resource::new("Bucket", "AWS::S3::Bucket").depends_on("Role"),
        );
        assert_eq!(
            Err(Error::UnresolvedReference(String::from("Role"))),
            result
        );

        let result = template.add_output(Output::new("VPCID", Ref::new("VPC")));
        assert_eq!(
            Err(Error::UnresolvedReference(String::from("VPC"))),
            result
        );
    }

    #[test]
    fn accepts_pseudo_parameters_and_nested_references() {
        let mut template = Template::new();
        let vpc = template
            .add_resource(Resource::new("VPC", "AWS::EC2::VPC"))
            .unwrap();

        template
            .add_resource(
                Resource::new("Subnet", "AWS::EC2::Subnet")
                    .property("VpcId", &vpc)
                    .property(
                        "AvailabilityZone",
                        json!({ "Fn::Select": [0, { "Fn::GetAZs": { "Ref": "AWS::Region" } }] }),
                    )
                    .depends_on("VPC"),
            )
            .unwrap();

        let document = template.to_value().unwrap();
        assert_eq!(json!(["VPC"]), document["Resources"]["Subnet"]["DependsOn"]);
        assert_eq!(
            json!({ "Ref": "VPC" }),
            document["Resources"]["Subnet"]["Properties"]["VpcId"]
        );
    }

    #[test]
    fn metadata_must_be_an_object() {
        let mut template = Template::new();

        template
            .add_metadata(&json!({ "Environment": "test" }))
            .unwrap();
        match template.add_metadata(&json!(["not", "an", "object"])) {
            Err(Error::SerializationError(_)) => {}
            _ => panic!("Expected `SerializationError` error"),
        }
    }

    #[test]
    fn enforces_resource_limit() {
        let mut template = Template::new();
        for index in 0..super::MAX_RESOURCES {
            template
                .add_resource(Resource::new(&format!("Topic{}", index), "AWS::SNS::Topic"))
                .unwrap();
        }

        let result = template.add_resource(Resource::new("OneTooMany", "AWS::SNS::Topic"));
        assert_eq!(
            Err(Error::LimitExceeded {
                kind: "resources",
                max: super::MAX_RESOURCES
            }),
            result
        );
    }

    #[test]
    fn enforces_output_limit() {
        let mut template = Template::new();
        let topic = template
            .add_resource(Resource::new("Topic", "AWS::SNS::Topic"))
            .unwrap();
        for index in 0..super::MAX_OUTPUTS {
            template
                .add_output(Output::new(&format!("TopicArn{}", index), &topic))
                .unwrap();
        }

        let result = template.add_output(Output::new("OneTooMany", &topic));
        assert_eq!(
            Err(Error::LimitExceeded {
                kind: "outputs",
                max: super::MAX_OUTPUTS
            }),
            result
        );
    }

    #[test]
    fn rejects_description_over_the_byte_limit() {
        let mut template = Template::new();

        template
            .add_description(&"a".repeat(super::MAX_DESCRIPTION_LENGTH))
            .unwrap();
        let result = template.add_description(&"é".repeat(600));
        assert_eq!(
            Err(Error::DescriptionTooLong(super::MAX_DESCRIPTION_LENGTH)),
            result
        );
    }

    #[test]
    fn serializes_output_exports() {
        let mut template = Template::new();
        let vpc = template
            .add_resource(Resource::new("VPC", "AWS::EC2::VPC"))
            .unwrap();
        template
            .add_output(
                Output::new("VPCID", &vpc)
                    .export(json!({ "Fn::Sub": "${AWS::StackName}-VPCID" })),
            )
            .unwrap();

        assert_eq!(
            json!({
                "Value": { "Ref": "VPC" },
                "Export": { "Name": { "Fn::Sub": "${AWS::StackName}-VPCID" } }
            }),
            template.to_value().unwrap()["Outputs"]["VPCID"]
        );
    }
}

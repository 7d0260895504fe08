//! Service VPC: a network with an internet gateway and a network ACL that lets
//! HTTPS in and TCP out.
//!
//! Required parameters:
//!
//! - `environment`: name of the environment the configuration targets. It
//!   prefixes every `Name` tag and the default stack name.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::CodeTemplate;
use crate::config::Parameters;
use crate::document::{Error, Output, Ref, Resource, Tags, Template};

pub const VPC_CIDR_BLOCK: &str = "10.0.0.0/16";
const ANYWHERE: &str = "0.0.0.0/0";
const TCP: &str = "6";

pub struct ServiceVpcTemplate;

impl CodeTemplate for ServiceVpcTemplate {
    fn name(&self) -> &'static str {
        return "service-vpc";
    }

    fn execute(&self, parameters: &Parameters) -> Result<String, Error> {
        let stack = ServiceVpc::new(parameters)?;
        return stack.template.to_json();
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StackMetadata {
    depends_on: Vec<String>,
    environment: String,
    stack_name: String,
}

struct ServiceVpc {
    template: Template,
    environment: String,
    declared: Vec<String>,
}

impl ServiceVpc {
    fn new(parameters: &Parameters) -> Result<Self, Error> {
        let mut stack = Self {
            template: Template::new(),
            environment: parameters.environment.clone(),
            declared: Vec::new(),
        };

        let metadata = StackMetadata {
            depends_on: Vec::new(),
            environment: stack.environment.clone(),
            stack_name: parameters.stack_name(),
        };
        stack.template.add_description(&parameters.description())?;
        stack.template.add_metadata(&metadata)?;

        let vpc = stack.add_vpc("VPC", "ServiceVPC")?;
        let gateway = stack.add_internet_gateway("InternetGateway", "InternetGateway")?;
        stack.add_gateway_attachment("VpcGatewayAttachment", &gateway, &vpc)?;

        stack.template.add_output(Output::new("VPCID", &vpc))?;
        stack
            .template
            .add_output(Output::new("InternetGateway", &gateway))?;

        let acl = stack.add_network_acl("VpcNetworkAcl", &vpc, "NetworkAcl")?;
        stack.add_inbound_rule("VpcNetworkAclInboundRule", &acl)?;
        stack.add_outbound_rule("VpcNetworkAclOutboundRule", &acl)?;

        debug!(
            environment = %stack.environment,
            resources = ?stack.declared,
            "assembled service VPC"
        );

        return Ok(stack);
    }

    fn tags(&self, tag_name: &str) -> Tags {
        return Tags::new()
            .tag("Environment", &self.environment)
            .tag("Name", &format!("{}-{}", self.environment, tag_name));
    }

    fn declare(&mut self, resource: Resource) -> Result<Ref, Error> {
        let reference = self.template.add_resource(resource)?;
        self.declared.push(String::from(reference.name()));

        return Ok(reference);
    }

    fn add_vpc(&mut self, name: &str, tag_name: &str) -> Result<Ref, Error> {
        let vpc = Resource::new(name, "AWS::EC2::VPC")
            .property("CidrBlock", VPC_CIDR_BLOCK)
            .property("EnableDnsHostnames", true)
            .property("EnableDnsSupport", true)
            .property("InstanceTenancy", "default")
            .tags(self.tags(tag_name));

        return self.declare(vpc);
    }

    fn add_internet_gateway(&mut self, name: &str, tag_name: &str) -> Result<Ref, Error> {
        let gateway = Resource::new(name, "AWS::EC2::InternetGateway").tags(self.tags(tag_name));

        return self.declare(gateway);
    }

    fn add_gateway_attachment(&mut self, name: &str, gateway: &Ref, vpc: &Ref) -> Result<Ref, Error> {
        let attachment = Resource::new(name, "AWS::EC2::VPCGatewayAttachment")
            .property("InternetGatewayId", gateway)
            .property("VpcId", vpc);

        return self.declare(attachment);
    }

    fn add_network_acl(&mut self, name: &str, vpc: &Ref, tag_name: &str) -> Result<Ref, Error> {
        let acl = Resource::new(name, "AWS::EC2::NetworkAcl")
            .property("VpcId", vpc)
            .tags(self.tags(tag_name));

        return self.declare(acl);
    }

    fn add_inbound_rule(&mut self, name: &str, acl: &Ref) -> Result<Ref, Error> {
        let rule = Resource::new(name, "AWS::EC2::NetworkAclEntry")
            .property("CidrBlock", ANYWHERE)
            .property("Egress", false)
            .property("NetworkAclId", acl)
            .property("PortRange", json!({ "From": "443", "To": "443" }))
            .property("Protocol", TCP)
            .property("RuleAction", "allow")
            .property("RuleNumber", 100);

        return self.declare(rule);
    }

    fn add_outbound_rule(&mut self, name: &str, acl: &Ref) -> Result<Ref, Error> {
        let rule = Resource::new(name, "AWS::EC2::NetworkAclEntry")
            .property("CidrBlock", ANYWHERE)
            .property("Egress", true)
            .property("NetworkAclId", acl)
            .property("Protocol", TCP)
            .property("RuleAction", "allow")
            .property("RuleNumber", 200);

        return self.declare(rule);
    }
}

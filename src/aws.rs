mod aws_sdk;

use crate::error::Error;
use crate::paginate::Page;
use crate::template::TemplateSource;
use crate::waiter::OperationKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub(crate) type AwsResult<T> = Result<T, Error>;

/// Trait representing interactions with CloudFormation
#[async_trait::async_trait]
pub(crate) trait AwsCloudFormationClient: Send + Sync {
    async fn list_stacks(&self, input: ListStacksInput) -> AwsResult<Page<StackSummary>>;

    async fn describe_stacks(&self, input: DescribeStacksInput) -> AwsResult<Page<Stack>>;

    async fn create_stack(&self, input: StackInput) -> AwsResult<StackId>;

    async fn update_stack(&self, input: StackInput) -> AwsResult<StackId>;

    async fn delete_stack(&self, input: DeleteStackInput) -> AwsResult<()>;

    async fn validate_template(&self, template: TemplateSource) -> AwsResult<TemplateSummary>;

    async fn describe_stack_events(
        &self,
        input: DescribeStackEventsInput,
    ) -> AwsResult<Page<StackEvent>>;

    async fn describe_stack_resources(&self, stack_name: String)
        -> AwsResult<Vec<StackResource>>;

    async fn detect_stack_drift(&self, input: DetectStackDriftInput) -> AwsResult<String>;

    async fn describe_stack_resource_drifts(
        &self,
        input: DescribeStackResourceDriftsInput,
    ) -> AwsResult<Page<StackResourceDrift>>;

    async fn describe_stack_drift_detection_status(
        &self,
        detection_id: String,
    ) -> AwsResult<DriftDetectionStatus>;

    /// Block until the stack reaches the terminal state for `kind`, or fail
    /// if it reaches a failure state or `max_wait` elapses.
    async fn wait_until_complete(
        &self,
        stack_name: String,
        kind: OperationKind,
        max_wait: Duration,
    ) -> AwsResult<()>;
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ListStacksInput {
    pub(crate) next_token: Option<String>,
    pub(crate) status_filter: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct DescribeStacksInput {
    pub(crate) stack_name: Option<String>,
    pub(crate) next_token: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct DescribeStackEventsInput {
    pub(crate) stack_name: String,
    pub(crate) next_token: Option<String>,
}

/// Shared shape of the create and update calls.
#[derive(Debug, Clone)]
pub(crate) struct StackInput {
    pub(crate) stack_name: String,
    pub(crate) template: TemplateSource,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) tags: Vec<Tag>,
    pub(crate) capabilities: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct DeleteStackInput {
    pub(crate) stack_name: String,
    pub(crate) retain_resources: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct DetectStackDriftInput {
    pub(crate) stack_name: String,
    pub(crate) logical_resource_ids: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct DescribeStackResourceDriftsInput {
    pub(crate) stack_name: String,
    pub(crate) status_filter: Vec<String>,
    pub(crate) next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub(crate) struct Parameter {
    pub(crate) key: String,
    pub(crate) value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub(crate) struct Tag {
    pub(crate) key: String,
    pub(crate) value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct StackId {
    pub(crate) stack_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StackSummary {
    pub(crate) stack_id: Option<String>,
    pub(crate) stack_name: String,
    pub(crate) stack_status: String,
    pub(crate) stack_status_reason: Option<String>,
    pub(crate) creation_time: DateTime<Utc>,
    pub(crate) last_updated_time: Option<DateTime<Utc>>,
    pub(crate) drift_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Output {
    pub(crate) key: Option<String>,
    pub(crate) value: Option<String>,
    pub(crate) description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Stack {
    pub(crate) stack_id: Option<String>,
    pub(crate) stack_name: String,
    pub(crate) description: Option<String>,
    pub(crate) stack_status: String,
    pub(crate) stack_status_reason: Option<String>,
    pub(crate) creation_time: DateTime<Utc>,
    pub(crate) last_updated_time: Option<DateTime<Utc>>,
    pub(crate) parameters: BTreeMap<String, String>,
    pub(crate) tags: BTreeMap<String, String>,
    pub(crate) outputs: Vec<Output>,
    pub(crate) capabilities: Vec<String>,
    pub(crate) drift_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StackEvent {
    pub(crate) event_id: String,
    pub(crate) stack_name: String,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) logical_resource_id: Option<String>,
    pub(crate) physical_resource_id: Option<String>,
    pub(crate) resource_type: Option<String>,
    pub(crate) resource_status: Option<String>,
    pub(crate) resource_status_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StackResource {
    pub(crate) logical_resource_id: String,
    pub(crate) physical_resource_id: Option<String>,
    pub(crate) resource_type: String,
    pub(crate) resource_status: String,
    pub(crate) resource_status_reason: Option<String>,
    pub(crate) timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PropertyDifference {
    pub(crate) property_path: String,
    pub(crate) expected_value: String,
    pub(crate) actual_value: String,
    pub(crate) difference_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StackResourceDrift {
    pub(crate) logical_resource_id: String,
    pub(crate) physical_resource_id: Option<String>,
    pub(crate) resource_type: String,
    pub(crate) drift_status: String,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) property_differences: Vec<PropertyDifference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DriftDetectionStatus {
    pub(crate) detection_id: String,
    pub(crate) stack_id: String,
    pub(crate) stack_drift_status: Option<String>,
    pub(crate) detection_status: String,
    pub(crate) detection_status_reason: Option<String>,
    pub(crate) drifted_stack_resource_count: Option<i32>,
    pub(crate) timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TemplateParameter {
    pub(crate) key: Option<String>,
    pub(crate) default_value: Option<String>,
    pub(crate) no_echo: Option<bool>,
    pub(crate) description: Option<String>,
}

/// Result of validating a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct TemplateSummary {
    pub(crate) description: Option<String>,
    pub(crate) capabilities: Vec<String>,
    pub(crate) capabilities_reason: Option<String>,
    pub(crate) parameters: Vec<TemplateParameter>,
}

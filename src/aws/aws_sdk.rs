use super::{
    AwsCloudFormationClient, AwsResult, DeleteStackInput, DescribeStackEventsInput,
    DescribeStackResourceDriftsInput, DescribeStacksInput, DetectStackDriftInput,
    DriftDetectionStatus, ListStacksInput, Output, PropertyDifference, Stack, StackEvent, StackId,
    StackInput, StackResource, StackResourceDrift, StackSummary, TemplateParameter,
    TemplateSummary,
};
use crate::error::Error;
use crate::paginate::Page;
use crate::template::TemplateSource;
use crate::waiter::OperationKind;

use aws_sdk_cloudformation::client::Waiters;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types as cfn;
use aws_sdk_cloudformation::Client;
use aws_smithy_types_convert::date_time::DateTimeExt;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Classify an SDK failure. Service errors keep their error code so the
/// validation class can be told apart, everything else is a transport error.
fn sdk_error<E, R>(name: &'static str, e: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let err = match &e {
        SdkError::ServiceError(service) => {
            let inner = service.err();
            let message = inner
                .message()
                .map(str::to_owned)
                .unwrap_or_else(|| DisplayErrorContext(inner).to_string());
            Error::from_service(inner.code(), message)
        }
        _ => Error::Transport(DisplayErrorContext(&e).to_string()),
    };
    tracing::debug!(%name, err = %err, "request failed");
    err
}

fn wait_error<E>(e: E) -> Error
where
    E: std::error::Error + 'static,
{
    Error::Wait(DisplayErrorContext(&e).to_string())
}

fn to_utc(field: &'static str, dt: &aws_smithy_types::DateTime) -> AwsResult<DateTime<Utc>> {
    dt.to_chrono_utc().map_err(|_| Error::UnexpectedValue {
        field,
        value: format!("{:?}", dt),
    })
}

fn required<'a, T: ?Sized>(field: &'static str, value: Option<&'a T>) -> AwsResult<&'a T> {
    value.ok_or_else(|| Error::UnexpectedValue {
        field,
        value: "missing".to_string(),
    })
}

fn to_utc_opt(
    field: &'static str,
    dt: Option<&aws_smithy_types::DateTime>,
) -> AwsResult<Option<DateTime<Utc>>> {
    dt.map(|dt| to_utc(field, dt)).transpose()
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

#[async_trait::async_trait]
impl AwsCloudFormationClient for Client {
    async fn list_stacks(&self, input: ListStacksInput) -> AwsResult<Page<StackSummary>> {
        let filter = non_empty(&input.status_filter)
            .map(|statuses| statuses.iter().map(|s| cfn::StackStatus::from(s.as_str())).collect());
        let output = Client::list_stacks(self)
            .set_next_token(input.next_token)
            .set_stack_status_filter(filter)
            .send()
            .await
            .map_err(|e| sdk_error("list_stacks", e))?;

        let items = output
            .stack_summaries()
            .iter()
            .map(convert_summary)
            .collect::<AwsResult<Vec<_>>>()?;
        Ok(Page::new(items, output.next_token().map(str::to_owned)))
    }

    async fn describe_stacks(&self, input: DescribeStacksInput) -> AwsResult<Page<Stack>> {
        let output = Client::describe_stacks(self)
            .set_stack_name(input.stack_name)
            .set_next_token(input.next_token)
            .send()
            .await
            .map_err(|e| sdk_error("describe_stacks", e))?;

        let items = output
            .stacks()
            .iter()
            .map(convert_stack)
            .collect::<AwsResult<Vec<_>>>()?;
        Ok(Page::new(items, output.next_token().map(str::to_owned)))
    }

    async fn create_stack(&self, input: StackInput) -> AwsResult<StackId> {
        let (body, url) = input.template.into_parts();
        let output = Client::create_stack(self)
            .stack_name(input.stack_name)
            .set_template_body(body)
            .set_template_url(url)
            .set_parameters(Some(convert_parameters(&input.parameters)))
            .set_tags(Some(convert_tags(&input.tags)))
            .set_capabilities(Some(convert_capabilities(&input.capabilities)))
            .send()
            .await
            .map_err(|e| sdk_error("create_stack", e))?;

        Ok(StackId {
            stack_id: output.stack_id().map(str::to_owned),
        })
    }

    async fn update_stack(&self, input: StackInput) -> AwsResult<StackId> {
        let (body, url) = input.template.into_parts();
        let output = Client::update_stack(self)
            .stack_name(input.stack_name)
            .set_template_body(body)
            .set_template_url(url)
            .set_parameters(Some(convert_parameters(&input.parameters)))
            .set_tags(Some(convert_tags(&input.tags)))
            .set_capabilities(Some(convert_capabilities(&input.capabilities)))
            .send()
            .await
            .map_err(|e| sdk_error("update_stack", e))?;

        Ok(StackId {
            stack_id: output.stack_id().map(str::to_owned),
        })
    }

    async fn delete_stack(&self, input: DeleteStackInput) -> AwsResult<()> {
        Client::delete_stack(self)
            .stack_name(input.stack_name)
            .set_retain_resources(non_empty(&input.retain_resources))
            .send()
            .await
            .map_err(|e| sdk_error("delete_stack", e))?;
        Ok(())
    }

    async fn validate_template(&self, template: TemplateSource) -> AwsResult<TemplateSummary> {
        let (body, url) = template.into_parts();
        let output = Client::validate_template(self)
            .set_template_body(body)
            .set_template_url(url)
            .send()
            .await
            .map_err(|e| sdk_error("validate_template", e))?;

        Ok(TemplateSummary {
            description: output.description().map(str::to_owned),
            capabilities: output
                .capabilities()
                .iter()
                .map(|c| c.as_str().to_owned())
                .collect(),
            capabilities_reason: output.capabilities_reason().map(str::to_owned),
            parameters: output
                .parameters()
                .iter()
                .map(|p| TemplateParameter {
                    key: p.parameter_key().map(str::to_owned),
                    default_value: p.default_value().map(str::to_owned),
                    no_echo: p.no_echo(),
                    description: p.description().map(str::to_owned),
                })
                .collect(),
        })
    }

    async fn describe_stack_events(
        &self,
        input: DescribeStackEventsInput,
    ) -> AwsResult<Page<StackEvent>> {
        let output = Client::describe_stack_events(self)
            .stack_name(input.stack_name)
            .set_next_token(input.next_token)
            .send()
            .await
            .map_err(|e| sdk_error("describe_stack_events", e))?;

        let items = output
            .stack_events()
            .iter()
            .map(convert_event)
            .collect::<AwsResult<Vec<_>>>()?;
        Ok(Page::new(items, output.next_token().map(str::to_owned)))
    }

    async fn describe_stack_resources(
        &self,
        stack_name: String,
    ) -> AwsResult<Vec<StackResource>> {
        let output = Client::describe_stack_resources(self)
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error("describe_stack_resources", e))?;

        output
            .stack_resources()
            .iter()
            .map(|r| {
                Ok(StackResource {
                    logical_resource_id: r.logical_resource_id().unwrap_or_default().to_owned(),
                    physical_resource_id: r.physical_resource_id().map(str::to_owned),
                    resource_type: r.resource_type().unwrap_or_default().to_owned(),
                    resource_status: r
                        .resource_status()
                        .map(|s| s.as_str().to_owned())
                        .unwrap_or_default(),
                    resource_status_reason: r.resource_status_reason().map(str::to_owned),
                    timestamp: to_utc("Timestamp", required("Timestamp", r.timestamp())?)?,
                })
            })
            .collect()
    }

    async fn detect_stack_drift(&self, input: DetectStackDriftInput) -> AwsResult<String> {
        let output = Client::detect_stack_drift(self)
            .stack_name(input.stack_name)
            .set_logical_resource_ids(non_empty(&input.logical_resource_ids))
            .send()
            .await
            .map_err(|e| sdk_error("detect_stack_drift", e))?;

        required("StackDriftDetectionId", output.stack_drift_detection_id()).map(str::to_owned)
    }

    async fn describe_stack_resource_drifts(
        &self,
        input: DescribeStackResourceDriftsInput,
    ) -> AwsResult<Page<StackResourceDrift>> {
        let filter = non_empty(&input.status_filter).map(|statuses| {
            statuses
                .iter()
                .map(|s| cfn::StackResourceDriftStatus::from(s.as_str()))
                .collect()
        });
        let output = Client::describe_stack_resource_drifts(self)
            .stack_name(input.stack_name)
            .set_stack_resource_drift_status_filters(filter)
            .set_next_token(input.next_token)
            .send()
            .await
            .map_err(|e| sdk_error("describe_stack_resource_drifts", e))?;

        let items = output
            .stack_resource_drifts()
            .iter()
            .map(convert_resource_drift)
            .collect::<AwsResult<Vec<_>>>()?;
        Ok(Page::new(items, output.next_token().map(str::to_owned)))
    }

    async fn describe_stack_drift_detection_status(
        &self,
        detection_id: String,
    ) -> AwsResult<DriftDetectionStatus> {
        let output = Client::describe_stack_drift_detection_status(self)
            .stack_drift_detection_id(detection_id)
            .send()
            .await
            .map_err(|e| sdk_error("describe_stack_drift_detection_status", e))?;

        Ok(DriftDetectionStatus {
            detection_id: output
                .stack_drift_detection_id()
                .unwrap_or_default()
                .to_owned(),
            stack_id: output.stack_id().unwrap_or_default().to_owned(),
            stack_drift_status: output.stack_drift_status().map(|s| s.as_str().to_owned()),
            detection_status: output
                .detection_status()
                .map(|s| s.as_str().to_owned())
                .unwrap_or_default(),
            detection_status_reason: output.detection_status_reason().map(str::to_owned),
            drifted_stack_resource_count: output.drifted_stack_resource_count(),
            timestamp: to_utc("Timestamp", required("Timestamp", output.timestamp())?)?,
        })
    }

    async fn wait_until_complete(
        &self,
        stack_name: String,
        kind: OperationKind,
        max_wait: Duration,
    ) -> AwsResult<()> {
        tracing::debug!(%stack_name, %kind, ?max_wait, "waiting for stack");
        match kind {
            OperationKind::Create => self
                .wait_until_stack_create_complete()
                .stack_name(stack_name)
                .wait(max_wait)
                .await
                .map(|_| ())
                .map_err(wait_error),
            OperationKind::Update => self
                .wait_until_stack_update_complete()
                .stack_name(stack_name)
                .wait(max_wait)
                .await
                .map(|_| ())
                .map_err(wait_error),
            OperationKind::Delete => self
                .wait_until_stack_delete_complete()
                .stack_name(stack_name)
                .wait(max_wait)
                .await
                .map(|_| ())
                .map_err(wait_error),
        }
    }
}

// conversions to and from third party types

fn convert_parameters(parameters: &[super::Parameter]) -> Vec<cfn::Parameter> {
    parameters
        .iter()
        .map(|p| {
            cfn::Parameter::builder()
                .parameter_key(&p.key)
                .parameter_value(&p.value)
                .build()
        })
        .collect()
}

fn convert_tags(tags: &[super::Tag]) -> Vec<cfn::Tag> {
    tags.iter()
        .map(|t| cfn::Tag::builder().key(&t.key).value(&t.value).build())
        .collect()
}

fn convert_capabilities(capabilities: &[String]) -> Vec<cfn::Capability> {
    capabilities
        .iter()
        .map(|c| cfn::Capability::from(c.as_str()))
        .collect()
}

fn status(s: Option<&cfn::StackStatus>) -> String {
    s.map(|s| s.as_str().to_owned()).unwrap_or_default()
}

fn convert_summary(s: &cfn::StackSummary) -> AwsResult<StackSummary> {
    Ok(StackSummary {
        stack_id: s.stack_id().map(str::to_owned),
        stack_name: s.stack_name().unwrap_or_default().to_owned(),
        stack_status: status(s.stack_status()),
        stack_status_reason: s.stack_status_reason().map(str::to_owned),
        creation_time: to_utc("CreationTime", required("CreationTime", s.creation_time())?)?,
        last_updated_time: to_utc_opt("LastUpdatedTime", s.last_updated_time())?,
        drift_status: s
            .drift_information()
            .and_then(|d| d.stack_drift_status())
            .map(|d| d.as_str().to_owned()),
    })
}

fn convert_stack(s: &cfn::Stack) -> AwsResult<Stack> {
    Ok(Stack {
        stack_id: s.stack_id().map(str::to_owned),
        stack_name: s.stack_name().unwrap_or_default().to_owned(),
        description: s.description().map(str::to_owned),
        stack_status: status(s.stack_status()),
        stack_status_reason: s.stack_status_reason().map(str::to_owned),
        creation_time: to_utc("CreationTime", required("CreationTime", s.creation_time())?)?,
        last_updated_time: to_utc_opt("LastUpdatedTime", s.last_updated_time())?,
        parameters: s
            .parameters()
            .iter()
            .filter_map(|p| {
                p.parameter_key().map(|k| {
                    (
                        k.to_owned(),
                        p.parameter_value().unwrap_or_default().to_owned(),
                    )
                })
            })
            .collect(),
        tags: s
            .tags()
            .iter()
            .filter_map(|t| {
                t.key()
                    .map(|k| (k.to_owned(), t.value().unwrap_or_default().to_owned()))
            })
            .collect(),
        outputs: s
            .outputs()
            .iter()
            .map(|o| Output {
                key: o.output_key().map(str::to_owned),
                value: o.output_value().map(str::to_owned),
                description: o.description().map(str::to_owned),
            })
            .collect(),
        capabilities: s
            .capabilities()
            .iter()
            .map(|c| c.as_str().to_owned())
            .collect(),
        drift_status: s
            .drift_information()
            .and_then(|d| d.stack_drift_status())
            .map(|d| d.as_str().to_owned()),
    })
}

fn convert_event(e: &cfn::StackEvent) -> AwsResult<StackEvent> {
    Ok(StackEvent {
        event_id: e.event_id().unwrap_or_default().to_owned(),
        stack_name: e.stack_name().unwrap_or_default().to_owned(),
        timestamp: to_utc("Timestamp", required("Timestamp", e.timestamp())?)?,
        logical_resource_id: e.logical_resource_id().map(str::to_owned),
        physical_resource_id: e.physical_resource_id().map(str::to_owned),
        resource_type: e.resource_type().map(str::to_owned),
        resource_status: e.resource_status().map(|s| s.as_str().to_owned()),
        resource_status_reason: e.resource_status_reason().map(str::to_owned),
    })
}

fn convert_resource_drift(d: &cfn::StackResourceDrift) -> AwsResult<StackResourceDrift> {
    Ok(StackResourceDrift {
        logical_resource_id: d.logical_resource_id().unwrap_or_default().to_owned(),
        physical_resource_id: d.physical_resource_id().map(str::to_owned),
        resource_type: d.resource_type().unwrap_or_default().to_owned(),
        drift_status: d
            .stack_resource_drift_status()
            .map(|s| s.as_str().to_owned())
            .unwrap_or_default(),
        timestamp: to_utc("Timestamp", required("Timestamp", d.timestamp())?)?,
        property_differences: d
            .property_differences()
            .iter()
            .map(|p| PropertyDifference {
                property_path: p.property_path().unwrap_or_default().to_owned(),
                expected_value: p.expected_value().unwrap_or_default().to_owned(),
                actual_value: p.actual_value().unwrap_or_default().to_owned(),
                difference_type: p
                    .difference_type()
                    .map(|t| t.as_str().to_owned())
                    .unwrap_or_default(),
            })
            .collect(),
    })
}

use crate::aws::{
    AwsCloudFormationClient, DeleteStackInput, DescribeStacksInput, ListStacksInput, Parameter,
    Stack, StackId, StackInput, StackResource, StackSummary, Tag,
};
use crate::error::Error;
use crate::paginate::{paginate, Listing};
use crate::template::validate_template;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tag stamped onto every stack created or updated through this tool.
pub(crate) const PROVENANCE_TAG_KEY: &str = "managed-by";
pub(crate) const PROVENANCE_TAG_VALUE: &str = env!("CARGO_PKG_NAME");

/// Stack operations against a CloudFormation client.
#[derive(Debug)]
pub(crate) struct StackManager<C> {
    client: Arc<C>,
}

pub(crate) fn tag_list(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

pub(crate) fn parameter_list(params: &BTreeMap<String, String>) -> Vec<Parameter> {
    params
        .iter()
        .map(|(key, value)| Parameter {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

fn with_provenance(mut tags: BTreeMap<String, String>) -> BTreeMap<String, String> {
    tags.insert(
        PROVENANCE_TAG_KEY.to_string(),
        PROVENANCE_TAG_VALUE.to_string(),
    );
    tags
}

fn require_name(stack_name: &str) -> Result<(), Error> {
    if stack_name.is_empty() {
        return Err(Error::InvalidInput("missing stack name".to_string()));
    }
    Ok(())
}

impl<C> StackManager<C>
where
    C: AwsCloudFormationClient,
{
    pub(crate) fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Stack summaries across all pages, optionally restricted to the given
    /// statuses.
    pub(crate) async fn list_stacks(&self, status_filter: &[String]) -> Listing<StackSummary> {
        paginate(|next_token| {
            let input = ListStacksInput {
                next_token,
                status_filter: status_filter.to_vec(),
            };
            self.client.list_stacks(input).boxed()
        })
        .await
    }

    /// Full descriptions of every stack, across all pages.
    pub(crate) async fn describe_stacks(&self) -> Listing<Stack> {
        paginate(|next_token| {
            let input = DescribeStacksInput {
                stack_name: None,
                next_token,
            };
            self.client.describe_stacks(input).boxed()
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub(crate) async fn describe_stack(&self, stack_name: &str) -> Result<Stack, Error> {
        require_name(stack_name)?;

        let input = DescribeStacksInput {
            stack_name: Some(stack_name.to_string()),
            next_token: None,
        };
        let page = self.client.describe_stacks(input).await?;
        page.items
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoStack(stack_name.to_string()))
    }

    /// Whether the stack can be described. Any failure counts as absent.
    pub(crate) async fn exists(&self, stack_name: &str) -> bool {
        match self.describe_stack(stack_name).await {
            Ok(_) => true,
            Err(e) if e.is_transport() => {
                tracing::debug!(%stack_name, err = %e, "stack not found");
                false
            }
            Err(e) => {
                tracing::debug!(%stack_name, err = %e, "stack lookup rejected");
                false
            }
        }
    }

    #[tracing::instrument(skip(self, params, tags, template_body))]
    pub(crate) async fn create_stack(
        &self,
        stack_name: &str,
        params: &BTreeMap<String, String>,
        tags: BTreeMap<String, String>,
        template_body: &str,
        template_url: &str,
    ) -> Result<StackId, Error> {
        let input = self
            .stack_input(stack_name, params, tags, template_body, template_url)
            .await?;
        let id = self.client.create_stack(input).await?;
        tracing::info!(stack_id = ?id.stack_id, "stack creation started");
        Ok(id)
    }

    /// Same shape as `create_stack`. Whether the stack exists is left to the
    /// server to decide.
    #[tracing::instrument(skip(self, params, tags, template_body))]
    pub(crate) async fn update_stack(
        &self,
        stack_name: &str,
        params: &BTreeMap<String, String>,
        tags: BTreeMap<String, String>,
        template_body: &str,
        template_url: &str,
    ) -> Result<StackId, Error> {
        let input = self
            .stack_input(stack_name, params, tags, template_body, template_url)
            .await?;
        let id = self.client.update_stack(input).await?;
        tracing::info!(stack_id = ?id.stack_id, "stack update started");
        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) async fn delete_stack(
        &self,
        stack_name: &str,
        retain_resources: &[String],
    ) -> Result<(), Error> {
        let input = DeleteStackInput {
            stack_name: stack_name.to_string(),
            retain_resources: retain_resources.to_vec(),
        };
        self.client.delete_stack(input).await?;
        tracing::info!("stack deletion started");
        Ok(())
    }

    pub(crate) async fn stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>, Error> {
        require_name(stack_name)?;
        self.client
            .describe_stack_resources(stack_name.to_string())
            .await
    }

    async fn stack_input(
        &self,
        stack_name: &str,
        params: &BTreeMap<String, String>,
        tags: BTreeMap<String, String>,
        template_body: &str,
        template_url: &str,
    ) -> Result<StackInput, Error> {
        require_name(stack_name)?;
        let validated = validate_template(self.client.as_ref(), template_body, template_url).await?;

        Ok(StackInput {
            stack_name: stack_name.to_string(),
            capabilities: validated.capabilities().to_vec(),
            template: validated.source,
            parameters: parameter_list(params),
            tags: tag_list(&with_provenance(tags)),
        })
    }
}

use crate::aws::{AwsCloudFormationClient, TemplateSummary};
use crate::error::Error;

/// Largest inline template body CloudFormation accepts, in bytes.
pub(crate) const MAX_TEMPLATE_BODY_BYTES: usize = 51_200;

/// Where a stack template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TemplateSource {
    Body(String),
    Url(String),
}

impl TemplateSource {
    /// Pick the template source, preferring an inline body over a URL.
    pub(crate) fn resolve(body: &str, url: &str) -> Result<Self, Error> {
        if !body.is_empty() {
            if body.len() > MAX_TEMPLATE_BODY_BYTES {
                return Err(Error::InvalidInput(format!(
                    "exceeded maximum template size of {} bytes",
                    MAX_TEMPLATE_BODY_BYTES
                )));
            }
            return Ok(TemplateSource::Body(body.to_string()));
        }

        if !url.is_empty() {
            return Ok(TemplateSource::Url(url.to_string()));
        }

        Err(Error::InvalidInput(
            "missing cloudformation template or template url".to_string(),
        ))
    }

    /// Split into the `(body, url)` pair the API expects.
    pub(crate) fn into_parts(self) -> (Option<String>, Option<String>) {
        match self {
            TemplateSource::Body(body) => (Some(body), None),
            TemplateSource::Url(url) => (None, Some(url)),
        }
    }
}

/// A template the server has accepted, with the capabilities it requires.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedTemplate {
    pub(crate) source: TemplateSource,
    pub(crate) summary: TemplateSummary,
}

impl ValidatedTemplate {
    pub(crate) fn capabilities(&self) -> &[String] {
        &self.summary.capabilities
    }
}

#[tracing::instrument(skip(client, body))]
pub(crate) async fn validate_template(
    client: &impl AwsCloudFormationClient,
    body: &str,
    url: &str,
) -> Result<ValidatedTemplate, Error> {
    let source = TemplateSource::resolve(body, url)?;
    let summary = client.validate_template(source.clone()).await?;
    tracing::debug!(capabilities = ?summary.capabilities, "template is valid");
    Ok(ValidatedTemplate { source, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCloudFormation;

    #[tokio::test]
    async fn body_at_limit_is_accepted() {
        let client = FakeCloudFormation::default();
        let body = "a".repeat(MAX_TEMPLATE_BODY_BYTES);
        let validated = validate_template(&client, &body, "").await.unwrap();
        assert_eq!(validated.source, TemplateSource::Body(body));
        assert_eq!(client.calls("validate_template"), 1);
    }

    #[tokio::test]
    async fn body_over_limit_is_rejected_without_a_remote_call() {
        let client = FakeCloudFormation::default();
        let body = "a".repeat(MAX_TEMPLATE_BODY_BYTES + 1);
        let err = validate_template(&client, &body, "").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(client.calls("validate_template"), 0);
    }

    #[tokio::test]
    async fn missing_template_is_rejected() {
        let client = FakeCloudFormation::default();
        let err = validate_template(&client, "", "").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(client.calls("validate_template"), 0);
    }

    #[test]
    fn body_takes_precedence_over_url() {
        let source = TemplateSource::resolve("{}", "https://bucket.s3.amazonaws.com/t.yml").unwrap();
        assert_eq!(source, TemplateSource::Body("{}".to_string()));
    }

    #[test]
    fn url_used_when_body_empty() {
        let url = "https://bucket.s3.amazonaws.com/t.yml";
        let source = TemplateSource::resolve("", url).unwrap();
        assert_eq!(source.into_parts(), (None, Some(url.to_string())));
    }

    #[tokio::test]
    async fn capabilities_come_from_the_server() {
        let client = FakeCloudFormation::default();
        client.set_capabilities(&["CAPABILITY_IAM"]);
        let validated = validate_template(&client, "{}", "").await.unwrap();
        assert_eq!(validated.capabilities(), &["CAPABILITY_IAM".to_string()]);
    }
}

//! Mailgun
//!
//! Sends mail through the messages endpoint of a sending domain, either as
//! raw HTML or from a stored template.

use crate::client::request::RequestOptions;
use crate::client::response::ApiResponse;
use crate::client::service::{Service, SessionConfig};
use crate::client::HttpClient;
use crate::config::settings::require;
use crate::config::{HttpSettings, MailgunConfig};
use crate::error::{Result, StacError};
use crate::util::listify::listify;
use async_trait::async_trait;
use serde_json::Value;

pub const MAILGUN_BASE_URL: &str = "https://api.mailgun.net/v3";

pub struct MailgunService {
    api_key: String,
    base_url: String,
}

impl MailgunService {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: MAILGUN_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Service for MailgunService {
    fn name(&self) -> &str {
        "mailgun"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_session(&self, _http: &reqwest::Client) -> Result<SessionConfig> {
        Ok(SessionConfig::new().basic_auth("api", &self.api_key))
    }
}

/// One message to send
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Email {
    pub subject: String,
    pub to: Vec<String>,
    /// Raw HTML body
    pub body: Option<String>,
    /// Overrides the emailer's sender
    pub from_addr: Option<String>,
    /// Comma separated; overrides the emailer's reply-to
    pub reply_to: Option<String>,
    /// Stored template name, used with `variables` when there is no body
    pub template: Option<String>,
    pub variables: Option<Value>,
}

impl Email {
    pub fn new<I, T>(subject: impl Into<String>, to: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            subject: subject.into(),
            to: to.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn template(mut self, template: impl Into<String>, variables: Value) -> Self {
        self.template = Some(template.into());
        self.variables = Some(variables);
        self
    }

    pub fn from_addr(mut self, from_addr: impl Into<String>) -> Self {
        self.from_addr = Some(from_addr.into());
        self
    }

    pub fn reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }
}

/// Mailgun sender bound to one domain
pub struct Emailer {
    client: HttpClient<MailgunService>,
    domain: String,
    from_addr: Option<String>,
    reply_to: Vec<String>,
}

impl Emailer {
    pub fn new(client: HttpClient<MailgunService>, domain: impl Into<String>) -> Self {
        Self {
            client,
            domain: domain.into(),
            from_addr: None,
            reply_to: Vec::new(),
        }
    }

    pub fn from_config(config: &MailgunConfig, settings: HttpSettings) -> Result<Self> {
        let api_key = require(&config.api_key, "mailgun", "api_key", "MAILGUN_API_KEY")?;
        let domain = require(&config.domain, "mailgun", "domain", "MAILGUN_DOMAIN")?;

        let mut service = MailgunService::new(api_key);
        if let Some(base_url) = &config.base_url {
            service = service.with_base_url(base_url.clone());
        }

        let mut emailer = Self::new(HttpClient::new(service, settings), domain);
        emailer.from_addr = config.from_addr.clone();
        emailer.reply_to = listify(config.reply_to.as_deref());
        Ok(emailer)
    }

    /// Default sender
    pub fn with_from_addr(mut self, from_addr: impl Into<String>) -> Self {
        self.from_addr = Some(from_addr.into());
        self
    }

    /// Default reply-to, comma separated
    pub fn with_reply_to(mut self, reply_to: &str) -> Self {
        self.reply_to = listify(Some(reply_to));
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Form fields for a message
    ///
    /// Requires an HTML body, or a template together with a non-empty
    /// object of variables.
    pub fn build_form(&self, email: &Email) -> Result<Vec<(String, String)>> {
        let mut form = vec![
            ("to".to_string(), email.to.join(",")),
            ("subject".to_string(), email.subject.clone()),
        ];

        if let Some(from) = email.from_addr.as_ref().or(self.from_addr.as_ref()) {
            form.push(("from".to_string(), from.clone()));
        }

        let reply_to = match listify(email.reply_to.as_deref()) {
            custom if !custom.is_empty() => custom,
            _ => self.reply_to.clone(),
        };
        for address in reply_to {
            form.push(("h:Reply-To".to_string(), address));
        }

        match (&email.body, &email.template, &email.variables) {
            (Some(body), _, _) if !body.is_empty() => {
                form.push(("html".to_string(), body.clone()));
            }
            (_, Some(template), Some(variables))
                if !template.is_empty() && variables.as_object().is_some_and(|v| !v.is_empty()) =>
            {
                form.push(("template".to_string(), template.clone()));
                form.push(("t:variables".to_string(), serde_json::to_string(variables)?));
            }
            _ => {
                return Err(StacError::InvalidInput(
                    "body or template must be provided".to_string(),
                ))
            }
        }

        Ok(form)
    }

    pub async fn send_email(&self, email: &Email) -> Result<ApiResponse> {
        let form = self.build_form(email)?;
        self.client
            .post(&format!("{}/messages", self.domain), RequestOptions::new().form(form))
            .await
    }
}

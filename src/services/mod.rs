//! Service Clients
//!
//! One `Service` implementation per vendor, with a client alias and the
//! vendor-specific helpers layered on `HttpClient`.

pub mod action_network;
pub mod bsd;
pub mod jira;
pub mod mailchimp;
pub mod mailgun;
pub mod ngpvan;
pub mod reach;
pub mod ticker;

pub use action_network::{ActionNetworkClient, ActionNetworkService};
pub use bsd::{BsdClient, BsdService};
pub use jira::{JiraClient, JiraService, NewIssue};
pub use mailchimp::{MailchimpClient, MailchimpService};
pub use mailgun::{Email, Emailer, MailgunService};
pub use ngpvan::{NgpVanClient, NgpVanService, VanMode};
pub use reach::{ReachClient, ReachService};
pub use ticker::{TickerClient, TickerMetric, TickerService};

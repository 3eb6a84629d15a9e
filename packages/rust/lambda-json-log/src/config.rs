//! Logger configuration.
//!
//! A [`LoggerConfig`] is built once at process start and consumed by
//! [`init`](crate::init) or [`Logger::build`](crate::Logger::build). It can be
//! created from five strings, through the builder, or from the environment.
//!
//! # Environment Configuration
//!
//! - `LOG_LEVEL`: minimum level, falls back to `AWS_LAMBDA_LOG_LEVEL`, then `info`
//! - `LOG_APPLICATION`: application name, falls back to `AWS_LAMBDA_FUNCTION_NAME`
//! - `LOG_PROJECT`: project name
//! - `LOG_PROJECT_GROUP`: project group name
//! - `LOG_CUSTOM_ATTRIBUTES_PREFIX`: prefix of custom attributes (default: `custom`)
//!
//! # Example
//!
//! ```
//! use lambda_json_log::{LoggerConfig, Sampling};
//!
//! let config = LoggerConfig::builder()
//!     .log_level("debug")
//!     .application("orders-consumer")
//!     .project("orders")
//!     .project_group("commerce")
//!     .sampling(Sampling::Disabled)
//!     .build();
//!
//! assert_eq!(config.application(), "orders-consumer");
//! ```

use crate::constants::{defaults, env_vars};
use crate::sampling::Sampling;
use bon::Builder;
use std::env;

/// Immutable configuration of the structured logger.
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Minimum severity name. Malformed values fall back to `info` at build time.
    #[builder(into, default = String::from(defaults::LOG_LEVEL))]
    log_level: String,

    /// Written as `application` on every line.
    #[builder(into, default)]
    application: String,

    /// Written as `project` on every line.
    #[builder(into, default)]
    project: String,

    /// Written as `projectGroup` on every line.
    #[builder(into, default)]
    project_group: String,

    /// Prefix used by [`with_custom_attr`](crate::Logger::with_custom_attr).
    #[builder(into, default = String::from(defaults::CUSTOM_ATTRIBUTES_PREFIX))]
    custom_attributes_prefix: String,

    /// Sampling policy, enabled (100 then every 100th per second) by default.
    #[builder(default)]
    sampling: Sampling,

    /// Optional logger name written as `logger`.
    #[builder(into)]
    name: Option<String>,
}

impl LoggerConfig {
    /// Create a configuration from its five string settings.
    pub fn new(
        log_level: impl Into<String>,
        application: impl Into<String>,
        project: impl Into<String>,
        project_group: impl Into<String>,
        custom_attributes_prefix: impl Into<String>,
    ) -> Self {
        Self::builder()
            .log_level(log_level)
            .application(application)
            .project(project)
            .project_group(project_group)
            .custom_attributes_prefix(custom_attributes_prefix)
            .build()
    }

    /// Build a configuration from environment variables.
    ///
    /// Unset variables keep their defaults; nothing here fails.
    pub fn from_env() -> Self {
        let log_level = env::var(env_vars::LOG_LEVEL)
            .or_else(|_| env::var(env_vars::AWS_LAMBDA_LOG_LEVEL))
            .unwrap_or_else(|_| defaults::LOG_LEVEL.to_string());

        let application = env::var(env_vars::APPLICATION)
            .or_else(|_| env::var(env_vars::AWS_LAMBDA_FUNCTION_NAME))
            .unwrap_or_default();

        Self::builder()
            .log_level(log_level)
            .application(application)
            .project(env::var(env_vars::PROJECT).unwrap_or_default())
            .project_group(env::var(env_vars::PROJECT_GROUP).unwrap_or_default())
            .custom_attributes_prefix(
                env::var(env_vars::CUSTOM_ATTRIBUTES_PREFIX)
                    .unwrap_or_else(|_| defaults::CUSTOM_ATTRIBUTES_PREFIX.to_string()),
            )
            .build()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn project_group(&self) -> &str {
        &self.project_group
    }

    pub fn custom_attributes_prefix(&self) -> &str {
        &self.custom_attributes_prefix
    }

    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

use std::borrow::Cow;
use std::path::Path;

use chrono::Utc;
use miette::{Diagnostic, IntoDiagnostic, Result};
use tera::{Context as TeraContext, Tera};
use thiserror::Error;

use crate::config::{ConfigError, SiteConfig};
use crate::data::{walk, PageNode, ResolvedRoute, NOT_FOUND_TEMPLATE};
use crate::server::RequestInfo;

/// classification of a finished response
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    NotFound,
}

impl StatusClass {
    pub fn code(self) -> u16 {
        match self {
            StatusClass::Success => 200,
            StatusClass::NotFound => 404,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusClass::Success => "OK",
            StatusClass::NotFound => "Not Found",
        }
    }
}

/// a rendered page body together with its status classification
#[derive(Clone, Debug)]
pub struct RenderedPage {
    pub status: StatusClass,
    pub body: String,
}

#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("failed to render template {template}")]
    Template {
        template: String,
        #[source]
        source: tera::Error,
    },
}

// renders resolved routes through the templates of the site
pub struct ResponseRenderer {
    tera: Tera,
}

impl ResponseRenderer {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn new(template_dir: &Path) -> Result<Self> {
        let template_glob = format!("{}/**/*", template_dir.to_string_lossy());
        let mut tera = Tera::new(&template_glob).into_diagnostic()?;
        tera_text_filters::register_all(&mut tera);

        let renderer = Self { tera };

        if !renderer.has_template(NOT_FOUND_TEMPLATE) {
            return Err(ConfigError::MissingNotFoundTemplate {
                template: NOT_FOUND_TEMPLATE.to_owned(),
            }
            .into());
        }

        Ok(renderer)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Checks that every template the page tree refers to exists.
    pub fn validate_templates(&self, config: &SiteConfig) -> Result<(), ConfigError> {
        let mut missing = None;

        walk(&config.pages, &mut |page| {
            if missing.is_none() && !self.has_template(&page.template) {
                missing = Some(ConfigError::MissingTemplate {
                    template: page.template.clone(),
                    path: page.path.clone(),
                });
            }
        });

        match missing {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Renders a resolved route into a response body.
    ///
    /// A matched page renders its own template, an unresolved path
    /// renders the reserved not-found template with a substitute page
    /// node. Templates see the page, its ancestor chain, the whole site
    /// configuration and the request metadata.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn render(
        &self,
        config: &SiteConfig,
        route: ResolvedRoute<'_>,
        request: &RequestInfo,
    ) -> Result<RenderedPage, RenderError> {
        let (status, page, ancestors) = match route {
            ResolvedRoute::Found { page, ancestors } => {
                (StatusClass::Success, Cow::Borrowed(page), ancestors)
            }
            ResolvedRoute::NotFound => (
                StatusClass::NotFound,
                Cow::Owned(PageNode::not_found(&request.path)),
                Vec::new(),
            ),
        };

        let mut context = TeraContext::new();
        context.insert("page", page.as_ref());
        context.insert("ancestors", &ancestors);
        context.insert("site", config);
        context.insert("request", request);
        context.insert("now", &Utc::now().to_rfc3339());
        context.insert("elapsed_ms", &request.elapsed_ms());

        tracing::debug!("context = {context:?}");

        let body = self
            .tera
            .render(&page.template, &context)
            .map_err(|source| RenderError::Template {
                template: page.template.clone(),
                source,
            })?;

        Ok(RenderedPage { status, body })
    }
}

//! Capability registry
//!
//! Holds the three independent namespaces served over MCP: actions (tools), data sources
//! (resources and resource templates) and templates (prompts). The registry is populated
//! once through [`RegistryBuilder`] and is read-only afterwards, so it can be shared by
//! every transport behind an `Arc` without locking.

pub mod pattern;
pub mod signature;

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::errors::{AppError, RegistrationError};
use pattern::UriPattern;
use signature::{check_signature, Arguments, ParamSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Action,
    DataSource,
    Template,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Action => "action",
            Self::DataSource => "data source",
            Self::Template => "template",
        })
    }
}

/// What happens when a name (or pattern) is registered twice in the same category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Replace,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown duplicate policy `{0}`, expected reject or replace")]
pub struct UnknownDuplicatePolicy(pub String);

impl FromStr for DuplicatePolicy {
    type Err = UnknownDuplicatePolicy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "replace" => Ok(Self::Replace),
            _ => Err(UnknownDuplicatePolicy(value.to_string())),
        }
    }
}

/// How an action reports a fault raised by its own implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// The fault becomes the successful result `"Error: <fault>"`.
    SoftFail,
    /// The fault is surfaced to the caller as [`AppError::ActionFailed`].
    #[default]
    HardFail,
}

/// A domain-level fault raised by a capability implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CapabilityFault {
    message: String,
}

impl CapabilityFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait ActionHandler: Send + Sync {
    fn call(&self, arguments: &Arguments) -> Result<Value, CapabilityFault>;
}

impl<F> ActionHandler for F
where
    F: Fn(&Arguments) -> Result<Value, CapabilityFault> + Send + Sync,
{
    fn call(&self, arguments: &Arguments) -> Result<Value, CapabilityFault> {
        self(arguments)
    }
}

pub trait DataSourceHandler: Send + Sync {
    fn read(&self, arguments: &Arguments) -> Value;
}

impl<F> DataSourceHandler for F
where
    F: Fn(&Arguments) -> Value + Send + Sync,
{
    fn read(&self, arguments: &Arguments) -> Value {
        self(arguments)
    }
}

pub trait TemplateHandler: Send + Sync {
    fn render(&self, arguments: &Arguments) -> String;
}

impl<F> TemplateHandler for F
where
    F: Fn(&Arguments) -> String + Send + Sync,
{
    fn render(&self, arguments: &Arguments) -> String {
        self(arguments)
    }
}

#[derive(Clone)]
pub struct Action {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub fault_policy: FaultPolicy,
    handler: Arc<dyn ActionHandler>,
}

impl Action {
    pub fn new(name: &str, description: &str, handler: impl ActionHandler + 'static) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: Vec::new(),
            fault_policy: FaultPolicy::default(),
            handler: Arc::new(handler),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn soft_fail(mut self) -> Self {
        self.fault_policy = FaultPolicy::SoftFail;
        self
    }
}

#[derive(Clone)]
pub struct DataSource {
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub params: Vec<ParamSpec>,
    pattern: String,
    handler: Arc<dyn DataSourceHandler>,
}

impl DataSource {
    pub fn new(
        pattern: &str,
        name: &str,
        description: &str,
        handler: impl DataSourceHandler + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            mime_type: "application/json".to_string(),
            params: Vec::new(),
            pattern: pattern.to_string(),
            handler: Arc::new(handler),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = mime_type.to_string();
        self
    }
}

#[derive(Clone)]
pub struct Template {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    handler: Arc<dyn TemplateHandler>,
}

impl Template {
    pub fn new(name: &str, description: &str, handler: impl TemplateHandler + 'static) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }
}

pub enum Capability {
    Action(Action),
    DataSource(DataSource),
    Template(Template),
}

impl Capability {
    pub fn category(&self) -> Category {
        match self {
            Self::Action(_) => Category::Action,
            Self::DataSource(_) => Category::DataSource,
            Self::Template(_) => Category::Template,
        }
    }
}

impl From<Action> for Capability {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

impl From<DataSource> for Capability {
    fn from(data_source: DataSource) -> Self {
        Self::DataSource(data_source)
    }
}

impl From<Template> for Capability {
    fn from(template: Template) -> Self {
        Self::Template(template)
    }
}

/// A data source after compilation of its URI pattern.
#[derive(Clone)]
pub struct RegisteredDataSource {
    pub source: DataSource,
    pub pattern: UriPattern,
}

/// Result of reading a data source.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResource {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
    pub value: Value,
}

impl ResolvedResource {
    /// Text body for the wire: strings are passed through, anything else is JSON encoded.
    pub fn text(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Ordered, name-indexed storage for one category.
struct Namespace<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Namespace<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Namespace<T> {
    fn insert(
        &mut self,
        category: Category,
        key: &str,
        entry: T,
        policy: DuplicatePolicy,
    ) -> Result<(), RegistrationError> {
        match (self.index.get(key), policy) {
            (Some(_), DuplicatePolicy::Reject) => Err(RegistrationError::DuplicateName {
                category,
                name: key.to_string(),
            }),
            (Some(&position), DuplicatePolicy::Replace) => {
                warn!(category = %category, name = %key, "replacing registered capability");
                self.entries[position] = entry;
                Ok(())
            }
            (None, _) => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&position| &self.entries[position])
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    policy: DuplicatePolicy,
    actions: Namespace<Action>,
    data_sources: Namespace<RegisteredDataSource>,
    templates: Namespace<Template>,
}

impl RegistryBuilder {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn register(&mut self, capability: impl Into<Capability>) -> Result<(), RegistrationError> {
        let capability = capability.into();
        let category = capability.category();

        match capability {
            Capability::Action(mut action) => {
                check_name(category, &action.name)?;
                check_signature(category, &action.name, &mut action.params)?;
                debug!(name = %action.name, "registering action");
                let key = action.name.clone();
                self.actions.insert(category, &key, action, self.policy)
            }
            Capability::DataSource(mut source) => {
                let pattern = UriPattern::parse(&source.pattern)
                    .map_err(|reason| RegistrationError::invalid_name(category, &source.pattern, reason))?;
                check_name(category, &source.name)?;
                check_signature(category, &source.pattern, &mut source.params)?;
                check_placeholders(&source, &pattern)?;

                if let Some(existing) = self.data_sources.entries.iter().find(|existing| {
                    existing.pattern.as_str() != pattern.as_str()
                        && !pattern.is_literal()
                        && existing.pattern.same_shape(&pattern)
                }) {
                    return Err(RegistrationError::AmbiguousPattern {
                        pattern: pattern.as_str().to_string(),
                        existing: existing.pattern.as_str().to_string(),
                    });
                }

                debug!(pattern = %pattern.as_str(), "registering data source");
                let key = pattern.as_str().to_string();
                self.data_sources.insert(
                    category,
                    &key,
                    RegisteredDataSource { source, pattern },
                    self.policy,
                )
            }
            Capability::Template(mut template) => {
                check_name(category, &template.name)?;
                check_signature(category, &template.name, &mut template.params)?;
                debug!(name = %template.name, "registering template");
                let key = template.name.clone();
                self.templates.insert(category, &key, template, self.policy)
            }
        }
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn data_source_count(&self) -> usize {
        self.data_sources.len()
    }

    pub fn build(self) -> CapabilityRegistry {
        let mut match_order: Vec<usize> = (0..self.data_sources.entries.len())
            .filter(|&position| !self.data_sources.entries[position].pattern.is_literal())
            .collect();
        match_order.sort_by(|&left, &right| {
            self.data_sources.entries[left]
                .pattern
                .specificity_cmp(&self.data_sources.entries[right].pattern)
        });

        info!(
            actions = self.actions.len(),
            data_sources = self.data_sources.len(),
            templates = self.templates.len(),
            "capability registry built"
        );

        CapabilityRegistry {
            actions: self.actions,
            data_sources: self.data_sources,
            templates: self.templates,
            match_order,
        }
    }
}

fn check_name(category: Category, name: &str) -> Result<(), RegistrationError> {
    if name.trim().is_empty() {
        return Err(RegistrationError::invalid_name(
            category,
            name,
            "name must not be empty",
        ));
    }

    if name.chars().any(char::is_whitespace) {
        return Err(RegistrationError::invalid_name(
            category,
            name,
            "name must not contain whitespace",
        ));
    }

    Ok(())
}

fn check_placeholders(source: &DataSource, pattern: &UriPattern) -> Result<(), RegistrationError> {
    let mut placeholders: Vec<&str> = pattern.placeholders().collect();
    let mut params: Vec<&str> = source.params.iter().map(|param| param.name.as_str()).collect();
    placeholders.sort_unstable();
    params.sort_unstable();

    if placeholders != params {
        return Err(RegistrationError::signature_mismatch(
            Category::DataSource,
            pattern.as_str(),
            format!(
                "placeholders [{}] do not match parameters [{}]",
                placeholders.join(", "),
                params.join(", ")
            ),
        ));
    }

    Ok(())
}

pub struct CapabilityRegistry {
    actions: Namespace<Action>,
    data_sources: Namespace<RegisteredDataSource>,
    templates: Namespace<Template>,
    match_order: Vec<usize>,
}

impl CapabilityRegistry {
    pub fn builder(policy: DuplicatePolicy) -> RegistryBuilder {
        RegistryBuilder::new(policy)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions.entries
    }

    pub fn data_sources(&self) -> &[RegisteredDataSource] {
        &self.data_sources.entries
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates.entries
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn invoke_action(&self, name: &str, arguments: &Map<String, Value>) -> Result<Value, AppError> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| AppError::not_found(Category::Action, name))?;
        let bound = Arguments::bind(&action.params, arguments)?;

        match (action.handler.call(&bound), action.fault_policy) {
            (Ok(value), _) => Ok(value),
            (Err(fault), FaultPolicy::SoftFail) => {
                debug!(name = %name, fault = %fault, "action reported a soft failure");
                Ok(Value::String(format!("Error: {fault}")))
            }
            (Err(fault), FaultPolicy::HardFail) => Err(AppError::action_failed(name, fault.to_string())),
        }
    }

    pub fn resolve_data_source(&self, uri: &str) -> Result<ResolvedResource, AppError> {
        let (entry, extracted) = self
            .lookup_data_source(uri)
            .ok_or_else(|| AppError::not_found(Category::DataSource, uri))?;

        let supplied: Map<String, Value> = extracted
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        let bound = Arguments::bind(&entry.source.params, &supplied)?;

        Ok(ResolvedResource {
            uri: uri.to_string(),
            name: entry.source.name.clone(),
            mime_type: entry.source.mime_type.clone(),
            value: entry.source.handler.read(&bound),
        })
    }

    pub fn render_template(&self, name: &str, arguments: &Map<String, Value>) -> Result<String, AppError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| AppError::not_found(Category::Template, name))?;
        let bound = Arguments::bind(&template.params, arguments)?;
        Ok(template.handler.render(&bound))
    }

    fn lookup_data_source(&self, uri: &str) -> Option<(&RegisteredDataSource, Vec<(String, String)>)> {
        if let Some(entry) = self
            .data_sources
            .get(uri)
            .filter(|entry| entry.pattern.is_literal())
        {
            return Some((entry, Vec::new()));
        }

        self.match_order.iter().find_map(|&position| {
            let entry = &self.data_sources.entries[position];
            entry
                .pattern
                .match_uri(uri)
                .map(|extracted| (entry, extracted))
        })
    }
}

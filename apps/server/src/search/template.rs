//! Search templates and where they come from.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quarry_template::Template;
use serde::Deserialize;

use super::error::{Result, SearchError};

/// A named, declarative query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTemplate {
    path: String,
    template_string: String,
    resource_type: Option<String>,
    property_provider_names: Vec<String>,
    default_values: BTreeMap<String, String>,
    query_options: BTreeMap<String, Vec<String>>,
    decorator_names: Vec<String>,
    batch_result_processor: Option<String>,
    batch_result_writer: Option<String>,
    result_processor: Option<String>,
    result_writer: Option<String>,
}

impl SearchTemplate {
    pub fn new(path: impl Into<String>, template_string: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            template_string: template_string.into(),
            resource_type: None,
            property_provider_names: Vec::new(),
            default_values: BTreeMap::new(),
            query_options: BTreeMap::new(),
            decorator_names: Vec::new(),
            batch_result_processor: None,
            batch_result_writer: None,
            result_processor: None,
            result_writer: None,
        }
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_property_provider(mut self, name: impl Into<String>) -> Self {
        self.property_provider_names.push(name.into());
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_values.insert(key.into(), value.into());
        self
    }

    pub fn with_option<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query_options
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_decorator(mut self, name: impl Into<String>) -> Self {
        self.decorator_names.push(name.into());
        self
    }

    pub fn with_batch_result_processor(mut self, name: impl Into<String>) -> Self {
        self.batch_result_processor = Some(name.into());
        self
    }

    pub fn with_batch_result_writer(mut self, name: impl Into<String>) -> Self {
        self.batch_result_writer = Some(name.into());
        self
    }

    pub fn with_result_processor(mut self, name: impl Into<String>) -> Self {
        self.result_processor = Some(name.into());
        self
    }

    pub fn with_result_writer(mut self, name: impl Into<String>) -> Self {
        self.result_writer = Some(name.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn template_string(&self) -> &str {
        &self.template_string
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    pub fn property_provider_names(&self) -> &[String] {
        &self.property_provider_names
    }

    pub fn default_values(&self) -> &BTreeMap<String, String> {
        &self.default_values
    }

    pub fn query_options(&self) -> &BTreeMap<String, Vec<String>> {
        &self.query_options
    }

    pub fn decorator_names(&self) -> &[String] {
        &self.decorator_names
    }

    pub fn batch_result_processor(&self) -> Option<&str> {
        self.batch_result_processor.as_deref()
    }

    pub fn batch_result_writer(&self) -> Option<&str> {
        self.batch_result_writer.as_deref()
    }

    pub fn result_processor(&self) -> Option<&str> {
        self.result_processor.as_deref()
    }

    pub fn result_writer(&self) -> Option<&str> {
        self.result_writer.as_deref()
    }

    /// Results go to a batch writer when either batch name is configured.
    pub fn is_batch(&self) -> bool {
        self.batch_result_processor.is_some() || self.batch_result_writer.is_some()
    }

    /// Reject malformed placeholders in the query or any option value.
    pub fn validate(&self) -> Result<()> {
        Template::parse_strict(&self.template_string)
            .map_err(|e| SearchError::InvalidTemplate(format!("{}: query: {e}", self.path)))?;
        for (key, values) in &self.query_options {
            for value in values {
                Template::parse_strict(value).map_err(|e| {
                    SearchError::InvalidTemplate(format!("{}: option {key}: {e}", self.path))
                })?;
            }
        }
        Ok(())
    }
}

/// One value or a list of values.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// On-disk JSON form of a template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateDocument {
    query_template: Option<String>,
    resource_type: Option<String>,
    property_providers: Option<OneOrMany>,
    defaults: BTreeMap<String, String>,
    options: BTreeMap<String, OneOrMany>,
    decorators: Option<OneOrMany>,
    batch_result_processor: Option<String>,
    batch_result_writer: Option<String>,
    result_processor: Option<String>,
    result_writer: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TemplateDocument {
    /// Validate and convert into the template served at `path`.
    pub fn into_template(self, path: &str) -> Result<SearchTemplate> {
        let query = non_blank(self.query_template).ok_or_else(|| {
            SearchError::InvalidTemplate(format!("{path}: node is not a template"))
        })?;

        let template = SearchTemplate {
            path: path.to_string(),
            template_string: query,
            resource_type: non_blank(self.resource_type),
            property_provider_names: self
                .property_providers
                .map(OneOrMany::into_vec)
                .unwrap_or_default(),
            default_values: self.defaults,
            query_options: self
                .options
                .into_iter()
                .map(|(key, values)| (key, values.into_vec()))
                .collect(),
            decorator_names: self.decorators.map(OneOrMany::into_vec).unwrap_or_default(),
            batch_result_processor: non_blank(self.batch_result_processor),
            batch_result_writer: non_blank(self.batch_result_writer),
            result_processor: non_blank(self.result_processor),
            result_writer: non_blank(self.result_writer),
        };
        template.validate()?;
        Ok(template)
    }
}

/// Supplies templates by path.
pub trait TemplateSource: Send + Sync {
    fn template(&self, path: &str) -> Option<Arc<SearchTemplate>>;
}

/// Templates held in memory, usually loaded from a directory of JSON files.
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: HashMap<String, Arc<SearchTemplate>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: SearchTemplate) {
        self.templates
            .insert(template.path().to_string(), Arc::new(template));
    }

    pub fn with_template(mut self, template: SearchTemplate) -> Self {
        self.insert(template);
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Load every `*.json` file below `directory`. `<directory>/a/b.json`
    /// becomes the template at `<mount>a/b`.
    pub fn load_dir(directory: &Path, mount: &str) -> Result<Self> {
        let mut store = Self::new();
        if !directory.is_dir() {
            tracing::warn!(directory = %directory.display(), "Template directory does not exist");
            return Ok(store);
        }

        for file in collect_json_files(directory)? {
            let path = template_path_for(directory, &file, mount)?;
            let template = load_template_file(&file, &path)?;
            tracing::debug!(path = %path, file = %file.display(), "Loaded search template");
            store.insert(template);
        }

        tracing::info!(
            directory = %directory.display(),
            count = store.len(),
            "Search templates loaded"
        );
        Ok(store)
    }
}

impl TemplateSource for TemplateStore {
    fn template(&self, path: &str) -> Option<Arc<SearchTemplate>> {
        self.templates.get(path).cloned()
    }
}

/// Parse one template file, serving it at `path`.
pub fn load_template_file(file: &Path, path: &str) -> Result<SearchTemplate> {
    let text = fs::read_to_string(file).map_err(|e| {
        SearchError::InvalidTemplate(format!("{}: {e}", file.display()))
    })?;
    let document: TemplateDocument = serde_json::from_str(&text).map_err(|e| {
        SearchError::InvalidTemplate(format!("{}: {e}", file.display()))
    })?;
    document.into_template(path)
}

fn collect_json_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![directory.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| {
            SearchError::Configuration(format!("cannot read {}: {e}", dir.display()))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                SearchError::Configuration(format!("cannot read {}: {e}", dir.display()))
            })?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn template_path_for(root: &Path, file: &Path, mount: &str) -> Result<String> {
    let relative = file
        .strip_prefix(root)
        .map_err(|e| SearchError::Configuration(format!("{}: {e}", file.display())))?
        .with_extension("");
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(format!(
        "{}/{}",
        mount.trim_end_matches('/'),
        segments.join("/")
    ))
}

//! Named helper registries.
//!
//! Property providers, writers and decorators are bound under one or more
//! names at wiring time and looked up by the names a template carries. One
//! helper per registry may also be flagged as the default.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::metrics::PROVIDER_RESOLUTION_WARNINGS_TOTAL;

pub struct NamedRegistry<T: ?Sized> {
    kind: &'static str,
    inner: RwLock<Bindings<T>>,
}

struct Bindings<T: ?Sized> {
    by_name: HashMap<String, Arc<T>>,
    default: Option<Arc<T>>,
}

impl<T: ?Sized> NamedRegistry<T> {
    /// `kind` labels warnings and metrics, e.g. `"batch_writer"`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            inner: RwLock::new(Bindings {
                by_name: HashMap::new(),
                default: None,
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Bind `helper` under every name in `names`. A later binding under the
    /// same name replaces the earlier one.
    pub fn bind(&self, names: &[&str], helper: Arc<T>, is_default: bool) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for name in names {
            tracing::debug!(registry = self.kind, name, is_default, "Binding helper");
            inner.by_name.insert((*name).to_string(), Arc::clone(&helper));
        }
        if is_default {
            inner.default = Some(helper);
        }
    }

    /// Remove the helper bound under `name`. If it was also the default, the
    /// default binding is cleared.
    pub fn unbind(&self, name: &str) -> Option<Arc<T>> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let removed = inner.by_name.remove(name)?;
        let was_default = inner
            .default
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &removed));
        if was_default && !inner.by_name.values().any(|h| Arc::ptr_eq(h, &removed)) {
            inner.default = None;
        }
        tracing::debug!(registry = self.kind, name, "Unbound helper");
        Some(removed)
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<T>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .get(name)
            .cloned()
    }

    pub fn default_helper(&self) -> Option<Arc<T>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .default
            .clone()
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = inner.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look `name` up; an unknown name is logged and counted, never an error.
    pub fn resolve(&self, name: &str) -> Option<Arc<T>> {
        let found = self.get_by_name(name);
        if found.is_some() {
            tracing::debug!(registry = self.kind, name, "Resolved helper");
        } else {
            tracing::warn!(registry = self.kind, name, "Unable to resolve named helper");
            PROVIDER_RESOLUTION_WARNINGS_TOTAL
                .with_label_values(&[self.kind, name])
                .inc();
        }
        found
    }
}

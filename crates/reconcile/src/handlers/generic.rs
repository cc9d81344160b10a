//! Fallback handler for paths with no typed handler.
//!
//! Each file is rendered with the template parameters, parsed as a JSON
//! object and written verbatim to its logical path. Nothing is pruned.

use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::handler::{PathHandler, read_file};
use crate::template::TemplateParams;
use crate::types::ApplyResult;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vaultkit::VaultBackend;

/// Name of the wildcard binding.
pub const GENERIC_NAME: &str = "generic";

/// Writes raw documents to arbitrary logical paths.
pub struct GenericHandler {
    backend: Arc<dyn VaultBackend>,
    root: PathBuf,
    params: TemplateParams,
}

impl fmt::Debug for GenericHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericHandler")
            .field("root", &self.root)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

impl GenericHandler {
    pub fn new(backend: Arc<dyn VaultBackend>, root: impl Into<PathBuf>, params: TemplateParams) -> Self {
        Self {
            backend,
            root: root.into(),
            params,
        }
    }

    /// Render and parse a document.
    pub fn parse_document(&self, source: &Path, content: &str) -> Result<Map<String, Value>> {
        let rendered = self
            .params
            .render(content)
            .map_err(|e| Error::parse(source, e.to_string()))?;
        match serde_json::from_str(&rendered) {
            Ok(Value::Object(data)) => Ok(data),
            Ok(_) => Err(Error::parse(source, "document must be a JSON object")),
            Err(e) => Err(Error::parse(source, e.to_string())),
        }
    }

    /// Write a document to `path`.
    pub fn ensure(&self, path: &str, data: &Map<String, Value>, ctx: &ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            // Reads only.
            let current = self
                .backend
                .read(path)
                .map_err(|e| Error::remote(path, e))?
                .and_then(|secret| secret.data);
            if current.as_ref() == Some(data) {
                return Ok(ApplyResult::NoChange);
            }
            log::info!("Would write {path}");
            return Ok(ApplyResult::dry_run());
        }

        log::info!("Writing {path}");
        let response = self
            .backend
            .write(path, data)
            .map_err(|e| Error::remote(path, e))?;
        if let Some(warnings) = response.and_then(|secret| secret.warnings) {
            for warning in warnings {
                log::warn!("{path}: {warning}");
            }
        }
        Ok(ApplyResult::Modified)
    }
}

impl PathHandler for GenericHandler {
    fn name(&self) -> &str {
        GENERIC_NAME
    }

    fn document_root(&self) -> &Path {
        &self.root
    }

    fn apply_file(&mut self, file: &Path, logical: &str, ctx: &ApplyContext) -> Result<ApplyResult> {
        let content = read_file(file)?;
        let data = self.parse_document(file, &content)?;
        self.ensure(logical, &data, ctx)
    }

    fn prune_undeclared(&mut self, _ctx: &ApplyContext) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, MockCall};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("Expected object, got {other}"),
        }
    }

    #[test]
    fn test_parse_document_renders_params() {
        let mock = MockBackend::new();
        let params = TemplateParams::from_pairs(["service=billing"]).unwrap();
        let handler = GenericHandler::new(Arc::new(mock), "/docs", params);

        let data = handler
            .parse_document(Path::new("role.json"), r#"{"policies": "{{ service }}-read"}"#)
            .unwrap();
        assert_eq!(data["policies"], "billing-read");
    }

    #[test]
    fn test_parse_document_unknown_parameter() {
        let handler = GenericHandler::new(Arc::new(MockBackend::new()), "/docs", TemplateParams::new());
        let err = handler
            .parse_document(Path::new("/docs/auth/approle/role/app.json"), r#"{"a": "{{ account }}"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        let message = err.to_string();
        assert!(message.contains("app.json"));
        assert!(message.contains("account"));
    }

    #[test]
    fn test_parse_document_requires_object() {
        let handler = GenericHandler::new(Arc::new(MockBackend::new()), "/docs", TemplateParams::new());
        assert!(handler.parse_document(Path::new("x"), "[1, 2]").is_err());
        assert!(handler.parse_document(Path::new("x"), "{").is_err());
    }

    #[test]
    fn test_apply_directory_writes_documents() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("auth/approle/role");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("app.json"), r#"{"token_ttl": "1h"}"#).unwrap();
        fs::write(dir.join("_draft.json"), "not even json").unwrap();

        let mock = MockBackend::new();
        let mut handler = GenericHandler::new(Arc::new(mock.clone()), temp.path(), TemplateParams::new());
        let report = handler
            .apply_directory(&temp.path().join("auth"), &ApplyContext::default())
            .unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].resource, "auth/approle/role/app");
        assert!(report.pruned.is_empty());
        assert_eq!(mock.calls(), vec![MockCall::Write("auth/approle/role/app".into())]);
        assert_eq!(
            mock.secret("auth/approle/role/app"),
            Some(object(json!({"token_ttl": "1h"})))
        );
    }

    #[test]
    fn test_dry_run_reads_but_never_writes() {
        let mock = MockBackend::new();
        mock.add_secret("secret/same", object(json!({"a": 1})));
        let handler = GenericHandler::new(Arc::new(mock.clone()), "/docs", TemplateParams::new());
        let ctx = ApplyContext::new(true);

        let same = handler.ensure("secret/same", &object(json!({"a": 1})), &ctx).unwrap();
        assert_eq!(same, ApplyResult::NoChange);

        let changed = handler.ensure("secret/new", &object(json!({"a": 2})), &ctx).unwrap();
        assert_eq!(changed, ApplyResult::dry_run());
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_write_failure_names_path() {
        let mock = MockBackend::new();
        mock.fail_on("secret/app");
        let handler = GenericHandler::new(Arc::new(mock), "/docs", TemplateParams::new());

        let err = handler
            .ensure("secret/app", &Map::new(), &ApplyContext::default())
            .unwrap_err();
        assert!(err.to_string().contains("secret/app"));
    }
}

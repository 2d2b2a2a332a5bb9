//! Structure Service - the engine's driving port.
//!
//! Hosts build one service with the adapters they have and call it per run:
//!
//! 1. Build the root variable scope (built-ins, then caller values)
//! 2. Hand the schema to the engine strategy for the use case
//! 3. Return the structured result; node failures are inside it, not `Err`

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::{
    application::{
        ApplicationError,
        engine::{
            CreateOptions,
            materialize::{self, Collaborators},
            preview, undo,
        },
        lint::{self, SchemaReport},
        ports::{ContentGenerator, Fetcher, Filesystem, HookRunner},
    },
    domain::{
        CreateResult, CreatedItem, DiffResult, EngineLimits, SchemaNode, SchemaTree, UndoResult,
        ValidationError, ValidationRule, VariableScope, substitute, validate_name,
        validate_variables,
    },
    error::TrellisResult,
};

/// Caller-supplied variable values, keyed by name in any case.
pub type Variables = BTreeMap<String, String>;

/// Main engine service.
///
/// Only a filesystem is required. Without a fetcher, URL files fail per
/// node; without a generator, generated files do; without a hook runner,
/// hooks are logged as skipped.
pub struct StructureService {
    filesystem: Box<dyn Filesystem>,
    fetcher: Option<Box<dyn Fetcher>>,
    generator: Option<Box<dyn ContentGenerator>>,
    hooks: Option<Box<dyn HookRunner>>,
    limits: EngineLimits,
}

impl StructureService {
    /// Create a service over the given filesystem with default limits.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use trellis_core::application::StructureService;
    ///
    /// let service = StructureService::new(filesystem) // impl Filesystem
    ///     .with_fetcher(fetcher)                      // impl Fetcher
    ///     .with_hook_runner(hooks);                   // impl HookRunner
    /// ```
    pub fn new(filesystem: Box<dyn Filesystem>) -> Self {
        Self {
            filesystem,
            fetcher: None,
            generator: None,
            hooks: None,
            limits: EngineLimits::default(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_generator(mut self, generator: Box<dyn ContentGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_hook_runner(mut self, hooks: Box<dyn HookRunner>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    /// Materialize `tree` under `output_root`.
    ///
    /// `project_name` feeds `%PROJECT_NAME%`; when absent, the root folder's
    /// substituted name is used.
    #[instrument(
        skip_all,
        fields(
            output_root = %output_root.as_ref().display(),
            dry_run = options.dry_run,
            overwrite = options.overwrite
        )
    )]
    pub fn create(
        &self,
        tree: &SchemaTree,
        output_root: impl AsRef<Path>,
        variables: &Variables,
        project_name: Option<&str>,
        options: CreateOptions,
    ) -> TrellisResult<CreateResult> {
        let output_root = require_root(output_root.as_ref())?;
        let scope = root_scope(tree, variables, project_name);

        info!(vars = variables.len(), "Creating structure");
        let with = Collaborators {
            fetcher: self.fetcher.as_deref(),
            generator: self.generator.as_deref(),
            hooks: self.hooks.as_deref(),
        };
        Ok(materialize::materialize(
            tree,
            output_root,
            &scope,
            self.filesystem.as_ref(),
            with,
            &self.limits,
            options,
        ))
    }

    /// Compute what [`create`](Self::create) would do, as a diff tree.
    #[instrument(skip_all, fields(output_root = %output_root.as_ref().display(), overwrite = overwrite))]
    pub fn preview(
        &self,
        tree: &SchemaTree,
        output_root: impl AsRef<Path>,
        variables: &Variables,
        project_name: Option<&str>,
        overwrite: bool,
    ) -> TrellisResult<DiffResult> {
        let output_root = require_root(output_root.as_ref())?;
        let scope = root_scope(tree, variables, project_name);
        Ok(preview::preview(
            tree,
            output_root,
            &scope,
            self.filesystem.as_ref(),
            &self.limits,
            overwrite,
        ))
    }

    /// Remove what a previous real run created.
    ///
    /// Fails up front when the filesystem cannot delete.
    pub fn undo(&self, items: &[CreatedItem], dry_run: bool) -> TrellisResult<UndoResult> {
        undo::undo(items, self.filesystem.as_ref(), dry_run)
    }

    /// Check `values` against `rules`. An empty result means every rule passed.
    pub fn validate(
        &self,
        values: &Variables,
        rules: &BTreeMap<String, ValidationRule>,
    ) -> Vec<ValidationError> {
        let scope = VariableScope::from_pairs(values);
        let errors = validate_variables(&scope, rules, self.limits.pattern_limits());
        debug!(rules = rules.len(), errors = errors.len(), "Variables validated");
        errors
    }

    /// Lint `tree` without touching the filesystem.
    pub fn check(&self, tree: &SchemaTree, variables: &Variables) -> SchemaReport {
        let scope = VariableScope::from_pairs(variables);
        lint::check_schema(tree, &scope, &self.limits)
    }
}

// -------------------------------------------------------------------------
// Internal Helpers
// -------------------------------------------------------------------------

fn require_root(output_root: &Path) -> TrellisResult<&Path> {
    if output_root.as_os_str().is_empty() {
        return Err(ApplicationError::NoOutputRoot.into());
    }
    Ok(output_root)
}

fn root_scope(
    tree: &SchemaTree,
    variables: &Variables,
    project_name: Option<&str>,
) -> VariableScope<'static> {
    let derived;
    let project_name = match project_name {
        Some(name) => Some(name),
        None => {
            derived = derived_project_name(tree, variables);
            derived.as_deref()
        }
    };
    VariableScope::with_builtins(project_name, variables)
}

/// The root folder's name after substitution, when it is a usable name.
fn derived_project_name(tree: &SchemaTree, variables: &Variables) -> Option<String> {
    let SchemaNode::Folder(folder) = &tree.root else {
        return None;
    };
    let scope = VariableScope::with_builtins(None, variables);
    let name = substitute(&folder.name, &scope);
    validate_name(&name).is_ok().then_some(name)
}

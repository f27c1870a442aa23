// crates/regolib-core/src/library.rs
// ============================================================================
// Module: Policy Library
// Description: Facade over bundle loading, catalogs, evaluation, and data.
// Purpose: Expose rules, controls, and frameworks as evaluable objects.
// Dependencies: regolib-config, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`PolicyLibrary`] owns the policy engine and its data channel. A load
//! unpacks the bundle, instantiates the engine, primes it with the seed data,
//! registers rules, and loads the control and framework catalogs. Evaluation
//! is only possible once the library is [`LibraryState::Ready`]; a failed
//! load leaves it [`LibraryState::Failed`] until the next load succeeds.
//!
//! Control inputs and result settings live in the engine's data document and
//! are only ever changed through the data channel, so the engine and the
//! library never disagree about them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use regolib_config::RegolibConfig;
use regolib_config::ResultLevel;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::bundle::Bundle;
use crate::bundle::BundleError;
use crate::data::DataChannel;
use crate::data::DataError;
use crate::engine::EngineError;
use crate::engine::PolicyEngine;
use crate::engine::PolicyRuntime;
use crate::engine::invoke;
use crate::entrypoint::EntrypointKind;
use crate::entrypoint::EntrypointRegistry;
use crate::entrypoint::RESULT_FIELD;
use crate::entrypoint::format_entrypoint;
use crate::entrypoint::normalize_name;
use crate::metadata::CatalogEntry;
use crate::metadata::ControlInputOption;
use crate::metadata::discover_controls_inputs;
use crate::metadata::load_catalog;
use crate::metadata::rule_metadata;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Data document key holding result settings.
const SETTINGS_KEY: &str = "settings";
/// Settings flag enabling verbose findings.
const VERBOSE_SETTING: &str = "verbose";
/// Settings flag enabling finding metadata.
const METADATA_SETTING: &str = "metadata";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy library errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The library is not in the ready state.
    #[error("policy not loaded")]
    PolicyNotLoaded,
    /// No entry point exists for the requested object.
    #[error("{} not found: {name}", .kind.map_or("entrypoint", EntrypointKind::label))]
    EntrypointNotFound {
        /// Object kind, when the lookup was kind-qualified.
        kind: Option<EntrypointKind>,
        /// Requested name or entry point.
        name: String,
    },
    /// The bundle could not be loaded.
    #[error("failed to load policy: {0}")]
    PolicyLoad(#[from] BundleError),
    /// A control input received a value of the wrong shape.
    #[error("controls input `{name}` must be a string or an array of strings")]
    ControlsInputValue {
        /// Control input name.
        name: String,
    },
    /// No control input with this name was discovered.
    #[error("controls input not found: {0}")]
    ControlsInputNotFound(String),
    /// The policy engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The data channel failed.
    #[error(transparent)]
    Data(#[from] DataError),
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Lifecycle of a policy library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryState {
    /// No load has been attempted.
    Unloaded,
    /// A load is in progress.
    Loading,
    /// A policy is loaded and evaluable.
    Ready,
    /// The last load failed.
    Failed,
}

/// Everything produced by a successful load.
struct LoadedPolicy {
    /// Policy engine.
    engine: Box<dyn PolicyEngine>,
    /// Engine data document.
    data: DataChannel,
    /// Rules keyed by normalized name.
    rules: BTreeMap<String, CatalogEntry>,
    /// Controls keyed by control identifier.
    controls: BTreeMap<String, CatalogEntry>,
    /// Frameworks keyed by framework name.
    frameworks: BTreeMap<String, CatalogEntry>,
    /// Discovered control inputs keyed by option name.
    controls_inputs: BTreeMap<String, ControlInputOption>,
}

impl LoadedPolicy {
    /// Returns the catalog for `kind`.
    const fn catalog(&self, kind: EntrypointKind) -> &BTreeMap<String, CatalogEntry> {
        match kind {
            EntrypointKind::Rules => &self.rules,
            EntrypointKind::Controls => &self.controls,
            EntrypointKind::Frameworks => &self.frameworks,
        }
    }

    /// Mutates the data document and re-primes the engine.
    fn update_data<F>(&mut self, mutate: F) -> Result<(), DataError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        self.data.update(self.engine.as_mut(), mutate)
    }

    /// Writes the result settings for `level`.
    fn set_result_level(&mut self, level: ResultLevel) -> Result<(), DataError> {
        self.update_data(|root| {
            with_object(root, SETTINGS_KEY, |settings| {
                settings.insert(VERBOSE_SETTING.to_string(), Value::Bool(level.verbose()));
                settings.insert(METADATA_SETTING.to_string(), Value::Bool(level.metadata()));
            });
        })
    }
}

// ============================================================================
// SECTION: Library
// ============================================================================

/// Policy library facade.
pub struct PolicyLibrary {
    /// Runtime used to instantiate engines.
    runtime: Box<dyn PolicyRuntime>,
    /// Library configuration.
    config: RegolibConfig,
    /// Lifecycle state.
    state: LibraryState,
    /// Loaded policy when ready.
    loaded: Option<LoadedPolicy>,
}

impl PolicyLibrary {
    /// Creates an unloaded library.
    #[must_use]
    pub fn new(runtime: Box<dyn PolicyRuntime>, config: RegolibConfig) -> Self {
        Self {
            runtime,
            config,
            state: LibraryState::Unloaded,
            loaded: None,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LibraryState {
        self.state
    }

    /// Returns the library configuration.
    #[must_use]
    pub const fn config(&self) -> &RegolibConfig {
        &self.config
    }

    /// Loads a policy bundle, replacing any previously loaded policy.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] when the bundle, engine, or seed data fails.
    /// The library is left [`LibraryState::Failed`].
    pub fn load(&mut self, archive: &[u8]) -> Result<(), LibraryError> {
        self.state = LibraryState::Loading;
        self.loaded = None;
        match self.load_policy(archive) {
            Ok(loaded) => {
                tracing::debug!(
                    rules = loaded.rules.len(),
                    controls = loaded.controls.len(),
                    frameworks = loaded.frameworks.len(),
                    controls_inputs = loaded.controls_inputs.len(),
                    "policy library ready"
                );
                self.loaded = Some(loaded);
                self.state = LibraryState::Ready;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "policy load failed");
                self.state = LibraryState::Failed;
                Err(err)
            }
        }
    }

    /// Runs every load step in order.
    fn load_policy(&self, archive: &[u8]) -> Result<LoadedPolicy, LibraryError> {
        let bundle = Bundle::from_archive(archive, &self.config.bundle)?;
        let mut engine = self.runtime.instantiate(&bundle.policy().bytes)?;
        let data = match bundle.data() {
            Some(entry) => {
                engine.set_data(&entry.bytes)?;
                DataChannel::new(Some(entry.bytes.clone()))
            }
            None => DataChannel::new(None),
        };
        let registry = EntrypointRegistry::scan(engine.entrypoints().keys().map(String::as_str));
        let rules = load_rules(&registry, &bundle);
        let controls = load_catalog(engine.as_ref(), EntrypointKind::Controls)?;
        let frameworks = load_catalog(engine.as_ref(), EntrypointKind::Frameworks)?;
        let controls_inputs = discover_controls_inputs(rules.values());
        let mut loaded = LoadedPolicy {
            engine,
            data,
            rules,
            controls,
            frameworks,
            controls_inputs,
        };
        if let Some(level) = self.config.library.result_level {
            loaded.set_result_level(level)?;
        }
        Ok(loaded)
    }

    /// Returns the loaded policy or [`LibraryError::PolicyNotLoaded`].
    fn ready(&self) -> Result<&LoadedPolicy, LibraryError> {
        match (&self.state, &self.loaded) {
            (LibraryState::Ready, Some(loaded)) => Ok(loaded),
            _ => Err(LibraryError::PolicyNotLoaded),
        }
    }

    /// Mutable form of [`Self::ready`].
    fn ready_mut(&mut self) -> Result<&mut LoadedPolicy, LibraryError> {
        match (&self.state, &mut self.loaded) {
            (LibraryState::Ready, Some(loaded)) => Ok(loaded),
            _ => Err(LibraryError::PolicyNotLoaded),
        }
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    /// Evaluates the entry point formed from `parts` and returns its result.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::PolicyNotLoaded`] before a successful load,
    /// [`LibraryError::EntrypointNotFound`] for unknown entry points, and
    /// [`LibraryError::Engine`] when evaluation fails.
    pub fn evaluate<I, S>(&self, parts: I, input: &Value) -> Result<Value, LibraryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let loaded = self.ready()?;
        let entrypoint = format_entrypoint(parts);
        let Some(handle) = loaded.engine.entrypoints().get(&entrypoint).copied() else {
            return Err(LibraryError::EntrypointNotFound {
                kind: None,
                name: entrypoint,
            });
        };
        Ok(invoke(loaded.engine.as_ref(), &entrypoint, handle, input)?)
    }

    /// Evaluates an object of `kind` and narrows the result to `deny`.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::EntrypointNotFound`] naming the object when it
    /// has no entry point, plus the errors of [`Self::evaluate`].
    pub fn evaluate_kind(
        &self,
        kind: EntrypointKind,
        name: &str,
        input: &Value,
    ) -> Result<Value, LibraryError> {
        match self.evaluate(kind.entrypoint_parts(name), input) {
            Ok(Value::Object(mut result)) => Ok(result.remove(RESULT_FIELD).unwrap_or(Value::Null)),
            Ok(_) => Ok(Value::Null),
            Err(LibraryError::EntrypointNotFound {
                kind: None, ..
            }) => Err(LibraryError::EntrypointNotFound {
                kind: Some(kind),
                name: name.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    /// Evaluates a rule.
    ///
    /// # Errors
    ///
    /// See [`Self::evaluate_kind`].
    pub fn evaluate_rule(&self, name: &str, input: &Value) -> Result<Value, LibraryError> {
        self.evaluate_kind(EntrypointKind::Rules, name, input)
    }

    /// Evaluates a control.
    ///
    /// # Errors
    ///
    /// See [`Self::evaluate_kind`].
    pub fn evaluate_control(&self, name: &str, input: &Value) -> Result<Value, LibraryError> {
        self.evaluate_kind(EntrypointKind::Controls, name, input)
    }

    /// Evaluates a framework.
    ///
    /// # Errors
    ///
    /// See [`Self::evaluate_kind`].
    pub fn evaluate_framework(&self, name: &str, input: &Value) -> Result<Value, LibraryError> {
        self.evaluate_kind(EntrypointKind::Frameworks, name, input)
    }

    // ------------------------------------------------------------------------
    // Catalogs
    // ------------------------------------------------------------------------

    /// Looks up a catalog object by kind and name.
    ///
    /// Rules also match by normalized name.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::PolicyNotLoaded`] before a successful load and
    /// [`LibraryError::EntrypointNotFound`] for unknown objects.
    pub fn lookup(&self, kind: EntrypointKind, name: &str) -> Result<Evaluable<'_>, LibraryError> {
        let catalog = self.ready()?.catalog(kind);
        let entry = catalog
            .get(name)
            .or_else(|| catalog.get(&normalize_name(name)))
            .ok_or_else(|| LibraryError::EntrypointNotFound {
                kind: Some(kind),
                name: name.to_string(),
            })?;
        Ok(Evaluable {
            library: self,
            kind,
            entry,
        })
    }

    /// Iterates the catalog of `kind`; empty unless ready.
    pub fn entries(&self, kind: EntrypointKind) -> impl Iterator<Item = Evaluable<'_>> {
        self.ready()
            .ok()
            .into_iter()
            .flat_map(move |loaded| loaded.catalog(kind).values())
            .map(move |entry| Evaluable {
                library: self,
                kind,
                entry,
            })
    }

    /// Iterates rules.
    pub fn rules(&self) -> impl Iterator<Item = Evaluable<'_>> {
        self.entries(EntrypointKind::Rules)
    }

    /// Iterates controls.
    pub fn controls(&self) -> impl Iterator<Item = Evaluable<'_>> {
        self.entries(EntrypointKind::Controls)
    }

    /// Iterates frameworks.
    pub fn frameworks(&self) -> impl Iterator<Item = Evaluable<'_>> {
        self.entries(EntrypointKind::Frameworks)
    }

    // ------------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------------

    /// Returns the current data document.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] before a successful load or when the retained
    /// data cannot be decoded.
    pub fn data(&self) -> Result<&Value, LibraryError> {
        Ok(self.ready()?.data.document()?)
    }

    /// Iterates discovered control inputs; empty unless ready.
    pub fn controls_inputs(&self) -> impl Iterator<Item = &ControlInputOption> {
        self.ready().ok().into_iter().flat_map(|loaded| loaded.controls_inputs.values())
    }

    /// Returns a read handle for one control input.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::ControlsInputNotFound`] for unknown options.
    pub fn controls_input(&self, name: &str) -> Result<ControlInput<'_>, LibraryError> {
        let option = self
            .ready()?
            .controls_inputs
            .get(name)
            .ok_or_else(|| LibraryError::ControlsInputNotFound(name.to_string()))?;
        Ok(ControlInput {
            library: self,
            option,
        })
    }

    /// Returns a write handle for one control input.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::ControlsInputNotFound`] for unknown options.
    pub fn controls_input_mut(&mut self, name: &str) -> Result<ControlInputMut<'_>, LibraryError> {
        if !self.ready()?.controls_inputs.contains_key(name) {
            return Err(LibraryError::ControlsInputNotFound(name.to_string()));
        }
        Ok(ControlInputMut {
            library: self,
            name: name.to_string(),
        })
    }

    /// Returns every control input value currently in the data document.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] before a successful load or when the data
    /// cannot be decoded.
    pub fn get_controls_inputs(&self) -> Result<Map<String, Value>, LibraryError> {
        let key = &self.config.library.controls_inputs_key;
        match self.data()?.get(key) {
            Some(Value::Object(inputs)) => Ok(inputs.clone()),
            _ => Ok(Map::new()),
        }
    }

    /// Replaces every control input value.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::ControlsInputValue`] when any value is not a
    /// string or an array of strings; nothing is written in that case.
    pub fn set_controls_inputs(&mut self, inputs: Map<String, Value>) -> Result<(), LibraryError> {
        for (name, value) in &inputs {
            validate_input_value(name, value)?;
        }
        let key = self.config.library.controls_inputs_key.clone();
        self.ready_mut()?.update_data(|root| {
            root.insert(key, Value::Object(inputs));
        })?;
        Ok(())
    }

    /// Writes one control input value.
    fn set_controls_input(&mut self, name: &str, value: Value) -> Result<(), LibraryError> {
        validate_input_value(name, &value)?;
        let key = self.config.library.controls_inputs_key.clone();
        self.ready_mut()?.update_data(|root| {
            with_object(root, &key, |inputs| {
                inputs.insert(name.to_string(), value);
            });
        })?;
        Ok(())
    }

    /// Sets the result verbosity.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError`] before a successful load or when the engine
    /// rejects the updated data.
    pub fn set_result_level(&mut self, level: ResultLevel) -> Result<(), LibraryError> {
        self.ready_mut()?.set_result_level(level)?;
        Ok(())
    }

    /// Enables verbose findings and metadata.
    ///
    /// # Errors
    ///
    /// See [`Self::set_result_level`].
    pub fn set_result_level_verbose(&mut self) -> Result<(), LibraryError> {
        self.set_result_level(ResultLevel::Verbose)
    }

    /// Enables metadata without verbose findings.
    ///
    /// # Errors
    ///
    /// See [`Self::set_result_level`].
    pub fn set_result_level_normal(&mut self) -> Result<(), LibraryError> {
        self.set_result_level(ResultLevel::Normal)
    }

    /// Disables verbose findings and metadata.
    ///
    /// # Errors
    ///
    /// See [`Self::set_result_level`].
    pub fn set_result_level_minimal(&mut self) -> Result<(), LibraryError> {
        self.set_result_level(ResultLevel::Minimal)
    }
}

// ============================================================================
// SECTION: Handles
// ============================================================================

/// Catalog object bound to its library.
#[derive(Clone, Copy)]
pub struct Evaluable<'a> {
    /// Owning library.
    library: &'a PolicyLibrary,
    /// Object kind.
    kind: EntrypointKind,
    /// Catalog entry.
    entry: &'a CatalogEntry,
}

impl<'a> Evaluable<'a> {
    /// Returns the object kind.
    #[must_use]
    pub const fn kind(&self) -> EntrypointKind {
        self.kind
    }

    /// Returns the object name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.entry.name
    }

    /// Returns the object metadata.
    #[must_use]
    pub const fn metadata(&self) -> &'a Map<String, Value> {
        &self.entry.metadata
    }

    /// Evaluates the object against `input`.
    ///
    /// # Errors
    ///
    /// See [`PolicyLibrary::evaluate_kind`].
    pub fn evaluate(&self, input: &Value) -> Result<Value, LibraryError> {
        self.library.evaluate_kind(self.kind, &self.entry.name, input)
    }
}

/// Read handle for one control input.
#[derive(Clone, Copy)]
pub struct ControlInput<'a> {
    /// Owning library.
    library: &'a PolicyLibrary,
    /// Discovered option.
    option: &'a ControlInputOption,
}

impl<'a> ControlInput<'a> {
    /// Returns the discovered option.
    #[must_use]
    pub const fn option(&self) -> &'a ControlInputOption {
        self.option
    }

    /// Returns the current value, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Data`] when the data cannot be decoded.
    pub fn get(&self) -> Result<Option<Value>, LibraryError> {
        Ok(self.library.get_controls_inputs()?.remove(&self.option.name))
    }
}

/// Write handle for one control input.
pub struct ControlInputMut<'a> {
    /// Owning library.
    library: &'a mut PolicyLibrary,
    /// Option name.
    name: String,
}

impl ControlInputMut<'_> {
    /// Returns the current value, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Data`] when the data cannot be decoded.
    pub fn get(&self) -> Result<Option<Value>, LibraryError> {
        Ok(self.library.get_controls_inputs()?.remove(&self.name))
    }

    /// Writes a new value and re-primes the engine.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::ControlsInputValue`] for values that are not a
    /// string or an array of strings.
    pub fn set(self, value: Value) -> Result<(), LibraryError> {
        self.library.set_controls_input(&self.name, value)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Registers every scanned rule with its annotation metadata.
fn load_rules(registry: &EntrypointRegistry, bundle: &Bundle) -> BTreeMap<String, CatalogEntry> {
    let sources: BTreeMap<String, &[u8]> =
        bundle.rule_sources().map(|rule| (normalize_name(rule.name), rule.source)).collect();
    registry
        .rules()
        .map(|name| {
            let metadata = sources
                .get(name)
                .map_or_else(Map::new, |source| rule_metadata(name, source));
            (
                name.to_string(),
                CatalogEntry {
                    name: name.to_string(),
                    metadata,
                },
            )
        })
        .collect()
}

/// Rejects control input values that are not strings or string arrays.
fn validate_input_value(name: &str, value: &Value) -> Result<(), LibraryError> {
    let valid = match value {
        Value::String(_) => true,
        Value::Array(items) => items.iter().all(Value::is_string),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(LibraryError::ControlsInputValue {
            name: name.to_string(),
        })
    }
}

/// Runs `apply` on the object at `key`, replacing non-objects with `{}`.
fn with_object<F>(root: &mut Map<String, Value>, key: &str, apply: F)
where
    F: FnOnce(&mut Map<String, Value>),
{
    let slot = root.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(object) = slot {
        apply(object);
    }
}

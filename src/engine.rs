//! The migration engine.
//!
//! Two passes per target: the first visits every source file and template
//! and only gathers evidence; once everything has been seen, a decision
//! table picks exactly one rewrite strategy, which is then realized through
//! the import manager and the structural edit utilities. Anything the
//! engine cannot rewrite safely becomes a [`Failure`] instead of a guess.

use crate::changes::{ChangeSet, available_path};
use crate::config::{GESTURE_CONFIG_FILE_STEM, GESTURE_CONFIG_TEMPLATE, LegacyApi};
use crate::edits::{remove_list_element, remove_markup_node};
use crate::imports::{BindingForm, ImportManager};
use crate::project::Target;
use crate::source::{SourceUnit, offset_to_line_col, relative_specifier};
use crate::template::{MarkupDoc, TemplateScanner, TemplateUsage, legacy_script_ranges};
use anyhow::Result;
use serde::Serialize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// A change the engine declined to make automatically, or a note about the
/// decision it took. Never aborts the run.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    pub message: String,
    #[serde(skip)]
    offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Nothing to do; explains the decision.
    Info,
    /// Manual cleanup needed.
    Warning,
}

/// The one project-wide rewrite strategy chosen after all evidence is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Custom setup exists and templates are clean: drop only the
    /// deprecated config class, keep the custom setup and the dependency.
    RemoveConfigOnly,
    /// Custom setup and template usage coexist; which configuration serves
    /// which event cannot be told apart, so nothing is changed.
    NoChangeAmbiguous,
    /// Pure runtime usage: drop the config class and the module wiring,
    /// keep the library.
    RemoveConfigAndModule,
    /// Standard events only: register the integration module, drop the
    /// deprecated config class.
    RegisterModule,
    /// Custom events in templates: copy the config into the project,
    /// repoint every reference, wire provider and module into the root.
    RelocateConfig,
    /// No usage at all: remove imports, config, wiring and script tags.
    RemoveEverything,
}

impl Strategy {
    pub fn describe(&self) -> &'static str {
        match self {
            Strategy::RemoveConfigOnly => {
                "custom gesture setup detected; removing only the deprecated config class"
            }
            Strategy::NoChangeAmbiguous => {
                "custom gesture setup and template gesture events coexist; no automated change"
            }
            Strategy::RemoveConfigAndModule => {
                "library used at runtime only; removing config class and module wiring"
            }
            Strategy::RegisterModule => {
                "standard gesture events in templates; registering the integration module"
            }
            Strategy::RelocateConfig => {
                "custom gesture events in templates; relocating the gesture config into the project"
            }
            Strategy::RemoveEverything => "no gesture usage found; removing the integration",
        }
    }
}

/// Per-target result consumed by the workspace aggregator.
#[derive(Debug, Serialize)]
pub struct TargetOutcome {
    pub root: PathBuf,
    pub strategy: Strategy,
    /// Whether this target still needs the legacy library after migration.
    pub legacy_needed: bool,
    pub failures: Vec<Failure>,
    pub files_scanned: usize,
    pub templates_scanned: usize,
}

/// One reference to the deprecated configuration class.
struct ConfigRef<'t> {
    unit: &'t SourceUnit,
    node: Node<'t>,
    /// Module specifier the binding came from, as written.
    module: String,
    in_import_clause: bool,
}

/// Classification of an object literal binding the gesture config token.
enum ProviderShape<'t> {
    /// `{ provide: <token>, useClass: <class> }`
    Recognized {
        object: Node<'t>,
        class_node: Node<'t>,
        class_is_config: bool,
    },
    /// Binds the token some other way (factory, value, …).
    Unrecognized { object: Node<'t> },
}

struct Provider<'t> {
    unit: &'t SourceUnit,
    shape: ProviderShape<'t>,
}

/// An integration-module entry in some module's `imports` array.
struct Wiring<'t> {
    unit: &'t SourceUnit,
    element: Node<'t>,
}

struct LibraryImport<'t> {
    unit: &'t SourceUnit,
    decl_range: Range<usize>,
}

struct RootModule<'t> {
    unit: &'t SourceUnit,
    object: Node<'t>,
    imports_array: Option<Node<'t>>,
    providers_array: Option<Node<'t>>,
}

/// Everything pass 1 learned about one target. Consumed exactly once by
/// [`decide`] and the strategy application.
struct Evidence<'t> {
    has_custom_setup: bool,
    usage: TemplateUsage,
    used_at_runtime: bool,
    config_refs: Vec<ConfigRef<'t>>,
    providers: Vec<Provider<'t>>,
    wirings: Vec<Wiring<'t>>,
    library_imports: Vec<LibraryImport<'t>>,
    root_module: Option<RootModule<'t>>,
    scripts: Vec<(&'t MarkupDoc, Node<'t>)>,
}

/// Runs the whole migration for one target, proposing edits into `changes`.
pub fn run_target(api: &LegacyApi, target: &Target, changes: &mut ChangeSet) -> Result<TargetOutcome> {
    let mut units = Vec::with_capacity(target.sources.len());
    for path in &target.sources {
        units.push(SourceUnit::load(path)?);
    }
    let mut docs = Vec::with_capacity(target.templates.len());
    for path in &target.templates {
        docs.push(MarkupDoc::load(path)?);
    }

    let mut manager = ImportManager::new();
    let evidence = collect_evidence(api, &units, &docs, &mut manager);
    let strategy = decide(
        evidence.has_custom_setup,
        evidence.usage,
        evidence.used_at_runtime,
    );

    let legacy_needed =
        evidence.has_custom_setup || evidence.usage.any() || evidence.used_at_runtime;

    let mut failures = apply_strategy(api, strategy, &evidence, &mut manager, changes, target)?;
    manager.commit(changes)?;

    // Whole-declaration import edits shift line numbers; diagnostics were
    // recorded before commit and have to be corrected.
    for failure in &mut failures {
        failure.line = manager.correct_line(&failure.file, failure.offset, failure.line);
    }

    Ok(TargetOutcome {
        root: target.root.clone(),
        strategy,
        legacy_needed,
        failures,
        files_scanned: units.len(),
        templates_scanned: docs.len(),
    })
}

/// The decision table. Evaluated once, after every file has been visited.
fn decide(has_custom_setup: bool, usage: TemplateUsage, used_at_runtime: bool) -> Strategy {
    if has_custom_setup {
        if usage.any() {
            Strategy::NoChangeAmbiguous
        } else {
            Strategy::RemoveConfigOnly
        }
    } else if usage.custom_events {
        Strategy::RelocateConfig
    } else if usage.standard_events {
        Strategy::RegisterModule
    } else if used_at_runtime {
        Strategy::RemoveConfigAndModule
    } else {
        Strategy::RemoveEverything
    }
}

fn collect_evidence<'t>(
    api: &LegacyApi,
    units: &'t [SourceUnit],
    docs: &'t [MarkupDoc],
    manager: &mut ImportManager,
) -> Evidence<'t> {
    let mut ev = Evidence {
        has_custom_setup: false,
        usage: TemplateUsage::default(),
        used_at_runtime: false,
        config_refs: Vec::new(),
        providers: Vec::new(),
        wirings: Vec::new(),
        library_imports: Vec::new(),
        root_module: None,
        scripts: Vec::new(),
    };

    for doc in docs {
        let mut scanner = TemplateScanner::new(api);
        ev.usage.merge(scanner.scan(doc));
        for range in legacy_script_ranges(doc, api) {
            if let Some(node) = node_at_range(doc.root(), &range) {
                ev.scripts.push((doc, node));
            }
        }
    }

    for unit in units {
        // Imports of the legacy library itself. A side-effect import is
        // setup; bound symbols mean runtime usage.
        let records = manager.analyze(unit).to_vec();
        for record in &records {
            if record.normalized != api.library_module {
                continue;
            }
            if !matches!(record.form, BindingForm::SideEffect) {
                ev.used_at_runtime = true;
            }
            ev.library_imports.push(LibraryImport {
                unit,
                decl_range: record.decl_range.clone(),
            });
        }

        // One read-only sweep collecting the nodes of interest; bindings
        // are resolved afterwards, the import table in hand.
        let mut identifiers = Vec::new();
        let mut objects = Vec::new();
        let mut decorators = Vec::new();
        let mut window_global = false;
        crate::source::walk(unit.root(), &mut |node| {
            match node.kind() {
                "identifier" | "type_identifier" => identifiers.push(node),
                "object" => objects.push(node),
                "decorator" => decorators.push(node),
                "property_identifier" => {
                    if unit.text_of(node) == api.global_name
                        && let Some(parent) = node.parent()
                        && parent.kind() == "member_expression"
                        && parent
                            .child_by_field_name("object")
                            .is_some_and(|o| unit.text_of(o) == "window")
                    {
                        window_global = true;
                    }
                }
                _ => {}
            }
            true
        });
        if window_global {
            ev.used_at_runtime = true;
        }

        for node in identifiers {
            let text = unit.text_of(node);
            if let Some(binding) = manager.binding_of(unit, text) {
                if binding.bound_name == api.config_class && api.is_config_module(&binding.module)
                {
                    ev.config_refs.push(ConfigRef {
                        unit,
                        node,
                        module: binding.module,
                        in_import_clause: within_import_clause(node),
                    });
                }
            } else if node.kind() == "identifier"
                && text == api.global_name
                && !is_declaration_name(node)
            {
                ev.used_at_runtime = true;
            }
        }

        for object in objects {
            if let Some(shape) = classify_provider(api, unit, object, manager) {
                // Anything binding the token to other than the deprecated
                // config class is a custom setup, factories and values
                // included.
                if !matches!(
                    shape,
                    ProviderShape::Recognized {
                        class_is_config: true,
                        ..
                    }
                ) {
                    ev.has_custom_setup = true;
                }
                ev.providers.push(Provider { unit, shape });
            }
        }

        for decorator in decorators {
            inspect_decorator(api, unit, decorator, manager, &mut ev);
        }
    }

    ev
}

/// Classifies an object literal as a gesture-config provider, if it is one.
///
/// Objects that do not bind the configured token at all are nobody's
/// business and return `None`.
fn classify_provider<'t>(
    api: &LegacyApi,
    unit: &SourceUnit,
    object: Node<'t>,
    manager: &mut ImportManager,
) -> Option<ProviderShape<'t>> {
    let pairs = object_pairs(object, unit);
    let (_, token_value) = pairs.iter().find(|(key, _)| key == "provide")?;
    if token_value.kind() != "identifier" {
        return None;
    }
    let binding = manager.binding_of(unit, unit.text_of(*token_value))?;
    if binding.bound_name != api.config_token || binding.module != api.framework_module {
        return None;
    }

    match pairs
        .iter()
        .find(|(key, value)| key == "useClass" && value.kind() == "identifier")
    {
        Some((_, class_node)) => {
            let class_is_config = manager
                .binding_of(unit, unit.text_of(*class_node))
                .is_some_and(|b| {
                    b.bound_name == api.config_class && api.is_config_module(&b.module)
                });
            Some(ProviderShape::Recognized {
                object,
                class_node: *class_node,
                class_is_config,
            })
        }
        None => Some(ProviderShape::Unrecognized { object }),
    }
}

fn inspect_decorator<'t>(
    api: &LegacyApi,
    unit: &'t SourceUnit,
    decorator: Node<'t>,
    manager: &mut ImportManager,
    ev: &mut Evidence<'t>,
) {
    let Some(call) = decorator.named_child(0).filter(|c| c.kind() == "call_expression") else {
        return;
    };
    let Some(function) = call.child_by_field_name("function") else {
        return;
    };
    let name = unit.text_of(function);
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return;
    };
    let Some(object) = first_named_child_of_kind(arguments, "object") else {
        return;
    };

    match name {
        "NgModule" => {
            let pairs = object_pairs(object, unit);
            let imports_array = pairs
                .iter()
                .find(|(k, v)| k == "imports" && v.kind() == "array")
                .map(|(_, v)| *v);
            let providers_array = pairs
                .iter()
                .find(|(k, v)| k == "providers" && v.kind() == "array")
                .map(|(_, v)| *v);

            if let Some(array) = imports_array {
                let mut cursor = array.walk();
                for element in array.named_children(&mut cursor) {
                    if element.kind() == "identifier"
                        && manager.binding_of(unit, unit.text_of(element)).is_some_and(|b| {
                            b.bound_name == api.integration_module
                                && b.module == api.framework_module
                        })
                    {
                        ev.wirings.push(Wiring { unit, element });
                    }
                }
            }

            let has_bootstrap = pairs.iter().any(|(k, _)| k == "bootstrap");
            if has_bootstrap && ev.root_module.is_none() {
                ev.root_module = Some(RootModule {
                    unit,
                    object,
                    imports_array,
                    providers_array,
                });
            }
        }
        "Component" => {
            // Inline templates count towards the usage evidence; files
            // referenced by templateUrl are already covered by the
            // target-wide template scan.
            let pairs = object_pairs(object, unit);
            if let Some((_, value)) = pairs
                .iter()
                .find(|(k, v)| k == "template" && matches!(v.kind(), "string" | "template_string"))
            {
                let range = value.byte_range();
                if range.len() >= 2 {
                    let inner = unit.text[range.start + 1..range.end - 1].to_string();
                    if let Ok(doc) = MarkupDoc::parse(&unit.path, inner) {
                        let mut scanner = TemplateScanner::new(api);
                        ev.usage.merge(scanner.scan(&doc));
                    }
                }
            }
        }
        _ => {}
    }
}

fn apply_strategy(
    api: &LegacyApi,
    strategy: Strategy,
    ev: &Evidence<'_>,
    manager: &mut ImportManager,
    changes: &mut ChangeSet,
    target: &Target,
) -> Result<Vec<Failure>> {
    let mut failures = Vec::new();

    match strategy {
        Strategy::RemoveConfigOnly => {
            remove_config_references(api, ev, manager, changes, &mut failures);
            report_unrecognized_providers(ev, &mut failures);
            failures.push(target_note(target, Severity::Info, strategy.describe()));
        }
        Strategy::NoChangeAmbiguous => {
            failures.push(target_note(
                target,
                Severity::Info,
                "both a custom gesture configuration and gesture events in templates were \
                 found; it cannot be determined which configuration provides which events, \
                 so no automated change was made",
            ));
        }
        Strategy::RemoveConfigAndModule => {
            remove_config_references(api, ev, manager, changes, &mut failures);
            remove_token_imports(api, ev, manager);
            remove_module_wiring(api, ev, manager, changes);
        }
        Strategy::RegisterModule => {
            register_integration_module(api, ev, manager, changes, target, &mut failures);
            remove_config_references(api, ev, manager, changes, &mut failures);
            remove_token_imports(api, ev, manager);
        }
        Strategy::RelocateConfig => {
            relocate_config(api, ev, manager, changes, target, &mut failures);
        }
        Strategy::RemoveEverything => {
            for import in &ev.library_imports {
                manager.delete_by_declaration(import.unit, &import.decl_range);
            }
            remove_config_references(api, ev, manager, changes, &mut failures);
            remove_token_imports(api, ev, manager);
            remove_module_wiring(api, ev, manager, changes);
            for (doc, node) in &ev.scripts {
                remove_markup_node(changes, doc, *node);
            }
        }
    }

    Ok(failures)
}

/// Removes every reference to the deprecated config class: references
/// inside a recognized provider take the provider entry with them, and the
/// import binding is deleted once no other reference in the file still
/// needs it. Anything that has to stay is surfaced as a failure.
fn remove_config_references(
    api: &LegacyApi,
    ev: &Evidence<'_>,
    manager: &mut ImportManager,
    changes: &mut ChangeSet,
    failures: &mut Vec<Failure>,
) {
    // Value positions first. A reference that stays in place keeps the
    // import binding it alive, so its file's import clause must survive.
    let mut kept_units: Vec<&Path> = Vec::new();
    for reference in &ev.config_refs {
        if reference.in_import_clause {
            continue;
        }

        match containing_recognized_provider(ev, reference) {
            Some(object) if object.parent().is_some_and(|p| p.kind() == "array") => {
                remove_list_element(changes, &reference.unit.path, object);
            }
            Some(object) => {
                // Not inlined in a provider array (e.g. assigned to a
                // variable). Leave a valid placeholder and flag it.
                changes.replace(
                    &reference.unit.path,
                    object.byte_range(),
                    "/* TODO: deprecated gesture config provider removed */ {}",
                );
                failures.push(node_failure(
                    reference.unit,
                    object.start_byte(),
                    Severity::Warning,
                    "a gesture config provider outside a provider array was replaced with an \
                     empty object; clean up its surroundings manually",
                ));
            }
            None => {
                // Covered by the unrecognized-provider report when the
                // reference sits inside one of those providers.
                if !within_unrecognized_provider(ev, reference) {
                    failures.push(node_failure(
                        reference.unit,
                        reference.node.start_byte(),
                        Severity::Warning,
                        "reference to the deprecated gesture config class could not be removed \
                         automatically; manual cleanup needed",
                    ));
                }
                kept_units.push(reference.unit.path.as_path());
            }
        }
    }

    for reference in &ev.config_refs {
        if reference.in_import_clause && !kept_units.contains(&reference.unit.path.as_path()) {
            manager.delete_specifier(reference.unit, &api.config_class, &reference.module);
        }
    }
}

/// The recognized provider whose `useClass` is exactly this reference.
fn containing_recognized_provider<'t>(
    ev: &Evidence<'t>,
    reference: &ConfigRef<'t>,
) -> Option<Node<'t>> {
    ev.providers.iter().find_map(|p| match &p.shape {
        ProviderShape::Recognized {
            object,
            class_node,
            class_is_config: true,
        } if class_node.byte_range() == reference.node.byte_range()
            && p.unit.path == reference.unit.path =>
        {
            Some(*object)
        }
        _ => None,
    })
}

fn within_unrecognized_provider(ev: &Evidence<'_>, reference: &ConfigRef<'_>) -> bool {
    let range = reference.node.byte_range();
    ev.providers.iter().any(|p| {
        p.unit.path == reference.unit.path
            && match &p.shape {
                ProviderShape::Unrecognized { object } => {
                    let outer = object.byte_range();
                    outer.start <= range.start && range.end <= outer.end
                }
                ProviderShape::Recognized { .. } => false,
            }
    })
}

/// Drops the token's import from files whose recognized config providers
/// were all removed. Skipped for files still holding an unrecognized
/// provider, which keeps referencing the token.
fn remove_token_imports(api: &LegacyApi, ev: &Evidence<'_>, manager: &mut ImportManager) {
    for provider in &ev.providers {
        let ProviderShape::Recognized {
            class_is_config: true,
            ..
        } = provider.shape
        else {
            continue;
        };
        let keeps_token = ev.providers.iter().any(|other| {
            other.unit.path == provider.unit.path
                && !matches!(
                    other.shape,
                    ProviderShape::Recognized {
                        class_is_config: true,
                        ..
                    }
                )
        });
        if !keeps_token {
            manager.delete_specifier(provider.unit, &api.config_token, &api.framework_module);
        }
    }
}

fn remove_module_wiring(
    api: &LegacyApi,
    ev: &Evidence<'_>,
    manager: &mut ImportManager,
    changes: &mut ChangeSet,
) {
    for wiring in &ev.wirings {
        remove_list_element(changes, &wiring.unit.path, wiring.element);
        manager.delete_specifier(wiring.unit, &api.integration_module, &api.framework_module);
    }
}

fn register_integration_module(
    api: &LegacyApi,
    ev: &Evidence<'_>,
    manager: &mut ImportManager,
    changes: &mut ChangeSet,
    target: &Target,
    failures: &mut Vec<Failure>,
) {
    let Some(root) = &ev.root_module else {
        failures.push(target_note(
            target,
            Severity::Warning,
            &format!(
                "could not find a root module (a module with a `bootstrap` property); \
                 add {} to its imports manually",
                api.integration_module
            ),
        ));
        return;
    };

    if ev.wirings.iter().any(|w| w.unit.path == root.unit.path) {
        return;
    }

    let expr = manager.add_symbol(
        root.unit,
        Some(&api.integration_module),
        &api.framework_module,
        false,
        &[],
    );
    match root.imports_array {
        Some(array) => append_to_array(changes, &root.unit.path, array, &expr),
        None => insert_object_property(changes, &root.unit.path, root.object, "imports", &expr),
    }
}

fn relocate_config(
    api: &LegacyApi,
    ev: &Evidence<'_>,
    manager: &mut ImportManager,
    changes: &mut ChangeSet,
    target: &Target,
    failures: &mut Vec<Failure>,
) {
    let dest_dir = ev
        .root_module
        .as_ref()
        .map(|r| r.unit.dir().to_path_buf())
        .unwrap_or_else(|| target.root.clone());
    let dest = available_path(&dest_dir.join(format!("{GESTURE_CONFIG_FILE_STEM}.ts")));
    changes.create(&dest, GESTURE_CONFIG_TEMPLATE);

    // Repoint every reference at the project-owned copy.
    for reference in &ev.config_refs {
        if reference.in_import_clause {
            manager.delete_specifier(reference.unit, &api.config_class, &reference.module);
            continue;
        }
        let specifier = relative_specifier(reference.unit.dir(), &dest);
        let ignore = doomed_ranges(ev, reference.unit);
        let expr = manager.add_symbol(
            reference.unit,
            Some(&api.config_class),
            &specifier,
            false,
            &ignore,
        );
        changes.replace(&reference.unit.path, reference.node.byte_range(), expr);
    }

    register_integration_module(api, ev, manager, changes, target, failures);

    let Some(root) = &ev.root_module else {
        // The missing-root failure was already recorded above.
        return;
    };

    // Already wired when the providers array mentions both the token and
    // the config class.
    if let Some(array) = root.providers_array
        && array_mentions(root.unit, array, &api.config_token)
        && array_mentions(root.unit, array, &api.config_class)
    {
        return;
    }

    let token_expr = manager.add_symbol(
        root.unit,
        Some(&api.config_token),
        &api.framework_module,
        false,
        &[],
    );
    let specifier = relative_specifier(root.unit.dir(), &dest);
    let ignore = doomed_ranges(ev, root.unit);
    let class_expr = manager.add_symbol(
        root.unit,
        Some(&api.config_class),
        &specifier,
        false,
        &ignore,
    );
    let provider = format!("{{ provide: {token_expr}, useClass: {class_expr} }}");
    match root.providers_array {
        Some(array) => append_to_array(changes, &root.unit.path, array, &provider),
        None => insert_object_property(changes, &root.unit.path, root.object, "providers", &provider),
    }
}

/// Byte ranges of config-class references in `unit` that this run deletes
/// or rewrites; the collision scan must not count them.
fn doomed_ranges(ev: &Evidence<'_>, unit: &SourceUnit) -> Vec<Range<usize>> {
    ev.config_refs
        .iter()
        .filter(|r| r.unit.path == unit.path)
        .map(|r| r.node.byte_range())
        .collect()
}

fn report_unrecognized_providers(ev: &Evidence<'_>, failures: &mut Vec<Failure>) {
    for provider in &ev.providers {
        if let ProviderShape::Unrecognized { object } = provider.shape {
            failures.push(node_failure(
                provider.unit,
                object.start_byte(),
                Severity::Warning,
                "a provider binds the gesture config token in an unrecognized shape; \
                 migrate it manually",
            ));
        }
    }
}

fn append_to_array(changes: &mut ChangeSet, path: &Path, array: Node<'_>, text: &str) {
    let mut cursor = array.walk();
    match array.named_children(&mut cursor).last() {
        Some(last) => changes.insert_right(path, last.end_byte(), format!(", {text}")),
        None => changes.insert_right(path, array.start_byte() + 1, text.to_string()),
    }
}

fn insert_object_property(
    changes: &mut ChangeSet,
    path: &Path,
    object: Node<'_>,
    key: &str,
    value: &str,
) {
    changes.insert_right(path, object.start_byte() + 1, format!(" {key}: [{value}],"));
}

fn array_mentions(unit: &SourceUnit, array: Node<'_>, name: &str) -> bool {
    let mut found = false;
    crate::source::walk(array, &mut |node| {
        if node.kind() == "identifier" && unit.text_of(node) == name {
            found = true;
        }
        !found
    });
    found
}

fn object_pairs<'t>(object: Node<'t>, unit: &SourceUnit) -> Vec<(String, Node<'t>)> {
    let mut pairs = Vec::new();
    let mut cursor = object.walk();
    for child in object.named_children(&mut cursor) {
        if child.kind() != "pair" {
            continue;
        }
        if let (Some(key), Some(value)) = (
            child.child_by_field_name("key"),
            child.child_by_field_name("value"),
        ) {
            pairs.push((unit.text_of(key).to_string(), value));
        }
    }
    pairs
}

fn first_named_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| c.kind() == kind)
}

fn node_at_range<'t>(root: Node<'t>, range: &Range<usize>) -> Option<Node<'t>> {
    if root.byte_range() == *range {
        return Some(root);
    }
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        let child_range = child.byte_range();
        if child_range.start <= range.start && range.end <= child_range.end
            && let Some(found) = node_at_range(child, range)
        {
            return Some(found);
        }
    }
    None
}

fn within_import_clause(node: Node<'_>) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.kind() == "import_statement" {
            return true;
        }
        current = parent;
    }
    false
}

fn is_declaration_name(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    matches!(
        parent.kind(),
        "variable_declarator" | "function_declaration" | "class_declaration" | "method_definition"
    ) && parent
        .child_by_field_name("name")
        .is_some_and(|n| n.id() == node.id())
}

fn node_failure(unit: &SourceUnit, offset: usize, severity: Severity, message: &str) -> Failure {
    let (line, column) = offset_to_line_col(&unit.text, offset);
    Failure {
        file: unit.path.clone(),
        line,
        column,
        severity,
        message: message.to_string(),
        offset,
    }
}

fn target_note(target: &Target, severity: Severity, message: &str) -> Failure {
    Failure {
        file: target.root.clone(),
        line: 0,
        column: 0,
        severity,
        message: message.to_string(),
        offset: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::collect_targets;
    use std::collections::HashMap;

    const APP_MODULE: &str = "\
import { NgModule } from '@angular/core';
import { GestureConfig } from '@angular/material/core';
import { HAMMER_GESTURE_CONFIG } from '@angular/platform-browser';

@NgModule({
  imports: [BrowserModule],
  providers: [{ provide: HAMMER_GESTURE_CONFIG, useClass: GestureConfig }],
  bootstrap: [AppComponent],
})
export class AppModule {}
";

    fn run_project(files: &[(&str, &str)]) -> (TargetOutcome, HashMap<PathBuf, String>) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
        let api = LegacyApi::default();
        let targets = collect_targets(&[dir.path().to_path_buf()], &[], true).unwrap();
        let mut changes = ChangeSet::new();
        let outcome = run_target(&api, &targets[0], &mut changes).unwrap();
        let outputs = changes
            .write(true)
            .unwrap()
            .into_iter()
            .map(|(path, content)| {
                let relative = path.strip_prefix(dir.path()).unwrap_or(&path).to_path_buf();
                (relative, content)
            })
            .collect();
        (outcome, outputs)
    }

    fn output<'m>(outputs: &'m HashMap<PathBuf, String>, name: &str) -> &'m str {
        outputs
            .get(Path::new(name))
            .unwrap_or_else(|| panic!("expected {name} to be rewritten; got {outputs:?}"))
    }

    #[test]
    fn unused_integration_is_removed_entirely() {
        let (outcome, outputs) = run_project(&[
            ("main.ts", "import 'hammerjs';\n\nplatformBrowserDynamic();\n"),
            ("app.module.ts", APP_MODULE),
            ("app.component.html", "<div (click)=\"noop()\"></div>\n"),
            (
                "index.html",
                "<html>\n<body>\n  <script src=\"node_modules/hammerjs/hammer.min.js\"></script>\n</body>\n</html>\n",
            ),
        ]);

        assert_eq!(outcome.strategy, Strategy::RemoveEverything);
        assert!(!outcome.legacy_needed);
        assert!(outcome.failures.is_empty(), "{:?}", outcome.failures);

        assert_eq!(output(&outputs, "main.ts"), "\nplatformBrowserDynamic();\n");

        let module = output(&outputs, "app.module.ts");
        assert!(!module.contains("GestureConfig"));
        assert!(!module.contains("HAMMER_GESTURE_CONFIG"));
        assert!(module.contains("providers: [],"));
        assert!(module.contains("import { NgModule } from '@angular/core';"));

        let index = output(&outputs, "index.html");
        assert!(!index.contains("<script"));
        assert!(!index.contains("\n  \n"), "blank line left behind: {index:?}");
    }

    #[test]
    fn standard_template_events_register_the_integration_module() {
        let (outcome, outputs) = run_project(&[
            ("app.module.ts", APP_MODULE),
            ("app.component.html", "<div (tap)=\"onTap()\"></div>\n"),
        ]);

        assert_eq!(outcome.strategy, Strategy::RegisterModule);
        assert!(outcome.legacy_needed);

        let module = output(&outputs, "app.module.ts");
        assert!(module.contains("imports: [BrowserModule, HammerModule],"));
        assert!(module.contains("import { HammerModule } from '@angular/platform-browser';"));
        assert!(module.contains("providers: [],"));
        assert!(!module.contains("GestureConfig"));
    }

    #[test]
    fn custom_template_events_relocate_the_config() {
        let (outcome, outputs) = run_project(&[
            ("app.module.ts", APP_MODULE),
            ("app.component.html", "<div (longpress)=\"hold()\"></div>\n"),
        ]);

        assert_eq!(outcome.strategy, Strategy::RelocateConfig);
        assert!(outcome.legacy_needed);

        let copy = output(&outputs, "gesture-config.ts");
        assert!(copy.contains("export class GestureConfig extends HammerGestureConfig"));

        let module = output(&outputs, "app.module.ts");
        assert!(module.contains("import { GestureConfig } from './gesture-config';"));
        assert!(!module.contains("@angular/material/core"));
        assert!(module.contains("HammerModule"));
        // The existing provider already wires token and class; no duplicate.
        assert_eq!(module.matches("provide: HAMMER_GESTURE_CONFIG").count(), 1);
    }

    #[test]
    fn custom_setup_without_templates_removes_only_the_config_class() {
        let module_text = "\
import { NgModule } from '@angular/core';
import { HAMMER_GESTURE_CONFIG } from '@angular/platform-browser';
import { GestureConfig } from '@angular/material/core';
import { MyGestureConfig } from './my-gesture-config';

@NgModule({
  providers: [
    { provide: HAMMER_GESTURE_CONFIG, useClass: MyGestureConfig },
    { provide: HAMMER_GESTURE_CONFIG, useClass: GestureConfig },
  ],
  bootstrap: [AppComponent],
})
export class AppModule {}
";
        let (outcome, outputs) = run_project(&[
            ("app.module.ts", module_text),
            ("my-gesture-config.ts", "export class MyGestureConfig {}\n"),
        ]);

        assert_eq!(outcome.strategy, Strategy::RemoveConfigOnly);
        assert!(outcome.legacy_needed);
        assert!(
            outcome
                .failures
                .iter()
                .any(|f| f.severity == Severity::Info)
        );

        let module = output(&outputs, "app.module.ts");
        assert!(module.contains("useClass: MyGestureConfig"));
        assert!(!module.contains("useClass: GestureConfig"));
        assert!(!module.contains("@angular/material/core"));
        // The token import serves the custom provider and must survive.
        assert!(module.contains("import { HAMMER_GESTURE_CONFIG } from '@angular/platform-browser';"));
    }

    #[test]
    fn ambiguous_setup_changes_nothing() {
        let module_text = "\
import { NgModule } from '@angular/core';
import { HAMMER_GESTURE_CONFIG } from '@angular/platform-browser';
import { MyGestureConfig } from './my-gesture-config';

@NgModule({
  providers: [{ provide: HAMMER_GESTURE_CONFIG, useClass: MyGestureConfig }],
  bootstrap: [AppComponent],
})
export class AppModule {}
";
        let (outcome, outputs) = run_project(&[
            ("app.module.ts", module_text),
            ("my-gesture-config.ts", "export class MyGestureConfig {}\n"),
            ("app.component.html", "<div (tap)=\"onTap()\"></div>\n"),
        ]);

        assert_eq!(outcome.strategy, Strategy::NoChangeAmbiguous);
        assert!(outcome.legacy_needed);
        assert!(outputs.is_empty(), "no file may change: {outputs:?}");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].severity, Severity::Info);
        assert!(outcome.failures[0].message.contains("no automated change"));
    }

    #[test]
    fn runtime_usage_keeps_library_but_drops_wiring() {
        let module_text = "\
import { NgModule } from '@angular/core';
import { HAMMER_GESTURE_CONFIG, HammerModule } from '@angular/platform-browser';
import { GestureConfig } from '@angular/material/core';

@NgModule({
  imports: [BrowserModule, HammerModule],
  providers: [{ provide: HAMMER_GESTURE_CONFIG, useClass: GestureConfig }],
  bootstrap: [AppComponent],
})
export class AppModule {}
";
        let service = "\
declare const Hammer: any;

export class TouchService {
  attach(element: HTMLElement) {
    return new Hammer(element);
  }
}
";
        let (outcome, outputs) = run_project(&[
            ("app.module.ts", module_text),
            ("touch.service.ts", service),
        ]);

        assert_eq!(outcome.strategy, Strategy::RemoveConfigAndModule);
        assert!(outcome.legacy_needed);

        let module = output(&outputs, "app.module.ts");
        assert!(module.contains("imports: [BrowserModule],"));
        assert!(!module.contains("HammerModule"));
        assert!(!module.contains("GestureConfig"));
        assert!(!module.contains("HAMMER_GESTURE_CONFIG"));
        // The service keeps using the library and is left alone.
        assert!(!outputs.contains_key(Path::new("touch.service.ts")));
    }

    #[test]
    fn factory_provider_counts_as_custom_setup() {
        let module_text = "\
import { NgModule } from '@angular/core';
import { HAMMER_GESTURE_CONFIG } from '@angular/platform-browser';
import { GestureConfig } from '@angular/material/core';

@NgModule({
  providers: [{ provide: HAMMER_GESTURE_CONFIG, useFactory: () => new GestureConfig() }],
  bootstrap: [AppComponent],
})
export class AppModule {}
";
        let (outcome, outputs) = run_project(&[("app.module.ts", module_text)]);

        // A factory binding the token is a custom setup, not removable usage.
        assert_eq!(outcome.strategy, Strategy::RemoveConfigOnly);
        assert!(outcome.legacy_needed);
        // The factory still references the config class, so neither the
        // provider nor the import may be touched.
        assert!(outputs.is_empty(), "custom setup must stay intact: {outputs:?}");
        assert!(
            outcome
                .failures
                .iter()
                .any(|f| f.severity == Severity::Warning && f.message.contains("unrecognized")),
            "{:?}",
            outcome.failures
        );
    }

    #[test]
    fn factory_provider_keeps_import_while_class_provider_is_removed() {
        let module_text = "\
import { NgModule } from '@angular/core';
import { HAMMER_GESTURE_CONFIG } from '@angular/platform-browser';
import { GestureConfig } from '@angular/material/core';

@NgModule({
  providers: [
    { provide: HAMMER_GESTURE_CONFIG, useFactory: () => new GestureConfig() },
    { provide: HAMMER_GESTURE_CONFIG, useClass: GestureConfig },
  ],
  bootstrap: [AppComponent],
})
export class AppModule {}
";
        let (outcome, outputs) = run_project(&[("app.module.ts", module_text)]);

        assert_eq!(outcome.strategy, Strategy::RemoveConfigOnly);
        assert!(outcome.legacy_needed);

        let module = output(&outputs, "app.module.ts");
        assert!(module.contains("useFactory: () => new GestureConfig()"));
        assert!(!module.contains("useClass: GestureConfig"));
        // The factory body still references the class; its import survives.
        assert!(module.contains("import { GestureConfig } from '@angular/material/core';"));
        let reparsed = SourceUnit::parse(Path::new("check.ts"), module.to_string()).unwrap();
        assert!(!reparsed.root().has_error());
    }

    #[test]
    fn provider_outside_an_array_gets_a_placeholder() {
        let module_text = "\
import { NgModule } from '@angular/core';
import { HAMMER_GESTURE_CONFIG } from '@angular/platform-browser';
import { GestureConfig } from '@angular/material/core';

const GESTURE_PROVIDER = { provide: HAMMER_GESTURE_CONFIG, useClass: GestureConfig };

@NgModule({
  providers: [GESTURE_PROVIDER],
  bootstrap: [AppComponent],
})
export class AppModule {}
";
        let (outcome, outputs) = run_project(&[("app.module.ts", module_text)]);

        let module = output(&outputs, "app.module.ts");
        assert!(module.contains(
            "const GESTURE_PROVIDER = /* TODO: deprecated gesture config provider removed */ {};"
        ));
        assert!(
            outcome
                .failures
                .iter()
                .any(|f| f.severity == Severity::Warning && f.message.contains("empty object"))
        );
        let reparsed = SourceUnit::parse(Path::new("check.ts"), module.to_string()).unwrap();
        assert!(!reparsed.root().has_error());
    }

    #[test]
    fn inline_component_templates_count_as_evidence() {
        let component = "\
import { Component } from '@angular/core';

@Component({
  selector: 'app-root',
  template: `<div (tap)=\"onTap()\"></div>`,
})
export class AppComponent {}
";
        let (outcome, _) = run_project(&[
            ("app.module.ts", APP_MODULE),
            ("app.component.ts", component),
        ]);
        assert_eq!(outcome.strategy, Strategy::RegisterModule);
    }

    #[test]
    fn decision_table_covers_every_combination() {
        let no_usage = TemplateUsage::default();
        let standard = TemplateUsage {
            standard_events: true,
            custom_events: false,
        };
        let custom = TemplateUsage {
            standard_events: false,
            custom_events: true,
        };

        for runtime in [false, true] {
            assert_eq!(decide(true, no_usage, runtime), Strategy::RemoveConfigOnly);
            assert_eq!(decide(true, standard, runtime), Strategy::NoChangeAmbiguous);
            assert_eq!(decide(true, custom, runtime), Strategy::NoChangeAmbiguous);
            assert_eq!(decide(false, standard, runtime), Strategy::RegisterModule);
            assert_eq!(decide(false, custom, runtime), Strategy::RelocateConfig);
        }
        assert_eq!(decide(false, no_usage, true), Strategy::RemoveConfigAndModule);
        assert_eq!(decide(false, no_usage, false), Strategy::RemoveEverything);
    }

    #[test]
    fn runs_are_deterministic() {
        let files: &[(&str, &str)] = &[
            ("app.module.ts", APP_MODULE),
            ("app.component.html", "<div (tap)=\"onTap()\"></div>\n"),
        ];
        let (first_outcome, first) = run_project(files);
        let (second_outcome, second) = run_project(files);
        assert_eq!(first_outcome.strategy, second_outcome.strategy);
        assert_eq!(first, second);
    }
}

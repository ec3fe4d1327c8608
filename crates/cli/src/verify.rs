//! One verification run: load the registry, run every check, collect the
//! findings. Printing and the exit decision live in `report` and `main`.

use std::{path::Path, time::Duration};

use {
    anyhow::{Context, Result},
    regcheck_common::{Finding, Findings, Location, Section},
    regcheck_config::{EvaluatorConfig, VerifyConfig},
    regcheck_graph::{
        CapabilityIndex, DependencyGraph, InstallPlan, ReferenceExtractor, cycle_findings,
        detect_cycles, plan_install_order, reconcile_declared_dependencies, validate_capabilities,
    },
    regcheck_hooks::{
        Classifier, EmbeddedSnippet, JqEvaluator, OutputLinter, REGISTRATION_FILE,
        discover_hook_files, evaluate_all, extract_embedded_json_snippets, installer_scripts,
        load_registration, snippet_findings, unclassified_entry_point, validate_hook_document,
    },
    regcheck_registry::{
        PluginDirectory, Registry, SchemaAsset, hooks_path, load_manifest, reconcile,
        remediation_entry, scan_plugin_dirs, validate_paths, validate_schema,
    },
    serde_json::Value,
    tracing::{debug, info, warn},
};

/// Everything a report needs, detached from the filesystem.
pub struct Outcome {
    /// Registry path as printed, relative to the root.
    pub registry_display: String,
    pub findings: Findings,
    /// Ready-to-paste entries for unregistered directories, by directory.
    pub remediations: Vec<(Location, Value)>,
    pub graph: DependencyGraph,
    pub install_plans: Vec<InstallPlan>,
}

pub async fn run(root: &Path, config: &VerifyConfig) -> Result<Outcome> {
    let registry_path = config.registry_path(root);
    let registry = load_manifest(&registry_path, root)
        .with_context(|| format!("cannot verify without a registry ({})", registry_path.display()))?;
    let mut findings = Findings::new();

    let asset = SchemaAsset::load(&config.schema_path(root));
    findings.extend(validate_schema(&registry, &asset));
    findings.extend(validate_paths(&registry));

    let plugins_root = config.plugins_path(root);
    let dirs = match scan_plugin_dirs(&plugins_root) {
        Ok(dirs) => dirs,
        Err(e) => {
            warn!(path = %plugins_root.display(), %e, "failed to scan plugins root");
            findings.push(
                Finding::warning(
                    Section::Registration,
                    format!("could not list plugin directories: {e}"),
                )
                .at(Location::relative(root, &plugins_root, None)),
            );
            Vec::new()
        },
    };

    let reconciliation = reconcile(&registry, &dirs);
    findings.extend(reconciliation.findings(&registry));
    let remediations = reconciliation
        .unregistered
        .iter()
        .map(|dir| {
            (
                Location::relative(root, &dir.path, None),
                remediation_entry(root, dir),
            )
        })
        .collect();

    let extraction = ReferenceExtractor::new()?.extract(&dirs, root);
    findings.extend(extraction.findings);
    let graph = DependencyGraph::from_edges(&extraction.edges);
    findings.extend(validate_capabilities(
        &extraction.edges,
        &CapabilityIndex::build(&dirs),
        root,
    ));
    findings.extend(reconcile_declared_dependencies(&registry, &graph));
    findings.extend(cycle_findings(&detect_cycles(&graph), &extraction.edges, root));

    findings.extend(check_hooks(root, &registry, &dirs, &config.evaluator).await?);

    info!(
        errors = findings.errors().len(),
        warnings = findings.warnings().len(),
        "verification finished"
    );

    Ok(Outcome {
        registry_display: registry.location(None).to_string(),
        findings,
        remediations,
        graph,
        install_plans: plan_install_order(&registry),
    })
}

/// Classification, output lint and structural checks for every plugin.
async fn check_hooks(
    root: &Path,
    registry: &Registry,
    dirs: &[PluginDirectory],
    evaluator: &EvaluatorConfig,
) -> Result<Vec<Finding>> {
    let classifier = Classifier::new()?;
    let linter = OutputLinter::new()?;
    let mut findings = Vec::new();
    let mut sites: Vec<(Location, EmbeddedSnippet)> = Vec::new();

    for dir in dirs {
        // The host reads the file the registry entry declares, if any.
        let registration_path = registry
            .get(&dir.name)
            .and_then(|entry| hooks_path(registry.root(), entry))
            .unwrap_or_else(|| dir.path.join(REGISTRATION_FILE));
        let registration = match load_registration(&registration_path) {
            Ok(registration) => registration,
            Err(e) => {
                findings.push(
                    Finding::error(Section::HookStructure, e.to_string())
                        .at(Location::relative(root, &registration_path, None)),
                );
                None
            },
        };
        if let Some(registration) = &registration {
            let at = Location::relative(root, &registration.path, None);
            findings.extend(validate_hook_document(&registration.document, &at));
        }

        for file in discover_hook_files(dir) {
            let Some(text) = read_script(root, &file.path, Section::HookOutput, &mut findings)
            else {
                continue;
            };
            let classification = classifier.classify(&file, &text, registration.as_ref());
            debug!(
                plugin = %dir.name,
                file = %file.filename,
                event = ?classification.event,
                tier = %classification.tier,
                "classified hook script"
            );

            if classification.event.is_some() {
                findings.extend(linter.lint(&classification, &text, root));
            } else if classifier.has_entry_point(&file, &text) {
                findings.push(unclassified_entry_point(&classification, root));
            }
            collect_snippets(root, &file.path, &text, &mut sites);
        }

        for script in installer_scripts(dir) {
            if let Some(text) = read_script(root, &script, Section::HookStructure, &mut findings) {
                collect_snippets(root, &script, &text, &mut sites);
            }
        }
    }

    findings.extend(evaluate_sites(&sites, evaluator).await);
    Ok(findings)
}

fn read_script(
    root: &Path,
    path: &Path,
    section: Section,
    findings: &mut Vec<Finding>,
) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(?path, %e, "failed to read script");
            findings.push(
                Finding::warning(section, format!("could not read script: {e}"))
                    .at(Location::relative(root, path, None)),
            );
            None
        },
    }
}

fn collect_snippets(
    root: &Path,
    path: &Path,
    text: &str,
    sites: &mut Vec<(Location, EmbeddedSnippet)>,
) {
    for snippet in extract_embedded_json_snippets(text) {
        sites.push((Location::relative(root, path, Some(snippet.line)), snippet));
    }
}

async fn evaluate_sites(
    sites: &[(Location, EmbeddedSnippet)],
    config: &EvaluatorConfig,
) -> Vec<Finding> {
    let Some((first_site, _)) = sites.first() else {
        return Vec::new();
    };

    if let Err(e) = which::which(&config.program) {
        warn!(program = %config.program, %e, "snippet evaluator not found");
        let finding = Finding::warning(
            Section::HookStructure,
            format!(
                "degraded: snippet evaluator `{}` is not available ({e}); {} embedded hook \
                 definition(s) were not checked",
                config.program,
                sites.len()
            ),
        );
        return vec![finding.at(first_site.clone())];
    }

    let evaluator = JqEvaluator::new(
        config.program.clone(),
        Duration::from_millis(config.timeout_ms),
    );
    let snippets: Vec<_> = sites.iter().map(|(_, snippet)| snippet.clone()).collect();
    let results = evaluate_all(&evaluator, &snippets, config.concurrency).await;
    debug!(count = results.len(), "evaluated embedded snippets");

    sites
        .iter()
        .zip(&results)
        .flat_map(|((at, _), result)| snippet_findings(result, at))
        .collect()
}

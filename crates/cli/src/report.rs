//! Sectioned text report.
//!
//! Every section is always printed, in a fixed order, followed by the
//! optional remediation and dependency blocks and a final summary line.
//! Rendering is a pure function of the outcome, so two runs over an
//! unchanged tree produce identical output.

use std::fmt::Write;

use {
    regcheck_common::{Finding, Section, Severity},
    serde_json::Value,
};

use crate::verify::Outcome;

pub struct Options {
    pub fix: bool,
    pub deps: bool,
    pub strict: bool,
}

/// Escape sequences used for emphasis; empty when stdout is not a terminal.
pub struct Palette {
    red: &'static str,
    yellow: &'static str,
    green: &'static str,
    dim: &'static str,
    bold: &'static str,
    reset: &'static str,
}

impl Palette {
    pub const ANSI: Self = Self {
        red: "\x1b[31m",
        yellow: "\x1b[33m",
        green: "\x1b[32m",
        dim: "\x1b[2m",
        bold: "\x1b[1m",
        reset: "\x1b[0m",
    };
    pub const PLAIN: Self = Self {
        red: "",
        yellow: "",
        green: "",
        dim: "",
        bold: "",
        reset: "",
    };

    fn severity(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Error => self.red,
            Severity::Warning => self.yellow,
        }
    }
}

pub fn render(outcome: &Outcome, options: &Options, p: &Palette) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, outcome, options, p);
    out
}

fn write_report(
    out: &mut String,
    outcome: &Outcome,
    options: &Options,
    p: &Palette,
) -> std::fmt::Result {
    let (bold, reset) = (p.bold, p.reset);
    writeln!(out, "{bold}regcheck{reset}")?;
    writeln!(out, "{bold}========{reset}")?;
    writeln!(out)?;

    for section in Section::ALL {
        writeln!(out, "{bold}{}{reset}", section.title())?;
        let mut empty = true;
        for finding in outcome.findings.in_section(*section) {
            write_finding(out, finding, p)?;
            empty = false;
        }
        if empty {
            writeln!(out, "  [{}ok{reset}]  no problems found", p.green)?;
        }
        writeln!(out)?;
    }

    if options.fix {
        write_remediation(out, outcome, p)?;
    }
    if options.deps {
        write_dependencies(out, outcome, p)?;
    }

    let errors = outcome.findings.errors().len();
    let warnings = outcome.findings.warnings().len();
    write!(out, "{bold}Summary:{reset} {errors} error(s), {warnings} warning(s)")?;
    if options.strict && warnings > 0 && errors == 0 {
        write!(out, " {}(strict: warnings fail the run){reset}", p.dim)?;
    }
    writeln!(out)
}

fn write_finding(out: &mut String, finding: &Finding, p: &Palette) -> std::fmt::Result {
    writeln!(
        out,
        "  [{}{}{}]  {finding}",
        p.severity(finding.severity),
        finding.severity,
        p.reset
    )
}

fn write_remediation(out: &mut String, outcome: &Outcome, p: &Palette) -> std::fmt::Result {
    writeln!(out, "{}Remediation{}", p.bold, p.reset)?;
    if outcome.remediations.is_empty() {
        writeln!(out, "  nothing to register")?;
    }
    for (location, entry) in &outcome.remediations {
        writeln!(
            out,
            "  {location}: add this entry to the `plugins` array of {}",
            outcome.registry_display
        )?;
        for line in pretty(entry).lines() {
            writeln!(out, "    {line}")?;
        }
    }
    writeln!(out)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn write_dependencies(out: &mut String, outcome: &Outcome, p: &Palette) -> std::fmt::Result {
    writeln!(out, "{}Dependency graph{}", p.bold, p.reset)?;
    if outcome.graph.is_empty() {
        writeln!(out, "  no cross-plugin references")?;
    }
    for node in outcome.graph.nodes() {
        let targets: Vec<_> = outcome.graph.targets(node).collect();
        if !targets.is_empty() {
            writeln!(out, "  {node} -> {}", targets.join(", "))?;
        }
    }
    writeln!(out)?;

    writeln!(out, "{}Install order{}", p.bold, p.reset)?;
    if outcome.install_plans.is_empty() {
        writeln!(out, "  no plugin declares `requires`")?;
    }
    for plan in &outcome.install_plans {
        write!(out, "  {}: {}", plan.plugin, plan.order.join(" -> "))?;
        if plan.cyclic {
            write!(out, " {}(cyclic requirements: install together){}", p.dim, p.reset)?;
        }
        writeln!(out)?;
    }
    writeln!(out)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        regcheck_common::{Findings, Location},
        regcheck_graph::{DependencyGraph, InstallPlan},
        serde_json::json,
    };

    fn outcome() -> Outcome {
        let findings: Findings = [
            Finding::warning(Section::Orphaned, "registry entry `x` has no plugin directory")
                .at(Location::line(".claude-plugin/marketplace.json", 9)),
            Finding::error(
                Section::Registration,
                "plugin directory `c` is not registered in .claude-plugin/marketplace.json",
            )
            .at(Location::file("plugins/c")),
        ]
        .into_iter()
        .collect();

        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("a", "c");

        Outcome {
            registry_display: ".claude-plugin/marketplace.json".into(),
            findings,
            remediations: vec![(Location::file("plugins/c"), json!({ "name": "c" }))],
            graph,
            install_plans: vec![InstallPlan {
                plugin: "a".into(),
                order: vec!["b".into(), "a".into()],
                cyclic: true,
            }],
        }
    }

    fn options(fix: bool, deps: bool) -> Options {
        Options {
            fix,
            deps,
            strict: false,
        }
    }

    #[test]
    fn plain_report_lists_every_section_in_order() {
        let text = render(&outcome(), &options(false, false), &Palette::PLAIN);
        let titles: Vec<_> = Section::ALL
            .iter()
            .map(|s| text.find(&format!("\n{}\n", s.title())).unwrap())
            .collect();
        assert!(titles.windows(2).all(|w| w[0] < w[1]));

        assert!(text.contains(
            "  [error]  plugins/c: plugin directory `c` is not registered in .claude-plugin/marketplace.json\n"
        ));
        assert!(text.contains(
            "  [warning]  .claude-plugin/marketplace.json:9: registry entry `x` has no plugin directory\n"
        ));
        assert!(text.ends_with("Summary: 1 error(s), 1 warning(s)\n"));
        assert!(!text.contains('\x1b'));
        assert!(!text.contains("Remediation"));
    }

    #[test]
    fn fix_and_deps_blocks() {
        let text = render(&outcome(), &options(true, true), &Palette::PLAIN);
        assert!(text.contains(
            "Remediation\n  plugins/c: add this entry to the `plugins` array of .claude-plugin/marketplace.json\n    {\n      \"name\": \"c\"\n    }\n"
        ));
        assert!(text.contains("Dependency graph\n  a -> b, c\n"));
        assert!(text.contains("  a: b -> a (cyclic requirements: install together)\n"));
    }

    #[test]
    fn rendering_is_stable() {
        let first = render(&outcome(), &options(true, true), &Palette::PLAIN);
        let second = render(&outcome(), &options(true, true), &Palette::PLAIN);
        assert_eq!(first, second);
    }
}

use crate::config::Config;
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use petal_common::{walk_markup_node, FreeIdentifiers, TemplateSource, Visitor};
use petal_parser::{
    format_errors, parse_expression, parse_for_header, parse_statements, Expression,
    MarkupAttribute, MarkupDocument, MarkupNode, ParseError,
};
use petal_runtime::is_global;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Template file or directory to check
    pub input: PathBuf,

    /// Only report errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// How a directive value is parsed
#[derive(Debug, Clone, Copy, PartialEq)]
enum SiteKind {
    Expression,
    Statements,
    ForHeader,
}

#[derive(Debug)]
struct Site {
    name: String,
    source: String,
    /// Where `source` starts in the file
    offset: usize,
    kind: SiteKind,
}

/// Every expression a template would hand to the evaluator
struct DirectiveSites<'a> {
    interpolation: &'a Regex,
    sites: Vec<Site>,
}

impl Visitor for DirectiveSites<'_> {
    fn visit_markup_node(&mut self, node: &MarkupNode) {
        match node {
            MarkupNode::Element { attributes, .. }
                if attributes.iter().any(|attribute| attribute.name == "v-pre") => {}
            MarkupNode::Text { content, span } => {
                for captures in self.interpolation.captures_iter(content) {
                    let Some(inner) = captures.get(1) else {
                        continue;
                    };
                    self.sites.push(Site {
                        name: "interpolation".to_string(),
                        source: inner.as_str().to_string(),
                        offset: span.start + inner.start(),
                        kind: SiteKind::Expression,
                    });
                }
            }
            _ => walk_markup_node(self, node),
        }
    }

    fn visit_attribute(&mut self, attribute: &MarkupAttribute) {
        if let Some(kind) = classify(&attribute.name, &attribute.value) {
            self.sites.push(Site {
                name: attribute.name.clone(),
                source: attribute.value.clone(),
                offset: attribute.value_span.start,
                kind,
            });
        }
    }
}

fn classify(name: &str, value: &str) -> Option<SiteKind> {
    if value.trim().is_empty() {
        return None;
    }
    let base = name.split('.').next().unwrap_or(name);
    if base == "v-for" {
        Some(SiteKind::ForHeader)
    } else if base.starts_with('@') || base.starts_with("v-on") || base == "v-effect" {
        Some(SiteKind::Statements)
    } else if base.starts_with(':') || base.starts_with("v-") {
        Some(SiteKind::Expression)
    } else {
        None
    }
}

/// What checking one template found
#[derive(Debug, Default)]
pub struct FileReport {
    pub expressions: usize,
    pub errors: Vec<ParseError>,
    /// Names read from root data: free identifiers minus loop aliases,
    /// `v-scope` literal keys, magic `$` names and built-ins
    pub root_names: Vec<String>,
}

pub fn check_document(document: &MarkupDocument, interpolation: &Regex) -> FileReport {
    let mut collector = DirectiveSites {
        interpolation,
        sites: Vec::new(),
    };
    for node in &document.nodes {
        collector.visit_markup_node(node);
    }

    let mut report = FileReport::default();
    let mut local = HashSet::new();
    let mut seen = HashSet::new();
    for site in &collector.sites {
        report.expressions += 1;
        let names = match site.kind {
            SiteKind::Expression => parse_expression(&site.source).map(|expr| {
                if site.name == "v-scope" {
                    if let Expression::Object { properties, .. } = &expr {
                        local.extend(properties.iter().map(|p| p.key.clone()));
                    }
                }
                FreeIdentifiers::of_expression(&expr)
            }),
            SiteKind::Statements => {
                parse_statements(&site.source).map(|program| FreeIdentifiers::of_program(&program))
            }
            SiteKind::ForHeader => parse_for_header(&site.source).map(|header| {
                local.extend(header.value.names());
                local.extend(header.index.clone());
                local.extend(header.object_index.clone());
                FreeIdentifiers::of_expression(&header.source)
            }),
        };
        match names {
            Ok(names) => {
                for name in names {
                    if seen.insert(name.clone()) {
                        report.root_names.push(name);
                    }
                }
            }
            Err(err) => report.errors.push(err.offset(site.offset)),
        }
    }

    report
        .root_names
        .retain(|name| !local.contains(name) && !name.starts_with('$') && !is_global(name));
    report
}

pub fn check(args: CheckArgs, config: &Config, cwd: &str) -> Result<()> {
    let input = PathBuf::from(cwd).join(&args.input);
    let files = if input.is_file() {
        vec![input.clone()]
    } else if input.is_dir() {
        find_templates(&input, config)
    } else {
        bail!("Input path does not exist: {}", input.display());
    };

    println!("🔍 {} {} template(s)", "Checking".green().bold(), files.len());
    println!();

    let interpolation = config.runtime.interpolation_pattern();
    let mut total_errors = 0;
    let mut total_expressions = 0;
    for file in &files {
        let (expressions, errors) = check_file(file, &interpolation, args.quiet)?;
        total_expressions += expressions;
        total_errors += errors;
    }

    println!();
    println!("   Expressions checked: {}", total_expressions);
    if total_errors > 0 {
        println!("   {} {}", "Errors:".red(), total_errors);
        bail!("{} invalid expression(s)", total_errors);
    }
    println!("   {} No issues found!", "✓".green());
    Ok(())
}

fn check_file(path: &Path, interpolation: &Regex, quiet: bool) -> Result<(usize, usize)> {
    let name = path.display().to_string();
    let source = match TemplateSource::load(path) {
        Ok(source) => source,
        Err(err) => match err.parse_error() {
            Some(parse_error) => {
                let text = std::fs::read_to_string(path)?;
                eprintln!("{} {}", "✗".red(), name);
                eprint!("{}", format_errors(&text, &name, std::slice::from_ref(parse_error)));
                return Ok((0, 1));
            }
            None => return Err(err.into()),
        },
    };

    let report = check_document(&source.document, interpolation);
    if report.errors.is_empty() {
        if !quiet {
            println!("{} {} ({} expressions)", "✓".green(), name, report.expressions);
            if !report.root_names.is_empty() {
                println!("    root data: {}", report.root_names.join(", ").dimmed());
            }
        }
    } else {
        eprintln!("{} {}", "✗".red(), name);
        eprint!("{}", format_errors(&source.text, &name, &report.errors));
    }
    Ok((report.expressions, report.errors.len()))
}

fn find_templates(dir: &Path, config: &Config) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file() && config.accepts(path))
        .collect()
}

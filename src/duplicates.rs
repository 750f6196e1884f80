use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;
use indicatif::{HumanBytes, HumanCount, ProgressBar, ProgressStyle};
use log::info;

use crate::bucket::Bucketer;
use crate::error::DedupError;
use crate::linker::{LinkSummary, link_duplicates};
use crate::planner::{ConsolidationPlan, plan_consolidation};
use crate::scanner::verify_checksums;
use crate::walker::{TreeWalker, WalkStats};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Hashing threads; 0 lets rayon decide.
    pub threads: usize,
    pub min_size: u64,
    pub show_progress: bool,
}

/// Last stage a run reached.
///
/// `find_duplicates` stops at one of the first three. Only `consolidate`
/// moves a planned run on to `Linked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SizeGrouping,
    ChecksumGrouping,
    Planning,
    Linked,
}

#[derive(Debug, Clone)]
pub struct Findings {
    pub stage: Stage,
    pub walk: WalkStats,
    pub size_groups: usize,
    pub checksum_groups: usize,
    pub unreadable: usize,
    pub plan: ConsolidationPlan,
}

impl Findings {
    fn new(walk: WalkStats, size_groups: usize) -> Self {
        Self {
            stage: Stage::SizeGrouping,
            walk,
            size_groups,
            checksum_groups: 0,
            unreadable: 0,
            plan: ConsolidationPlan::default(),
        }
    }

    /// Whether any stage ended the run with nothing left to compare.
    pub fn no_duplicates(&self) -> bool {
        self.size_groups == 0 || self.checksum_groups == 0
    }

    pub fn needs_linking(&self) -> bool {
        !self.plan.is_empty()
    }
}

fn scan_spinner(show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} {human_pos} found") {
        pb.set_style(style);
    }
    pb.set_message("Scanning files...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn hash_progress(total_bytes: u64, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total_bytes);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {bytes}/{total_bytes} ETA: {eta}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Walks `roots` and works out which duplicates still need linking.
///
/// Stops early, with `stage` telling where, as soon as a stage leaves no
/// group that could hold a duplicate. Nothing on disk is modified.
pub fn find_duplicates<P: AsRef<Path>>(
    roots: &[P],
    options: &ScanOptions,
) -> Result<Findings, DedupError> {
    let mut walker = TreeWalker::new(roots.iter().map(|root| root.as_ref().to_path_buf()));
    let mut bucketer = Bucketer::new(options.min_size);

    let spinner = scan_spinner(options.show_progress);
    for path in walker.files() {
        spinner.inc(1);
        bucketer.add_path(path);
    }
    spinner.finish_and_clear();

    let walk = walker.stats();
    info!(
        "Found {} files and {} directories ({} unreadable entries)",
        HumanCount(walk.files),
        HumanCount(walk.dirs),
        HumanCount(walk.errors)
    );

    let buckets = bucketer.finish();
    let mut findings = Findings::new(walk, buckets.len());
    if buckets.is_empty() {
        return Ok(findings);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()?;
    let progress = hash_progress(buckets.candidate_bytes(), options.show_progress);
    let verification = verify_checksums(buckets, &pool, &progress);
    progress.finish_and_clear();

    findings.stage = Stage::ChecksumGrouping;
    findings.checksum_groups = verification.groups.len();
    findings.unreadable = verification.failures.len();
    if verification.groups.is_empty() {
        return Ok(findings);
    }

    findings.plan = plan_consolidation(verification.groups);
    findings.stage = Stage::Planning;
    Ok(findings)
}

/// Writes the dry-run report for `findings`.
pub fn print_results<W: Write>(findings: &Findings, out: &mut W) -> io::Result<()> {
    if findings.size_groups == 0 {
        return writeln!(out, "{}", "No duplicates found.".green());
    }
    writeln!(
        out,
        "Found {} candidate groups with common size.",
        findings.size_groups
    )?;

    if findings.checksum_groups == 0 {
        return writeln!(out, "{}", "No duplicates found.".green());
    }
    writeln!(
        out,
        "Found {} candidate groups with same checksum.",
        findings.checksum_groups
    )?;

    let plan = &findings.plan;
    writeln!(
        out,
        "{}",
        format!(
            "Found {} groups that are duplicates and probably not hard links:",
            plan.groups.len()
        )
        .yellow()
    )?;
    for (index, group) in plan.groups.iter().enumerate() {
        writeln!(
            out,
            "Group {} ({} each, {} files):",
            index + 1,
            HumanBytes(group.canonical.size),
            group.file_count()
        )?;
        writeln!(out, "  {} (keep)", group.canonical.path.display())?;
        for path in group.replace.iter().flat_map(|record| record.paths()) {
            writeln!(out, "  {}", path.display())?;
        }
    }
    writeln!(
        out,
        "Space freed will be about {}.",
        HumanBytes(plan.reclaimable)
    )
}

/// Replaces every planned duplicate with a hardlink, tracing each step.
///
/// Confirms the space freed even when the plan turned out empty.
pub fn consolidate<W: Write>(
    findings: &mut Findings,
    out: &mut W,
) -> Result<LinkSummary, DedupError> {
    writeln!(out, "No dry-run. Proceeding to filesystem modifications.")?;
    let summary = link_duplicates(&findings.plan, out)?;
    findings.stage = Stage::Linked;
    writeln!(
        out,
        "{}",
        format!("Space freed: {}.", HumanBytes(summary.bytes_freed)).green()
    )?;
    Ok(summary)
}

/// Ends a run after its report: links when `apply` is set and the run got as
/// far as planning, otherwise notes that nothing was changed.
pub fn finish_run<W: Write>(
    findings: &mut Findings,
    apply: bool,
    out: &mut W,
) -> Result<Option<LinkSummary>, DedupError> {
    if findings.stage != Stage::Planning {
        return Ok(None);
    }
    if apply {
        return consolidate(findings, out).map(Some);
    }
    if findings.needs_linking() {
        writeln!(
            out,
            "Dry run, nothing was changed. Re-run with --apply to link duplicates."
        )?;
    }
    Ok(None)
}

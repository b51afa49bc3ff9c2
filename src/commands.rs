use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use copycull_core::storage::{export_csv, import_csv, read_workbook, write_workbook};
use copycull_core::{CellGrid, CopyCullJob, StageOptions, copycull};
use copycull_engine::engine::{PredicateSet, column_letters};
use copycull_engine::script::{RhaiPredicate, create_engine};
use log::info;

use crate::config::{Defaults, JobFile, build_formulas};
use crate::logging::init_logging;
use crate::{Cli, Commands, CullArgs};

pub fn run(cli: Cli) -> Result<()> {
    let defaults = Defaults::load(cli.config.as_deref()).context("loading defaults")?;
    init_logging(cli.verbose, defaults.log_level.as_deref());

    match cli.command {
        Commands::Run {
            job_file,
            output_dir,
        } => run_jobs(&job_file, output_dir.as_deref(), &defaults),
        Commands::Cull(args) => cull(args, &defaults),
        Commands::Inspect {
            workbook,
            sheet,
            header_row,
        } => inspect(&workbook, sheet.as_deref(), header_row),
        Commands::ImportCsv { csv, output, sheet } => {
            let sheet = import_csv(&csv, &sheet)
                .with_context(|| format!("importing {}", csv.display()))?;
            write_workbook(&output, &[sheet])
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Imported {} into {}", csv.display(), output.display());
            Ok(())
        }
        Commands::ExportCsv {
            workbook,
            sheet,
            output,
        } => {
            let sheets = read_workbook(&workbook)
                .with_context(|| format!("reading {}", workbook.display()))?;
            let found = sheets
                .iter()
                .find(|s| s.name == sheet)
                .ok_or_else(|| anyhow!("no sheet named {:?} in {}", sheet, workbook.display()))?;
            export_csv(&output, &found.grid)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Exported {:?} to {}", sheet, output.display());
            Ok(())
        }
    }
}

fn run_jobs(job_file: &Path, output_dir: Option<&Path>, defaults: &Defaults) -> Result<()> {
    let file = JobFile::load(job_file)?;
    if file.jobs.is_empty() {
        bail!("{} has no [[job]] entries", job_file.display());
    }
    let output_dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| file.output_dir.clone())
        .or_else(|| defaults.output_dir.clone());

    let engine = Arc::new(create_engine());
    for (index, spec) in file.jobs.iter().enumerate() {
        let job = spec.to_job(index, &file.source, output_dir.as_deref(), &engine)?;
        run_one(job).with_context(|| format!("job {} ({})", index, spec.output.display()))?;
    }
    info!("{} jobs done", file.jobs.len());
    Ok(())
}

fn cull(args: CullArgs, defaults: &Defaults) -> Result<()> {
    let engine = Arc::new(create_engine());

    let mut predicates = PredicateSet::new();
    for condition in &args.conditions {
        let (column, expr) = split_assignment(condition, "--where")?;
        let predicate = RhaiPredicate::compile(engine.clone(), expr)
            .with_context(|| format!("condition on {:?}", column))?;
        predicates.insert(column, predicate);
    }

    let formulas = parse_assignments(&args.formulas, "--formula")?;
    let number_formats = parse_assignments(&args.number_formats, "--number-format")?;
    let formulas = build_formulas(&formulas, &number_formats, &engine).map_err(|e| anyhow!(e))?;

    let mut options = StageOptions::default()
        .with_header_row(args.header_row)
        .with_protected_rows(args.protected_rows.iter().copied());
    if let Some(row) = args.first_modifiable_row {
        options = options.with_first_modifiable_row(row);
    }
    if let Some(name) = args.rename {
        options = options.with_rename(name);
    }

    let mut job = CopyCullJob::new(&args.workbook, &args.output, &args.sheet)
        .with_options(options)
        .with_predicates(predicates, args.combinator)
        .with_mode(args.mode)
        .with_formulas(formulas);
    if let Some(dir) = args.output_dir.or_else(|| defaults.output_dir.clone()) {
        job = job.with_copy_to_dir(dir);
    }
    run_one(job)
}

fn run_one(job: CopyCullJob) -> Result<()> {
    let source = job.source.clone();
    let outcome = copycull(job).with_context(|| format!("culling {}", source.display()))?;
    println!(
        "{}: sheet {:?}, {} rows removed, {} cells written",
        outcome.workbook.target_path().display(),
        outcome.sheet,
        outcome.rows_removed,
        outcome.cells_written
    );
    Ok(())
}

fn inspect(path: &Path, only: Option<&str>, header_row: u32) -> Result<()> {
    let sheets = read_workbook(path).with_context(|| format!("reading {}", path.display()))?;
    if let Some(name) = only
        && !sheets.iter().any(|s| s.name == name)
    {
        bail!("no sheet named {:?} in {}", name, path.display());
    }

    for sheet in sheets.iter().filter(|s| only.is_none_or(|name| s.name == name)) {
        let last = sheet.grid.last_populated_row();
        println!(
            "{}: {} data rows",
            sheet.name,
            last.saturating_sub(header_row)
        );
        for (col, label) in sheet.grid.header_text(header_row) {
            println!("  {}: {}", column_letters(col), label);
        }
    }
    Ok(())
}

/// Split `KEY=VALUE` at the first `=`.
fn split_assignment<'a>(input: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("{} expects KEY=VALUE, got {:?}", flag, input),
    }
}

fn parse_assignments(inputs: &[String], flag: &str) -> Result<BTreeMap<String, String>> {
    inputs
        .iter()
        .map(|input| {
            split_assignment(input, flag).map(|(k, v)| (k.to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assignment_first_equals() {
        assert_eq!(
            split_assignment("G==A{row}+B{row}", "--formula").unwrap(),
            ("G", "=A{row}+B{row}")
        );
        assert_eq!(
            split_assignment("Team Code=value == 7", "--where").unwrap(),
            ("Team Code", "value == 7")
        );
        assert!(split_assignment("=x", "--where").is_err());
        assert!(split_assignment("nothing", "--where").is_err());
    }

    #[test]
    fn test_parse_assignments() {
        let parsed =
            parse_assignments(&["G=0.00".to_string(), "H = #,##0".to_string()], "--number-format")
                .unwrap();
        assert_eq!(parsed.get("G").map(String::as_str), Some("0.00"));
        assert_eq!(parsed.get("H").map(String::as_str), Some("#,##0"));
    }
}

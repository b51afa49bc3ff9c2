//! copycull - cull rows from copies of a workbook sheet and fill in formulas

mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use copycull_core::CullMode;
use copycull_engine::engine::Combinator;

#[derive(Parser)]
#[command(name = "copycull")]
#[command(about = "Copy a workbook, cull sheet rows by column conditions, and write formulas")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, action = ArgAction::Count, global = true, help = "More logging (-v debug, -vv trace)")]
    pub verbose: u8,
    #[arg(long, value_name = "PATH", global = true, help = "Defaults file (default: copycull.toml in the user config dir)")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run every job in a TOML job file")]
    Run {
        #[arg(help = "Path to the job file")]
        job_file: PathBuf,
        #[arg(long, value_name = "DIR", help = "Directory for the copies (overrides the job file)")]
        output_dir: Option<PathBuf>,
    },
    #[command(about = "Cull one sheet into a copy of a workbook")]
    Cull(CullArgs),
    #[command(about = "Show sheets, header columns and row counts")]
    Inspect {
        #[arg(help = "Path to the workbook")]
        workbook: PathBuf,
        #[arg(long, help = "Only this sheet")]
        sheet: Option<String>,
        #[arg(long, default_value_t = 1, help = "Row holding the column labels")]
        header_row: u32,
    },
    #[command(about = "Convert a CSV file into a one-sheet workbook")]
    ImportCsv {
        #[arg(help = "Path to the CSV file")]
        csv: PathBuf,
        #[arg(long, short, help = "Workbook to write")]
        output: PathBuf,
        #[arg(long, default_value = "Sheet1", help = "Name of the sheet")]
        sheet: String,
    },
    #[command(about = "Write one sheet of a workbook as CSV")]
    ExportCsv {
        #[arg(help = "Path to the workbook")]
        workbook: PathBuf,
        #[arg(long, help = "Sheet to export")]
        sheet: String,
        #[arg(long, short, help = "CSV file to write")]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct CullArgs {
    #[arg(help = "Source workbook (left unchanged)")]
    pub workbook: PathBuf,
    #[arg(long, help = "Sheet to cull")]
    pub sheet: String,
    #[arg(long, short, help = "File name of the copy")]
    pub output: PathBuf,
    #[arg(long, value_name = "DIR", help = "Directory for the copy (default: the source's directory)")]
    pub output_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 1, help = "Row holding the column labels")]
    pub header_row: u32,
    #[arg(long, value_name = "ROW", help = "First row that may be changed (default: header row + 1)")]
    pub first_modifiable_row: Option<u32>,
    #[arg(long = "where", value_name = "COLUMN=EXPR", help = "Condition on a header column, e.g. 'Team Code=value == 7'")]
    pub conditions: Vec<String>,
    #[arg(long, default_value = "and", help = "How conditions combine: and | or | xor")]
    pub combinator: Combinator,
    #[arg(long, default_value = "delete", help = "delete rows that match, or keep only those")]
    pub mode: CullMode,
    #[arg(long = "protect", value_name = "ROW", help = "Row that is never deleted or filled")]
    pub protected_rows: Vec<u32>,
    #[arg(long = "formula", value_name = "COL=FORMULA", help = "Formula column, e.g. 'G==A{row}+B{row}'")]
    pub formulas: Vec<String>,
    #[arg(long = "number-format", value_name = "COL=FORMAT", help = "Number format for a formula column")]
    pub number_formats: Vec<String>,
    #[arg(long, help = "New name for the culled sheet")]
    pub rename: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match commands::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{debug, error};
use modus_core::goal::Module;
use modus_core::reports::{ReportCollector, Severity};
use modus_core::{CompileError, OptTuple};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

mod listing;
mod output;

use output::{Format, Printer};

fn main() -> ExitCode {
    let cli = Command::new("modus")
        .version("0.1.0")
        .about("Checks and compiles logic-language modules to low-level code");

    let cli = setup_cli(cli);
    let matches = cli.get_matches();
    init_logging(matches.get_count("verbose"));
    ExitCode::from(dispatch_commands(&matches))
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn module_arg() -> Arg {
    Arg::new("file")
        .help("The module file (JSON) to read")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .index(1)
}

fn format_arg() -> Arg {
    Arg::new("format")
        .help("Output format")
        .long("format")
        .value_parser(["text", "json"])
        .default_value("text")
        .value_name("FORMAT")
}

fn level_arg() -> Arg {
    Arg::new("level")
        .help("Optimization level")
        .short('O')
        .value_parser(clap::value_parser!(u8).range(0..=6))
        .default_value("2")
        .value_name("N")
}

fn opt_arg() -> Arg {
    Arg::new("opt")
        .help("Override one optimization setting, e.g. `no-licm` or `inline-simple-threshold=20`")
        .long("opt")
        .action(ArgAction::Append)
        .value_name("OVERRIDE")
}

/// Sets up the subcommands and their arguments.
fn setup_cli(cli: Command) -> Command {
    cli.arg(
        Arg::new("verbose")
            .help("More log output (repeat for more)")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .global(true),
    )
    .subcommand(
        Command::new("check")
            .about("Run mode, determinism and switch analysis and print diagnostics")
            .arg(module_arg())
            .arg(format_arg()),
    )
    .subcommand(
        Command::new("build")
            .about("Compile a module and print or write its instruction listing")
            .arg(module_arg())
            .arg(level_arg())
            .arg(opt_arg())
            .arg(format_arg())
            .arg(
                Arg::new("output")
                    .help("Write the listing to this file instead of stdout")
                    .short('o')
                    .long("output")
                    .value_parser(clap::value_parser!(PathBuf))
                    .value_name("FILE"),
            )
            .arg(
                Arg::new("stats")
                    .help("Print a per-procedure summary table")
                    .long("stats")
                    .action(ArgAction::SetTrue),
            ),
    )
    .subcommand(
        Command::new("run")
            .about("Compile a module and enumerate the solutions of one procedure")
            .arg(module_arg())
            .arg(
                Arg::new("proc")
                    .help("Procedure to run, as name, name/arity or name/arity-mode")
                    .long("proc")
                    .required(true)
                    .value_name("PROC"),
            )
            .arg(
                Arg::new("arg")
                    .help("Input argument as a ground term, in order")
                    .long("arg")
                    .action(ArgAction::Append)
                    .allow_hyphen_values(true)
                    .value_name("TERM"),
            )
            .arg(level_arg())
            .arg(opt_arg()),
    )
}

/// Runs the chosen subcommand and returns the process exit code.
fn dispatch_commands(matches: &ArgMatches) -> u8 {
    let result = match matches.subcommand() {
        Some(("check", sub_m)) => cmd_check(sub_m),
        Some(("build", sub_m)) => cmd_build(sub_m),
        Some(("run", sub_m)) => cmd_run(sub_m),
        _ => {
            eprintln!("No valid subcommand was used. Use --help for more information.");
            return 1;
        }
    };
    match result {
        Ok(code) => code,
        Err(failure) => failure.exit_code(),
    }
}

/// Why a command stopped before producing its normal output.
enum Failure {
    /// Bad input from the user; already printed.
    Usage,
    /// The compiler itself failed; already printed.
    Fatal,
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Usage => 1,
            Failure::Fatal => 2,
        }
    }
}

fn load(sub_m: &ArgMatches, printer: &Printer) -> Result<Module, Failure> {
    let path = sub_m.get_one::<PathBuf>("file").ok_or(Failure::Usage)?;
    debug!("loading {}", path.display());
    Module::load(path).map_err(|e| {
        printer.compile_error(&CompileError::Load(e));
        Failure::Usage
    })
}

fn policy(sub_m: &ArgMatches, printer: &Printer) -> Result<OptTuple, Failure> {
    let level = sub_m.get_one::<u8>("level").copied().unwrap_or(2);
    let overrides: Vec<&String> = sub_m.get_many::<String>("opt").map(|v| v.collect()).unwrap_or_default();
    OptTuple::from_args(level, &overrides).map_err(|e| {
        let mut reports = ReportCollector::new();
        reports.push_diagnostic(&e);
        printer.reports(&reports);
        Failure::Usage
    })
}

fn printer_for(sub_m: &ArgMatches) -> Printer {
    let format = match sub_m.get_one::<String>("format").map(String::as_str) {
        Some("json") => Format::Json,
        _ => Format::Text,
    };
    Printer::new(format)
}

fn cmd_check(sub_m: &ArgMatches) -> Result<u8, Failure> {
    let printer = printer_for(sub_m);
    let module = load(sub_m, &printer)?;
    let checked = modus_core::check_module(module).map_err(|e| compile_failure(&printer, e))?;
    let mut reports = checked.reports;
    reports.sort();
    printer.reports(&reports);
    if printer.format() == Format::Text {
        printer.summary(&reports, checked.procs.len());
    }
    Ok(exit_code(&reports))
}

fn cmd_build(sub_m: &ArgMatches) -> Result<u8, Failure> {
    let printer = printer_for(sub_m);
    let module = load(sub_m, &printer)?;
    let opts = policy(sub_m, &printer)?;
    debug!("policy: {}", opts);

    let total = module.bodies.len();
    let bar = printer.progress(total);
    let compiled = modus_core::compile_module_observed(module, &opts, |name| {
        if let Some(bar) = &bar {
            bar.set_message(name.to_string());
            bar.inc(1);
        }
    });
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let compiled = compiled.map_err(|e| compile_failure(&printer, e))?;

    let mut reports = compiled.reports;
    reports.sort();
    printer.reports(&reports);

    let rendered = match printer.format() {
        Format::Json => compiled.code.to_json().map_err(|e| {
            error!("cannot serialise module code: {}", e);
            Failure::Fatal
        })?,
        Format::Text => listing::render(&compiled.code),
    };
    match sub_m.get_one::<PathBuf>("output") {
        Some(path) => {
            fs::write(path, rendered).map_err(|e| {
                eprintln!("cannot write {}: {}", path.display(), e);
                Failure::Usage
            })?;
            printer.note(&format!("wrote {}", path.display()));
        }
        None => println!("{}", rendered),
    }
    if sub_m.get_flag("stats") {
        eprintln!("{}", listing::stats_table(&compiled.code));
    }
    Ok(exit_code(&reports))
}

fn cmd_run(sub_m: &ArgMatches) -> Result<u8, Failure> {
    let printer = Printer::new(Format::Text);
    let module = load(sub_m, &printer)?;
    let opts = policy(sub_m, &printer)?;

    let inputs = sub_m
        .get_many::<String>("arg")
        .map(|v| v.collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .map(|text| modus_core::parse_term(text))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            eprintln!("{}", e);
            Failure::Usage
        })?;

    let compiled = modus_core::compile_module(module, &opts).map_err(|e| compile_failure(&printer, e))?;
    let mut reports = compiled.reports;
    reports.sort();
    printer.reports(&reports);

    let wanted = sub_m.get_one::<String>("proc").ok_or(Failure::Usage)?;
    let proc = compiled.table.lookup_proc(wanted).ok_or_else(|| {
        eprintln!("no procedure matches `{}`", wanted);
        Failure::Usage
    })?;
    if compiled.code.proc(proc).is_none() {
        eprintln!("{} was not compiled because of the errors above", compiled.table.proc_name(proc));
        return Err(Failure::Usage);
    }

    match modus_core::run_proc(&compiled.code, &compiled.table, proc, inputs) {
        Ok(solutions) => {
            printer.solutions(&solutions);
            Ok(exit_code(&reports))
        }
        Err(e) => {
            eprintln!("{}", e);
            Err(Failure::Fatal)
        }
    }
}

fn compile_failure(printer: &Printer, e: CompileError) -> Failure {
    printer.compile_error(&e);
    match e.report().severity {
        Severity::Fatal => Failure::Fatal,
        _ => Failure::Usage,
    }
}

fn exit_code(reports: &ReportCollector) -> u8 {
    reports.exit_code().clamp(0, 2) as u8
}

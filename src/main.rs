//! Command-line front end for gaussjob.
//!
//! Prepares a Gaussian calculation the way a workflow engine would: reads a
//! structure and a parameters dictionary, writes the sandbox input file and
//! the job descriptor, and later checks that the retrieved outputs exist.

use gaussjob::calcjob::{
    check_retrieved, CalcInfo, CalcJob, CalcJobOptions, Code, Folder, GaussianCalculation,
    GaussianInputs,
};
use gaussjob::help::{print_global_help, print_keyword_help};
use gaussjob::io::read_xyz;
use gaussjob::settings::{SettingsManager, CONFIG_FILE_NAME};
use gaussjob::template_generator::{parameters_template, settings_template, write_template_to_file};
use log::{info, warn};
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use uuid::Uuid;

/// Name of the job descriptor written next to the input file.
const CALCINFO_FILE: &str = "calcinfo.json";

/// Target name that selects the settings dictionary template in `ci`.
const SETTINGS_TEMPLATE_FILE: &str = "settings.json";

/// Options of the `prepare` command.
struct PrepareArgs {
    structure: PathBuf,
    parameters: PathBuf,
    settings: Option<PathBuf>,
    folder: PathBuf,
    code_uuid: Option<Uuid>,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    check_help_flags(&args);

    let manager = match SettingsManager::load() {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    // RUST_LOG directives refine the configured level
    manager.logging().logger_builder().parse_default_env().init();
    for message in manager.skipped_files() {
        warn!("{}", message);
    }
    info!("Configuration loaded from: {}", manager.config_source());

    let result = match args[1].as_str() {
        "prepare" => parse_prepare_args(&args[2..]).and_then(|opts| run_prepare(&opts, &manager)),
        "define" => run_define(),
        "check" => {
            if args.len() < 4 {
                Err("Usage: gaussjob check <retrieved_dir> <calcinfo.json>".into())
            } else {
                run_check(Path::new(&args[2]), Path::new(&args[3]))
            }
        }
        "ci" => {
            if args.len() < 3 {
                Err("Usage: gaussjob ci parameters.json | settings.json | gaussjob_config.cfg".into())
            } else {
                run_create_template(Path::new(&args[2]))
            }
        }
        other => {
            eprintln!("Error: Unknown command: {}", other);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} prepare <structure.xyz> <parameters.json> [--settings FILE] [--folder DIR]", program);
    eprintln!("  {} define", program);
    eprintln!("  {} check <retrieved_dir> <calcinfo.json>", program);
    eprintln!("  {} ci parameters.json | settings.json | {}", program, CONFIG_FILE_NAME);
    eprintln!("  {} --help [keywords]", program);
}

/// Check for help flags and print appropriate help
fn check_help_flags(args: &[String]) {
    if args[1] == "--help" || args[1] == "-h" {
        match args.get(2).map(String::as_str) {
            Some("keywords") => print_keyword_help(),
            _ => print_global_help(),
        }
        process::exit(0);
    }
}

fn parse_prepare_args(args: &[String]) -> Result<PrepareArgs, Box<dyn std::error::Error>> {
    let mut positional = Vec::new();
    let mut settings = None;
    let mut folder = PathBuf::from("sandbox");
    let mut code_uuid = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--settings" => {
                settings = Some(PathBuf::from(iter.next().ok_or("--settings needs a file")?));
            }
            "--folder" => {
                folder = PathBuf::from(iter.next().ok_or("--folder needs a directory")?);
            }
            "--code-uuid" => {
                let value = iter.next().ok_or("--code-uuid needs a value")?;
                code_uuid = Some(Uuid::parse_str(value)?);
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown option: {}", flag).into());
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    if positional.len() != 2 {
        return Err("prepare needs <structure.xyz> and <parameters.json>".into());
    }
    let parameters = positional.pop().ok_or("missing parameters file")?;
    let structure = positional.pop().ok_or("missing structure file")?;

    Ok(PrepareArgs {
        structure,
        parameters,
        settings,
        folder,
        code_uuid,
    })
}

fn read_dict(path: &Path) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(format!("{} does not contain a JSON object", path.display()).into()),
    }
}

fn run_prepare(
    opts: &PrepareArgs,
    manager: &SettingsManager,
) -> Result<(), Box<dyn std::error::Error>> {
    let job = manager.job();
    let structure = read_xyz(&opts.structure)?;
    let parameters = read_dict(&opts.parameters)?;

    let mut code = Code::new("gaussian");
    if let Some(uuid) = opts.code_uuid {
        code.uuid = uuid;
    }

    let mut inputs = GaussianInputs::new(structure, parameters)
        .with_code(code)
        .with_options(CalcJobOptions {
            withmpi: job.withmpi,
            parser_name: job.parser_name.clone(),
        });
    if let Some(path) = &opts.settings {
        inputs = inputs.with_settings(read_dict(path)?);
    }

    let calc = GaussianCalculation::new(inputs)?
        .with_title(&job.title)
        .with_route_tag(job.route_tag);

    let folder = Folder::create(&opts.folder)?;
    let calc_info = calc.prepare_for_submission(&folder)?;

    let calcinfo_path = folder.abs_path(CALCINFO_FILE);
    fs::write(&calcinfo_path, serde_json::to_string_pretty(&calc_info)?)?;

    info!("Job descriptor written to {}", calcinfo_path.display());
    println!("Prepared calculation {}", calc_info.uuid);
    println!("  Input file:  {}", folder.abs_path(&calc_info.stdin_name).display());
    println!("  Stdout:      {}", calc_info.stdout_name);
    println!("  Arguments:   {:?}", calc_info.cmdline_params);
    println!("  Retrieve:    {}", calc_info.retrieve_list.join(", "));
    Ok(())
}

fn run_define() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&GaussianCalculation::spec())?);
    Ok(())
}

fn run_check(retrieved: &Path, calcinfo_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let calc_info: CalcInfo = serde_json::from_str(&fs::read_to_string(calcinfo_path)?)?;
    let folder = Folder::open(retrieved)?;

    match check_retrieved(&calc_info, &folder) {
        Ok(()) => {
            println!("All expected output files retrieved");
            Ok(())
        }
        Err(exit_code) => {
            eprintln!("{}", exit_code);
            process::exit(exit_code.status as i32);
        }
    }
}

fn run_create_template(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.file_name().and_then(|n| n.to_str()) == Some(CONFIG_FILE_NAME) {
        SettingsManager::create_template(path)?;
        println!("✓ Settings template created: {}", path.display());
        return Ok(());
    }

    if path.exists() {
        warn!("Overwriting existing file {}", path.display());
    }
    if path.file_name().and_then(|n| n.to_str()) == Some(SETTINGS_TEMPLATE_FILE) {
        write_template_to_file(&settings_template(), path)?;
        println!("✓ Settings dictionary template created: {}", path.display());
        return Ok(());
    }
    write_template_to_file(&parameters_template(), path)?;
    println!("✓ Parameters template created: {}", path.display());
    println!("\nNext steps:");
    println!("  1. Edit functional, basis set and keyword groups");
    println!("  2. Run: gaussjob prepare <structure.xyz> {}", path.display());
    Ok(())
}

use gaussjob::calcjob::{
    CalcJob, CalcJobError, CalcJobOptions, Code, Folder, GaussianCalculation, GaussianInputs,
};
use gaussjob::parameters::InputValidationError;
use gaussjob::structure::Molecule;
use serde_json::{json, Map, Value};
use std::fs;
use tempfile::TempDir;

fn dict(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

fn methyl_radical() -> Molecule {
    Molecule::with_charge_and_spin(
        vec!["C".to_string(), "H".to_string(), "H".to_string(), "H".to_string()],
        vec![
            0.0, 0.0, 0.0, //
            1.079, 0.0, 0.0, //
            -0.5395, 0.9344, 0.0, //
            -0.5395, -0.9344, 0.0,
        ],
        0,
        2,
    )
    .unwrap()
}

fn hydroxide() -> Molecule {
    Molecule::with_charge_and_spin(
        vec!["O".to_string(), "H".to_string()],
        vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.97],
        -1,
        1,
    )
    .unwrap()
}

fn basic_parameters() -> Map<String, Value> {
    dict(json!({"functional": "PBE1PBE", "basis_set": "6-31g"}))
}

#[test]
fn test_writes_single_input_file_with_charge_and_multiplicity() {
    let dir = TempDir::new().unwrap();
    let folder = Folder::create(dir.path()).unwrap();

    let calc = GaussianCalculation::new(GaussianInputs::new(hydroxide(), basic_parameters())).unwrap();
    let calc_info = calc.prepare_for_submission(&folder).unwrap();

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);

    let text = fs::read_to_string(folder.abs_path(GaussianCalculation::INPUT_FILE)).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "#P PBE1PBE/6-31g ");
    assert_eq!(lines[2], GaussianCalculation::DEFAULT_TITLE);
    assert_eq!(lines[4], "-1 1");
    assert_eq!(lines[5], "O 0.000000 0.000000 0.000000");
    assert_eq!(lines[6], "H 0.000000 0.000000 0.970000");

    assert_eq!(calc_info.stdin_name, GaussianCalculation::INPUT_FILE);
}

#[test]
fn test_open_shell_structure() {
    let dir = TempDir::new().unwrap();
    let folder = Folder::create(dir.path()).unwrap();

    let parameters = dict(json!({
        "functional": "UB3LYP",
        "basis_set": "def2SVP",
        "route_parameters": {"nosymm": null, "opt": {"maxcycles": 50}},
        "link0_parameters": {"%chk": "aiida.chk", "%nprocshared": 4},
    }));
    let calc = GaussianCalculation::new(GaussianInputs::new(methyl_radical(), parameters)).unwrap();
    calc.prepare_for_submission(&folder).unwrap();

    let text = fs::read_to_string(folder.abs_path("aiida.gjf")).unwrap();
    assert!(text.starts_with(
        "%chk=aiida.chk\n%nprocshared=4\n#P UB3LYP/def2SVP nosymm opt=(maxcycles=50)\n"
    ));
    assert!(text.contains("\n0 2\nC 0.000000 0.000000 0.000000\n"));
}

#[test]
fn test_absent_groups_and_settings() {
    let dir = TempDir::new().unwrap();
    let folder = Folder::create(dir.path()).unwrap();

    let calc = GaussianCalculation::new(GaussianInputs::new(hydroxide(), basic_parameters())).unwrap();
    assert!(calc.parameters().route_parameters.is_none());
    assert!(calc.parameters().input_parameters.is_none());
    assert!(calc.parameters().link0_parameters.is_none());

    let calc_info = calc.prepare_for_submission(&folder).unwrap();
    assert!(calc_info.cmdline_params.is_empty());
    assert!(calc_info.codes_info[0].cmdline_params.is_empty());
    assert_eq!(calc_info.retrieve_list, vec![GaussianCalculation::OUTPUT_FILE]);
    assert!(calc_info.local_copy_list.is_empty());
    assert!(calc_info.remote_copy_list.is_empty());
}

#[test]
fn test_cmdline_from_settings() {
    let dir = TempDir::new().unwrap();
    let folder = Folder::create(dir.path()).unwrap();

    let settings = dict(json!({"cmdline": ["-p=4", "-m=2GB"]}));
    let inputs = GaussianInputs::new(hydroxide(), basic_parameters()).with_settings(settings.clone());
    let calc = GaussianCalculation::new(inputs).unwrap();

    let calc_info = calc.prepare_for_submission(&folder).unwrap();
    assert_eq!(calc_info.cmdline_params, vec!["-p=4", "-m=2GB"]);
    assert_eq!(calc_info.codes_info[0].cmdline_params, vec!["-p=4", "-m=2GB"]);

    // Preparing twice gives the same arguments; the caller's dictionary is untouched
    let again = calc.prepare_for_submission(&folder).unwrap();
    assert_eq!(again.cmdline_params, calc_info.cmdline_params);
    assert!(settings.contains_key("cmdline"));
}

#[test]
fn test_additional_retrieve_list() {
    let dir = TempDir::new().unwrap();
    let folder = Folder::create(dir.path()).unwrap();

    let settings = dict(json!({"additional_retrieve_list": ["aiida.chk", "aiida.log"]}));
    let inputs = GaussianInputs::new(hydroxide(), basic_parameters()).with_settings(settings);
    let calc_info = GaussianCalculation::new(inputs)
        .unwrap()
        .prepare_for_submission(&folder)
        .unwrap();

    assert_eq!(calc_info.retrieve_list, vec!["aiida.log", "aiida.chk"]);
}

#[test]
fn test_stdout_name_is_fixed() {
    let dir = TempDir::new().unwrap();
    let folder = Folder::create(dir.path()).unwrap();

    let code = Code::new("g16@cluster");
    let code_uuid = code.uuid;
    let inputs = GaussianInputs::new(methyl_radical(), basic_parameters())
        .with_code(code)
        .with_options(CalcJobOptions {
            withmpi: true,
            parser_name: "custom_parser".to_string(),
        });
    let calc = GaussianCalculation::new(inputs).unwrap();
    let calc_info = calc.prepare_for_submission(&folder).unwrap();

    assert_eq!(calc_info.stdout_name, GaussianCalculation::OUTPUT_FILE);
    assert_eq!(calc_info.stdout_name, "aiida.log");
    assert_eq!(calc_info.codes_info.len(), 1);

    let code_info = &calc_info.codes_info[0];
    assert_eq!(code_info.stdout_name, GaussianCalculation::OUTPUT_FILE);
    assert_eq!(code_info.stdin_name, GaussianCalculation::INPUT_FILE);
    assert_eq!(code_info.code_uuid, code_uuid);
    assert!(code_info.withmpi);
    assert_eq!(calc_info.uuid, calc.uuid());
}

#[test]
fn test_missing_functional_is_rejected() {
    let inputs = GaussianInputs::new(hydroxide(), dict(json!({"basis_set": "6-31g"})));
    match GaussianCalculation::new(inputs) {
        Err(CalcJobError::InputValidation(InputValidationError::MissingKey(key))) => {
            assert_eq!(key, "functional")
        }
        other => panic!("Expected a missing functional, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_malformed_cmdline_is_rejected() {
    let dir = TempDir::new().unwrap();
    let folder = Folder::create(dir.path()).unwrap();

    let inputs = GaussianInputs::new(hydroxide(), basic_parameters())
        .with_settings(dict(json!({"cmdline": "-p=4"})));
    let calc = GaussianCalculation::new(inputs).unwrap();
    assert!(matches!(
        calc.prepare_for_submission(&folder),
        Err(CalcJobError::InputValidation(_))
    ));
}

#[test]
fn test_descriptor_serializes_for_the_engine() {
    let dir = TempDir::new().unwrap();
    let folder = Folder::create(dir.path()).unwrap();

    let calc = GaussianCalculation::new(GaussianInputs::new(hydroxide(), basic_parameters())).unwrap();
    let calc_info = calc.prepare_for_submission(&folder).unwrap();

    let json = serde_json::to_value(&calc_info).unwrap();
    assert_eq!(json["stdin_name"], "aiida.gjf");
    assert_eq!(json["stdout_name"], "aiida.log");
    assert_eq!(json["retrieve_list"], json!(["aiida.log"]));

    let back: gaussjob::CalcInfo = serde_json::from_value(json).unwrap();
    assert_eq!(back, calc_info);
}

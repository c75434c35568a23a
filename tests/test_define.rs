use gaussjob::calcjob::{
    check_retrieved, CalcJob, Folder, GaussianCalculation, GaussianInputs, ValidType,
};
use gaussjob::io::parse_xyz;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_declared_inputs() {
    let spec = GaussianCalculation::spec();

    let structure = spec.get_input("structure").unwrap();
    assert_eq!(structure.valid_type, ValidType::Structure);
    assert!(structure.required);

    let parameters = spec.get_input("parameters").unwrap();
    assert_eq!(parameters.valid_type, ValidType::Dict);
    assert!(parameters.required);

    let settings = spec.get_input("settings").unwrap();
    assert!(!settings.required);

    assert!(spec.get_input("code").unwrap().required);

    let withmpi = spec.get_input("metadata.options.withmpi").unwrap();
    assert_eq!(withmpi.default, Some(json!(false)));

    let parser = spec.get_input("metadata.options.parser_name").unwrap();
    assert_eq!(parser.default, Some(json!("gaussian_base_parser")));
    assert!(parser.non_db);
}

#[test]
fn test_declared_outputs_and_exit_codes() {
    let spec = GaussianCalculation::spec();

    assert_eq!(spec.outputs.len(), 2);
    assert!(spec.get_output("output_parameters").unwrap().required);
    assert!(!spec.get_output("output_structure").unwrap().required);
    assert_eq!(spec.default_output_node.as_deref(), Some("output_parameters"));

    assert_eq!(spec.exit_codes.len(), 1);
    let missing = spec.exit_code_by_label("ERROR_MISSING_OUTPUT_FILES").unwrap();
    assert_eq!(missing.status, 100);
    assert_eq!(
        missing.message,
        "Calculation did not produce all expected output files."
    );
}

#[test]
fn test_spec_serializes() {
    let value = serde_json::to_value(GaussianCalculation::spec()).unwrap();
    assert_eq!(value["default_output_node"], "output_parameters");
    assert_eq!(value["exit_codes"][0]["status"], 100);
}

#[test]
fn test_check_retrieved_reports_missing_outputs() {
    let sandbox = TempDir::new().unwrap();
    let retrieved = TempDir::new().unwrap();

    let water = parse_xyz("3\n\nO 0.0 0.0 0.0\nH 0.757 0.586 0.0\nH -0.757 0.586 0.0\n").unwrap();
    let parameters = json!({"functional": "B3LYP", "basis_set": "STO-3G"});
    let inputs = GaussianInputs::new(water, parameters.as_object().unwrap().clone())
        .with_settings(json!({"additional_retrieve_list": ["aiida.chk"]}).as_object().unwrap().clone());
    let calc_info = GaussianCalculation::new(inputs)
        .unwrap()
        .prepare_for_submission(&Folder::create(sandbox.path()).unwrap())
        .unwrap();

    let folder = Folder::open(retrieved.path()).unwrap();
    let err = check_retrieved(&calc_info, &folder).unwrap_err();
    assert_eq!(err.status, GaussianCalculation::ERROR_MISSING_OUTPUT_FILES);
    assert_eq!(err.label, "ERROR_MISSING_OUTPUT_FILES");

    fs::write(folder.abs_path("aiida.log"), " Normal termination of Gaussian 16\n").unwrap();
    assert!(check_retrieved(&calc_info, &folder).is_err());

    fs::write(folder.abs_path("aiida.chk"), "").unwrap();
    assert!(check_retrieved(&calc_info, &folder).is_ok());
}

#[test]
fn test_open_missing_folder_fails() {
    let dir = TempDir::new().unwrap();
    assert!(Folder::open(dir.path().join("absent")).is_err());
}

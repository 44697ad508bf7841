//! Integration tests for the xsd-polish CLI

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn get_binary_path() -> String {
    let release = "target/release/xsd-polish";
    let debug = "target/debug/xsd-polish";

    if Path::new(release).exists() {
        release.to_string()
    } else {
        debug.to_string()
    }
}

const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:gml="http://www.opengis.net/gml/3.2"
           targetNamespace="urn:x-test">
    <xs:import namespace="urn:x-sample" schemaLocation="stale-a.xsd"/>
    <xs:import namespace="urn:x-sample" schemaLocation="stale-b.xsd"/>
    <xs:element name="" type="Discarded"/>
    <xs:complexType name="Type"/>
    <xs:element name="Temperature" type="gml:CodeType"/>
    <xs:element name="Report" type="ReportType" substitutionGroup="gml:AbstractFeature"/>
    <xs:complexType name="ReportType">
        <xs:complexContent>
            <xs:extension base="gml:AbstractFeatureType">
                <xs:sequence>
                    <xs:element name="issueTime" type="xs:dateTime"/>
                </xs:sequence>
            </xs:extension>
        </xs:complexContent>
    </xs:complexType>
</xs:schema>"#;

fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let json = format!(
        r#"{{
            "location": {{"EADirectory": "EA", "ReleaseDirectory": "schemas"}},
            "schema": {{"name": "test.xsd", "defaultNamespace": "urn:x-test"}}{extra}
        }}"#
    );
    let path = dir.join("test.json");
    fs::write(&path, json).unwrap();
    path
}

fn setup(schema: &str, config_extra: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("EA")).unwrap();
    fs::create_dir(temp.path().join("schemas")).unwrap();
    fs::write(temp.path().join("EA").join("test.xsd"), schema).unwrap();
    let config = write_config(temp.path(), config_extra);
    (temp, config)
}

#[test]
fn test_full_pipeline() {
    let binary = get_binary_path();
    let (temp, config) = setup(
        SCHEMA,
        r#", "imports": {"smp": "urn:x-sample schema/x.xsd"},
            "codeLists": {"Temperature": "TemperatureType"},
            "setNilAttribute": ["issueTime"]"#,
    );

    let output = Command::new(&binary)
        .args([
            "--base-dir",
            temp.path().to_str().unwrap(),
            config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run command");

    assert!(output.status.success());

    let result = fs::read_to_string(temp.path().join("schemas").join("test.xsd")).unwrap();

    // Code list retyped.
    assert!(result.contains(r#"<xs:element name="Temperature" type="TemperatureType"/>"#));
    // Duplicate import collapsed onto the required location.
    assert_eq!(result.matches(r#"namespace="urn:x-sample""#).count(), 1);
    assert!(result.contains(r#"schemaLocation="schema/x.xsd""#));
    assert!(!result.contains("stale-b.xsd"));
    // Placeholder element and generator type removed.
    assert!(!result.contains(r#"name="""#));
    assert!(!result.contains(r#"name="Type""#));
    // Abstract feature flattened.
    assert!(!result.contains("substitutionGroup"));
    assert!(!result.contains("complexContent"));
    // Nillable injected, schema prefix stripped from the type value.
    assert!(result.contains(r#"<xs:element name="issueTime" type="dateTime" nillable="true"/>"#));
    // Default namespace and attribute form on the root.
    assert!(result.contains(r#"xmlns="urn:x-test""#));
    assert!(result.contains(r#"attributeFormDefault="unqualified""#));
    // Output conventions.
    assert!(result.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(!result.contains(" />"));
}

#[test]
fn test_rule_misses_are_advisory() {
    let binary = get_binary_path();
    let (temp, config) = setup(SCHEMA, r#", "dataTypes": {"Ghost": "NewType"}"#);

    let output = Command::new(&binary)
        .args([
            "--base-dir",
            temp.path().to_str().unwrap(),
            config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run command");

    // Misses are reported but do not fail the run.
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Ghost"));
    assert!(temp.path().join("schemas").join("test.xsd").exists());
}

#[test]
fn test_missing_schema_file_fails() {
    let binary = get_binary_path();
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("EA")).unwrap();
    fs::create_dir(temp.path().join("schemas")).unwrap();
    let config = write_config(temp.path(), "");

    let output = Command::new(&binary)
        .args([
            "--base-dir",
            temp.path().to_str().unwrap(),
            config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run command");

    assert!(!output.status.success());
    assert!(!temp.path().join("schemas").join("test.xsd").exists());
}

#[test]
fn test_missing_mandatory_config_fails() {
    let binary = get_binary_path();
    let (temp, _) = setup(SCHEMA, "");
    let bad = temp.path().join("bad.json");
    fs::write(&bad, r#"{"schema": {"name": "test.xsd", "defaultNamespace": "urn:x"}}"#).unwrap();

    let output = Command::new(&binary)
        .args([
            "--base-dir",
            temp.path().to_str().unwrap(),
            bad.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad.json"));
}

#[test]
fn test_default_namespace_schema_skipped() {
    let binary = get_binary_path();
    let (temp, config) = setup(r#"<schema xmlns="urn:x-already"/>"#, "");

    let output = Command::new(&binary)
        .args([
            "--base-dir",
            temp.path().to_str().unwrap(),
            config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("skipped"));
    assert!(!temp.path().join("schemas").join("test.xsd").exists());
}

#[test]
fn test_per_file_isolation() {
    let binary = get_binary_path();
    let (temp, good_config) = setup(SCHEMA, "");

    // A second configuration pointing at a schema that does not exist.
    let bad_json = r#"{
        "location": {"EADirectory": "EA", "ReleaseDirectory": "schemas"},
        "schema": {"name": "absent.xsd", "defaultNamespace": "urn:x-test"}
    }"#;
    let bad_config = temp.path().join("bad.json");
    fs::write(&bad_config, bad_json).unwrap();

    let output = Command::new(&binary)
        .args([
            "--base-dir",
            temp.path().to_str().unwrap(),
            bad_config.to_str().unwrap(),
            good_config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run command");

    // The failing file taints the exit code, the good one still completes.
    assert!(!output.status.success());
    assert!(temp.path().join("schemas").join("test.xsd").exists());
}

#[test]
fn test_duplicate_prefix_aborts_file() {
    let binary = get_binary_path();
    let (temp, config) = setup(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:annotation xmlns:p="urn:one"/>
             <xs:annotation xmlns:p="urn:two"/>
           </xs:schema>"#,
        "",
    );

    let output = Command::new(&binary)
        .args([
            "--base-dir",
            temp.path().to_str().unwrap(),
            config.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to run command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate namespace prefix"));
    assert!(!temp.path().join("schemas").join("test.xsd").exists());
}

#[test]
fn test_help() {
    let binary = get_binary_path();

    let output = Command::new(&binary)
        .args(["--help"])
        .output()
        .expect("Failed to run command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("xsd-polish"));
    assert!(stdout.contains("--base-dir"));
}

#[test]
fn test_version() {
    let binary = get_binary_path();

    let output = Command::new(&binary)
        .args(["--version"])
        .output()
        .expect("Failed to run command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("xsd-polish"));
}

use membership_etl::core::ConfigProvider;
use membership_etl::domain::services::annotations::AnnotationStore;
use membership_etl::{EtlEngine, LocalStorage, MembershipPipeline, TomlConfig};
use std::path::Path;
use tempfile::TempDir;

const EXPIRATIONS: &str = "\
Customer name,Customer email,Membership name,Home location,Expires at
Alice,alice@x.com,Studio 4 Class Package,Downtown,2024-01-01
Bob,bob@y.com,Staff Comp,Uptown,2024-02-15
Alice,ALICE@x.com,Studio 4 Class Package,Downtown,2024-03-01
";

const FROZEN: &str = "\
Customer name,Customer email,Membership name,Frozen at,Unfrozen at
Bob,bob@y.com,Studio Annual Unlimited,2024-01-10,2024-04-10
";

fn write_reports(dir: &Path) -> (String, String) {
    let expirations = dir.join("momence-memberships-expiration-report-march.csv");
    let frozen = dir.join("frozen-memberships-report-march.csv");
    std::fs::write(&expirations, EXPIRATIONS).unwrap();
    std::fs::write(&frozen, FROZEN).unwrap();
    (
        expirations.to_string_lossy().to_string(),
        frozen.to_string_lossy().to_string(),
    )
}

fn toml_config(inputs: &[String], output: &str, extra_load: &str) -> TomlConfig {
    let files = inputs
        .iter()
        .map(|f| format!("{:?}", f))
        .collect::<Vec<_>>()
        .join(", ");
    let content = format!(
        r#"
[pipeline]
name = "integration"

[source]
files = [{files}]

[processing]
today = "2024-03-11"

[load]
output_path = {output:?}
output_formats = ["csv", "json"]
{extra_load}
"#
    );
    TomlConfig::from_toml_str(&content).unwrap()
}

#[tokio::test]
async fn test_end_to_end_keeps_latest_unfrozen_record() {
    let temp_dir = TempDir::new().unwrap();
    let (expirations, frozen) = write_reports(temp_dir.path());
    let output_path = temp_dir.path().join("out").to_string_lossy().to_string();

    let config = toml_config(&[expirations, frozen], &output_path, "");
    let pipeline = MembershipPipeline::new(LocalStorage::default(), config);
    let engine = EtlEngine::new_with_monitoring(pipeline, false);

    let result = engine.run().await.unwrap();
    assert_eq!(result, output_path);

    let processed = std::fs::read(Path::new(&output_path).join("processed.json")).unwrap();
    let processed: serde_json::Value = serde_json::from_slice(&processed).unwrap();

    let records = processed["allRecords"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["customerEmail"], "ALICE@x.com");
    assert_eq!(records[0]["expiresAt"], "2024-03-01");
    assert_eq!(records[0]["daysLapsed"], 10);
    assert_eq!(
        records[0]["tags"],
        serde_json::json!(["30-days", "location:downtown"])
    );

    assert_eq!(processed["byPeriod"]["March 2024"].as_array().unwrap().len(), 1);
    assert_eq!(
        processed["byMembershipName"]["Studio 4 Class Package"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
    assert_eq!(processed["summary"]["total"], 1);

    let csv = std::fs::read_to_string(Path::new(&output_path).join("membership-expiry-data.csv"))
        .unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("\"2024-03-01\""));
    assert!(!csv.contains("bob@y.com"));
}

#[tokio::test]
async fn test_bundle_and_annotations_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let (expirations, frozen) = write_reports(temp_dir.path());
    let output_path = temp_dir.path().join("out").to_string_lossy().to_string();
    let annotations_path = temp_dir.path().join("state").join("annotations.json");

    let mut store = AnnotationStore::new();
    let mut alice = membership_etl::MembershipRecord::new("Alice", "alice@x.com", "Session");
    alice.assigned_to = Some("Sam".to_string());
    store.set_from_record(&alice);
    std::fs::create_dir_all(annotations_path.parent().unwrap()).unwrap();
    std::fs::write(&annotations_path, store.to_json().unwrap()).unwrap();

    let extra = format!(
        "annotations_file = {:?}\n\n[load.compression]\nenabled = true\nfilename = \"membership-expiry-data.zip\"\n",
        annotations_path.to_string_lossy()
    );
    let config = toml_config(&[expirations, frozen], &output_path, &extra);
    assert!(config.annotation_edits().is_empty());

    let pipeline = MembershipPipeline::new(LocalStorage::default(), config);
    let engine = EtlEngine::new(pipeline);
    let zip_path = engine.run().await.unwrap();
    assert!(zip_path.ends_with("membership-expiry-data.zip"));

    let zip_data = std::fs::read(&zip_path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    assert_eq!(archive.len(), 3);

    let processed: serde_json::Value = {
        let file = archive.by_name("processed.json").unwrap();
        serde_json::from_reader(file).unwrap()
    };
    assert_eq!(processed["allRecords"][0]["assignedTo"], "Sam");
    assert_eq!(processed["summary"]["assigned"], 1);
    assert_eq!(processed["facets"]["assignees"], serde_json::json!(["Sam"]));
}

#[cfg(feature = "cli")]
#[tokio::test]
async fn test_cli_edits_are_saved_between_runs() {
    use clap::Parser;
    use membership_etl::CliConfig;

    let temp_dir = TempDir::new().unwrap();
    let (expirations, frozen) = write_reports(temp_dir.path());
    let output_path = temp_dir.path().join("out").to_string_lossy().to_string();
    let annotations_path = temp_dir
        .path()
        .join("annotations.json")
        .to_string_lossy()
        .to_string();
    let inputs = format!("{},{}", expirations, frozen);

    let first = CliConfig::try_parse_from([
        "membership-etl",
        "--inputs",
        inputs.as_str(),
        "--output-path",
        output_path.as_str(),
        "--today",
        "2024-03-11",
        "--annotations",
        annotations_path.as_str(),
        "--assign",
        "alice@x.com=Sam",
        "--follow-up",
        "alice@x.com=Left voicemail",
    ])
    .unwrap();
    EtlEngine::new(MembershipPipeline::new(LocalStorage::default(), first))
        .run()
        .await
        .unwrap();

    let saved = AnnotationStore::from_json(&std::fs::read(&annotations_path).unwrap()).unwrap();
    assert_eq!(saved.len(), 1);

    // 第二次執行不帶編輯，應沿用已儲存的指派
    let second = CliConfig::try_parse_from([
        "membership-etl",
        "--inputs",
        inputs.as_str(),
        "--output-path",
        output_path.as_str(),
        "--today",
        "2024-03-11",
        "--annotations",
        annotations_path.as_str(),
        "--assigned-to",
        "Sam",
    ])
    .unwrap();
    EtlEngine::new(MembershipPipeline::new(LocalStorage::default(), second))
        .run()
        .await
        .unwrap();

    let processed = std::fs::read(Path::new(&output_path).join("processed.json")).unwrap();
    let processed: serde_json::Value = serde_json::from_slice(&processed).unwrap();
    let records = processed["allRecords"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["followUps"][0]["comment"], "Left voicemail");
    assert_eq!(records[0]["followUps"][0]["date"], "2024-03-11");
}

#[tokio::test]
async fn test_missing_input_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir
        .path()
        .join("momence-memberships-expiration-report.csv")
        .to_string_lossy()
        .to_string();
    let output_path = temp_dir.path().join("out").to_string_lossy().to_string();

    let config = toml_config(&[missing], &output_path, "");
    let engine = EtlEngine::new(MembershipPipeline::new(LocalStorage::default(), config));

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, membership_etl::EtlError::IoError(_)));
}

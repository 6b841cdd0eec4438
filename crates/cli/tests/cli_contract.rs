use assert_cmd::cargo::cargo_bin_cmd;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, Stream};
use predicates::prelude::*;
use serde_json::Value;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a minimal PDF with one empty content stream per page
fn write_pdf(dir: &Path, name: &str, sizes: &[(i64, i64)]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = sizes
        .iter()
        .map(|(width, height)| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), (*width).into(), (*height).into()],
                "Contents" => content_id,
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => sizes.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).expect("fixture PDF should be written");
    path
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture should be written");
    path
}

fn png_data_url() -> String {
    let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([0, 0, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).expect("png should encode");
    format!("data:image/png;base64,{}", BASE64.encode(out.into_inner()))
}

const COMMENT: &str = r##"[{
    "type": "comment",
    "position": { "page": 1, "x": 10, "y": 20 },
    "text": "Hi",
    "fontSize": 14,
    "fontFamily": "Arial",
    "color": "#000000"
}]"##;

fn page_operators(doc: &Document, page: u32) -> Vec<String> {
    let page_id = doc.get_pages()[&page];
    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    content.operations.into_iter().map(|op| op.operator).collect()
}

#[test]
fn info_emits_page_geometry() {
    let temp = TempDir::new().unwrap();
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(600, 800), (300, 400)]);

    let output = cargo_bin_cmd!("overlay-cli")
        .arg("info")
        .arg(&pdf)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["page_count"], 2);
    assert_eq!(value["pages"][0]["width"], 600.0);
    assert_eq!(value["pages"][1]["height"], 400.0);
}

#[test]
fn validate_prints_normalized_annotations() {
    let temp = TempDir::new().unwrap();
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(600, 800)]);
    let annotations = write_file(
        temp.path(),
        "annotations.json",
        r#"[{"type":"stamp","position":{"page":1,"x":5,"y":5},"text":"approved"}]"#,
    );

    let output = cargo_bin_cmd!("overlay-cli")
        .arg("validate")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value[0]["text"], "APPROVED");
    assert_eq!(value[0]["shape"], "rounded");
    assert!(value[0]["id"].is_u64());
}

#[test]
fn validate_and_export_share_config_resolution() {
    let temp = TempDir::new().unwrap();
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(600, 800)]);
    let annotations = write_file(
        temp.path(),
        "annotations.json",
        r#"[{"type":"signature","position":{"page":1,"x":5,"y":5},
             "signature":{"mode":"typed","text":"Ada"}}]"#,
    );
    let config = write_file(
        temp.path(),
        "overlay.json",
        r#"{ "defaultSignatureSize": { "width": 300, "height": 100 } }"#,
    );

    let output = cargo_bin_cmd!("overlay-cli")
        .arg("validate")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value[0]["size"]["width"], 300.0);
    assert_eq!(value[0]["size"]["height"], 100.0);

    let broken = write_file(temp.path(), "broken.json", r#"{ "zoom": { "min": 2.0, "max": 1.0 } }"#);
    cargo_bin_cmd!("overlay-cli")
        .arg("validate")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .arg("--config")
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn validate_rejects_annotations_on_missing_pages() {
    let temp = TempDir::new().unwrap();
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(600, 800)]);
    let annotations = write_file(
        temp.path(),
        "annotations.json",
        r#"[{"type":"comment","position":{"page":4,"x":0,"y":0},"text":"late"}]"#,
    );

    cargo_bin_cmd!("overlay-cli")
        .arg("validate")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .assert()
        .failure()
        .stderr(predicate::str::contains("page 4 does not exist"));
}

#[test]
fn validate_rejects_empty_comment() {
    let temp = TempDir::new().unwrap();
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(600, 800)]);
    let annotations = write_file(
        temp.path(),
        "annotations.json",
        r#"[{"type":"comment","position":{"page":1,"x":0,"y":0},"text":"  "}]"#,
    );

    cargo_bin_cmd!("overlay-cli")
        .arg("validate")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .assert()
        .failure()
        .stderr(predicate::str::contains("comment text must not be empty"));
}

#[test]
fn export_writes_prefixed_file_next_to_input() {
    let temp = TempDir::new().unwrap();
    let pdf = write_pdf(temp.path(), "contract.pdf", &[(600, 800)]);
    let annotations = write_file(temp.path(), "annotations.json", COMMENT);

    cargo_bin_cmd!("overlay-cli")
        .arg("export")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .assert()
        .success()
        .stdout(predicate::str::contains("annotated_contract.pdf"));

    let exported = temp.path().join("annotated_contract.pdf");
    let doc = Document::load(&exported).expect("exported PDF should load");
    let ops = page_operators(&doc, 1);
    assert!(ops.iter().any(|op| op == "Tj"));
    assert!(ops.iter().any(|op| op == "Tf"));
}

#[test]
fn export_skips_broken_images_and_keeps_the_rest() {
    let temp = TempDir::new().unwrap();
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(600, 800), (600, 800)]);
    let annotations = format!(
        r#"[
            {{"type":"signature","position":{{"page":1,"x":0,"y":0}},
              "signature":{{"mode":"uploaded","image":"data:image/png;base64,iVBORw0KGgoAAAA="}}}},
            {{"type":"signature","position":{{"page":2,"x":20,"y":20}},"size":{{"width":120,"height":60}},
              "signature":{{"mode":"drawn","image":"{}"}}}},
            {{"type":"stamp","position":{{"page":2,"x":300,"y":300}},"text":"draft","shape":"circle"}}
        ]"#,
        png_data_url()
    );
    let annotations = write_file(temp.path(), "annotations.json", &annotations);
    let output = temp.path().join("out/annotated.pdf");

    cargo_bin_cmd!("overlay-cli")
        .arg("export")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("skipped annotation"));

    let doc = Document::load(&output).expect("exported PDF should load");
    assert!(!page_operators(&doc, 1).iter().any(|op| op == "Do"));
    let page_two = page_operators(&doc, 2);
    assert!(page_two.iter().any(|op| op == "Do"));
    assert!(page_two.iter().any(|op| op == "Tj"));
}

#[test]
fn export_honours_config_file() {
    let temp = TempDir::new().unwrap();
    let pdf = write_pdf(temp.path(), "doc.pdf", &[(600, 800)]);
    let annotations = write_file(temp.path(), "annotations.json", COMMENT);
    let config = write_file(temp.path(), "overlay.json", r#"{ "zoom": { "min": 2.0, "max": 1.0 } }"#);

    cargo_bin_cmd!("overlay-cli")
        .arg("export")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn info_fails_for_missing_file() {
    let temp = TempDir::new().unwrap();
    cargo_bin_cmd!("overlay-cli")
        .arg("info")
        .arg(temp.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "invalid.pdf", "this is not a pdf");
    cargo_bin_cmd!("overlay-cli")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn export_fails_for_encrypted_marker_pdf() {
    let temp = TempDir::new().unwrap();
    let path = write_file(temp.path(), "locked.pdf", "%PDF-1.7\n1 0 obj << /Encrypt 2 0 R >> endobj\n");
    let annotations = write_file(temp.path(), "annotations.json", COMMENT);
    cargo_bin_cmd!("overlay-cli")
        .arg("export")
        .arg(&path)
        .arg("--annotations")
        .arg(&annotations)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
    assert!(!temp.path().join("annotated_locked.pdf").exists());
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("overlay-cli")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

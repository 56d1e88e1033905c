//! Translator integration tests: XML exchange and text mapping round trips

mod common;

use canadianccv::content::FieldValue;
use canadianccv::converters::{import_document, to_value, Encoder, JsonEncoder, MappingEncoder, XmlEncoder};
use canadianccv::documents::Document;
use canadianccv::limits::Limits;
use canadianccv::{ContentModel, Error, GENERIC_CV_NAMESPACE};
use pretty_assertions::assert_eq;
use serde_json::json;

const CV: &str = r#"
Personal Information:
  Identification:
    - Family Name: Lovelace
      First Name: Ada
      Biography:
        english: Mathematician and writer
        french: Mathématicienne et écrivaine
Education:
  Degrees:
    - Degree Type: Bachelor's
      Degree Name: Mathematics
      Degree Status: Completed
      Degree Received Date: 1835/06
      Organization: Dalhousie University
      Supervisors:
        - Supervisor Name: Augustus De Morgan
          Start Date: 1840/01
Employment:
  Academic Work Experience:
    - Position Title: Lecturer
      Start Date: 2015/09
      Affiliation:
        Organization: University of Toronto
Activities:
  Teaching Activities:
    Courses Taught:
      - Course Title: Intro to Programming
        Course Code: CS101
        Course Level: Undergraduate
        Start Date: 2019/07
        Number of Students: 45
        Co-Instructors:
          - Family Name: Hopper
            First Name: Grace
          - Family Name: Liskov
            First Name: Barbara
      - Course Title: Compilers
        Course Level: Graduate
        Start Date: 2020/01
"#;

fn populated() -> ContentModel {
    let mut model = common::model();
    let report = model.add_yaml(CV).unwrap();
    assert_eq!(report.skipped, 0);
    assert!(report.warnings.is_empty(), "{:#?}", report.warnings);
    model
}

// ============================================================================
// XML exchange document
// ============================================================================

#[test]
fn test_xml_round_trip() {
    let model = populated();
    let xml = XmlEncoder::new()
        .with_pretty(true)
        .with_timestamp(common::timestamp())
        .encode(&model)
        .unwrap();

    let mut imported = common::model();
    let warnings = import_document(&mut imported, &xml).unwrap();
    assert!(warnings.is_empty(), "{:#?}", warnings);

    assert_eq!(to_value(&imported).unwrap(), to_value(&model).unwrap());
}

#[test]
fn test_xml_reexport_is_stable() {
    let encoder = XmlEncoder::new().with_timestamp(common::timestamp());
    let first = encoder.encode(&populated()).unwrap();

    let mut imported = common::model();
    import_document(&mut imported, &first).unwrap();
    let second = encoder.with_pretty(true).encode(&imported).unwrap();

    let a = Document::from_string(&first).unwrap().into_root().unwrap();
    let b = Document::from_string(&second).unwrap().into_root().unwrap();
    assert!(a.same_structure(&b));
}

#[test]
fn test_xml_document_shape() {
    let model = populated();
    let xml = XmlEncoder::new().with_timestamp(common::timestamp()).encode(&model).unwrap();
    let root = Document::parse(xml.as_bytes(), &Limits::default())
        .unwrap()
        .into_root()
        .unwrap();

    assert_eq!(root.name, "generic-cv:generic-cv");
    assert_eq!(root.namespace(), Some(GENERIC_CV_NAMESPACE));
    assert_eq!(root.get_attribute("lang"), Some("en"));
    assert_eq!(root.get_attribute("dateTimeGenerated"), Some("2024-05-01 09:30:00"));

    let sections: Vec<&str> = root
        .find_children("section")
        .filter_map(|s| s.get_attribute("label"))
        .collect();
    assert_eq!(sections, vec!["Personal Information", "Education", "Employment", "Activities"]);

    assert!(xml.contains(r#"<lov id="00000000000000000000000100000400">Undergraduate</lov>"#));
    assert!(xml.contains(r#"<lov id="71">Bachelor&apos;s</lov>"#) || xml.contains(r#"<lov id="71">Bachelor's</lov>"#));
    assert!(xml.contains(r#"<value format="yyyy/MM" type="Year Month">2019/07</value>"#));
    assert!(xml.contains(r#"<value type="Number">45</value>"#));
    assert!(xml.contains(r#"<refTable refValueId="o_dal">"#));
    assert!(xml.contains(
        r#"<linkedWith label="Subdivision" value="Nova Scotia" refOrLovId="ref_sub"/>"#
    ));
    assert!(xml.contains(
        r#"<linkedWith label="Organization" value="Dalhousie University" refOrLovId="ref_org"/>"#
    ));
}

#[test]
fn test_xml_sections_follow_sort_keys() {
    let model = populated();
    let xml = XmlEncoder::new().with_timestamp(common::timestamp()).encode(&model).unwrap();

    let compilers = xml.find("Compilers").unwrap();
    let intro = xml.find("Intro to Programming").unwrap();
    assert!(compilers < intro, "courses should be newest first");
}

#[test]
fn test_unsupported_type_skips_only_its_record() {
    let mut model = common::model();
    model
        .add(&common::record("Family Name: Lovelace\nLast Updated: 2024-01-01 10:00"))
        .unwrap();
    model
        .add(&common::record("Course Title: Compilers\nCourse Code: CS101\nStart Date: 2020/01"))
        .unwrap();

    let (xml, report) = XmlEncoder::new()
        .with_timestamp(common::timestamp())
        .encode_with_report(&model)
        .unwrap();

    assert_eq!(report.skipped.len(), 1);
    match &report.skipped[0] {
        Error::Unsupported { data_type, field_id, field_label } => {
            assert_eq!(data_type, "Datetime");
            assert_eq!(field_id, "f_updated");
            assert_eq!(field_label, "Last Updated");
        }
        other => panic!("expected an unsupported type error, got {:?}", other),
    }

    // The sibling course is still written; the emptied grouping is not
    assert!(xml.contains("CS101"));
    assert!(!xml.contains("Lovelace"));
    assert!(!xml.contains("Personal Information"));

    // The plain encoder produces the same partial document
    assert_eq!(
        XmlEncoder::new().with_timestamp(common::timestamp()).encode(&model).unwrap(),
        xml
    );

    // The mapping translator carries any text
    assert!(MappingEncoder::default().encode(&model).unwrap().contains("Lovelace"));
}

#[test]
fn test_import_reads_ids_and_chains() {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<generic-cv:generic-cv xmlns:generic-cv="{}" lang="en" dateTimeGenerated="2024-05-01 09:30:00">
  <section id="s_edu" label="Education">
    <section id="s_degrees" label="Degrees">
      <field id="f_dtype" label="Degree Type"><lov id="72"/></field>
      <field id="f_org" label="Organization">
        <refTable refValueId="o_uoft">
          <linkedWith label="Country" value="Canada" refOrLovId="lov_country"/>
          <linkedWith label="Organization" value="University of Toronto" refOrLovId="ref_org"/>
          <linkedWith label="Subdivision" value="Ontario" refOrLovId="ref_sub"/>
        </refTable>
      </field>
      <field id="f_gpa" label="GPA"><value type="String">4.0</value></field>
    </section>
    <section id="s_hobbies" label="Hobbies"/>
  </section>
</generic-cv:generic-cv>"#,
        GENERIC_CV_NAMESPACE
    );

    let mut model = common::model();
    let warnings = import_document(&mut model, &xml).unwrap();
    assert_eq!(warnings.len(), 2, "{:#?}", warnings);

    let degree = &model.root().children("s_edu")[0].children("s_degrees")[0];
    assert_eq!(degree.field("f_dtype"), Some(&FieldValue::text("Master's")));
    assert_eq!(degree.field("f_org"), Some(&FieldValue::text("University of Toronto")));
}

#[test]
fn test_import_appends_to_existing_content() {
    let model = populated();
    let xml = XmlEncoder::new().encode(&model).unwrap();

    let mut merged = populated();
    import_document(&mut merged, &xml).unwrap();

    let value = to_value(&merged).unwrap();
    let courses = &value["Activities"]["Teaching Activities"]["Courses Taught"];
    assert_eq!(courses.as_array().map(Vec::len), Some(4));
    let identification = &value["Personal Information"]["Identification"];
    assert_eq!(identification.as_array().map(Vec::len), Some(2));
}

// ============================================================================
// Text mapping format
// ============================================================================

#[test]
fn test_mapping_round_trip() {
    let model = populated();
    let text = MappingEncoder::new(40, 4).encode(&model).unwrap();

    let mut reread = common::model();
    let report = reread.add_yaml(&text).unwrap();
    assert!(report.warnings.is_empty(), "{}\n{:#?}", text, report.warnings);

    assert_eq!(to_value(&reread).unwrap(), to_value(&model).unwrap());
}

#[test]
fn test_mapping_shapes() {
    let model = populated();
    let value = to_value(&model).unwrap();

    // Containers are mappings, record sections sequences
    assert!(value["Activities"]["Teaching Activities"].is_object());
    assert!(value["Activities"]["Teaching Activities"]["Courses Taught"].is_array());

    // Dependent sections: a single record is a mapping, several a sequence
    let degree = &value["Education"]["Degrees"][0];
    assert_eq!(
        degree["Supervisors"],
        json!({"Supervisor Name": "Augustus De Morgan", "Start Date": "1840/01"})
    );
    let course = &value["Activities"]["Teaching Activities"]["Courses Taught"][1];
    assert_eq!(course["Co-Instructors"].as_array().map(Vec::len), Some(2));

    assert_eq!(
        value["Personal Information"]["Identification"][0]["Biography"],
        json!({"english": "Mathematician and writer", "french": "Mathématicienne et écrivaine"})
    );
}

#[test]
fn test_mapping_text_layout() {
    let mut model = common::model();
    model
        .add(&common::record(
            "Course Title: Introduction to the Theory of Computation\nCourse Code: CS\nStart Date: 2019/07",
        ))
        .unwrap();

    let text = MappingEncoder::new(40, 4).encode(&model).unwrap();
    let expected = "\
Activities:
    Teaching Activities:
        Courses Taught:
            - Course Title: >-
                  Introduction to the
                  Theory of Computation
              Course Code: CS
              Start Date: 2019/07
";
    assert_eq!(text, expected);
}

#[test]
fn test_empty_model_mapping() {
    let model = common::model();
    assert_eq!(MappingEncoder::default().encode(&model).unwrap(), "{}\n");
    assert_eq!(JsonEncoder::new().encode(&model).unwrap(), "{}");
}

#[test]
fn test_json_encoder() {
    let model = populated();
    let text = JsonEncoder::new().with_pretty(true).encode(&model).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, to_value(&model).unwrap());
}

use crate::helpers::write_file;
use emf_reader::xsd::{Document, EnrichOptions, EnrichStats, XSD_NS, enrich_xsd};

const ECORE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<ecore:EPackage xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:ecore="http://www.eclipse.org/emf/2002/Ecore" name="iso" nsURI="urn:iso" nsPrefix="iso">
  <eClassifiers xsi:type="ecore:EClass" name="Repository">
    <eStructuralFeatures xsi:type="ecore:EReference" name="types" upperBound="-1" eType="#//Concept" containment="true"/>
  </eClassifiers>
  <eClassifiers xsi:type="ecore:EClass" name="Concept" abstract="true">
    <eStructuralFeatures xsi:type="ecore:EAttribute" name="name" eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"/>
    <eStructuralFeatures xsi:type="ecore:EAttribute" name="xmlTag" eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"/>
    <eStructuralFeatures xsi:type="ecore:EAttribute" name="definition" eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"/>
  </eClassifiers>
  <eClassifiers xsi:type="ecore:EClass" name="MessageComponent" eSuperTypes="#//Concept">
    <eStructuralFeatures xsi:type="ecore:EReference" name="messageElement" upperBound="-1" eType="#//MessageElement" containment="true"/>
  </eClassifiers>
  <eClassifiers xsi:type="ecore:EClass" name="MessageElement" eSuperTypes="#//Concept"/>
  <eClassifiers xsi:type="ecore:EClass" name="DataType" eSuperTypes="#//Concept"/>
  <eClassifiers xsi:type="ecore:EClass" name="Amount" eSuperTypes="#//DataType"/>
</ecore:EPackage>
"##;

const XMI: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<iso:Repository xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:iso="urn:iso">
  <types xsi:type="iso:MessageComponent" xmi:id="_c1" name="Payment" definition="A payment.">
    <messageElement xmi:id="_e1" name="Amount" xmlTag="Amt" definition="Amount paid."/>
  </types>
  <types xsi:type="iso:Amount" xmi:id="_d1" name="ActiveCurrencyAmount"/>
</iso:Repository>
"#;

const XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" elementFormDefault="qualified">
  <xs:complexType name="Payment">
    <xs:sequence>
      <xs:element name="Amt" type="ActiveCurrencyAmount"/>
      <xs:element name="Extra" type="xs:string"/>
    </xs:sequence>
  </xs:complexType>
  <xs:simpleType name="ActiveCurrencyAmount_SimpleType">
    <xs:restriction base="xs:decimal"/>
  </xs:simpleType>
</xs:schema>
"#;

fn appinfo(element: &emf_reader::xsd::Element) -> Vec<(String, String)> {
    element
        .elements()
        .find(|e| e.is(XSD_NS, "annotation"))
        .map(|annotation| {
            annotation
                .elements()
                .map(|i| (i.attribute("source").unwrap_or_default().to_string(), i.text()))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_enrich_files() {
    let dir = tempfile::tempdir().unwrap();
    let ecore = write_file(dir.path(), "iso.ecore", ECORE);
    let xmi = write_file(dir.path(), "repo.xmi", XMI);
    let xsd = write_file(dir.path(), "pain.xsd", XSD);
    let output = dir.path().join("pain.enriched.xsd");

    let stats = enrich_xsd(&ecore, &xmi, &xsd, &output, &EnrichOptions::default()).unwrap();
    assert_eq!(stats, EnrichStats { annotated: 3, missing: 1, total: 4 });

    let document = Document::parse(&std::fs::read(&output).unwrap()).unwrap();
    let payment = document.root.elements().next().unwrap();
    assert_eq!(
        appinfo(payment),
        vec![
            ("xmi:id".to_string(), "_c1".to_string()),
            ("definition".to_string(), "A payment.".to_string()),
        ]
    );

    let sequence = payment.elements().nth(1).unwrap();
    let amt = sequence.elements().next().unwrap();
    assert_eq!(appinfo(amt)[0], ("xmi:id".to_string(), "_e1".to_string()));
    assert_eq!(appinfo(amt)[2], ("parent".to_string(), "_c1".to_string()));
    assert!(appinfo(sequence.elements().nth(1).unwrap()).is_empty());

    let simple = document.root.elements().nth(1).unwrap();
    assert_eq!(appinfo(simple), vec![("xmi:id".to_string(), "_d1".to_string())]);
}

#[test]
fn test_unreadable_schema_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let ecore = write_file(dir.path(), "iso.ecore", ECORE);
    let xmi = write_file(dir.path(), "repo.xmi", XMI);
    let xsd = write_file(dir.path(), "broken.xsd", "<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">");
    let output = dir.path().join("out.xsd");

    assert!(enrich_xsd(&ecore, &xmi, &xsd, &output, &EnrichOptions::default()).is_err());
    assert!(!output.exists());
}

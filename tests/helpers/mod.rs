//! Shared fixtures for integration tests.

#![allow(dead_code)]

use emf_reader::{Instance, Metamodel, ModelAccess, ObjectGraph, ObjectInfo, build_object_graph};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HEADER: &str = r#"xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#;

/// One class `Foo` with a many-valued containment `children` to `Foo`.
pub fn foo_ecore() -> String {
    format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<ecore:EPackage {HEADER} xmlns:ecore="http://www.eclipse.org/emf/2002/Ecore" name="foo" nsURI="http://example.org/foo" nsPrefix="foo">
  <eClassifiers xsi:type="ecore:EClass" name="Foo">
    <eStructuralFeatures xsi:type="ecore:EReference" name="children" upperBound="-1" eType="#//Foo" containment="true"/>
  </eClassifiers>
</ecore:EPackage>
"##
    )
}

/// `Foo#1` containing `Foo#2` and `Foo#3`.
pub fn foo_xmi() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<foo:Foo {HEADER} xmlns:foo="http://example.org/foo" xmi:id="1">
  <children xmi:id="2"/>
  <children xmi:id="3"/>
</foo:Foo>
"#
    )
}

/// `Network` contains `Node`s; `Node.links` is a plain many-valued
/// reference and `Router` specializes `Node`.
pub fn network_ecore() -> String {
    format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<ecore:EPackage {HEADER} xmlns:ecore="http://www.eclipse.org/emf/2002/Ecore" name="net" nsURI="http://example.org/net" nsPrefix="net">
  <eClassifiers xsi:type="ecore:EClass" name="Network">
    <eStructuralFeatures xsi:type="ecore:EAttribute" name="name" eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"/>
    <eStructuralFeatures xsi:type="ecore:EReference" name="nodes" upperBound="-1" eType="#//Node" containment="true"/>
  </eClassifiers>
  <eClassifiers xsi:type="ecore:EClass" name="Node">
    <eStructuralFeatures xsi:type="ecore:EAttribute" name="name" eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"/>
    <eStructuralFeatures xsi:type="ecore:EAttribute" name="weight" eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EInt"/>
    <eStructuralFeatures xsi:type="ecore:EReference" name="links" upperBound="-1" eType="#//Node"/>
  </eClassifiers>
  <eClassifiers xsi:type="ecore:EClass" name="Router" eSuperTypes="#//Node"/>
</ecore:EPackage>
"##
    )
}

/// A network of `(class, name, links)` nodes; names double as `xmi:id`s.
pub fn network_xmi(nodes: &[(&str, &str, &[&str])]) -> String {
    let mut body = String::new();
    for (class, name, links) in nodes {
        let type_attr = if *class == "Node" {
            String::new()
        } else {
            format!(r#" xsi:type="net:{class}""#)
        };
        let links_attr = if links.is_empty() {
            String::new()
        } else {
            format!(r#" links="{}""#, links.join(" "))
        };
        body.push_str(&format!(
            "  <nodes{type_attr} xmi:id=\"{name}\" name=\"{name}\" weight=\"{}\"{links_attr}/>\n",
            name.len()
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<net:Network {HEADER} xmlns:net=\"http://example.org/net\" name=\"lab\">\n{body}</net:Network>\n"
    )
}

/// A → B → C → D, where C is a `Router`.
pub fn chain_xmi() -> String {
    network_xmi(&[
        ("Node", "A", &["B"]),
        ("Node", "B", &["C"]),
        ("Router", "C", &["D"]),
        ("Node", "D", &[]),
    ])
}

/// A → B → C → A, plus an unreachable E.
pub fn cycle_xmi() -> String {
    network_xmi(&[
        ("Node", "A", &["B"]),
        ("Node", "B", &["C"]),
        ("Node", "C", &["A"]),
        ("Node", "E", &[]),
    ])
}

/// S → N1, S → N2, N1 → F.
pub fn star_xmi() -> String {
    network_xmi(&[
        ("Node", "S", &["N1", "N2"]),
        ("Node", "N1", &["F"]),
        ("Node", "N2", &[]),
        ("Node", "F", &[]),
    ])
}

pub fn load(ecore: &str, xmi: &str) -> (Instance, ObjectGraph) {
    let metamodel = Arc::new(Metamodel::from_ecore_bytes(ecore.as_bytes()).unwrap());
    let instance = Instance::from_xmi_bytes(xmi.as_bytes(), metamodel).unwrap();
    let graph = build_object_graph(&instance, instance.roots());
    (instance, graph)
}

pub fn load_network(xmi: &str) -> (Instance, ObjectGraph) {
    load(&network_ecore(), xmi)
}

/// Write `text` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// `name` attribute of every node, in order.
pub fn names(instance: &Instance, nodes: &[&ObjectInfo]) -> Vec<String> {
    nodes.iter().map(|n| instance.display_name(n.handle)).collect()
}

use fleurmod_common::{MockFileSystem, RealFileSystem};
use fleurmod_schema::{validate, IncludeError, IncludeResolver, SchemaCache, XINCLUDE_NAMESPACE};
use fleurmod_xml::{parse, Serializer, XPath};
use std::fs;
use std::path::PathBuf;

const INP: &str = include_str!("fixtures/inp.xml");
const SYM: &str = include_str!("fixtures/sym.xml");

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn test_fixture_validates_after_include_resolution() {
    let schemas = SchemaCache::new();
    let schema = schemas.bundled().unwrap();
    let doc = parse(INP).unwrap();

    let fs = RealFileSystem;
    let resolved = IncludeResolver::new(&fs, fixtures_dir()).resolve(&doc).unwrap();

    validate(&schema, &resolved).unwrap();
    let sym_ops = XPath::parse("/fleurInput/cell/symmetryOperations/symOp").unwrap();
    assert_eq!(sym_ops.select(&resolved).len(), 2);
}

#[test]
fn test_unresolved_include_fails_validation() {
    let schema = SchemaCache::new().bundled().unwrap();
    let doc = parse(INP).unwrap();

    let err = validate(&schema, &doc).unwrap_err();
    assert!(err
        .violations
        .iter()
        .any(|v| v.rule == "unknown-element" && v.message.contains("xi:include")));
}

#[test]
fn test_missing_required_attribute_reported() {
    let schema = SchemaCache::new().bundled().unwrap();
    let fs = MockFileSystem::new().with_file("/calc/sym.xml", SYM);

    let mut doc = parse(INP).unwrap();
    let scf = XPath::parse("/fleurInput/calculationSetup/scfLoop").unwrap().select(&doc)[0];
    doc.remove_attribute(scf, "itmax");

    let resolved = IncludeResolver::new(&fs, "/calc").resolve(&doc).unwrap();
    let err = validate(&schema, &resolved).unwrap_err();

    assert_eq!(err.violations.len(), 1);
    assert_eq!(err.violations[0].path, "/fleurInput/calculationSetup/scfLoop");
    assert_eq!(err.violations[0].rule, "missing-attribute");
}

#[test]
fn test_resolution_leaves_source_untouched() {
    let fs = MockFileSystem::new().with_file("/calc/sym.xml", SYM);
    let doc = parse(INP).unwrap();
    let before = Serializer::new().serialize(&doc);

    let _ = IncludeResolver::new(&fs, "/calc").resolve(&doc).unwrap();

    assert_eq!(Serializer::new().serialize(&doc), before);
}

#[test]
fn test_nested_includes_resolved_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let symmetry = dir.path().join("symmetry");
    fs::create_dir(&symmetry).unwrap();

    let input = INP.replace(r#"href="sym.xml""#, r#"href="symmetry/sym.xml""#);
    fs::write(dir.path().join("inp.xml"), &input).unwrap();
    let include = format!(r#"<xi:include xmlns:xi="{}" href="identity.xml"/>"#, XINCLUDE_NAMESPACE);
    let nested = format!("<symmetryOperations>{}</symmetryOperations>", include);
    fs::write(symmetry.join("sym.xml"), nested).unwrap();
    fs::write(
        symmetry.join("identity.xml"),
        "<symOp><row-1>1 0 0 .0</row-1><row-2>0 1 0 .0</row-2><row-3>0 0 1 .0</row-3></symOp>",
    )
    .unwrap();

    let doc = parse(&fs::read_to_string(dir.path().join("inp.xml")).unwrap()).unwrap();
    let real = RealFileSystem;
    let resolver = IncludeResolver::new(&real, dir.path());
    let resolved = resolver.resolve(&doc).unwrap();

    let schema = SchemaCache::new().bundled().unwrap();
    validate(&schema, &resolved).unwrap();
    let sym_ops = XPath::parse("/fleurInput/cell/symmetryOperations/symOp").unwrap();
    assert_eq!(sym_ops.select(&resolved).len(), 1);

    fs::remove_file(symmetry.join("identity.xml")).unwrap();
    assert!(matches!(
        resolver.resolve(&doc),
        Err(IncludeError::MissingTarget { href }) if href == "identity.xml"
    ));
}

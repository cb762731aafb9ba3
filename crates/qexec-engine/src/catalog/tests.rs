//! Tests for the descriptor catalog

use pretty_assertions::assert_eq;

use super::*;

const CATALOG: &str = r#"
[connections]
default = "sqlite:/var/lib/app/app.db"
reporting = "sqlite:/var/lib/app/reports.db?busy_timeout=5000"

[queries.USER_NAME]
sql = "SELECT name FROM users WHERE id = ?"
args = ["id"]

[queries.USER_COUNT]
sql = "SELECT COUNT(*) FROM users"
connection = "reporting"

[queries.SCRATCH]
sql = "DELETE FROM scratch"
connection = "sqlite::memory:"

[procedures.ADD_TAX]
signature = "add_tax(>, >)"
arg_types = ["DOUBLE", "double"]
connection = "reporting"

[procedures.NOW_UTC]
signature = "now_utc"
"#;

#[test]
fn test_parse_catalog() {
    let catalog = Catalog::from_toml_str(CATALOG).unwrap();

    let user_name = catalog.query("USER_NAME").unwrap();
    assert_eq!(user_name.name(), "USER_NAME");
    assert_eq!(user_name.query_text(), "SELECT name FROM users WHERE id = ?");
    assert_eq!(user_name.arg_names(), vec!["id"]);
    assert_eq!(user_name.arg_count(), 1);
    assert_eq!(user_name.connection(), "sqlite:/var/lib/app/app.db");

    let user_count = catalog.query("USER_COUNT").unwrap();
    assert_eq!(user_count.arg_count(), 0);
    assert_eq!(
        user_count.connection(),
        "sqlite:/var/lib/app/reports.db?busy_timeout=5000"
    );

    // Not an alias, so used as a connection string
    assert_eq!(catalog.query("SCRATCH").unwrap().connection(), "sqlite::memory:");

    let add_tax = catalog.procedure("ADD_TAX").unwrap();
    assert_eq!(add_tax.signature(), "add_tax(>, >)");
    assert_eq!(add_tax.arg_types(), &[SqlType::Double, SqlType::Double]);
    assert_eq!(add_tax.arg_count(), 2);

    let now = catalog.procedure("NOW_UTC").unwrap();
    assert!(now.arg_types().is_empty());
    assert_eq!(now.connection(), "sqlite:/var/lib/app/app.db");

    let names: Vec<&str> = catalog.queries().map(|q| q.name()).collect();
    assert_eq!(names, vec!["SCRATCH", "USER_COUNT", "USER_NAME"]);
    assert_eq!(catalog.procedures().count(), 2);
}

#[test]
fn test_missing_default_connection() {
    let err = Catalog::from_toml_str(
        r#"
[queries.ORPHAN]
sql = "SELECT 1"
"#,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::MissingConnection { kind: "Query", ref name } if name == "ORPHAN"
    ));
}

#[test]
fn test_rejects_invalid_signature() {
    let err = Catalog::from_toml_str(
        r#"
[procedures.BROKEN]
signature = "add tax(>)"
arg_types = ["INTEGER"]
connection = "sqlite::memory:"
"#,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::Invalid(ConfigurationError::InvalidSignature { .. })
    ));
}

#[test]
fn test_rejects_arity_mismatch() {
    let err = Catalog::from_toml_str(
        r#"
[procedures.LOPSIDED]
signature = "lopsided(>, >)"
arg_types = ["INTEGER"]
connection = "sqlite::memory:"
"#,
    )
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Signature argument count differs from declared type count for LOPSIDED[INTEGER]: signature: 2; declared: 1"
    );
}

#[test]
fn test_rejects_unknown_type_and_fields() {
    let unknown_type = Catalog::from_toml_str(
        r#"
[procedures.P]
signature = "p(>)"
arg_types = ["WIDGET"]
connection = "sqlite::memory:"
"#,
    );
    assert!(matches!(unknown_type, Err(CatalogError::Parse(_))));

    let unknown_field = Catalog::from_toml_str(
        r#"
[queries.Q]
sql = "SELECT 1"
connection = "sqlite::memory:"
timeout = 5
"#,
    );
    assert!(matches!(unknown_field, Err(CatalogError::Parse(_))));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.toml");
    std::fs::write(&path, CATALOG).unwrap();

    let catalog = Catalog::load(&path).unwrap();
    assert!(catalog.query("USER_NAME").is_some());

    let missing = Catalog::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(missing.to_string().contains("Failed to read catalog"));
}

#[test]
fn test_programmatic_catalog() {
    let catalog = Catalog::new()
        .with_query(QueryDef::new("PING", "SELECT 1", Vec::<String>::new(), "sqlite::memory:"))
        .with_procedure(ProcedureDef::new(
            "ECHO",
            "echo(>)",
            [SqlType::Varchar],
            "sqlite::memory:",
        ));

    assert!(catalog.validate().is_ok());
    assert_eq!(catalog.query("PING").unwrap().arg_count(), 0);

    let broken = catalog.with_procedure(ProcedureDef::new(
        "ECHO",
        "echo",
        [SqlType::Varchar],
        "sqlite::memory:",
    ));
    assert!(broken.validate().is_err());
}

// Integration tests for cdb-core using test fixtures
use cdb_core::error::{CdbError, LexicalError, SemanticError, SyntaxError};
use cdb_core::inference::{array_dimensions, ArrayDimensions};
use cdb_core::lexer::LexicalIssue;
use cdb_core::types::{Shape, TypeName};
use cdb_core::{parse_reader, parse_str, parse_str_with, Engine, ParseOptions, ParsedConfig};
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

fn get_test_file_path(subdir: &str, filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(subdir)
        .join(filename)
}

fn read_test_file(subdir: &str, filename: &str) -> String {
    let path = get_test_file_path(subdir, filename);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read test file: {:?}", path))
}

fn parse_both(source: &str) -> [Result<ParsedConfig, CdbError>; 2] {
    [
        parse_str_with(source, &ParseOptions::with_engine(Engine::StateMachine)),
        parse_str_with(source, &ParseOptions::with_engine(Engine::TableDriven)),
    ]
}

// Documents that should parse successfully
mod ok_tests {
    use super::*;

    #[test]
    fn test_scalars() {
        let content = read_test_file("ok", "scalars.cfg");
        let parsed = parse_str(&content).unwrap();
        let db = &parsed.database;

        assert_eq!(db.read::<String>("Name"), Ok("Acquisition Loop".to_string()));
        assert_eq!(db.read::<f64>("Period"), Ok(0.001));
        assert_eq!(db.read::<u32>("Cycles"), Ok(1000));
        assert_eq!(db.read::<i8>("Offset"), Ok(-42));
        assert_eq!(db.read::<u8>("Mask"), Ok(255));
        assert_eq!(db.read::<String>("Enabled"), Ok("true".to_string()));
        assert_eq!(db.get("Cycles").unwrap().type_name, TypeName::String);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_vectors_and_matrices() {
        let content = read_test_file("ok", "vectors_matrices.cfg");
        let parsed = parse_str(&content).unwrap();
        let db = &parsed.database;

        assert_eq!(db.read_array::<f32>("Gains"), Ok(vec![1.5, 2.5, 3.5]));
        assert_eq!(db.get("Gains").unwrap().shape, Shape::Vector(3));
        assert_eq!(
            db.read_array::<String>("Labels"),
            Ok(vec!["first".to_string(), "second".to_string(), "third".to_string()])
        );

        let identity = db.get("Identity").unwrap();
        assert_eq!(identity.shape, Shape::Matrix { rows: 3, columns: 3 });
        assert_eq!(
            db.read_array::<u8>("Identity"),
            Ok(vec![1, 0, 0, 0, 1, 0, 0, 0, 1])
        );
        assert_eq!(identity.get_at::<u8>(1, 1), Some(Ok(1)));
        assert_eq!(identity.get_at::<u8>(3, 0), None);

        assert_eq!(db.get("Pairs").unwrap().shape, Shape::Matrix { rows: 2, columns: 2 });
    }

    #[test]
    fn test_groups_and_links() {
        let content = read_test_file("ok", "groups_links.cfg");
        let parsed = parse_str(&content).unwrap();
        let db = &parsed.database;

        assert_eq!(
            db.read::<String>("Application.Class"),
            Ok("RealTimeApplication".to_string())
        );
        assert_eq!(db.read::<f64>("Application.Threads.Main.Period"), Ok(0.01));

        // `Scheduler = *path` is a group holding one link leaf
        let main = db.find("Application.Threads.Main").unwrap();
        assert_eq!(db.resolve_link("Application.Scheduler.link0"), Ok(main));

        // a bare link inside a block is numbered after the first one
        let threads = db.find("Application.Threads").unwrap();
        assert_eq!(db.resolve_link("Data.link1"), Ok(threads));
        assert_eq!(db.read_array::<u32>("Data.Buffers"), Ok(vec![8, 16]));
    }

    #[test]
    fn test_type_casts() {
        let content = read_test_file("ok", "type_casts.cfg");
        let parsed = parse_str(&content).unwrap();
        let db = &parsed.database;

        assert_eq!(db.read::<i8>("Small"), Ok(-128));
        assert_eq!(db.get("Small").unwrap().type_name, TypeName::Int8);
        assert_eq!(db.read::<u16>("Medium"), Ok(65535));
        assert_eq!(db.read::<u64>("Large"), Ok(u64::MAX));
        assert_eq!(db.read::<f32>("Ratio"), Ok(0.25));
        assert_eq!(db.get("Text").unwrap().type_name, TypeName::String);
        assert_eq!(db.read_array::<i16>("Samples"), Ok(vec![-1, 0, 1]));
        assert_eq!(db.get("Grid").unwrap().type_name, TypeName::Float64);

        let typed = db.find("Typed").unwrap();
        assert_eq!(db.type_annotation(typed), Some("Custom"));
        assert_eq!(db.read::<i32>("Typed.Field"), Ok(1));
    }

    #[test]
    fn test_comments() {
        let content = read_test_file("ok", "comments.cfg");
        let parsed = parse_str(&content).unwrap();
        let db = &parsed.database;

        assert_eq!(db.read::<i32>("A"), Ok(1));
        assert_eq!(db.read_array::<i32>("B"), Ok(vec![2, 3]));
        assert!(db.find("C").is_none());
        assert_eq!(db.read::<String>("D"), Ok("// not a comment".to_string()));
    }

    #[test]
    fn test_fixture_to_json() {
        let content = read_test_file("ok", "vectors_matrices.cfg");
        let json: serde_json::Value =
            serde_json::from_str(&parse_str(&content).unwrap().to_json().unwrap()).unwrap();
        assert_eq!(json["Gains"], serde_json::json!(["1.5", "2.5", "3.5"]));
        assert_eq!(json["Pairs"], serde_json::json!([["a", "b"], ["c", "d"]]));
    }

    #[test]
    fn test_parse_from_file() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(read_test_file("ok", "type_casts.cfg").as_bytes())
            .unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let parsed = parse_reader(file, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.database.read::<i8>("Small"), Ok(-128));
    }

    #[test]
    fn test_options_from_json_and_yaml() {
        let options: ParseOptions = serde_json::from_str(
            r##"{ "engine": "table_driven", "lexer": { "line_comment": "#", "parse_numbers": false } }"##,
        )
        .unwrap();
        assert_eq!(options.engine, Engine::TableDriven);
        let parsed = parse_str_with("A = 1 # note\nB = (int8) 2", &options).unwrap();
        assert_eq!(parsed.database.read::<String>("A"), Ok("1".to_string()));
        assert_eq!(parsed.database.read::<i8>("B"), Ok(2));

        let options: ParseOptions =
            serde_yaml::from_str("lexer:\n  escape_policy: strict\n").unwrap();
        assert_eq!(options.engine, Engine::StateMachine);
        let error = parse_str_with(r#"A = "a\qb""#, &options).unwrap_err();
        assert!(matches!(
            error,
            CdbError::Lexical(LexicalError { issue: LexicalIssue::UnknownEscape, .. })
        ));
    }

    #[test]
    fn test_indexed_groups_infer_as_arrays() {
        let source = "Table = { 0 = { 1 2 3 } 1 = { 4 5 6 } }";
        let parsed = parse_str(source).unwrap();
        let db = &parsed.database;
        let table = db.find("Table").unwrap();
        assert_eq!(
            array_dimensions(db, table, true),
            Ok(ArrayDimensions { depth: 2, sizes: vec![2, 3] })
        );
    }
}

// Documents that should be rejected
mod err_tests {
    use super::*;

    #[test]
    fn test_empty_vector() {
        let content = read_test_file("err", "empty_vector.cfg");
        for result in parse_both(&content) {
            assert!(matches!(
                result,
                Err(CdbError::Semantic(SemanticError::EmptyArray { line: 1, .. }))
            ));
        }
    }

    #[test]
    fn test_matrix_mismatch() {
        let content = read_test_file("err", "matrix_mismatch.cfg");
        for result in parse_both(&content) {
            assert!(matches!(
                result,
                Err(CdbError::Semantic(SemanticError::MatrixFormat {
                    expected: 2,
                    found: 1,
                    line: 3,
                    ..
                }))
            ));
        }
    }

    #[test]
    fn test_unmatched_close() {
        let content = read_test_file("err", "unmatched_close.cfg");
        for result in parse_both(&content) {
            assert!(matches!(
                result,
                Err(CdbError::Syntax(SyntaxError::UnmatchedClose { line: 2, .. }))
            ));
        }
    }

    #[test]
    fn test_missing_close() {
        let content = read_test_file("err", "missing_close.cfg");
        let [fsm, table] = parse_both(&content);
        assert!(matches!(
            fsm,
            Err(CdbError::Syntax(SyntaxError::UnbalancedBlocks { open: 1, .. }))
        ));
        assert!(matches!(
            table,
            Err(CdbError::Syntax(SyntaxError::MissingExpectedToken { .. }))
        ));
    }

    #[test]
    fn test_double_cast() {
        let content = read_test_file("err", "double_cast.cfg");
        for result in parse_both(&content) {
            let error = result.unwrap_err();
            assert_eq!(
                error.to_string(),
                "Double definition of type: was int16, now set to int8! [1]"
            );
        }
    }

    #[test]
    fn test_lexical_errors() {
        let content = read_test_file("err", "unterminated_string.cfg");
        for result in parse_both(&content) {
            assert!(matches!(
                result,
                Err(CdbError::Lexical(LexicalError {
                    issue: LexicalIssue::UnterminatedString,
                    ..
                }))
            ));
        }

        let content = read_test_file("err", "malformed_number.cfg");
        for result in parse_both(&content) {
            let error = result.unwrap_err();
            assert_eq!(error.to_string(), "Lexical error: malformed number in '123a1'! [1]");
        }
    }

    #[test]
    fn test_mixed_kinds() {
        let content = read_test_file("err", "mixed_kinds.cfg");
        for result in parse_both(&content) {
            assert!(matches!(
                result,
                Err(CdbError::Semantic(SemanticError::MixedKinds { .. }))
            ));
        }
    }

    #[test]
    fn test_bad_conversion() {
        let content = read_test_file("err", "bad_conversion.cfg");
        for result in parse_both(&content) {
            match result {
                Err(CdbError::Semantic(SemanticError::Conversion {
                    name,
                    value,
                    type_name,
                    ..
                })) => {
                    assert_eq!(name, "Byte");
                    assert_eq!(value, "300");
                    assert_eq!(type_name, TypeName::UInt8);
                }
                other => panic!("expected a conversion error, got {other:?}"),
            }
        }
    }
}

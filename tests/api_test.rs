use cdb_core::error::{ParseWarning, SemanticError};
use cdb_core::lexer::{Lexer, TokenKind};
use cdb_core::types::{Shape, TypeName};
use cdb_core::{parse, parse_str, parse_str_with, CdbError, ConfigurationDatabase, Engine, ParseOptions};

const ENGINES: [Engine; 2] = [Engine::StateMachine, Engine::TableDriven];

fn options(engine: Engine) -> ParseOptions {
    ParseOptions::with_engine(engine)
}

#[test]
fn test_simple_parse_to_json() {
    let source = r#"
        Name = "My App"
        Version = (float64) 1.5
        Features = { a b c }
        Server = {
            Host = localhost
            Port = (uint16) 8080
            Weights = (int8) { { 1 -1 } { -2 2 } }
        }
    "#;

    let expected_json = serde_json::json!({
        "Name": "My App",
        "Version": 1.5,
        "Features": ["a", "b", "c"],
        "Server": {
            "Host": "localhost",
            "Port": 8080,
            "Weights": [[1, -1], [-2, 2]],
        }
    });

    for engine in ENGINES {
        let parsed = parse_str_with(source, &options(engine)).unwrap();
        let result = parsed.to_json().unwrap();
        let result_json: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(result_json, expected_json, "{engine:?}");
    }
}

#[test]
fn test_scalar_assignment() {
    for engine in ENGINES {
        let parsed = parse_str_with("a = 10", &options(engine)).unwrap();
        let leaf = parsed.database.get("a").unwrap();
        assert_eq!(leaf.shape, Shape::Scalar);
        assert_eq!(parsed.database.read::<i32>("a"), Ok(10));
    }
}

#[test]
fn test_vector_assignment() {
    for engine in ENGINES {
        let parsed = parse_str_with("v = { 1, 2, 3 }", &options(engine)).unwrap();
        assert_eq!(parsed.database.get("v").unwrap().shape, Shape::Vector(3));
        assert_eq!(parsed.database.read_array::<u64>("v"), Ok(vec![1, 2, 3]));

        let error = parse_str_with("v = {}", &options(engine)).unwrap_err();
        assert!(matches!(error, CdbError::Semantic(SemanticError::EmptyArray { .. })));
    }
}

#[test]
fn test_matrix_assignment() {
    for engine in ENGINES {
        let parsed = parse_str_with("m = { {1 2} {3 4} }", &options(engine)).unwrap();
        let leaf = parsed.database.get("m").unwrap();
        assert_eq!(leaf.shape, Shape::Matrix { rows: 2, columns: 2 });
        assert_eq!(leaf.get_at::<i32>(1, 0), Some(Ok(3)));
    }
}

#[test]
fn test_matrix_mismatch_keeps_earlier_leaves() {
    for engine in ENGINES {
        let mut db = ConfigurationDatabase::new();
        let result = parse("a = 1 m = { {1 2} {3} }".chars(), &mut db, &options(engine), None);
        assert!(matches!(
            result,
            Err(CdbError::Semantic(SemanticError::MatrixFormat { .. }))
        ));
        assert_eq!(db.read::<i32>("a"), Ok(1));
        assert!(db.get("m").is_none());
    }
}

#[test]
fn test_type_cast() {
    for engine in ENGINES {
        let parsed = parse_str_with("x = (int16) -5", &options(engine)).unwrap();
        let leaf = parsed.database.get("x").unwrap();
        assert_eq!(leaf.type_name, TypeName::Int16);
        assert_eq!(parsed.database.read::<i16>("x"), Ok(-5));
    }
}

#[test]
fn test_unknown_type_cast_warns_and_stores_string() {
    for engine in ENGINES {
        let parsed = parse_str_with("x = (bogus) 5", &options(engine)).unwrap();
        assert_eq!(parsed.database.get("x").unwrap().type_name, TypeName::String);
        assert_eq!(parsed.database.read::<String>("x"), Ok("5".to_string()));
        assert!(matches!(
            parsed.warnings.as_slice(),
            [ParseWarning::UnknownTypeCast { type_name, .. }] if type_name == "bogus"
        ));
    }
}

#[test]
fn test_comments_are_skipped() {
    for engine in ENGINES {
        let source = "/* header */ a = 1 // tail\n b = 2";
        let parsed = parse_str_with(source, &options(engine)).unwrap();
        assert_eq!(parsed.database.number_of_children(), 2);
        assert_eq!(parsed.database.child_name(0), Some("a"));
        assert_eq!(parsed.database.child_name(1), Some("b"));
    }
}

#[test]
fn test_peek_does_not_consume() {
    let mut lexer = Lexer::new("a = { 1 }".chars());
    let third = lexer.peek_token(2).clone();
    assert_eq!(lexer.peek_token(0).text, "a");
    assert_eq!(lexer.peek_token(2), &third);

    let consumed: Vec<String> = (0..3).map(|_| lexer.next_token().text).collect();
    assert_eq!(consumed, vec!["a", "=", "{"]);
    assert_eq!(third.text, "{");
    assert_eq!(lexer.next_token().kind, TokenKind::Number);
}

#[test]
fn test_nesting_returns_to_root() {
    for engine in ENGINES {
        let mut db = ConfigurationDatabase::new();
        let source = "A = { B = { C = { D = 1 } } E = 2 } F = 3";
        parse(source.chars(), &mut db, &options(engine), None).unwrap();
        assert_eq!(db.current(), db.root());
        assert_eq!(db.read::<i32>("A.B.C.D"), Ok(1));
        assert_eq!(db.read::<i32>("A.E"), Ok(2));
        assert_eq!(db.read::<i32>("F"), Ok(3));
    }
}

#[test]
fn test_links_are_numbered_per_parse() {
    for engine in ENGINES {
        let source = "T = { x = 1 } *T L = *T.x";
        let first = parse_str_with(source, &options(engine)).unwrap();
        let db = &first.database;
        assert_eq!(db.read::<String>("link0"), Ok("T".to_string()));
        assert_eq!(db.read::<String>("L.link1"), Ok("T.x".to_string()));
        assert_eq!(db.resolve_link("L.link1"), Ok(db.find("T.x").unwrap()));

        let second = parse_str_with("*T", &options(engine)).unwrap();
        assert!(second.database.find("link0").is_some());
        assert!(second.database.find("link1").is_none());
    }
}

#[test]
fn test_parsed_config_is_serializable() {
    let parsed = parse_str("b = (uint8) { 1 2 }\na = text").unwrap();
    assert_eq!(parsed.to_yaml().unwrap(), "b:\n- 1\n- 2\na: text\n");
}

use cdb_core::{parse_str_with, Engine, ParseOptions};
use miette::Report;
use std::fs;
use std::path::PathBuf;

const ENGINES: [Engine; 2] = [Engine::StateMachine, Engine::TableDriven];

fn fixtures(subdir: &str) -> Vec<PathBuf> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join(subdir);
    let entries = fs::read_dir(&dir).expect("Failed to read fixture directory");
    let mut paths: Vec<PathBuf> = entries
        .map(|entry| entry.expect("Failed to read directory entry").path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "cfg"))
        .collect();
    paths.sort();
    assert!(!paths.is_empty(), "no fixtures in {dir:?}");
    paths
}

#[test]
fn test_all_ok_files() {
    for path in fixtures("ok") {
        println!("Parsing file: {path:?}");
        let source = fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read file: {path:?}"));

        let mut trees = Vec::new();
        for engine in ENGINES {
            match parse_str_with(&source, &ParseOptions::with_engine(engine)) {
                Ok(parsed) => trees.push(parsed),
                Err(err) => panic!("Failed to parse {path:?} with {engine:?}. Error: {:?}", Report::new(err)),
            }
        }
        assert_eq!(trees[0], trees[1], "engines disagree on {path:?}");
    }
}

#[test]
fn test_all_err_files() {
    for path in fixtures("err") {
        println!("Parsing file: {path:?}");
        let source = fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read file: {path:?}"));

        for engine in ENGINES {
            if let Ok(parsed) = parse_str_with(&source, &ParseOptions::with_engine(engine)) {
                panic!("{path:?} parsed with {engine:?}: {:#?}", parsed.database);
            }
        }
    }
}

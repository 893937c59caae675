use cdb_core::{parse_named, ConfigurationDatabase, ParseOptions};

fn main() {
    let config = r#"
        Server = {
            Host = "localhost"
            Port = (uint16) 8080
            Limits = (float32) { 0.5 1.5 }
        }
        Primary = *Server
    "#;

    match parse_named(config, "server.cfg", &ParseOptions::default()) {
        Ok(result) => {
            let db: &ConfigurationDatabase = &result.database;
            match db.read::<u16>("Server.Port") {
                Ok(port) => println!("Server listens on port {port}"),
                Err(e) => eprintln!("Failed to read the port: {e}"),
            }
            match result.to_json() {
                Ok(json_output) => println!("Successfully parsed configuration to JSON:\n{json_output}"),
                Err(e) => eprintln!("Failed to serialize: {e}"),
            }
        }
        Err(e) => {
            eprintln!("Failed to parse configuration: {:?}", miette::Report::new(e));
        }
    }
}

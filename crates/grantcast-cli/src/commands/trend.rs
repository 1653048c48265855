use chrono::NaiveDate;

use super::{open_engine, print_json};

pub fn run(program: &str, today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(today)?;
    print_json(&engine.trend(program)?)
}

pub fn seasonal(today: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = open_engine(today)?;
    print_json(&engine.seasonal()?)
}

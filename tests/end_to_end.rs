use std::io::Write;

use chrono::NaiveDate;

use bizdash::data::export::write_csv;
use bizdash::data::loader::load_file;
use bizdash::data::{
    AggregationSpec, FilterSpec, Reducer, Table, Value, filter, group_and_aggregate,
};

fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn filter_then_group_east_west() {
    let file = write_fixture("date,region,revenue\n2024-01-01,East,100\n2024-02-01,West,200\n");
    let table = load_file(file.path()).unwrap();

    let east = filter(&table, &FilterSpec::new().equal("region", "East"));
    assert_eq!(east.len(), 1);
    assert_eq!(east.rows()[0], table.rows()[0]);

    let spec = AggregationSpec::by(["region"]).agg("revenue", Reducer::Sum);
    let by_region = group_and_aggregate(&table, &spec);
    assert_eq!(by_region.columns(), ["region", "revenue"]);
    assert_eq!(
        by_region.rows(),
        [
            vec![Value::from("East"), Value::Integer(100)],
            vec![Value::from("West"), Value::Integer(200)],
        ]
    );
}

#[test]
fn date_range_filter_is_inclusive() {
    let file = write_fixture(
        "date,region,revenue\n2024-01-01,East,100\n2024-02-01,West,200\n2024-03-01,East,50\n",
    );
    let table = load_file(file.path()).unwrap();
    let spec = FilterSpec::new().date_from("2024-01-01").date_to("2024-02-01");
    let window = filter(&table, &spec);
    assert_eq!(window.len(), 2);
    assert_eq!(filter(&window, &spec), window);
}

#[test]
fn export_reload_round_trip() {
    let date = |m| Value::Date(NaiveDate::from_ymd_opt(2024, m, 1).unwrap());
    let table = Table::from_rows(
        ["date", "region", "department", "revenue", "performance_score"],
        vec![
            vec![date(1), "East".into(), "Sales".into(), Value::Integer(100), Value::Float(88.5)],
            vec![date(2), "West".into(), "IT".into(), Value::Integer(200), Value::Null],
            vec![date(3), "North, Upper".into(), "IT".into(), Value::Null, Value::Float(70.0)],
        ],
    )
    .unwrap();

    let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write_csv(&table, file.reopen().unwrap()).unwrap();
    assert_eq!(load_file(file.path()).unwrap(), table);
}

#[test]
fn filtered_export_reload_round_trip() {
    let file = write_fixture(
        "date,region,product,revenue\n\
         2024-01-01,East,A1,100\n\
         2024-02-01,West,B2,200.5\n\
         2024-03-01,West,C3,\n",
    );
    let table = load_file(file.path()).unwrap();
    let west = filter(&table, &FilterSpec::new().equal("region", "West"));
    assert_eq!(west.len(), 2);

    let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write_csv(&west, out.reopen().unwrap()).unwrap();
    assert_eq!(load_file(out.path()).unwrap(), west);
}

//! Data view commands.

use super::{Console, Status};
use crate::render::{row, DataSetRenderer, Row};
use lavadash_engine::{require, Capability, Dashboard, EngineError, EngineResult};
use lavadash_protocol::{Cell, DataView};
use std::collections::BTreeMap;
use std::io::Write;

/// Lists the data views defined on the server.
pub fn data_views<D: Dashboard + ?Sized>(server: &D, console: &mut Console<'_>) -> EngineResult<Status> {
    require(server, Capability::DataViews)?;
    let rows: Vec<Row> = server
        .data_views()?
        .into_iter()
        .map(|view| row([("name", view.name), ("summary", view.summary)]))
        .collect();
    let table = DataSetRenderer::pretty()
        .with_order(["name", "summary"])
        .with_title("name", "Name")
        .with_title("summary", "Summary")
        .with_empty("There are no data views defined yet")
        .with_caption("Data Views")
        .render(&rows);
    write!(console.out, "{table}")?;
    console.line("")?;
    console.line("Tip: to invoke a data view try `lava-dashboard query-data-view`")?;
    Ok(Status::Success)
}

/// Parses a `KEY=VALUE` command line argument.
pub fn parse_key_value(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.replace('-', "_"), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {input:?}")),
    }
}

/// Resolves the arguments for `view`: given values first, then defaults.
///
/// Every argument without a default must be given. Unknown names are
/// rejected.
pub fn resolve_arguments(view: &DataView, given: &[(String, String)]) -> EngineResult<BTreeMap<String, String>> {
    for (key, _) in given {
        if view.argument(key).is_none() {
            return Err(EngineError::usage(format!(
                "Data view {} has no argument {key}",
                view.name
            )));
        }
    }
    let mut resolved = BTreeMap::new();
    for argument in &view.arguments {
        let value = given
            .iter()
            .rev()
            .find(|(key, _)| *key == argument.name)
            .map(|(_, value)| value.clone())
            .or_else(|| argument.default.clone());
        match value {
            Some(value) => {
                resolved.insert(argument.name.clone(), value);
            }
            None => {
                return Err(EngineError::usage(format!(
                    "Data view {} requires argument {} (pass --arg {}=VALUE)",
                    view.name, argument.name, argument.name
                )))
            }
        }
    }
    Ok(resolved)
}

/// Runs a data view and prints its result.
pub fn query_data_view<D: Dashboard + ?Sized>(
    server: &D,
    name: &str,
    given: &[(String, String)],
    console: &mut Console<'_>,
) -> EngineResult<Status> {
    require(server, Capability::QueryDataView)?;
    let views = server.data_views()?;
    let Some(view) = views.iter().find(|view| view.name == name) else {
        let available: Vec<&str> = views.iter().map(|view| view.name.as_str()).collect();
        return Err(EngineError::usage(format!(
            "No data view named {name}; available: {}",
            if available.is_empty() { "(none)".to_string() } else { available.join(", ") }
        )));
    };
    let arguments = resolve_arguments(view, given)?;
    let result = server.query_data_view(name, &arguments)?;

    let rows: Vec<Row> = result
        .rows
        .iter()
        .map(|cells| {
            row(result
                .columns
                .iter()
                .zip(cells)
                .map(|(column, value)| (column.as_str(), Cell(value).to_string())))
        })
        .collect();
    let table = DataSetRenderer::pretty()
        .with_order(result.columns.iter().cloned())
        .with_caption(view.summary.clone())
        .render(&rows);
    write!(console.out, "{table}")?;
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavadash_engine::{DashboardCall, MemoryDashboard};
    use lavadash_protocol::{DataViewArgument, QueryResult};
    use lavadash_xmlrpc::Value;

    fn view() -> DataView {
        DataView {
            name: "pass_rate".into(),
            summary: "Pass rate per board".into(),
            documentation: String::new(),
            arguments: vec![
                DataViewArgument {
                    name: "board".into(),
                    help: "Board name".into(),
                    default: None,
                },
                DataViewArgument {
                    name: "days".into(),
                    help: "Window".into(),
                    default: Some("7".into()),
                },
            ],
        }
    }

    fn server() -> MemoryDashboard {
        MemoryDashboard::new().with_data_view(
            view(),
            QueryResult {
                columns: vec!["board".into(), "pass".into()],
                rows: vec![
                    vec![Value::String("panda".into()), Value::Int(97)],
                    vec![Value::String("beagle".into()), Value::Nil],
                ],
            },
        )
    }

    fn given(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn key_value_parsing() {
        assert_eq!(parse_key_value("days=30").unwrap(), ("days".into(), "30".into()));
        assert_eq!(parse_key_value("max-age=a=b").unwrap(), ("max_age".into(), "a=b".into()));
        assert!(parse_key_value("nodays").is_err());
        assert!(parse_key_value("=3").is_err());
    }

    #[test]
    fn defaults_fill_missing_arguments() {
        let args = resolve_arguments(&view(), &given(&[("board", "panda")])).unwrap();
        assert_eq!(args["board"], "panda");
        assert_eq!(args["days"], "7");

        let args = resolve_arguments(&view(), &given(&[("board", "x"), ("days", "30")])).unwrap();
        assert_eq!(args["days"], "30");
    }

    #[test]
    fn required_and_unknown_arguments_are_usage_errors() {
        let err = resolve_arguments(&view(), &[]).unwrap_err();
        assert!(matches!(err, EngineError::Usage(ref m) if m.contains("requires argument board")));
        let err = resolve_arguments(&view(), &given(&[("board", "x"), ("colour", "red")])).unwrap_err();
        assert!(matches!(err, EngineError::Usage(ref m) if m.contains("no argument colour")));
    }

    #[test]
    fn lists_views_with_a_tip() {
        let server = server();
        let mut out = Vec::new();
        let mut err = Vec::new();
        data_views(&server, &mut Console::new(&mut out, &mut err)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Data Views"));
        assert!(out.contains("pass_rate | Pass rate per board"));
        assert!(out.ends_with("\n\nTip: to invoke a data view try `lava-dashboard query-data-view`\n"));
    }

    #[test]
    fn queries_render_result_columns() {
        let server = server();
        let mut out = Vec::new();
        let mut err = Vec::new();
        query_data_view(
            &server,
            "pass_rate",
            &given(&[("board", "panda")]),
            &mut Console::new(&mut out, &mut err),
        )
        .unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0].trim(), "Pass rate per board");
        assert_eq!(lines[2], "board  | pass");
        assert_eq!(lines[4], "panda  | 97  ");
        assert_eq!(lines[5], "beagle | None");

        let sent = server.calls().into_iter().find_map(|call| match call {
            DashboardCall::QueryDataView { arguments, .. } => Some(arguments),
            _ => None,
        });
        assert_eq!(sent.unwrap().get("days").map(String::as_str), Some("7"));
    }

    #[test]
    fn unknown_views_and_old_servers() {
        let server = server();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = query_data_view(&server, "nope", &[], &mut Console::new(&mut out, &mut err));
        assert!(matches!(result, Err(EngineError::Usage(ref m)) if m.contains("pass_rate")));

        let old = MemoryDashboard::new().with_version("0.3.2.final.0");
        let result = data_views(&old, &mut Console::new(&mut out, &mut err));
        assert!(matches!(result, Err(EngineError::InsufficientServerVersion { .. })));
    }
}

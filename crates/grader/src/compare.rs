//! The row-by-row comparison primitive and feedback rendering.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use sqlab_models::{SqlabError, SqlabResult};

/// Name of the evaluator function installed in every tenant database.
pub const COMPARISON_FUNCTION: &str = "compare_views_with_order_and_diff";

/// Evaluator function definition. Numbers rows in view order, pairs them by
/// position with a full outer join, and reports each pair with a text
/// rendering of both rows.
pub const COMPARISON_FUNCTION_SQL: &str = r#"
CREATE OR REPLACE FUNCTION compare_views_with_order_and_diff(view1 text, view2 text)
RETURNS TABLE(
    norder bigint,
    is_row_correct boolean,
    is_in_solution text,
    view1_row text,
    view2_row text
)
AS $evaluator$
BEGIN
    RETURN QUERY EXECUTE format(
        'WITH submitted AS (
             SELECT row_number() OVER () AS rn, t::text AS row_text FROM %I t
         ),
         expected AS (
             SELECT row_number() OVER () AS rn, t::text AS row_text FROM %I t
         )
         SELECT COALESCE(s.rn, e.rn) AS norder,
                s.row_text IS NOT DISTINCT FROM e.row_text AS is_row_correct,
                CASE
                    WHEN s.rn IS NULL THEN ''missing''
                    WHEN e.rn IS NULL THEN ''unexpected''
                    ELSE ''present''
                END AS is_in_solution,
                s.row_text AS view1_row,
                e.row_text AS view2_row
         FROM submitted s FULL OUTER JOIN expected e ON s.rn = e.rn
         ORDER BY 1',
        view1, view2);
END;
$evaluator$ LANGUAGE plpgsql;
"#;

pub const ALL_CORRECT_FEEDBACK: &str = "All rows are correct.";
pub const NO_RESPONSE_FEEDBACK: &str = "No response was submitted for this question.";
const NOT_PRESENT: &str = "not present";

/// One row of evaluator output, parsed from text-format results.
#[derive(Debug, Clone)]
pub struct ComparisonRow {
    pub norder: String,
    pub is_row_correct: bool,
    pub is_in_solution: String,
    pub view1_row: Option<String>,
    pub view2_row: Option<String>,
}

impl ComparisonRow {
    /// Parse one JSON object produced by the sandbox executor. Booleans
    /// arrive as PostgreSQL text output, `t` or `f`.
    pub fn from_value(value: &Value) -> SqlabResult<Self> {
        let field = |name: &str| -> Option<String> {
            match value.get(name) {
                Some(Value::String(s)) => Some(s.clone()),
                _ => None,
            }
        };

        Ok(ComparisonRow {
            norder: field("norder").ok_or_else(|| SqlabError::ComparisonSetup {
                reason: "evaluator output is missing the norder column".into(),
            })?,
            is_row_correct: field("is_row_correct").as_deref() == Some("t"),
            is_in_solution: field("is_in_solution").unwrap_or_default(),
            view1_row: field("view1_row"),
            view2_row: field("view2_row"),
        })
    }
}

/// Extract the two view names from a check query of the form
/// `SELECT * FROM compare_views_with_order_and_diff('v1', 'v2');`.
pub fn extract_view_names(sqlcheckrun: &str) -> SqlabResult<(String, String)> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"{}\('([^']+)',\s*'([^']+)'\)",
            COMPARISON_FUNCTION
        ))
        .expect("view extraction pattern is valid")
    });

    let captures = pattern
        .captures(sqlcheckrun)
        .ok_or_else(|| SqlabError::ComparisonSetup {
            reason: "check query does not call the evaluator with two view names".into(),
        })?;

    Ok((captures[1].to_string(), captures[2].to_string()))
}

/// Maximum grade still reachable after repeated submissions.
pub fn decayed_max_grade(
    current_max: f64,
    execution_count: i32,
    decrease_attempt: f64,
    min_grade: f64,
) -> f64 {
    let decayed = current_max - f64::from(execution_count) * decrease_attempt;
    decayed.max(min_grade).min(current_max)
}

/// Render the per-row diff as an HTML table for feedback display.
pub fn render_feedback_table(rows: &[ComparisonRow]) -> String {
    let mut html = String::from(
        "<table class='sql-query-results'>\n\
         <tr class='sql-results-header'>\n\
         <th class='sql-results-header'>Row</th>\n\
         <th class='sql-results-header'>Correct</th>\n\
         <th class='sql-results-header'>Status</th>\n\
         <th class='sql-results-header'>Your answer</th>\n\
         <th class='sql-results-header'>Expected answer</th>\n\
         </tr>\n",
    );

    for row in rows {
        let cell = |content: &Option<String>| match content {
            Some(text) => escape_html(text),
            None => NOT_PRESENT.to_string(),
        };
        html.push_str(&format!(
            "<tr class='sql-results-row'>\n\
             <td class='sql-results-data'>{}</td>\n\
             <td class='sql-results-data'>{}</td>\n\
             <td class='sql-results-data'>{}</td>\n\
             <td class='sql-results-data'>{}</td>\n\
             <td class='sql-results-data'>{}</td>\n\
             </tr>\n",
            escape_html(&row.norder),
            if row.is_row_correct { "yes" } else { "no" },
            escape_html(&row.is_in_solution),
            cell(&row.view1_row),
            cell(&row.view2_row),
        ));
    }

    html.push_str("</table>\n");
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn view_names_are_extracted_from_check_queries() {
        let (v1, v2) = extract_view_names(
            "SELECT * FROM compare_views_with_order_and_diff('student_q1', 'solution_q1');",
        )
        .unwrap();
        assert_eq!(v1, "student_q1");
        assert_eq!(v2, "solution_q1");
    }

    #[test]
    fn evaluator_sql_defines_the_named_function() {
        assert!(COMPARISON_FUNCTION_SQL
            .contains(&format!("FUNCTION {}(", COMPARISON_FUNCTION)));
    }

    #[test]
    fn check_query_without_evaluator_call_is_rejected() {
        let err = extract_view_names("SELECT * FROM some_other_function('a', 'b');").unwrap_err();
        assert_eq!(err.category(), "comparison");
    }

    #[test]
    fn decay_stops_at_the_minimum_grade() {
        assert_eq!(decayed_max_grade(10.0, 0, 0.5, 2.0), 10.0);
        assert_eq!(decayed_max_grade(10.0, 4, 0.5, 2.0), 8.0);
        assert_eq!(decayed_max_grade(10.0, 100, 0.5, 2.0), 2.0);
    }

    #[test]
    fn decay_never_exceeds_the_current_maximum() {
        assert_eq!(decayed_max_grade(5.0, 0, -1.0, 0.0), 5.0);
    }

    #[test]
    fn comparison_rows_parse_postgres_text_booleans() {
        let row = ComparisonRow::from_value(&json!({
            "norder": "1",
            "is_row_correct": "t",
            "is_in_solution": "present",
            "view1_row": "(1,Alice)",
            "view2_row": "(1,Alice)"
        }))
        .unwrap();
        assert!(row.is_row_correct);

        let row = ComparisonRow::from_value(&json!({
            "norder": "2",
            "is_row_correct": "f",
            "is_in_solution": "missing",
            "view1_row": null,
            "view2_row": "(2,Bob)"
        }))
        .unwrap();
        assert!(!row.is_row_correct);
        assert!(row.view1_row.is_none());
    }

    #[test]
    fn feedback_table_escapes_row_contents() {
        let rows = vec![ComparisonRow {
            norder: "1".into(),
            is_row_correct: false,
            is_in_solution: "present".into(),
            view1_row: Some("(1,<script>)".into()),
            view2_row: None,
        }];
        let html = render_feedback_table(&rows);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(NOT_PRESENT));
        assert!(html.starts_with("<table class='sql-query-results'>"));
    }
}

//! End-to-end query scenarios over the standard example graphs.
//!
//! Run with: cargo test --test tests_query

mod helpers;

use std::io::Write as _;

use helpers::{QueryFixture, spec_parameters, with_match};
use kypher::query::QuerySpec;

fn sorted(mut values: Vec<&str>) -> Vec<&str> {
    values.sort_unstable();
    values
}

#[test]
fn test_default_query_returns_all_rows() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| spec);
    assert_eq!(result.header, vec!["node1", "label", "node2", "id"]);
    assert_eq!(result.rows.len(), 9);
    // row order preserves import order
    assert_eq!(result.rows[0][3], "e11");
    assert_eq!(result.rows[8][3], "e25");
}

#[test]
fn test_match_loves() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], with_match("(i)-[:loves]->(c)"));
    assert_eq!(sorted(result.values("id")), vec!["e11", "e12", "e14"]);
}

#[test]
fn test_limit_and_skip() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        limit_clause: Some("3".to_string()),
        ..spec
    });
    assert_eq!(result.values("id"), vec!["e11", "e12", "e13"]);

    let result = fx.run(&[&graph], |spec| QuerySpec {
        skip_clause: Some("2".to_string()),
        limit_clause: Some("3".to_string()),
        ..spec
    });
    assert_eq!(result.values("id"), vec!["e13", "e14", "e21"]);
}

#[test]
fn test_node_label_filter() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], with_match("(:Hans)-[]->()"));
    assert_eq!(sorted(result.values("id")), vec!["e11", "e21"]);

    let result = fx.run(&[&graph], with_match("(:Otto)-[:name]->()"));
    assert_eq!(result.values("id"), vec!["e22"]);
}

#[test]
fn test_where_regex_double_letter() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[:name]->(n)".to_string(),
        where_clause: Some(r#"n =~ ".*(.)\\1.*""#.to_string()),
        ..spec
    });
    assert_eq!(sorted(result.values("id")), vec!["e22", "e24"]);
}

#[test]
fn test_where_in_list() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[:name]->(n)".to_string(),
        where_clause: Some(r#"p IN ["Hans", "Susi"]"#.to_string()),
        ..spec
    });
    assert_eq!(sorted(result.values("id")), vec!["e21", "e25"]);
}

#[test]
fn test_where_upper_substring_ordered() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[:name]->(n)".to_string(),
        where_clause: Some("upper(substr(n,2,1)) >= 'J'".to_string()),
        order_clause: Some("substr(n,2,1)".to_string()),
        ..spec
    });
    assert_eq!(result.values("id"), vec!["e23", "e24", "e22", "e25"]);

    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[:name]->(n)".to_string(),
        where_clause: Some("upper(substr(n,2,1)) >= 'J'".to_string()),
        order_clause: Some("substr(n,2,1) desc".to_string()),
        ..spec
    });
    assert_eq!(result.values("id"), vec!["e25", "e22", "e24", "e23"]);
}

#[test]
fn test_return_selected_columns() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[:name]->(n)".to_string(),
        where_clause: Some("upper(substr(n,2,1)) >= 'J'".to_string()),
        return_clause: "p, n".to_string(),
        ..spec
    });
    assert_eq!(result.header, vec!["node1", "node2"]);
    assert_eq!(
        sorted(result.values("node1")),
        vec!["Joe", "Molly", "Otto", "Susi"]
    );
}

#[test]
fn test_return_bare_edge_variable_expands() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[r:name]->(n)".to_string(),
        return_clause: "r, n".to_string(),
        ..spec
    });
    // bare relationship variables expand to the canonical column set
    assert_eq!(
        result.header,
        vec!["id", "node1", "label", "node2", "node2.1"]
    );
    assert_eq!(result.field("id", "e23", "node1"), "Joe");
    assert_eq!(result.field("id", "e23", "label"), "name");
    assert_eq!(result.field("id", "e23", "node2"), "\"Joe\"");
}

#[test]
fn test_return_with_function_and_alias() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[r:name]->(n)".to_string(),
        where_clause: Some("upper(substr(n,2,1)) >= 'J'".to_string()),
        return_clause: "lower(p) as node1, r.label, n".to_string(),
        ..spec
    });
    assert_eq!(result.header, vec!["node1", "label", "node2"]);
    assert_eq!(
        sorted(result.values("node1")),
        vec!["joe", "molly", "otto", "susi"]
    );
    assert_eq!(result.values("label"), vec!["name"; 4]);
}

#[test]
fn test_return_kgtk_unstringify() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[r:name]->(n)".to_string(),
        where_clause: Some("upper(substr(n,2,1)) >= 'J'".to_string()),
        return_clause: "p, kgtk_unstringify(n) as node2".to_string(),
        ..spec
    });
    assert!(result.values("node2").contains(&"Molly"));
}

#[test]
fn test_parameters_by_class() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[r:name]->(n)".to_string(),
        where_clause: Some("n = $name OR n = $name2 OR n = $name3".to_string()),
        parameters: spec_parameters(&[
            // regular: passed verbatim, quotes included, matches nothing
            ("name", "\"'Hans'@de\""),
            // string: wrapped, matches "Susi"
            ("name2", "\"Susi\""),
            // language-qualified: matches 'Otto'@de
            ("name3", "'Otto'@de"),
        ]),
        ..spec
    });
    assert_eq!(sorted(result.values("id")), vec!["e22", "e25"]);
}

#[test]
fn test_udf_property_access_lang_filter() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(p)-[r:name]->(n)".to_string(),
        where_clause: Some(r#"n.kgtk_lqstring_lang = "de""#.to_string()),
        ..spec
    });
    assert_eq!(sorted(result.values("id")), vec!["e21", "e22"]);
}

#[test]
fn test_reflexive_edges() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], with_match("(a)-[]->(a)"));
    assert_eq!(result.values("id"), vec!["e14"]);
}

#[test]
fn test_multi_step_path() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(na)<-[:name]-(a)-[r:loves]->(b)-[:name]->(nb)".to_string(),
        return_clause: "r, na, r.label, nb".to_string(),
        ..spec
    });
    assert_eq!(result.rows.len(), 3);
    assert_eq!(sorted(result.values("id")), vec!["e11", "e12", "e14"]);
    // na lands in the first free node2 slot after the expansion of r
    let nas = result.values("node2.1");
    assert!(nas.contains(&"'Hans'@de"));
    assert!(nas.contains(&"'Otto'@de"));
    let nbs = result.values("node2.2");
    assert!(nbs.contains(&"\"Molly\""));
    assert!(nbs.contains(&"\"Susi\""));
}

#[test]
fn test_multi_step_path_anonymous_connectors() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        // connection through anonymous nodes instead of a and b
        match_clause: "(na)<-[:name]-()-[r:loves]->()-[:name]->(nb)".to_string(),
        where_clause: Some(
            r#"na.kgtk_lqstring_lang = "de" OR nb.kgtk_lqstring_lang = "de""#.to_string(),
        ),
        return_clause: "r, na, r.label, nb".to_string(),
        ..spec
    });
    assert_eq!(sorted(result.values("id")), vec!["e11", "e12"]);
}

#[test]
fn test_named_multi_graph_join() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let works = fx.works();
    let result = fx.run(
        &[&graph, &works],
        with_match("g: (x)-[:loves]->(y), w: (y)-[:works]-(c)"),
    );
    assert_eq!(result.rows.len(), 3);
    // the Joe row carries the full works columns, extras included
    assert_eq!(result.field("id", "e14", "node1"), "Joe");
    assert_eq!(result.field("id", "e14", "node2"), "Joe");
    assert_eq!(result.field("id", "e14", "id.1"), "w13");
    assert_eq!(result.field("id", "e14", "node1.1"), "Joe");
    assert_eq!(result.field("id", "e14", "label.1"), "works");
    assert_eq!(result.field("id", "e14", "node2.1"), "Kaiser");
    assert_eq!(result.field("id", "e14", "node1;salary"), "20000");
    assert_eq!(result.field("id", "e14", "graph"), "employ");
}

#[test]
fn test_default_graph_in_multi_graph_join() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let works = fx.works();
    // the unqualified chain binds to the first input
    let result = fx.run(
        &[&graph, &works],
        with_match("(x)-[:loves]->(y), w: (y)-[:works]-(c)"),
    );
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.field("id", "e14", "node2.1"), "Kaiser");
}

#[test]
fn test_multi_graph_join_with_aliases() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let works = fx.works();
    let result = fx.run(&[&graph, &works], |spec| QuerySpec {
        match_clause: "g: (x)-[r:loves]->(y), w: (y)-[:works]-(c)".to_string(),
        return_clause: "r, x, r.label, y as node2, c as `node2;work`".to_string(),
        ..spec
    });
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.field("id", "e11", "node1"), "Hans");
    assert_eq!(result.field("id", "e11", "node2"), "Molly");
    assert_eq!(result.field("id", "e11", "node2;work"), "Renal");
}

#[test]
fn test_property_map_capture_with_cast() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let works = fx.works();
    let result = fx.run(&[&graph, &works], |spec| QuerySpec {
        match_clause: "g: (x)-[r:loves]->(y), w: (y {salary: s})-[:works]-(c)".to_string(),
        where_clause: Some("cast(s, integer) >= 10000".to_string()),
        return_clause: "r, x, y as node2, c as `node2;work`, s as `node2;salary`".to_string(),
        ..spec
    });
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.field("id", "e11", "node2;work"), "Renal");
    assert_eq!(result.field("id", "e11", "node2;salary"), "11000");
    assert_eq!(result.field("id", "e14", "node2;salary"), "20000");
}

#[test]
fn test_aggregate_groups_by_non_aggregates() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "g: (x)-[r]->(y)".to_string(),
        return_clause: "r.label, count(x) as N".to_string(),
        ..spec
    });
    // grouped by the single non-aggregate entry
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.field("label", "loves", "N"), "3");
    assert_eq!(result.field("label", "name", "N"), "5");
    assert_eq!(result.field("label", "friend", "N"), "1");
}

#[test]
fn test_count_and_count_distinct() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "g: (x)-[r]->(y)".to_string(),
        where_clause: Some(r#"x = "Joe""#.to_string()),
        return_clause: "count(x) as N".to_string(),
        ..spec
    });
    assert_eq!(result.values("N"), vec!["3"]);

    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "g: (x)-[r]->(y)".to_string(),
        where_clause: Some(r#"x = "Joe""#.to_string()),
        return_clause: "count(distinct x) as N".to_string(),
        ..spec
    });
    assert_eq!(result.values("N"), vec!["1"]);
}

#[test]
fn test_biggest_salary() {
    let fx = QueryFixture::new();
    let works = fx.works();
    let result = fx.run(&[&works], |spec| QuerySpec {
        match_clause: "w: (y {salary: s})-[r:works]-(c)".to_string(),
        return_clause: "max(cast(s, int)) as `node1;salary`".to_string(),
        ..spec
    });
    assert_eq!(result.values("node1;salary"), vec!["20000"]);
}

#[test]
fn test_date_filter() {
    let fx = QueryFixture::new();
    let quals = fx.quals();
    let result = fx.run(&[&quals], |spec| QuerySpec {
        match_clause: "(eid)-[q]->(time)".to_string(),
        where_clause: Some("time.kgtk_date_year < 2005".to_string()),
        ..spec
    });
    assert_eq!(
        sorted(result.values("id")),
        vec!["m11", "m12", "m13", "m14"]
    );
}

#[test]
fn test_three_graph_join() {
    let fx = QueryFixture::new();
    let works = fx.works();
    let quals = fx.quals();
    let props = fx.props();
    let result = fx.run(&[&works, &quals, &props], |spec| QuerySpec {
        match_clause:
            "work: (x)-[r {label: rl}]->(y), qual: (r)-[rp {label: p}]->(time), prop: (p)-[:member]->(:set1)"
                .to_string(),
        where_clause: Some("time.kgtk_date_year <= 2000".to_string()),
        return_clause: "r as id, x, rl, y, p as trel, time as time".to_string(),
        ..spec
    });
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.field("id", "w12", "node1"), "Otto");
    assert_eq!(result.field("id", "w12", "node2"), "Kaiser");
    assert_eq!(result.field("id", "w12", "trel"), "ends");
    assert_eq!(result.field("id", "w12", "time"), "^1987-11-08T04:56:34Z/10");
}

#[test]
fn test_property_enumeration_list() {
    let fx = QueryFixture::new();
    let works = fx.works();
    let quals = fx.quals();
    let result = fx.run(&[&works, &quals], |spec| QuerySpec {
        match_clause: "work: (x)-[r {label: rl}]->(y), qual: (r)-[rp {label: p}]->(time)"
            .to_string(),
        where_clause: Some("p in ['starts', 'ends'] and time.kgtk_date_year <= 2000".to_string()),
        return_clause: "r as id, x, rl, y, p as trel, time as time".to_string(),
        ..spec
    });
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.field("id", "w11", "trel"), "starts");
    assert_eq!(result.field("id", "w11", "time"), "^1984-12-17T00:03:12Z/11");
}

#[test]
fn test_multi_graph_regex_with_order() {
    let fx = QueryFixture::new();
    let works = fx.works();
    let quals = fx.quals();
    let result = fx.run(&[&works, &quals], |spec| QuerySpec {
        match_clause: "work: (x)-[r {label: rl}]->(y), qual: (r)-[rp {label: p}]->(time)"
            .to_string(),
        where_clause: Some(r#"p =~ "s.*" and time.kgtk_date_year <= 2000"#.to_string()),
        return_clause: "r as id, x, rl, y, p as trel, time as time".to_string(),
        order_clause: Some("p desc, time asc".to_string()),
        ..spec
    });
    assert_eq!(result.values("id"), vec!["w11", "w13"]);
    assert_eq!(result.field("id", "w13", "trel"), "starts");
}

#[test]
fn test_mod_operator() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(n1)-[r:name]->(n2)".to_string(),
        return_clause: "r, n1, n2, length(n2) % 3 as rem".to_string(),
        ..spec
    });
    assert_eq!(result.rows.len(), 5);
    // "Joe" has length 5, 'Otto'@de length 9
    assert_eq!(result.field("id", "e23", "rem"), "2");
    assert_eq!(result.field("id", "e22", "rem"), "0");
    assert_eq!(result.field("id", "e24", "rem"), "1");
}

#[test]
fn test_order_by_alias() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        match_clause: "(n1)-[r:name]->(n2)".to_string(),
        return_clause: "r, n1, n2, length(n2) as `node2;len`".to_string(),
        order_clause: Some("`node2;len`".to_string()),
        ..spec
    });
    let lengths: Vec<&str> = result.values("node2;len");
    assert_eq!(lengths, vec!["5", "6", "7", "9", "9"]);
}

#[test]
fn test_full_query_string() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let result = fx.run(&[&graph], |spec| QuerySpec {
        query: Some(
            "MATCH (i)-[:loves]->(c) RETURN i, c ORDER BY i".to_string(),
        ),
        ..spec
    });
    assert_eq!(result.header, vec!["node1", "node2"]);
    assert_eq!(result.values("node1"), vec!["Hans", "Joe", "Otto"]);
}

#[test]
fn test_parse_error_reports_position() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let err = fx
        .try_run(&[&graph], with_match("(a)-"))
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Parse error"), "got: {message}");
    assert!(message.contains("^"), "got: {message}");
}

#[test]
fn test_unknown_variable_is_rejected() {
    let fx = QueryFixture::new();
    let graph = fx.graph();
    let err = fx
        .try_run(&[&graph], |spec| QuerySpec {
            match_clause: "(a)-[r]->(b)".to_string(),
            return_clause: "ghost".to_string(),
            ..spec
        })
        .unwrap_err();
    assert!(err.to_string().contains("Semantic error"));
}

#[test]
fn test_compressed_input_and_output() {
    let fx = QueryFixture::new();
    let path = fx.dir.path().join("graph.tsv.gz");
    {
        let mut out = kypher::tabio::open_to_write(&path).unwrap();
        out.write_all(helpers::GRAPH_TSV.as_bytes()).unwrap();
        out.flush().unwrap();
    }
    let result = fx.run(&[&path], with_match("(i)-[:loves]->(c)"));
    assert_eq!(result.rows.len(), 3);
}

// bases/vcluster_ctl/src/output.rs
use cluster_ops::workflows::ReviveOutcome;

/// Render the result of a revive; display-only prints the description file
pub fn revive_outcome(outcome: &ReviveOutcome, display_only: bool) -> String {
    if display_only {
        return match serde_json::from_str::<serde_json::Value>(&outcome.db_info) {
            Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| outcome.db_info.clone()),
            Err(_) => outcome.db_info.clone(),
        };
    }

    let vdb = &outcome.vdb;
    let mut lines = vec![format!(
        "Successfully revived database {} from {}",
        vdb.name, vdb.communal_storage_location
    )];
    for host in &vdb.host_list {
        if let Some(node) = vdb.host_node_map.get(host) {
            lines.push(format!("  {:<24} {}", node.name, host));
        }
    }
    lines.join("\n")
}

pub fn started(what: &str, db_name: &str, hosts: &[String]) -> String {
    format!(
        "Successfully started {} {} on {}",
        what,
        db_name,
        hosts.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_primitives::{CoordinationDatabase, CoordinationNode};

    fn outcome(db_info: &str) -> ReviveOutcome {
        let mut vdb = CoordinationDatabase {
            name: "test_db".into(),
            communal_storage_location: "s3://bucket/test_db".into(),
            is_eon: true,
            ..Default::default()
        };
        for (i, host) in ["10.0.0.1", "10.0.0.2"].iter().enumerate() {
            vdb.host_list.push(host.to_string());
            vdb.host_node_map.insert(
                host.to_string(),
                CoordinationNode {
                    name: format!("v_test_db_node000{}", i + 1),
                    address: host.to_string(),
                    ..Default::default()
                },
            );
        }
        ReviveOutcome {
            db_info: db_info.into(),
            vdb,
        }
    }

    #[test]
    fn display_only_pretty_prints_the_description() {
        let text = revive_outcome(&outcome(r#"{"database":{"name":"test_db"}}"#), true);
        assert_eq!(text, "{\n  \"database\": {\n    \"name\": \"test_db\"\n  }\n}");
    }

    #[test]
    fn display_only_passes_unparsable_description_through() {
        let text = revive_outcome(&outcome("not json"), true);
        assert_eq!(text, "not json");
    }

    #[test]
    fn revive_lists_nodes_in_host_order() {
        let text = revive_outcome(&outcome("{}"), false);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Successfully revived database test_db from s3://bucket/test_db"
        );
        assert!(lines[1].contains("v_test_db_node0001") && lines[1].ends_with("10.0.0.1"));
        assert!(lines[2].contains("v_test_db_node0002") && lines[2].ends_with("10.0.0.2"));
    }

    #[test]
    fn started_joins_hosts() {
        let hosts = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        assert_eq!(
            started("database", "test_db", &hosts),
            "Successfully started database test_db on 10.0.0.1, 10.0.0.2"
        );
    }
}

// src/catalog.rs

use std::path::{Path, PathBuf};

/// Root folder holding one sub-directory of `.npy` exports per table, and the
/// consolidated `.npz` archives next to them.
pub static BASE_FOLDER: &str = "data";

/// Every table exported from the upstream database, in processing order.
pub static TABLE_NAMES: &[&str] = &[
    "actions",
    "agent_key_values",
    "agents",
    "api_keys",
    "execution_plans",
    "memory",
    "memory_document",
    "notifications",
    "prompts",
    "saga_events",
    "sagas",
    "schemas",
    "tool_configurations",
    "toolboxes",
    "tools",
    "tools_to_agents",
    "tools_to_schemas",
    "triggers",
    "user_sessions",
    "users",
    "world_model",
    "world_model_canvas_relations",
    "world_model_data_source_configuration",
];

/// Directory holding the per-column `.npy` files for `table`.
pub fn table_dir(base: &Path, table: &str) -> PathBuf {
    base.join(table)
}

/// Path of the consolidated archive for `table`.
pub fn archive_path(base: &Path, table: &str) -> PathBuf {
    base.join(archive_name(table))
}

/// File name of the consolidated archive for `table`.
pub fn archive_name(table: &str) -> String {
    format!("{}.npz", table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_paths_sit_next_to_table_dirs() {
        let base = Path::new("data");
        assert_eq!(table_dir(base, "users"), PathBuf::from("data/users"));
        assert_eq!(archive_path(base, "users"), PathBuf::from("data/users.npz"));
        assert_eq!(archive_name("users"), "users.npz");
    }
}

//! Where description files live in communal storage and on the initiator

/// Catalog location handed to the agent when it reads description files
pub const CATALOG_PATH: &str = "/catalog";

/// Local copy of the current description file on the initiator
pub const CURRENT_DESCRIPTION_DEST_PATH: &str = "/tmp/desc.json";

/// Local copy of a restore point's description file on the initiator
pub const RESTORE_POINT_DESCRIPTION_DEST_PATH: &str = "/tmp/restore_point_desc.json";

const DESCRIPTION_FILE_NAME: &str = "cluster_config.json";

fn metadata_dir(communal_location: &str, db_name: &str) -> String {
    format!(
        "{}/metadata/{}",
        communal_location.trim_end_matches('/'),
        db_name
    )
}

/// Description file of the database as it was last running
pub fn current_description_path(communal_location: &str, db_name: &str) -> String {
    format!(
        "{}/{}",
        metadata_dir(communal_location, db_name),
        DESCRIPTION_FILE_NAME
    )
}

/// Description file saved with a restore point
pub fn restore_point_description_path(
    communal_location: &str,
    db_name: &str,
    archive: &str,
    restore_point_id: &str,
) -> String {
    format!(
        "{}/archives/{}/{}/{}",
        metadata_dir(communal_location, db_name),
        archive,
        restore_point_id,
        DESCRIPTION_FILE_NAME
    )
}

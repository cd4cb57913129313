use std::path::PathBuf;

const APP_DIR_NAME: &str = "dsa-planner";

pub fn get_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| {
            let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(".local/share");
            path.push(APP_DIR_NAME);
            path
        })
}

pub fn get_database_path() -> PathBuf {
    let mut path = get_app_data_dir();
    path.push("planner.db");
    path
}

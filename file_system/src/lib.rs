use std::{fs, io, path::PathBuf};

use directories_next::ProjectDirs;

const DATABASE_FILE_NAME: &str = "uploader.sqlite";
const LOG_DIR_NAME: &str = "logs";

/// Returns path to the queue database located in the default data dir for the application.
pub fn get_database_path() -> io::Result<PathBuf> {
    Ok(get_default_data_dir()?.join(DATABASE_FILE_NAME))
}

/// Returns path to the directory where rotated log files are written.
pub fn get_log_dir() -> io::Result<PathBuf> {
    let log_dir = get_default_data_dir()?.join(LOG_DIR_NAME);
    fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}

fn get_default_data_dir() -> io::Result<PathBuf> {
    let project_dirs = ProjectDirs::from("org", "photouploader", "uploader").ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "could not determine project directory",
        )
    })?;
    let data_dir = project_dirs.data_local_dir();
    fs::create_dir_all(data_dir)?;
    Ok(PathBuf::from(data_dir))
}

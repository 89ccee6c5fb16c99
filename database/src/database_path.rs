use file_system::get_database_path;
use std::{env, io};

/// Returns the database URL in the format sqlite:///absolute/path/to/db.sqlite
///
/// `DATABASE_URL` (also read from a `.env` file when present) takes precedence over the
/// default location in the platform data directory.
pub fn get_database_url() -> io::Result<String> {
    dotenvy::dotenv().ok();
    if let Ok(env_url) = env::var("DATABASE_URL") {
        return Ok(env_url);
    }

    let db_path = get_database_path()?;

    Ok(format!("sqlite://{}", db_path.display()))
}

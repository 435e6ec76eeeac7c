// src/utils.rs
use web_sys::window;

/// Sub-path the app is served under on static hosting.
const DEPLOY_PREFIX: &str = "/exif-map-viewer";

/// Get the base URL for the application
/// This handles both local development and sub-path deployment
pub fn get_base_url() -> String {
    if let Some(window) = window() {
        if let Ok(location) = window.location().pathname() {
            if location.starts_with(&format!("{}/", DEPLOY_PREFIX)) {
                return DEPLOY_PREFIX.to_string();
            }
        }
    }
    // Local development - no base path needed
    String::new()
}

/// Build a resource URL with the correct base path
pub fn resource_url(path: &str) -> String {
    join_base(&get_base_url(), path)
}

fn join_base(base: &str, path: &str) -> String {
    let clean_path = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", clean_path)
    } else {
        format!("{}/{}", base, clean_path)
    }
}

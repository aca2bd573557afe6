use super::*;

#[test]
fn test_config_default() {
    let config = BrowserConfig::default();
    assert_eq!(config.debug_port, 9222);
    assert!(!config.headless);
    assert!(config.chrome_binary.is_none());
}

#[test]
fn test_config_endpoint() {
    let config = BrowserConfig::default();
    assert_eq!(config.endpoint(), "http://localhost:9222");
}

#[test]
fn test_config_profile_dir() {
    let config = BrowserConfig::default();
    let profile = config.get_profile_dir();
    assert!(profile.ends_with(".autotag/browser-profile"));
}

#[test]
fn test_config_profile_dir_override() {
    let config = BrowserConfig {
        profile_dir: Some(PathBuf::from("/tmp/profile")),
        ..Default::default()
    };
    assert_eq!(config.get_profile_dir(), PathBuf::from("/tmp/profile"));
}

#[test]
fn test_browser_error_display() {
    let err = BrowserError::ConnectionFailed("timeout".to_string());
    assert_eq!(err.to_string(), "Connection failed: timeout");

    let err = BrowserError::ChromeNotFound;
    assert_eq!(
        err.to_string(),
        "Chrome not found. Please install Google Chrome."
    );

    let err = BrowserError::PageNotFound("no open tab matching '/icon/draft/'".to_string());
    assert!(err.to_string().contains("/icon/draft/"));
}

#[test]
fn test_find_chrome() {
    // Presence depends on the host; just make sure the lookup does not panic.
    let _result = Browser::find_chrome();
}

#[tokio::test]
async fn test_client_before_connect() {
    let browser = Browser::new(BrowserConfig::default());
    assert!(matches!(
        browser.client().await,
        Err(BrowserError::NotConnected)
    ));
}

#[tokio::test]
async fn test_close_without_connect() {
    let browser = Browser::new(BrowserConfig::default());
    assert!(browser.close().await.is_ok());
}

#[tokio::test]
async fn test_shutdown_without_launch() {
    let browser = Browser::new(BrowserConfig::default());
    assert!(browser.shutdown_chrome().await.is_ok());
}

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter("info,resona_assets=debug,resona_core=debug")
        .init();
    tracing::debug!("logging initialized");
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub bearer_prefix: String,
    pub allow_anonymous_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bearer_prefix: "Bearer ".to_string(),
            allow_anonymous_paths: vec!["/api/health".to_string(), "/api/auth/login".to_string()],
        }
    }
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_anonymous_allowed(&self, path: &str) -> bool {
        self.allow_anonymous_paths
            .iter()
            .any(|allowed| path == allowed || path.starts_with(&format!("{allowed}/")))
    }
}

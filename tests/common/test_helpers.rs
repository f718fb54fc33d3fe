use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::fs;

use html_angular_validate::{Config, HtmlChecker, ValidationEngine, WrappingRule};

pub const VALID_FULL: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Valid</title>
</head>
<body>
    <p class="lead">Hello</p>
</body>
</html>
"#;

pub const VALID_ANGULAR: &str = r#"<!DOCTYPE html>
<html lang="en" ng-app="demo">
<head>
    <title>Angular</title>
</head>
<body ng-controller="MainCtrl">
    <custom-tag></custom-tag>
    <div fixed-div-label="Label" ng-click="go()">{{ name }}</div>
</body>
</html>
"#;

pub const VALID_CUSTOM: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Custom</title>
</head>
<body>
    <custom-widget custom-size="3"></custom-widget>
</body>
</html>
"#;

pub const VALID_TEMPLATE: &str = r#"<div class="panel">
    <p>Fragment</p>
</div>
"#;

pub const VALID_ANGULAR_TEMPLATE: &str = r#"<div ng-repeat="item in items" fixed-div-label="x">
    <span ui-sref="home">{{ item }}</span>
</div>
"#;

pub const TABLE_ROW_TEMPLATE: &str = "<tr><td>{{ row.name }}</td></tr>\n";

pub const IMPROPER_OPERATOR_TEMPLATE: &str = r#"<div ng-if="ready && loaded">
    <p>Loaded</p>
</div>
"#;

pub const RELAXED_AMPERSAND: &str =
    "“&” did not start a character reference. (“&” probably should have been escaped as “&amp;”.)";

/// A throwaway project directory
pub struct TestProject {
    pub temp_dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub async fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(&path, content).await.unwrap();
        path
    }

    pub fn pattern(&self, relative: &str) -> String {
        self.root().join(relative).to_string_lossy().into_owned()
    }

    pub fn report_path(&self) -> PathBuf {
        self.root().join("html-angular-validate-report.json")
    }

    /// The six valid files the default options accept
    pub async fn with_valid_files(self) -> Self {
        self.write("valid/full/valid.html", VALID_FULL).await;
        self.write("valid/full/valid_angular.html", VALID_ANGULAR).await;
        self.write("valid/full/valid_custom.html", VALID_CUSTOM).await;
        self.write("valid/template/valid.tmpl.html", VALID_TEMPLATE).await;
        self.write("valid/template/valid_angular.tmpl.html", VALID_ANGULAR_TEMPLATE)
            .await;
        self.write(
            "valid/template/valid_angular_table_row.tmpl.html",
            TABLE_ROW_TEMPLATE,
        )
        .await;
        self
    }

    /// Configuration writing its report inside the project, retrying without delay
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.checker.retry_delay_ms = 0;
        config.output.report_path = Some(self.report_path());
        config
    }

    /// Options that accept every file written by `with_valid_files`
    pub fn default_options(&self) -> Config {
        let mut config = self.config();
        config.rules.custom_tags = vec!["custom-tag".to_string(), "custom-*".to_string()];
        config.rules.custom_attrs = vec!["fixed-div-label".to_string(), "custom-*".to_string()];
        config.rules.wrapping = vec![WrappingRule::new("tr", "<table>{0}</table>")];
        config
    }
}

pub fn engine(config: &Config, checker: Arc<dyn HtmlChecker>) -> ValidationEngine {
    ValidationEngine::from_config(config, checker).unwrap()
}

/// Messages of every failed file, flattened in report order
pub fn failure_messages(results: &html_angular_validate::ValidationResults) -> Vec<String> {
    results
        .failed()
        .flat_map(|task| task.diagnostics().iter().map(|d| d.message.clone()))
        .collect()
}

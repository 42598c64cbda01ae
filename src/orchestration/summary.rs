//! Fixed operator-facing text printed at the end of a publish run

use crate::core::config::PublishConfig;
use crate::core::push_failure::PushFailureCause;

/// Success summary with the repository URL and post-publish checklist
pub fn success_summary(config: &PublishConfig, tag: Option<&str>) -> String {
    let url = config.repository_url();
    let release_step = match tag {
        Some(tag) => format!(
            "Publish the release notes for {} (Releases → Draft a new release → choose tag {})",
            tag, tag
        ),
        None => "Create a release (Releases → Draft a new release, tag v1.0.0)".to_string(),
    };

    let steps = [
        "Open the repository page and check that every file is there".to_string(),
        "Add a description and topics (telegram-bot, python, students, education)".to_string(),
        release_step,
        "Choose a license if the repository does not have one yet".to_string(),
        "Enable Issues so users can report problems".to_string(),
        "Add build and license badges to README.md".to_string(),
    ];

    let mut lines = vec![
        "✅ Repository published successfully!".to_string(),
        String::new(),
        format!("🔗 Repository URL: {}", url),
        String::new(),
        "📋 Next steps:".to_string(),
    ];
    lines.extend(
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("  {}. {}", i + 1, step)),
    );

    lines.join("\n")
}

/// Troubleshooting checklist printed after a failed push
pub fn troubleshooting(config: &PublishConfig, cause: PushFailureCause) -> String {
    let steps = [
        format!(
            "Make sure the repository exists: {} (create it empty, without README or .gitignore)",
            config.repository_url()
        ),
        format!("Check that the account name \"{}\" is correct", config.account),
        "Use a Personal Access Token instead of your password (Settings → Developer settings → Personal access tokens)"
            .to_string(),
        format!(
            "Or switch to SSH: git remote set-url {} git@{}:{}/{}.git",
            config.remote, config.host, config.account, config.project
        ),
        "Check your internet connection".to_string(),
    ];

    let mut lines = vec![
        "❌ Push failed".to_string(),
        String::new(),
        format!("💡 Likely cause: {}. {}", cause, cause.hint()),
        String::new(),
        "🔧 Troubleshooting:".to_string(),
    ];
    lines.extend(
        steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("  {}. {}", i + 1, step)),
    );
    lines.push(String::new());
    lines.push("Your commit is kept locally. After fixing the problem, push again with:".to_string());
    lines.push(format!("  git push -u {} {}", config.remote, config.branch));

    lines.join("\n")
}

//! Error handling for repository publishing
//!
//! This module provides the error taxonomy of the publish workflow with
//! recovery guidance using the thiserror crate for ergonomic error handling.

use crate::core::push_failure::PushFailureCause;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad outcome class of a failed run
///
/// Callers branch on this instead of parsing printed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Configuration,
    Environment,
    Declined,
    Remote,
    Command,
}

impl FailureKind {
    /// Process exit code used by the CLI for this kind
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::Environment => 3,
            Self::Declined => 4,
            Self::Remote => 5,
            Self::Command => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Environment => "environment",
            Self::Declined => "declined",
            Self::Remote => "remote",
            Self::Command => "command",
        }
    }
}

/// Main error type for publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Configuration errors
    #[error("アカウント名がプレースホルダー ({placeholder}) のままです")]
    PlaceholderAccount { placeholder: String },

    #[error("無効なアカウント名です: {account} ({reason})")]
    InvalidAccount { account: String, reason: String },

    #[error("無効なリリースタグです: {tag} ({reason})")]
    InvalidReleaseTag { tag: String, reason: String },

    #[error("リリースタグ {tag} は既に別のコミット ({commit}) を指しています")]
    TagConflict { tag: String, commit: String },

    #[error("無効なユーザー情報です: {field}")]
    InvalidIdentity { field: String },

    #[error("設定エラー: {0}")]
    ConfigError(String),

    #[error("シークレットファイルが見つかりません: {path}")]
    SecretsFileMissing { path: String },

    #[error("エントリーポイントが見つかりません: {path}")]
    EntryPointMissing { path: String },

    // Environment errors
    #[error("{tool} がインストールされていません")]
    ToolMissing { tool: String },

    #[error("gitのユーザー情報 (user.name / user.email) が設定されていません")]
    IdentityMissing,

    #[error("依存関係のインストールに失敗しました: {message}")]
    DependencyInstallFailed { message: String },

    // Operator decisions
    #[error("シークレットファイルがステージされているため中断しました: {}", files.join(", "))]
    Declined { files: Vec<String> },

    // Remote errors
    #[error("プッシュに失敗しました ({cause}): {message}")]
    PushFailed {
        cause: PushFailureCause,
        message: String,
    },

    // Command execution errors
    #[error("コマンド実行エラー [{command}]: {message}")]
    CommandError { command: String, message: String },

    #[error("コマンドがタイムアウトしました [{command}] ({seconds}秒)")]
    Timeout { command: String, seconds: u64 },

    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// Outcome class of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PlaceholderAccount { .. }
            | Self::InvalidAccount { .. }
            | Self::InvalidReleaseTag { .. }
            | Self::TagConflict { .. }
            | Self::InvalidIdentity { .. }
            | Self::ConfigError(_)
            | Self::SecretsFileMissing { .. }
            | Self::EntryPointMissing { .. } => FailureKind::Configuration,
            Self::ToolMissing { .. }
            | Self::IdentityMissing
            | Self::DependencyInstallFailed { .. } => FailureKind::Environment,
            Self::Declined { .. } => FailureKind::Declined,
            Self::PushFailed { .. } => FailureKind::Remote,
            Self::CommandError { .. } | Self::Timeout { .. } | Self::Io(_) => {
                FailureKind::Command
            }
        }
    }

    /// Check whether re-running the workflow can succeed without code changes
    ///
    /// Configuration errors need an edit to the configuration first.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), FailureKind::Configuration)
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::PlaceholderAccount { .. } => vec![
                ".repo-publisher.yaml の account を設定してください",
                "または --account オプション / PUBLISH_ACCOUNT 環境変数で指定してください",
            ],
            Self::InvalidAccount { .. } => vec![
                "英数字とハイフンのみ使用できます",
                "先頭と末尾にハイフンは使用できません",
            ],
            Self::InvalidReleaseTag { .. } => {
                vec!["SemVer形式（例: 1.0.0 または v1.0.0）で指定してください"]
            }
            Self::TagConflict { .. } => vec![
                "新しいバージョン番号を --tag で指定してください",
                "未プッシュのタグであれば git tag -d で削除してから再実行してください",
            ],
            Self::InvalidIdentity { .. } => vec![
                "名前とメールアドレスを入力してください",
                "メールアドレスは name@example.com の形式で入力してください",
            ],
            Self::ConfigError(_) => vec![".repo-publisher.yaml の内容を確認してください"],
            Self::SecretsFileMissing { .. } => vec![
                ".env.example をコピーして .env を作成してください",
                "BOT_TOKEN などの必須項目を設定してください",
            ],
            Self::EntryPointMissing { .. } => {
                vec!["launcher.entryPoint の設定を確認してください"]
            }
            Self::ToolMissing { .. } => vec![
                "必要なツールをインストールしてください",
                "PATH が正しく設定されているか確認してください",
            ],
            Self::IdentityMissing => vec![
                "git config --global user.name \"Your Name\" を実行してください",
                "git config --global user.email \"you@example.com\" を実行してください",
            ],
            Self::DependencyInstallFailed { .. } => vec![
                "requirements.txt の内容を確認してください",
                "ネットワーク接続を確認してください",
            ],
            Self::Declined { .. } => vec![
                ".gitignore に .env を追加してください",
                "git rm --cached .env でステージから外してください",
            ],
            Self::PushFailed { .. } => vec![
                "リモートリポジトリが作成済みか確認してください",
                "認証情報（Personal Access Token / SSH鍵）を確認してください",
                "ネットワーク接続を確認してから再実行してください",
            ],
            Self::CommandError { .. } => vec![
                "コマンドの出力を確認してください",
                "必要な依存関係がインストールされているか確認してください",
            ],
            Self::Timeout { .. } => vec![
                "ネットワーク環境を確認してください",
                "pushTimeoutSecs で時間を延長できます",
            ],
            Self::Io(_) => vec!["ファイルのアクセス権限を確認してください"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlaceholderAccount { .. } => "PLACEHOLDER_ACCOUNT",
            Self::InvalidAccount { .. } => "INVALID_ACCOUNT",
            Self::InvalidReleaseTag { .. } => "INVALID_RELEASE_TAG",
            Self::TagConflict { .. } => "TAG_CONFLICT",
            Self::InvalidIdentity { .. } => "INVALID_IDENTITY",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::SecretsFileMissing { .. } => "SECRETS_FILE_MISSING",
            Self::EntryPointMissing { .. } => "ENTRY_POINT_MISSING",
            Self::ToolMissing { .. } => "TOOL_MISSING",
            Self::IdentityMissing => "IDENTITY_MISSING",
            Self::DependencyInstallFailed { .. } => "DEPENDENCY_INSTALL_FAILED",
            Self::Declined { .. } => "DECLINED",
            Self::PushFailed { .. } => "PUSH_FAILED",
            Self::CommandError { .. } => "COMMAND_ERROR",
            Self::Timeout { .. } => "TIMEOUT_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

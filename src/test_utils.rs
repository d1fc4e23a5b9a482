//! テスト用ユーティリティ関数
//!
//! 複数のテストモジュールで使用される共通のヘルパー関数を提供します。
#![cfg(test)]

use crate::config::EngineSettings;

/// テスト用の `EngineSettings` を作成する
///
/// 環境検出を無効にして、テストをホストのロケールから独立させる。
///
/// # Arguments
/// * `available` - 利用可能な言語タグ（例: `&["en", "ja"]`）
pub(crate) fn engine_settings(available: &[&str]) -> EngineSettings {
    EngineSettings {
        available_languages: available.iter().map(ToString::to_string).collect(),
        detect_environment: false,
        ..EngineSettings::default()
    }
}

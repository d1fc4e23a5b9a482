//! dom-i18n
//!
//! 動的ドキュメント向けのライブ i18n 翻訳エンジン

pub mod cache;
pub mod config;
pub mod dictionary;
pub mod dom;
pub mod interpolate;
pub mod prefs;
pub mod selector;
pub mod session;
pub mod source;
pub mod types;

mod test_utils;

// 主要な型を再エクスポート
pub use interpolate::interpolate;
pub use session::I18nSession;
pub use types::{
    LanguageTag,
    Params,
};

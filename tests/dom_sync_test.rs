//! ドキュメント同期フローの統合テスト

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(missing_docs)]

use dom_i18n::config::EngineSettings;
use dom_i18n::dom::{
    Document,
    NodeId,
    SyncState,
    ARIA_MARKER,
};
use dom_i18n::prefs::MemoryPrefs;
use dom_i18n::source::StaticSource;
use dom_i18n::I18nSession;
use pretty_assertions::assert_eq;
use serde_json::json;

/// `RUST_LOG` でエンジンのログを確認できるようにする
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn source() -> StaticSource {
    StaticSource::new()
        .with(
            "en",
            json!({
                "nav": {"home": "Home", "search": "Search"},
                "form": {"email": "Email address", "send": "Send"}
            }),
        )
        .with(
            "ja",
            json!({
                "nav": {"home": "ホーム", "search": "検索"},
                "form": {"email": "メールアドレス", "send": "送信"}
            }),
        )
}

fn session() -> I18nSession<StaticSource, MemoryPrefs> {
    init_tracing();
    let settings = EngineSettings {
        available_languages: vec!["en".to_string(), "ja".to_string()],
        detect_environment: false,
        ..EngineSettings::default()
    };
    I18nSession::new(settings, source(), MemoryPrefs::new()).unwrap()
}

/// ヘッダー、検索フォーム、送信ボタンを持つページを組み立てる
fn build_page(document: &mut Document) -> (NodeId, NodeId, NodeId) {
    let header = document.append_element(document.root(), "h1");
    document.set_attribute(header, "data-i18n", "nav.home");

    let search = document.append_element(document.root(), "input");
    document.set_attribute(search, "data-i18n-placeholder", "form.email");
    document.set_attribute(search, ARIA_MARKER, "nav.search");

    let send = document.append_element(document.root(), "input");
    document.set_attribute(send, "data-i18n", "form.send");

    (header, search, send)
}

#[tokio::test]
async fn test_attach_translates_the_page_and_language_switch_retranslates() {
    let mut document = Document::new();
    let (header, search, send) = build_page(&mut document);

    let mut session = session();
    session.init().await.unwrap();
    let mut sync = session.synchronizer();

    let applied = sync.attach(&mut document, &mut session);
    assert_eq!(applied, 3);
    assert_eq!(sync.state(), SyncState::Observing);
    assert_eq!(document.text(header).unwrap(), "Home");
    assert_eq!(document.attribute(search, "placeholder").unwrap(), "Email address");
    assert_eq!(document.attribute(search, "aria-label").unwrap(), "Search");
    assert_eq!(document.value(send).unwrap(), "Send");

    session.activate("ja").await.unwrap();
    let applied = sync.pump(&mut document, &mut session);

    assert_eq!(applied, 3);
    assert_eq!(document.text(header).unwrap(), "ホーム");
    assert_eq!(document.attribute(search, "placeholder").unwrap(), "メールアドレス");
    assert_eq!(document.attribute(search, "aria-label").unwrap(), "検索");
    assert_eq!(document.value(send).unwrap(), "送信");
}

#[tokio::test]
async fn test_inserted_content_is_translated_incrementally() {
    let mut document = Document::new();
    let (header, _, _) = build_page(&mut document);

    let mut session = session();
    session.init().await.unwrap();
    let mut sync = session.synchronizer();
    sync.attach(&mut document, &mut session);

    // Content rendered later, for example by a client-side router.
    let card = document.create_element("section");
    let title = document.create_element("span");
    document.set_attribute(title, "data-i18n", "nav.search");
    document.append(card, title);
    document.append(document.root(), card);

    // Unrelated drift shows the pass does not revisit old content.
    document.set_text(header, "drifted");

    let applied = sync.pump(&mut document, &mut session);

    assert_eq!(applied, 1);
    assert_eq!(document.text(title).unwrap(), "Search");
    assert_eq!(document.text(header).unwrap(), "drifted");

    // Nothing pending: the next pump is free.
    assert_eq!(sync.pump(&mut document, &mut session), 0);
}

#[tokio::test]
async fn test_dispose_ends_observation() {
    let mut document = Document::new();
    build_page(&mut document);

    let mut session = session();
    session.init().await.unwrap();
    let mut sync = session.synchronizer();
    sync.attach(&mut document, &mut session);

    sync.dispose(&mut document, &mut session);
    assert_eq!(sync.state(), SyncState::Disposed);
    assert_eq!(session.stats().cached, 0);

    let late = document.append_element(document.root(), "span");
    document.set_attribute(late, "data-i18n", "nav.home");

    assert_eq!(sync.pump(&mut document, &mut session), 0);
    assert_eq!(document.text(late).unwrap(), "");
}

//! Controller behavior tests against mock capabilities

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;

use super::backend::{ChatReply, ConfigStatus, OutboundChat, TokenGrant, WidgetBackend};
use super::controller::{
    MSG_CHAT_NETWORK, MSG_CHAT_TIMEOUT, MSG_CONNECT_FAILED, MSG_FATAL_TRANSPORT, MSG_MIC_DENIED,
    MSG_RECONNECTING, MSG_SIM_ACK, MSG_SIM_GREETING, SessionController, WidgetConfig,
};
use super::errors::{BackendError, MicrophoneError, RealtimeError};
use super::microphone::{MicrophoneHandle, MicrophoneSource};
use super::session::{
    ConversationToken, MessageSource, RealtimeConnector, RealtimeEvents, RealtimeSession,
};
use super::state::{MessageKind, VoiceStatus};

struct MockBackend {
    config_result: StdMutex<Result<ConfigStatus, BackendError>>,
    token_result: StdMutex<Result<TokenGrant, BackendError>>,
    chat_result: StdMutex<Result<ChatReply, BackendError>>,
    token_calls: AtomicUsize,
    chat_calls: AtomicUsize,
}

impl MockBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            config_result: StdMutex::new(Ok(ConfigStatus { configured: true })),
            token_result: StdMutex::new(Ok(good_grant())),
            chat_result: StdMutex::new(Ok(ChatReply {
                response: "respuesta del backend".to_string(),
            })),
            token_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
        })
    }

    fn set_token(&self, result: Result<TokenGrant, BackendError>) {
        *self.token_result.lock().unwrap() = result;
    }

    fn set_chat(&self, result: Result<ChatReply, BackendError>) {
        *self.chat_result.lock().unwrap() = result;
    }
}

fn good_grant() -> TokenGrant {
    TokenGrant {
        configured: true,
        token_generated: true,
        token: Some("tok_abc".to_string()),
        agent_id: Some("agent_1".to_string()),
        error: None,
    }
}

fn ungenerated_grant() -> TokenGrant {
    TokenGrant {
        configured: true,
        token_generated: false,
        token: None,
        agent_id: None,
        error: None,
    }
}

#[async_trait]
impl WidgetBackend for MockBackend {
    async fn check_config(&self) -> Result<ConfigStatus, BackendError> {
        self.config_result.lock().unwrap().clone()
    }

    async fn fetch_token(&self) -> Result<TokenGrant, BackendError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        self.token_result.lock().unwrap().clone()
    }

    async fn send_chat(&self, _chat: &OutboundChat) -> Result<ChatReply, BackendError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.chat_result.lock().unwrap().clone()
    }
}

struct MockMicHandle {
    released: Arc<AtomicBool>,
}

impl MicrophoneHandle for MockMicHandle {
    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

struct MockMicrophone {
    deny: AtomicBool,
    acquire_calls: AtomicUsize,
    handles: StdMutex<Vec<Arc<AtomicBool>>>,
}

impl MockMicrophone {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            deny: AtomicBool::new(false),
            acquire_calls: AtomicUsize::new(0),
            handles: StdMutex::new(Vec::new()),
        })
    }

    fn last_released(&self) -> bool {
        self.handles
            .lock()
            .unwrap()
            .last()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

#[async_trait]
impl MicrophoneSource for MockMicrophone {
    async fn acquire(&self) -> Result<Box<dyn MicrophoneHandle>, MicrophoneError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny.load(Ordering::SeqCst) {
            return Err(MicrophoneError::PermissionDenied);
        }
        let released = Arc::new(AtomicBool::new(false));
        self.handles.lock().unwrap().push(released.clone());
        Ok(Box::new(MockMicHandle { released }))
    }
}

#[derive(Default)]
struct MockSessionState {
    sent: StdMutex<Vec<String>>,
    muted: StdMutex<Option<bool>>,
    ended: AtomicBool,
    fail_send: AtomicBool,
    raw_ok: AtomicBool,
    raw_sent: StdMutex<Vec<String>>,
    activity_pings: AtomicUsize,
}

struct MockSession(Arc<MockSessionState>);

#[async_trait]
impl RealtimeSession for MockSession {
    async fn send_message(&self, text: &str) -> Result<(), RealtimeError> {
        if self.0.fail_send.load(Ordering::SeqCst) {
            return Err(RealtimeError::SendFailed("data channel closed".to_string()));
        }
        self.0.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn notify_activity(&self) {
        self.0.activity_pings.fetch_add(1, Ordering::SeqCst);
    }

    async fn set_muted(&self, muted: bool) {
        *self.0.muted.lock().unwrap() = Some(muted);
    }

    async fn end(&self) {
        self.0.ended.store(true, Ordering::SeqCst);
    }

    async fn send_raw(&self, text: &str) -> bool {
        if self.0.raw_ok.load(Ordering::SeqCst) {
            self.0.raw_sent.lock().unwrap().push(text.to_string());
            return true;
        }
        false
    }
}

struct MockConnector {
    fail: AtomicBool,
    events: StdMutex<Option<RealtimeEvents>>,
    sessions: StdMutex<Vec<Arc<MockSessionState>>>,
}

impl MockConnector {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            events: StdMutex::new(None),
            sessions: StdMutex::new(Vec::new()),
        })
    }

    fn events(&self) -> RealtimeEvents {
        self.events.lock().unwrap().clone().expect("no session was opened")
    }

    fn last_session(&self) -> Arc<MockSessionState> {
        self.sessions.lock().unwrap().last().expect("no session was opened").clone()
    }
}

#[async_trait]
impl RealtimeConnector for MockConnector {
    async fn connect(
        &self,
        _token: ConversationToken,
        events: RealtimeEvents,
    ) -> Result<Box<dyn RealtimeSession>, RealtimeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RealtimeError::ConnectionFailed("sdk load failed".to_string()));
        }
        let state = Arc::new(MockSessionState::default());
        self.sessions.lock().unwrap().push(state.clone());
        *self.events.lock().unwrap() = Some(events.clone());
        (events.on_connect)();
        Ok(Box::new(MockSession(state)))
    }
}

struct Fixture {
    controller: SessionController,
    backend: Arc<MockBackend>,
    microphone: Arc<MockMicrophone>,
    connector: Arc<MockConnector>,
}

fn fixture() -> Fixture {
    let backend = MockBackend::new();
    let microphone = MockMicrophone::new();
    let connector = MockConnector::new();
    let config = WidgetConfig {
        simulated_reply_delay: Duration::from_millis(10),
        ..WidgetConfig::default()
    };
    let controller = SessionController::new(
        config,
        backend.clone(),
        microphone.clone(),
        connector.clone(),
    );
    Fixture {
        controller,
        backend,
        microphone,
        connector,
    }
}

async fn connected_fixture() -> Fixture {
    let f = fixture();
    f.controller.check_service_configured().await;
    f.controller.start_call().await;
    assert_eq!(f.controller.voice_status(), VoiceStatus::Connected);
    f
}

fn message_texts(controller: &SessionController) -> Vec<String> {
    controller
        .snapshot()
        .messages
        .iter()
        .map(|m| m.text.clone())
        .collect()
}

fn assistant_count(controller: &SessionController) -> usize {
    controller
        .snapshot()
        .messages
        .iter()
        .filter(|m| m.kind == MessageKind::Assistant)
        .count()
}

#[tokio::test]
async fn test_start_call_without_config_has_no_side_effects() {
    let f = fixture();
    let toasts = Arc::new(StdMutex::new(Vec::new()));
    let record = toasts.clone();
    f.controller.listeners().set_on_toast(Arc::new(move |title, _, _| {
        record.lock().unwrap().push(title.to_string());
    }));

    f.controller.start_call().await;

    assert_eq!(f.controller.voice_status(), VoiceStatus::Idle);
    assert_eq!(f.microphone.acquire_calls.load(Ordering::SeqCst), 0);
    assert_eq!(toasts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_check_config_failure_reports_unconfigured() {
    let f = fixture();
    *f.backend.config_result.lock().unwrap() =
        Err(BackendError::Network("connection refused".to_string()));

    assert!(!f.controller.check_service_configured().await);
    assert!(!f.controller.has_service_config());
}

#[tokio::test]
async fn test_happy_path_reaches_connected_and_routes_text() {
    let f = connected_fixture().await;
    let session = f.connector.last_session();

    f.controller.send_text_message("hola").await;

    assert_eq!(session.sent.lock().unwrap().as_slice(), ["hola"]);
    assert_eq!(session.activity_pings.load(Ordering::SeqCst), 1);
    // Delivery went through the session, not the backend fallback
    assert_eq!(f.backend.chat_calls.load(Ordering::SeqCst), 0);
    assert_eq!(message_texts(&f.controller), ["hola"]);

    // The agent's reply arrives as a transcript event
    (f.connector.events().on_message)(MessageSource::Assistant, "¡Hola! ¿En qué ayudo?".to_string());
    assert_eq!(assistant_count(&f.controller), 1);
}

#[tokio::test]
async fn test_ungenerated_token_enters_simulated_mode() {
    let f = fixture();
    f.backend.set_token(Ok(ungenerated_grant()));
    f.controller.check_service_configured().await;

    f.controller.start_call().await;

    assert_eq!(f.controller.voice_status(), VoiceStatus::Connected);
    assert_eq!(message_texts(&f.controller), [MSG_SIM_GREETING]);
    assert!(f.connector.sessions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_simulated_mode_acknowledges_text_after_delay() {
    let f = fixture();
    f.backend.set_token(Ok(ungenerated_grant()));
    f.controller.check_service_configured().await;
    f.controller.start_call().await;

    f.controller.send_text_message("hola").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let texts = message_texts(&f.controller);
    assert_eq!(texts, [MSG_SIM_GREETING, "hola", MSG_SIM_ACK]);
    // The canned reply never goes through the backend
    assert_eq!(f.backend.chat_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stopping_cancels_pending_simulated_reply() {
    let f = fixture();
    f.backend.set_token(Ok(ungenerated_grant()));
    f.controller.check_service_configured().await;
    f.controller.start_call().await;

    f.controller.send_text_message("hola").await;
    f.controller.stop_call().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(f.controller.snapshot().messages.is_empty());
}

#[tokio::test]
async fn test_mic_denial_is_terminal_and_skips_token() {
    let f = fixture();
    f.microphone.deny.store(true, Ordering::SeqCst);
    f.controller.check_service_configured().await;

    f.controller.start_call().await;

    assert_eq!(f.controller.voice_status(), VoiceStatus::Error);
    assert_eq!(message_texts(&f.controller), [MSG_MIC_DENIED]);
    assert_eq!(f.backend.token_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_token_failure_releases_microphone() {
    let f = fixture();
    f.backend.set_token(Err(BackendError::Timeout));
    f.controller.check_service_configured().await;

    f.controller.start_call().await;

    assert_eq!(f.controller.voice_status(), VoiceStatus::Error);
    assert_eq!(message_texts(&f.controller), [MSG_CONNECT_FAILED]);
    assert!(f.microphone.last_released());
}

#[tokio::test]
async fn test_unconfigured_token_body_is_a_failure() {
    let f = fixture();
    f.backend.set_token(Ok(TokenGrant {
        configured: false,
        token_generated: false,
        token: None,
        agent_id: None,
        error: Some("missing api key".to_string()),
    }));
    f.controller.check_service_configured().await;

    f.controller.start_call().await;

    assert_eq!(f.controller.voice_status(), VoiceStatus::Error);
    assert!(f.microphone.last_released());
}

#[tokio::test]
async fn test_connector_failure_degrades_to_simulated() {
    let f = fixture();
    f.connector.fail.store(true, Ordering::SeqCst);
    f.controller.check_service_configured().await;

    f.controller.start_call().await;

    // Still usable: connected in simulated mode, with an explanation first
    assert_eq!(f.controller.voice_status(), VoiceStatus::Connected);
    let texts = message_texts(&f.controller);
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[1], MSG_SIM_GREETING);
}

#[tokio::test]
async fn test_stop_call_is_idempotent() {
    let f = connected_fixture().await;
    let session = f.connector.last_session();
    f.controller.toggle_mute().await;
    assert!(f.controller.snapshot().is_muted);

    f.controller.stop_call().await;
    f.controller.stop_call().await;

    let state = f.controller.snapshot();
    assert_eq!(state.voice_status, VoiceStatus::Idle);
    assert!(state.messages.is_empty());
    assert!(!state.is_muted);
    assert!(session.ended.load(Ordering::SeqCst));
    assert!(f.microphone.last_released());
}

#[tokio::test]
async fn test_restart_tears_down_previous_call() {
    let f = connected_fixture().await;
    let first = f.connector.last_session();

    f.controller.start_call().await;

    assert!(first.ended.load(Ordering::SeqCst));
    assert_eq!(f.microphone.handles.lock().unwrap().len(), 2);
    assert!(f.microphone.handles.lock().unwrap()[0].load(Ordering::SeqCst));
    assert_eq!(f.controller.voice_status(), VoiceStatus::Connected);
}

#[tokio::test]
async fn test_blank_text_is_a_complete_noop() {
    let f = fixture();
    f.controller.send_text_message("").await;
    f.controller.send_text_message("   ").await;

    assert!(f.controller.snapshot().messages.is_empty());
    assert_eq!(f.backend.chat_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_backend_fallback_appends_reply_and_clears_typing() {
    let f = fixture();
    let typing_seen = Arc::new(StdMutex::new(Vec::new()));
    let record = typing_seen.clone();
    f.controller
        .listeners()
        .set_on_messages_change(Arc::new(move |_, is_typing| {
            record.lock().unwrap().push(is_typing);
        }));

    // No call in progress: text goes straight to the backend fallback
    f.controller.send_text_message("hola").await;

    assert_eq!(f.backend.chat_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        message_texts(&f.controller),
        ["hola", "respuesta del backend"]
    );
    let seen = typing_seen.lock().unwrap();
    assert!(seen.contains(&true));
    assert_eq!(seen.last(), Some(&false));
    assert!(!f.controller.snapshot().is_typing);
}

#[tokio::test]
async fn test_backend_fallback_error_messages_by_kind() {
    let cases = [
        (BackendError::Timeout, MSG_CHAT_TIMEOUT),
        (
            BackendError::Network("dns failure".to_string()),
            MSG_CHAT_NETWORK,
        ),
        (
            BackendError::Http {
                status: 500,
                body: "boom".to_string(),
            },
            super::controller::MSG_CHAT_GENERIC,
        ),
    ];

    for (error, expected) in cases {
        let f = fixture();
        f.backend.set_chat(Err(error));
        f.controller.send_text_message("hola").await;

        let texts = message_texts(&f.controller);
        assert_eq!(texts, ["hola", expected]);
        assert!(!f.controller.snapshot().is_typing);
    }
}

#[tokio::test]
async fn test_failed_realtime_send_falls_back_to_raw_transport() {
    let f = connected_fixture().await;
    let session = f.connector.last_session();
    session.fail_send.store(true, Ordering::SeqCst);
    session.raw_ok.store(true, Ordering::SeqCst);

    f.controller.send_text_message("hola").await;

    assert_eq!(session.raw_sent.lock().unwrap().as_slice(), ["hola"]);
    assert_eq!(f.backend.chat_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_realtime_send_without_raw_uses_backend() {
    let f = connected_fixture().await;
    let session = f.connector.last_session();
    session.fail_send.store(true, Ordering::SeqCst);

    f.controller.send_text_message("hola").await;

    assert_eq!(f.backend.chat_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        message_texts(&f.controller),
        ["hola", "respuesta del backend"]
    );
}

#[tokio::test]
async fn test_toggle_mute_without_session_is_noop() {
    let f = fixture();
    f.controller.toggle_mute().await;
    assert!(!f.controller.snapshot().is_muted);
}

#[tokio::test]
async fn test_toggle_mute_forwards_to_session() {
    let f = connected_fixture().await;
    let session = f.connector.last_session();

    f.controller.toggle_mute().await;
    assert_eq!(*session.muted.lock().unwrap(), Some(true));
    assert!(f.controller.snapshot().is_muted);

    f.controller.toggle_mute().await;
    assert_eq!(*session.muted.lock().unwrap(), Some(false));
    assert!(!f.controller.snapshot().is_muted);
}

#[tokio::test]
async fn test_toggle_mute_in_simulated_mode_flips_flag() {
    let f = fixture();
    f.backend.set_token(Ok(ungenerated_grant()));
    f.controller.check_service_configured().await;
    f.controller.start_call().await;

    f.controller.toggle_mute().await;
    assert!(f.controller.snapshot().is_muted);
}

#[tokio::test]
async fn test_stale_events_are_ignored_after_stop() {
    let f = connected_fixture().await;
    let events = f.connector.events();

    f.controller.stop_call().await;
    (events.on_message)(MessageSource::Assistant, "tarde".to_string());
    (events.on_connect)();

    assert!(f.controller.snapshot().messages.is_empty());
    assert_eq!(f.controller.voice_status(), VoiceStatus::Idle);
}

#[tokio::test]
async fn test_transient_transport_error_keeps_session() {
    let f = connected_fixture().await;
    let session = f.connector.last_session();

    (f.connector.events().on_error)(RealtimeError::Transport(
        "WebSocket closed unexpectedly".to_string(),
    ));

    assert_eq!(f.controller.voice_status(), VoiceStatus::Connected);
    assert_eq!(message_texts(&f.controller), [MSG_RECONNECTING]);
    assert!(!session.ended.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_fatal_transport_error_tears_down() {
    let f = connected_fixture().await;
    let session = f.connector.last_session();

    (f.connector.events().on_error)(RealtimeError::Transport(
        "ICE negotiation failed".to_string(),
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(f.controller.voice_status(), VoiceStatus::Error);
    assert_eq!(message_texts(&f.controller), [MSG_FATAL_TRANSPORT]);
    assert!(session.ended.load(Ordering::SeqCst));
    assert!(f.microphone.last_released());
}

#[tokio::test]
async fn test_disconnect_event_returns_to_idle() {
    let f = connected_fixture().await;

    (f.connector.events().on_disconnect)();

    assert_eq!(f.controller.voice_status(), VoiceStatus::Idle);
}

#[tokio::test]
async fn test_history_window_holds_under_transcript_flood() {
    let f = connected_fixture().await;
    let events = f.connector.events();

    for i in 0..150 {
        (events.on_message)(MessageSource::Assistant, format!("m{i}"));
    }

    let messages = f.controller.snapshot().messages;
    assert_eq!(messages.len(), super::state::MAX_HISTORY);
    assert_eq!(messages[0].text, "m50");
}

#[tokio::test]
async fn test_toggle_widget_notifies_listener() {
    let f = fixture();
    let opens = Arc::new(StdMutex::new(Vec::new()));
    let record = opens.clone();
    f.controller.listeners().set_on_toggle(Arc::new(move |is_open| {
        record.lock().unwrap().push(is_open);
    }));

    f.controller.toggle_widget();
    f.controller.toggle_widget();

    assert_eq!(opens.lock().unwrap().as_slice(), [true, false]);
    assert!(!f.controller.snapshot().is_open);
}

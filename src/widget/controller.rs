//! Session controller: the widget's state owner and call lifecycle manager
//!
//! Owns the [`WidgetState`] exclusively. The UI drives it through a handful of
//! operations (`toggle_widget`, `start_call`, `stop_call`, `toggle_mute`,
//! `send_text_message`) and observes it only through listener callbacks.
//! Failures never escape an operation boundary: every error becomes a state
//! transition plus a user-facing assistant message.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backend::{OutboundChat, WidgetBackend};
use super::callbacks::WidgetListeners;
use super::errors::{BackendError, WidgetError, WidgetResult};
use super::microphone::{MicrophoneHandle, MicrophoneSource};
use super::session::{
    ConversationToken, MessageSource, RealtimeConnector, RealtimeEvents, RealtimeSession,
};
use super::state::{MessageKind, VoiceStatus, WidgetState, epoch_ms};

/// Static widget settings
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Base URL of the widget's own backend, no trailing slash
    pub api_base_url: String,
    /// Full URL (or absolute path) of the chat fallback endpoint
    pub chat_endpoint: String,
    pub config_check_timeout: Duration,
    pub token_timeout: Duration,
    pub chat_timeout: Duration,
    /// Delay before the canned acknowledgement in simulated mode
    pub simulated_reply_delay: Duration,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            chat_endpoint: "/api/chat/send".to_string(),
            config_check_timeout: Duration::from_secs(5),
            token_timeout: Duration::from_secs(10),
            chat_timeout: Duration::from_secs(10),
            simulated_reply_delay: Duration::from_secs(1),
        }
    }
}

// User-facing copy, in Spanish to match the site audience.
pub(crate) const MSG_CONNECT_FAILED: &str = "Lo siento, no pude establecer la conexión de voz. \
     Por favor, intenta usar WhatsApp o el formulario de contacto.";
pub(crate) const MSG_MIC_DENIED: &str = "Necesito acceso al micrófono para poder conversar contigo. \
     Por favor, permite el acceso y vuelve a intentar.";
pub(crate) const MSG_SIM_GREETING: &str = "¡Hola! Soy tu asistente virtual. Aunque el servicio de voz \
     no está disponible en este momento, puedes escribirme tus preguntas y te ayudaré con \
     información sobre nuestros programas.";
pub(crate) const MSG_SIM_ACK: &str = "Gracias por tu mensaje. Un asesor te contactará pronto para \
     brindarte información detallada sobre nuestros programas.";
pub(crate) const MSG_RECONNECTING: &str = "Reconectando... Por favor espera un momento.";
pub(crate) const MSG_FATAL_TRANSPORT: &str = "Error de conexión. La llamada se terminó. Puedes volver \
     a intentar o usar WhatsApp.";
pub(crate) const MSG_VOICE_UNAVAILABLE: &str = "El asistente de voz no está disponible en este momento. \
     Puedes usar el chat de texto o contactarnos por WhatsApp.";
pub(crate) const MSG_CHAT_TIMEOUT: &str = "La conexión tardó demasiado tiempo. Por favor, intenta \
     nuevamente.";
pub(crate) const MSG_CHAT_NETWORK: &str = "No se pudo conectar con el servidor. Verifica tu conexión \
     a internet e intenta nuevamente.";
pub(crate) const MSG_CHAT_GENERIC: &str = "Gracias por tu mensaje. En breve un asesor te responderá.";
pub(crate) const TOAST_TITLE: &str = "Asistente de voz no disponible";
pub(crate) const TOAST_BODY: &str = "Usa el chat de texto, WhatsApp o el formulario de contacto \
     mientras terminamos la configuración.";
const TOAST_DURATION: Duration = Duration::from_millis(3000);

/// The active call, real or simulated.
///
/// The simulated variant carries no transport; mute and send operations
/// degrade gracefully instead of erroring against a missing session.
enum SessionHandle {
    Realtime(Box<dyn RealtimeSession>),
    Simulated,
}

/// Call-scoped resources, exclusively owned, released on every exit path
#[derive(Default)]
struct CallRefs {
    session: Option<SessionHandle>,
    mic: Option<Box<dyn MicrophoneHandle>>,
    reply_timers: Vec<JoinHandle<()>>,
}

struct ControllerInner {
    config: WidgetConfig,
    backend: Arc<dyn WidgetBackend>,
    microphone: Arc<dyn MicrophoneSource>,
    connector: Arc<dyn RealtimeConnector>,
    state: RwLock<WidgetState>,
    listeners: WidgetListeners,
    refs: Mutex<CallRefs>,
    /// Bumped on every call start/stop; completions carrying an older value
    /// are stale and must not mutate state.
    generation: AtomicU64,
    session_active: AtomicBool,
    /// Serializes call setup/teardown so two overlapping `start_call`
    /// invocations cannot both proceed.
    setup_lock: Mutex<()>,
}

/// Handle to the widget session controller. Cheap to clone.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    pub fn new(
        config: WidgetConfig,
        backend: Arc<dyn WidgetBackend>,
        microphone: Arc<dyn MicrophoneSource>,
        connector: Arc<dyn RealtimeConnector>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                config,
                backend,
                microphone,
                connector,
                state: RwLock::new(WidgetState::default()),
                listeners: WidgetListeners::default(),
                refs: Mutex::new(CallRefs::default()),
                generation: AtomicU64::new(0),
                session_active: AtomicBool::new(false),
                setup_lock: Mutex::new(()),
            }),
        }
    }

    /// Listener registry for the UI layer
    pub fn listeners(&self) -> &WidgetListeners {
        &self.inner.listeners
    }

    /// Read-only snapshot of the current state
    pub fn snapshot(&self) -> WidgetState {
        self.inner.state.read().clone()
    }

    pub fn voice_status(&self) -> VoiceStatus {
        self.inner.state.read().voice_status
    }

    pub fn has_service_config(&self) -> bool {
        self.inner.state.read().has_service_config
    }

    /// Ask the backend whether the voice service is configured.
    ///
    /// Never fails: any error is logged and reported as "not configured".
    pub async fn check_service_configured(&self) -> bool {
        let configured = match self.inner.backend.check_config().await {
            Ok(status) => status.configured,
            Err(e) => {
                warn!(error = %e, "Voice config check failed");
                false
            }
        };
        self.inner.state.write().has_service_config = configured;
        debug!(configured, "Voice config check completed");
        configured
    }

    /// Open or close the widget panel
    pub fn toggle_widget(&self) {
        let is_open = {
            let mut state = self.inner.state.write();
            state.is_open = !state.is_open;
            state.is_open
        };
        self.inner.listeners.notify_toggle(is_open);
    }

    /// Start a voice call.
    ///
    /// Without a configured service this only surfaces a toast, with no other
    /// side effects. Any prior call is torn down first; no two sessions ever
    /// coexist. Failures transition to [`VoiceStatus::Error`] with a
    /// user-facing message instead of propagating.
    pub async fn start_call(&self) {
        if !self.inner.state.read().has_service_config {
            self.inner
                .listeners
                .notify_toast(TOAST_TITLE, TOAST_BODY, TOAST_DURATION);
            return;
        }

        let _setup = self.inner.setup_lock.lock().await;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut refs = self.inner.refs.lock().await;
            self.teardown_refs(&mut refs).await;
        }
        {
            let mut state = self.inner.state.write();
            state.messages.clear();
            state.is_muted = false;
        }
        self.notify_messages();

        if let Err(e) = self.run_call_setup(generation).await {
            match e {
                WidgetError::Microphone(err) => {
                    warn!(error = %err, "Microphone acquisition failed");
                    self.set_status(VoiceStatus::Error);
                    self.add_message(MSG_MIC_DENIED, MessageKind::Assistant);
                }
                other => {
                    error!(error = %other, "Call setup failed");
                    self.fail_call_attempt().await;
                }
            }
        }
    }

    /// The fallible part of `start_call`: mic, token, session.
    ///
    /// Errors surface at the `start_call` boundary as a state transition plus
    /// an assistant message; they never reach the UI as raw failures.
    async fn run_call_setup(&self, generation: u64) -> WidgetResult<()> {
        self.set_status(VoiceStatus::AskingMic);
        let mic = self.inner.microphone.acquire().await?;
        self.inner.refs.lock().await.mic = Some(mic);

        self.set_status(VoiceStatus::GettingToken);
        let grant = self.inner.backend.fetch_token().await?;
        if !grant.configured {
            warn!(error = ?grant.error, "Token endpoint reports service not configured");
            return Err(WidgetError::NotConfigured);
        }

        self.set_status(VoiceStatus::Connecting);

        if grant.token_generated
            && let Some(token) = grant.token
        {
            let token = ConversationToken {
                token,
                agent_id: grant.agent_id,
            };
            let events = self.realtime_events(generation);
            match self.inner.connector.connect(token, events).await {
                Ok(session) => {
                    self.inner.refs.lock().await.session =
                        Some(SessionHandle::Realtime(session));
                    info!("Realtime voice session started");
                }
                Err(e) => {
                    error!(error = %e, "Realtime session setup failed, degrading to simulated mode");
                    self.add_message(MSG_VOICE_UNAVAILABLE, MessageKind::Assistant);
                    self.enter_simulated().await;
                }
            }
        } else {
            info!("No usable token, entering simulated conversation");
            self.enter_simulated().await;
        }
        Ok(())
    }

    /// End the active call, if any. Idempotent, never fails.
    ///
    /// Resets messages and mute, releases the microphone and transitions back
    /// to [`VoiceStatus::Idle`].
    pub async fn stop_call(&self) {
        let _setup = self.inner.setup_lock.lock().await;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        {
            let mut refs = self.inner.refs.lock().await;
            self.teardown_refs(&mut refs).await;
        }
        {
            let mut state = self.inner.state.write();
            state.messages.clear();
            state.is_muted = false;
            state.is_typing = false;
        }
        self.notify_messages();
        self.inner.listeners.notify_mute(false);
        self.set_status(VoiceStatus::Idle);
    }

    /// Flip the mute flag and forward it to the active session.
    ///
    /// No-op with a warning when no session is active. In simulated mode the
    /// flag flips with no transport to forward to.
    pub async fn toggle_mute(&self) {
        let refs = self.inner.refs.lock().await;
        let Some(session) = refs.session.as_ref() else {
            warn!("toggle_mute called without an active session");
            return;
        };

        let muted = {
            let mut state = self.inner.state.write();
            state.is_muted = !state.is_muted;
            state.is_muted
        };
        if let SessionHandle::Realtime(session) = session {
            session.set_muted(muted).await;
        }
        self.inner.listeners.notify_mute(muted);
    }

    /// Send a user text message.
    ///
    /// Empty or whitespace-only input is ignored. The user message is always
    /// appended first; delivery then tries the realtime session, its raw
    /// transport fallback, and finally the backend chat endpoint.
    pub async fn send_text_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.add_message(text, MessageKind::User);

        {
            let mut refs = self.inner.refs.lock().await;
            match refs.session.as_ref() {
                Some(SessionHandle::Realtime(session)) => {
                    session.notify_activity().await;
                    match session.send_message(text).await {
                        Ok(()) => return,
                        Err(e) => {
                            warn!(error = %e, "Realtime message send failed, trying raw transport");
                            if session.send_raw(text).await {
                                return;
                            }
                        }
                    }
                }
                Some(SessionHandle::Simulated) => {
                    let controller = self.clone();
                    let delay = self.inner.config.simulated_reply_delay;
                    let timer = tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if controller.inner.generation.load(Ordering::SeqCst) == generation {
                            controller.add_message(MSG_SIM_ACK, MessageKind::Assistant);
                        }
                    });
                    refs.reply_timers.push(timer);
                    return;
                }
                None => {}
            }
        }

        // Last resort: backend chat fallback. The typing flag is cleared by
        // the guard on every exit path, including panics.
        debug!("Falling back to backend chat endpoint");
        let _typing = TypingGuard::engage(self);

        let now = epoch_ms();
        let chat = OutboundChat {
            message: text.to_string(),
            session_id: Some(format!("web-session-{now}")),
            user_id: Some(format!("web-user-{now}")),
            source: "website-widget".to_string(),
        };

        let outcome = self.inner.backend.send_chat(&chat).await;
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding chat reply from a superseded call attempt");
            return;
        }
        match outcome {
            Ok(reply) => self.add_message(&reply.response, MessageKind::Assistant),
            Err(BackendError::Timeout) => {
                warn!("Chat fallback timed out");
                self.add_message(MSG_CHAT_TIMEOUT, MessageKind::Assistant);
            }
            Err(BackendError::Network(e)) => {
                warn!(error = %e, "Chat fallback network failure");
                self.add_message(MSG_CHAT_NETWORK, MessageKind::Assistant);
            }
            Err(e) => {
                warn!(error = %e, "Chat fallback failed");
                self.add_message(MSG_CHAT_GENERIC, MessageKind::Assistant);
            }
        }
    }

    /// Append a message and notify listeners. Empty text is ignored.
    pub fn add_message(&self, text: &str, kind: MessageKind) {
        let pushed = self
            .inner
            .state
            .write()
            .push_message(super::state::Message::new(text, kind));
        if pushed {
            self.notify_messages();
        }
    }

    fn set_status(&self, status: VoiceStatus) {
        self.inner.state.write().voice_status = status;
        self.inner.listeners.notify_status(status);
    }

    fn set_typing(&self, is_typing: bool) {
        self.inner.state.write().is_typing = is_typing;
        self.notify_messages();
    }

    fn notify_messages(&self) {
        let (messages, is_typing) = {
            let state = self.inner.state.read();
            (state.messages.clone(), state.is_typing)
        };
        self.inner.listeners.notify_messages(&messages, is_typing);
    }

    /// Release everything the current call attempt acquired.
    async fn teardown_refs(&self, refs: &mut CallRefs) {
        for timer in refs.reply_timers.drain(..) {
            timer.abort();
        }
        if let Some(SessionHandle::Realtime(session)) = refs.session.take() {
            session.end().await;
        }
        if let Some(mic) = refs.mic.take() {
            mic.release();
        }
        self.inner.session_active.store(false, Ordering::SeqCst);
    }

    /// Terminal failure during `start_call`: release resources, error state,
    /// apology message.
    async fn fail_call_attempt(&self) {
        {
            let mut refs = self.inner.refs.lock().await;
            self.teardown_refs(&mut refs).await;
        }
        self.set_status(VoiceStatus::Error);
        self.add_message(MSG_CONNECT_FAILED, MessageKind::Assistant);
    }

    /// Degraded mode: report connected with a synthetic session marker so the
    /// text input stays usable, and greet once.
    async fn enter_simulated(&self) {
        self.inner.refs.lock().await.session = Some(SessionHandle::Simulated);
        self.inner.session_active.store(true, Ordering::SeqCst);
        self.set_status(VoiceStatus::Connected);
        self.add_message(MSG_SIM_GREETING, MessageKind::Assistant);
    }

    /// Build the event callbacks for a realtime session.
    ///
    /// Each callback captures the generation of the call attempt that created
    /// it; events arriving after a newer attempt (or a stop) are ignored.
    fn realtime_events(&self, generation: u64) -> RealtimeEvents {
        let weak = Arc::downgrade(&self.inner);

        let on_connect = {
            let weak = weak.clone();
            Arc::new(move || {
                let Some(inner) = weak.upgrade() else { return };
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                inner.session_active.store(true, Ordering::SeqCst);
                let controller = SessionController { inner };
                controller.set_status(VoiceStatus::Connected);
            }) as Arc<dyn Fn() + Send + Sync>
        };

        let on_disconnect = {
            let weak = weak.clone();
            Arc::new(move || {
                let Some(inner) = weak.upgrade() else { return };
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                inner.session_active.store(false, Ordering::SeqCst);
                let controller = SessionController { inner };
                controller.set_status(VoiceStatus::Idle);
            }) as Arc<dyn Fn() + Send + Sync>
        };

        let on_message = {
            let weak = weak.clone();
            Arc::new(move |source: MessageSource, text: String| {
                let Some(inner) = weak.upgrade() else { return };
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                if !inner.session_active.load(Ordering::SeqCst) {
                    debug!("Ignoring transcript event, session not active");
                    return;
                }
                let kind = match source {
                    MessageSource::User => MessageKind::User,
                    MessageSource::Assistant => MessageKind::Assistant,
                };
                let controller = SessionController { inner };
                controller.add_message(&text, kind);
            }) as Arc<dyn Fn(MessageSource, String) + Send + Sync>
        };

        let on_error = {
            Arc::new(move |e: super::errors::RealtimeError| {
                let Some(inner) = weak.upgrade() else { return };
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                let controller = SessionController { inner };
                if e.is_transient() {
                    // The transport retries its own socket; just inform.
                    info!(error = %e, "Transient transport error, keeping session");
                    controller.add_message(MSG_RECONNECTING, MessageKind::Assistant);
                    return;
                }
                error!(error = %e, "Fatal transport error, tearing down session");
                controller
                    .inner
                    .session_active
                    .store(false, Ordering::SeqCst);
                controller.set_status(VoiceStatus::Error);
                controller.add_message(MSG_FATAL_TRANSPORT, MessageKind::Assistant);
                tokio::spawn(async move {
                    let mut refs = controller.inner.refs.lock().await;
                    controller.teardown_refs(&mut refs).await;
                });
            }) as Arc<dyn Fn(super::errors::RealtimeError) + Send + Sync>
        };

        RealtimeEvents {
            on_connect,
            on_disconnect,
            on_message,
            on_error,
        }
    }
}

/// Keeps the typing flag true for exactly the lifetime of a backend chat
/// round-trip. Clearing happens in `Drop` so no exit path can leave it set.
struct TypingGuard {
    controller: SessionController,
}

impl TypingGuard {
    fn engage(controller: &SessionController) -> Self {
        controller.set_typing(true);
        Self {
            controller: controller.clone(),
        }
    }
}

impl Drop for TypingGuard {
    fn drop(&mut self) {
        self.controller.set_typing(false);
    }
}

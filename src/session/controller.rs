use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::config::{CapturePolicy, SessionConfig};
use super::state::{SessionState, SessionStatus, Trigger};
use super::stats::{LatencyMetrics, SessionReport, SessionStats, TranscriptEntry};
use crate::audio::{AudioFrame, AudioSink, AudioStreamSource, CaptureDevice, OutputClock};
use crate::capture::{AudioChunk, CapturePipeline};
use crate::codec;
use crate::lipsync::{LipSyncTimeline, VisemeWeight};
use crate::playback::{PlaybackEvent, PlaybackPipeline};
use crate::transport::{AlignmentPayload, Channel, ClientMessage, Connector, ServerMessage, Speaker};

/// Requests from the UI side while a session runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// The candidate finished answering
    EndTurn,
    /// The candidate interrupts the interviewer
    BargeIn,
    End { reason: String },
}

/// Injected resources, scoped to one session
pub struct SessionResources {
    pub connector: Arc<dyn Connector>,
    pub device: Arc<dyn CaptureDevice>,
    pub clock: Arc<dyn OutputClock>,
    pub sink: Box<dyn AudioSink>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    chunks_sent: u64,
    chunks_suppressed: u64,
    chunks_received: u64,
    decode_failures: u64,
}

/// Drives one interview session
///
/// Owns the channel, the state machine and the capture/playback/lip-sync
/// pipelines. Everything runs on a single dispatch loop; other components
/// talk to it only through a [`SessionHandle`].
pub struct SessionController {
    config: SessionConfig,
    state: SessionState,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn OutputClock>,
    capture: CapturePipeline,
    playback: PlaybackPipeline,
    lipsync: LipSyncTimeline,
    outbound: Option<mpsc::Sender<ClientMessage>>,
    commands: mpsc::Receiver<SessionCommand>,
    remote_tap: Option<mpsc::Sender<AudioFrame>>,
    counters: Counters,
    /// Speech still in flight after a barge-in is dropped until the next turn
    discard_speech: bool,
    started_at: chrono::DateTime<Utc>,
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
    metrics: Arc<Mutex<LatencyMetrics>>,
    status_tx: watch::Sender<SessionStats>,
    visemes_tx: watch::Sender<Vec<VisemeWeight>>,
}

impl SessionController {
    /// Create a controller and the handle used to talk to it
    pub fn new(config: SessionConfig, resources: SessionResources) -> (Self, SessionHandle) {
        let SessionResources {
            connector,
            device,
            clock,
            sink,
        } = resources;

        let state = SessionState::new(config.session_id.clone(), config.interview_id.clone());
        let capture = CapturePipeline::new(device, config.capture_config());
        let playback = PlaybackPipeline::new(Arc::clone(&clock), sink, config.playback_config());

        let (commands_tx, commands_rx) = mpsc::channel(32);
        let transcript = Arc::new(Mutex::new(Vec::new()));
        let metrics = Arc::new(Mutex::new(LatencyMetrics::default()));
        let started_at = Utc::now();

        let initial = SessionStats {
            session_id: config.session_id.clone(),
            interview_id: config.interview_id.clone(),
            status: SessionStatus::Idle,
            error: None,
            started_at,
            duration_secs: 0.0,
            chunks_sent: 0,
            chunks_suppressed: 0,
            chunks_received: 0,
            decode_failures: 0,
            transcript_entries: 0,
        };
        let (status_tx, status_rx) = watch::channel(initial);
        let (visemes_tx, visemes_rx) = watch::channel(vec![VisemeWeight::silence()]);

        let handle = SessionHandle {
            commands: commands_tx,
            status: status_rx,
            visemes: visemes_rx,
            transcript: Arc::clone(&transcript),
            metrics: Arc::clone(&metrics),
        };

        let controller = Self {
            config,
            state,
            connector,
            clock,
            capture,
            playback,
            lipsync: LipSyncTimeline::new(),
            outbound: None,
            commands: commands_rx,
            remote_tap: None,
            counters: Counters::default(),
            discard_speech: false,
            started_at,
            transcript,
            metrics,
            status_tx,
            visemes_tx,
        };

        (controller, handle)
    }

    /// Copy every played speech buffer to `tap` (for the mixed recording)
    pub fn with_remote_audio_tap(mut self, tap: mpsc::Sender<AudioFrame>) -> Self {
        self.remote_tap = Some(tap);
        self
    }

    /// Run on a background task
    pub fn spawn(self) -> JoinHandle<Result<SessionReport>> {
        tokio::spawn(self.run())
    }

    /// Run the session to completion
    ///
    /// Failures end the session in the `error` state and are reported in
    /// the returned stats rather than as an `Err`.
    pub async fn run(mut self) -> Result<SessionReport> {
        info!(
            "Starting interview session {} (interview {})",
            self.config.session_id, self.config.interview_id
        );

        self.transition(Trigger::Start);

        let Channel {
            outbound,
            mut inbound,
        } = match self.connector.connect().await {
            Ok(channel) => channel,
            Err(e) => {
                self.fail(format!("Could not connect to {}: {:#}", self.connector.endpoint(), e));
                return Ok(self.finish().await);
            }
        };
        self.outbound = Some(outbound);

        let start = ClientMessage::Start {
            session_id: self.config.session_id.clone(),
            interview_id: self.config.interview_id.clone(),
        };
        if let Err(e) = self.send(start).await {
            self.fail(format!("Could not start session: {:#}", e));
            return Ok(self.finish().await);
        }

        let mut ticker = tokio::time::interval(self.config.render_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.state.status().is_terminal() {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => self.handle_server_message(message).await,
                    None => self.fail("Connection to the interview backend was lost".to_string()),
                },
                chunk = self.capture.next_chunk(), if self.capture.is_capturing() => match chunk {
                    Some(chunk) => self.forward_chunk(chunk).await,
                    None => self.fail("Microphone stream ended".to_string()),
                },
                _ = ticker.tick() => self.on_tick(),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => self.end("client_closed").await,
                },
            }
        }

        Ok(self.finish().await)
    }

    /// Dispatch one inbound message
    pub async fn handle_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::SessionReady { .. } => {
                if self.transition(Trigger::SessionReady) {
                    self.start_capture().await;
                }
            }

            ServerMessage::Transcript {
                speaker,
                text,
                is_final,
            } => {
                self.record_transcript(speaker, text, is_final).await;
                if speaker == Speaker::User && is_final {
                    self.finish_user_turn();
                }
            }

            ServerMessage::TtsChunk { audio_b64, align } => {
                self.counters.chunks_received += 1;
                self.play_speech(&audio_b64, align.as_ref()).await;
            }

            ServerMessage::AnswerEnd {} => {
                debug!("Backend finished answering");
                self.discard_speech = false;
                if !self.playback.is_active() {
                    self.transition(Trigger::AnswerEndedWithoutAudio);
                }
            }

            ServerMessage::Notice { msg } => {
                info!("Backend notice: {}", msg);
            }

            ServerMessage::ErrorMessage { message } => {
                error!("Backend reported an error: {}", message);
                self.fail(message);
            }

            ServerMessage::Metrics { latency } => {
                debug!("Latency report: {:?}", latency);
                self.metrics.lock().await.replace(latency);
            }

            ServerMessage::Unknown => {
                debug!("Ignoring unknown server event");
            }
        }

        self.publish_status();
    }

    /// Dispatch one UI command
    pub async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::EndTurn => {
                if self.state.status() != SessionStatus::Listening {
                    debug!("End of turn ignored while {}", self.state.status().label());
                    return;
                }
                match self.send(ClientMessage::UserTurnEnd {}).await {
                    Ok(()) => self.finish_user_turn(),
                    Err(e) => self.fail(format!("Could not end turn: {:#}", e)),
                }
            }
            SessionCommand::BargeIn => self.barge_in().await,
            SessionCommand::End { reason } => self.end(&reason).await,
        }

        self.publish_status();
    }

    /// Interrupt the interviewer
    ///
    /// Tells the backend to stop generating, then empties the playback
    /// schedule, then clears the lip-sync timeline. If the backend cannot be
    /// told, nothing local changes.
    pub async fn barge_in(&mut self) {
        let status = self.state.status();
        if !matches!(status, SessionStatus::Speaking | SessionStatus::Processing) {
            debug!("Barge-in ignored while {}", status.label());
            return;
        }

        if let Err(e) = self.send(ClientMessage::BargeIn {}).await {
            warn!("Barge-in not delivered: {:#}", e);
            return;
        }

        self.playback.stop();
        self.lipsync.clear();
        self.discard_speech = true;

        info!("Barge-in: playback stopped and lip-sync cleared");

        self.transition(Trigger::Interrupted);
        self.drain_playback_events();
        self.publish_visemes(vec![VisemeWeight::silence()]);
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn lipsync(&self) -> &LipSyncTimeline {
        &self.lipsync
    }

    pub fn playback(&self) -> &PlaybackPipeline {
        &self.playback
    }

    /// Advance time-driven state: playback end, lip-sync pruning, visemes
    pub fn on_tick(&mut self) {
        self.drain_playback_events();

        let now = self.clock.now();
        self.lipsync.prune(now);

        let visemes = if self.playback.is_active() {
            self.lipsync.current_visemes(now)
        } else {
            vec![VisemeWeight::silence()]
        };
        self.publish_visemes(visemes);
    }

    async fn start_capture(&mut self) {
        match self.capture.start().await {
            Ok(()) => {
                self.transition(Trigger::CaptureStarted);
            }
            Err(e) => {
                self.fail(format!("Microphone unavailable: {:#}", e));
            }
        }
    }

    async fn forward_chunk(&mut self, chunk: AudioChunk) {
        let status = self.state.status();
        let suppress = match status {
            SessionStatus::Speaking => self.config.capture_policy == CapturePolicy::SuspendWhileSpeaking,
            SessionStatus::Listening | SessionStatus::Processing => false,
            _ => true,
        };

        if suppress {
            self.counters.chunks_suppressed += 1;
            debug!("Withholding mic chunk {} while {}", chunk.seq, status.label());
        } else {
            let message = ClientMessage::MicChunk {
                seq: chunk.seq,
                audio_b64: chunk.encoded,
            };

            match self.send(message).await {
                Ok(()) => self.counters.chunks_sent += 1,
                Err(e) => self.fail(format!("Could not send audio: {:#}", e)),
            }
        }

        self.publish_status();
    }

    async fn play_speech(&mut self, audio_b64: &str, align: Option<&AlignmentPayload>) {
        if self.discard_speech {
            debug!("Dropping speech chunk received after barge-in");
            return;
        }

        let samples = match codec::decode_chunk(audio_b64) {
            Ok(samples) => samples,
            Err(e) => {
                self.counters.decode_failures += 1;
                warn!("Dropping undecodable speech chunk: {}", e);
                return;
            }
        };

        // Settle a schedule that ran dry before this chunk, so its end does
        // not clear the new utterance's alignment
        self.drain_playback_events();

        let scheduled = self.playback.play_samples(&samples);

        if let Some(align) = align {
            self.lipsync.add_alignment_data(&align.to_events(), scheduled.start);
        }

        if let Some(tap) = &self.remote_tap {
            if !samples.is_empty() {
                let frame = AudioFrame {
                    samples,
                    sample_rate: self.playback.sample_rate(),
                    channels: 1,
                    timestamp_ms: (Utc::now() - self.started_at).num_milliseconds().max(0) as u64,
                    source: AudioStreamSource::Remote,
                };
                if tap.try_send(frame).is_err() {
                    debug!("Recording tap full or closed; remote audio not mixed");
                }
            }
        }

        self.drain_playback_events();
    }

    async fn record_transcript(&mut self, speaker: Speaker, text: String, is_final: bool) {
        debug!("Transcript ({:?}, final={}): {}", speaker, is_final, text);

        let entry = TranscriptEntry {
            speaker,
            text,
            is_final,
            created_at: Utc::now(),
        };
        self.transcript.lock().await.push(entry);
    }

    fn finish_user_turn(&mut self) {
        if self.transition(Trigger::UserTurnFinished) {
            self.discard_speech = false;
        }
    }

    fn drain_playback_events(&mut self) {
        while let Some(event) = self.playback.poll() {
            match event {
                PlaybackEvent::Started { at } => {
                    debug!("Utterance starts at {:.3}s", at.as_secs_f64());
                    self.transition(Trigger::PlaybackStarted);
                }
                PlaybackEvent::Ended => {
                    self.lipsync.clear();
                    self.transition(Trigger::PlaybackEnded);
                }
            }
        }
    }

    async fn end(&mut self, reason: &str) {
        if self.state.status().is_terminal() {
            return;
        }

        info!("Ending session {}: {}", self.config.session_id, reason);

        if let Err(e) = self
            .send(ClientMessage::End {
                reason: reason.to_string(),
            })
            .await
        {
            warn!("End message not delivered: {:#}", e);
        }

        self.transition(Trigger::End);
    }

    fn fail(&mut self, message: String) {
        error!("Session {} failed: {}", self.config.session_id, message);
        self.transition(Trigger::Fail(message));
    }

    async fn send(&mut self, message: ClientMessage) -> Result<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| anyhow!("Channel is not open"))?;

        let event = message.event_name();
        outbound
            .send(message)
            .await
            .map_err(|_| anyhow!("Channel closed while sending {}", event))
    }

    fn transition(&mut self, trigger: Trigger) -> bool {
        let changed = self.state.apply(trigger);
        if changed {
            self.publish_status();
        }
        changed
    }

    fn publish_status(&self) {
        let stats = self.stats(self.transcript_len());
        self.status_tx.send_replace(stats);
    }

    fn publish_visemes(&self, visemes: Vec<VisemeWeight>) {
        self.visemes_tx.send_if_modified(|current| {
            if *current == visemes {
                false
            } else {
                *current = visemes;
                true
            }
        });
    }

    fn transcript_len(&self) -> usize {
        self.transcript.try_lock().map(|t| t.len()).unwrap_or_else(|_| {
            self.status_tx.borrow().transcript_entries
        })
    }

    fn stats(&self, transcript_entries: usize) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            session_id: self.state.session_id.clone(),
            interview_id: self.state.interview_id.clone(),
            status: self.state.status(),
            error: self.state.error().map(str::to_string),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_sent: self.counters.chunks_sent,
            chunks_suppressed: self.counters.chunks_suppressed,
            chunks_received: self.counters.chunks_received,
            decode_failures: self.counters.decode_failures,
            transcript_entries,
        }
    }

    /// Release pipelines and the channel, then build the report
    async fn finish(&mut self) -> SessionReport {
        self.capture.dispose();
        self.playback.stop();
        while self.playback.poll().is_some() {}
        self.lipsync.clear();
        self.publish_visemes(vec![VisemeWeight::silence()]);
        self.outbound = None;
        self.remote_tap = None;

        let transcript = self.transcript.lock().await.clone();
        let metrics = self.metrics.lock().await.clone();
        let stats = self.stats(transcript.len());
        self.status_tx.send_replace(stats.clone());

        info!(
            "Session {} finished as {} ({} chunks sent, {} received)",
            stats.session_id,
            stats.status.label(),
            stats.chunks_sent,
            stats.chunks_received
        );

        SessionReport {
            stats,
            transcript,
            metrics,
        }
    }
}

/// Cloneable access to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionStats>,
    visemes: watch::Receiver<Vec<VisemeWeight>>,
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
    metrics: Arc<Mutex<LatencyMetrics>>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("Session is not running"))
    }

    pub async fn end_turn(&self) -> Result<()> {
        self.send(SessionCommand::EndTurn).await
    }

    pub async fn barge_in(&self) -> Result<()> {
        self.send(SessionCommand::BargeIn).await
    }

    pub async fn end(&self, reason: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::End {
            reason: reason.into(),
        })
        .await
    }

    /// Latest published stats
    pub fn stats(&self) -> SessionStats {
        self.status.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().status
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Wait until the session reaches `status` (or a terminal state)
    pub async fn wait_for(&self, status: SessionStatus) -> SessionStatus {
        let mut rx = self.status.clone();
        let reached = match rx
            .wait_for(|stats| stats.status == status || stats.status.is_terminal())
            .await
        {
            Ok(stats) => stats.status,
            Err(_) => self.status.borrow().status,
        };
        reached
    }

    /// Viseme targets for the renderer, updated at the render rate
    pub fn visemes(&self) -> watch::Receiver<Vec<VisemeWeight>> {
        self.visemes.clone()
    }

    pub async fn get_transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().await.clone()
    }

    pub async fn get_metrics(&self) -> LatencyMetrics {
        self.metrics.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ChannelDevice, ManualClock, NullSink};
    use crate::transport::MemoryConnector;
    use std::time::Duration;

    fn speaking_payload() -> ServerMessage {
        ServerMessage::TtsChunk {
            audio_b64: codec::encode_chunk(&vec![0.1f32; 12000]),
            align: Some(AlignmentPayload {
                chars: vec!["h".into(), "i".into()],
                char_start_times_ms: vec![0.0, 200.0],
                char_durations_ms: vec![200.0, 300.0],
            }),
        }
    }

    /// Controller wired to an outbound channel, already in `listening`
    async fn listening() -> (SessionController, mpsc::Receiver<ClientMessage>, ManualClock) {
        let (connector, _backend) = MemoryConnector::pair();
        let clock = ManualClock::new();
        let (mut controller, _handle) = SessionController::new(
            SessionConfig::new("iv-1"),
            SessionResources {
                connector: Arc::new(connector),
                device: Arc::new(ChannelDevice::new(48000, 1)),
                clock: Arc::new(clock.clone()),
                sink: Box::new(NullSink),
            },
        );

        let (tx, rx) = mpsc::channel(16);
        controller.outbound = Some(tx);
        controller.transition(Trigger::Start);
        controller
            .handle_server_message(ServerMessage::SessionReady { session_id: None })
            .await;
        assert_eq!(controller.status(), SessionStatus::Listening);

        (controller, rx, clock)
    }

    #[tokio::test]
    async fn test_barge_in_clears_timeline_and_playback() {
        let (mut controller, mut rx, _clock) = listening().await;

        controller
            .handle_server_message(ServerMessage::Transcript {
                speaker: Speaker::User,
                text: "done".into(),
                is_final: true,
            })
            .await;
        assert_eq!(controller.status(), SessionStatus::Processing);

        controller.handle_server_message(speaking_payload()).await;
        assert_eq!(controller.status(), SessionStatus::Speaking);
        assert_eq!(controller.lipsync().len(), 2);
        assert!(controller.playback().is_active());

        controller.barge_in().await;

        assert_eq!(rx.recv().await, Some(ClientMessage::BargeIn {}));
        assert!(controller.lipsync().is_empty());
        assert!(!controller.playback().is_active());
        assert_eq!(controller.playback().current_playback_time(), Duration::ZERO);
        assert_eq!(controller.status(), SessionStatus::Listening);

        // Speech still in flight from the interrupted answer is dropped
        controller.handle_server_message(speaking_payload()).await;
        assert!(!controller.playback().is_active());
        assert!(controller.lipsync().is_empty());
    }

    #[tokio::test]
    async fn test_failed_barge_in_changes_nothing() {
        let (mut controller, rx, _clock) = listening().await;
        controller.handle_server_message(speaking_payload()).await;
        assert_eq!(controller.status(), SessionStatus::Speaking);

        drop(rx);
        controller.barge_in().await;

        assert_eq!(controller.status(), SessionStatus::Speaking);
        assert!(controller.playback().is_active());
        assert_eq!(controller.lipsync().len(), 2);
    }

    #[tokio::test]
    async fn test_playback_end_returns_to_listening_and_clears_lipsync() {
        let (mut controller, _rx, clock) = listening().await;
        controller.handle_server_message(speaking_payload()).await;

        clock.set(Duration::from_millis(300));
        controller.on_tick();
        assert_eq!(controller.status(), SessionStatus::Speaking);
        assert_eq!(
            controller.visemes_tx.borrow().clone(),
            vec![VisemeWeight::full(crate::lipsync::Viseme::I)]
        );

        clock.set(Duration::from_millis(550));
        controller.on_tick();
        assert_eq!(controller.status(), SessionStatus::Listening);
        assert!(controller.lipsync().is_empty());
        assert_eq!(
            controller.visemes_tx.borrow().clone(),
            vec![VisemeWeight::silence()]
        );
    }

    #[tokio::test]
    async fn test_run_future_can_be_spawned() {
        fn assert_send<T: Send>(_: &T) {}

        let (controller, _rx, _clock) = listening().await;
        let run = controller.run();
        assert_send(&run);
    }

    #[tokio::test]
    async fn test_next_utterance_after_dry_schedule_keeps_alignment() {
        let (mut controller, _rx, clock) = listening().await;
        controller.handle_server_message(speaking_payload()).await;

        // First utterance ran out at 550ms but no tick has seen it yet
        clock.set(Duration::from_millis(551));
        controller.handle_server_message(speaking_payload()).await;

        assert_eq!(controller.status(), SessionStatus::Speaking);
        assert!(controller.playback().is_active());
        assert_eq!(controller.lipsync().len(), 2);

        // Inside the first window of the new utterance (601ms..801ms)
        clock.set(Duration::from_millis(700));
        controller.on_tick();
        assert_eq!(controller.status(), SessionStatus::Speaking);
        assert_ne!(
            controller.visemes_tx.borrow().clone(),
            vec![VisemeWeight::silence()]
        );
    }

    #[tokio::test]
    async fn test_heartbeat_speech_opens_and_closes_an_utterance() {
        let (mut controller, _rx, clock) = listening().await;

        controller
            .handle_server_message(ServerMessage::TtsChunk {
                audio_b64: String::new(),
                align: None,
            })
            .await;

        assert_eq!(controller.status(), SessionStatus::Speaking);
        assert!(controller.playback().is_active());
        assert_eq!(controller.counters.decode_failures, 0);

        // Nothing was scheduled past the lookahead
        clock.set(Duration::from_millis(50));
        controller.on_tick();
        assert_eq!(controller.status(), SessionStatus::Listening);
        assert!(!controller.playback().is_active());
    }

    #[tokio::test]
    async fn test_suppressed_chunks_leave_sequence_gaps() {
        let (mut controller, mut rx, _clock) = listening().await;

        let chunk = |seq| AudioChunk {
            seq,
            samples: vec![0; 4],
            encoded: codec::encode_pcm16(&[0; 4]),
        };

        controller.forward_chunk(chunk(0)).await;
        controller.handle_server_message(speaking_payload()).await;
        controller.forward_chunk(chunk(1)).await;
        controller.barge_in().await;
        controller.forward_chunk(chunk(2)).await;

        let mut sent = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let ClientMessage::MicChunk { seq, .. } = message {
                sent.push(seq);
            }
        }
        assert_eq!(sent, vec![0, 2]);
        assert_eq!(controller.counters.chunks_suppressed, 1);
    }

    #[tokio::test]
    async fn test_undecodable_speech_is_counted_and_dropped() {
        let (mut controller, _rx, _clock) = listening().await;

        controller
            .handle_server_message(ServerMessage::TtsChunk {
                audio_b64: "%%%".into(),
                align: None,
            })
            .await;

        assert_eq!(controller.counters.decode_failures, 1);
        assert_eq!(controller.status(), SessionStatus::Listening);
        assert!(!controller.playback().is_active());
    }
}

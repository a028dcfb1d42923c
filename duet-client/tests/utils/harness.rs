use duet_client::{
    EngineConfig, EngineEvent, MediaSource, NegotiationEngine, SampleMediaSource, SignalSender,
    SimulatedTransport, SimulatedTransportFactory, TransportFactory,
};
use duet_core::{ClientEvent, ConnectionId, ParticipantId, ServerEvent, SignalingError};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::recording_sink::RecordingSink;

/// Rounds before `pump` gives up on the exchange settling.
pub const MAX_PUMP_ROUNDS: usize = 64;

/// One participant: an engine on simulated transports plus everything it emitted.
pub struct Peer {
    pub id: ConnectionId,
    pub email: ParticipantId,
    pub engine: NegotiationEngine,
    pub outbound: mpsc::UnboundedReceiver<ClientEvent>,
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
    pub transports: SimulatedTransportFactory,
    pub sink: Arc<RecordingSink>,
    /// Errors returned while handling relayed events.
    pub errors: Vec<SignalingError>,
}

impl Peer {
    pub fn new(email: &str) -> Self {
        Self::with_media(email, SampleMediaSource::new())
    }

    pub fn with_media(email: &str, media: impl MediaSource + 'static) -> Self {
        let transports = SimulatedTransportFactory::new();
        Self::build(email, media, transports.clone(), Arc::new(transports))
    }

    /// `opener` wraps `transports`; inspection still goes through the simulated transports.
    pub fn with_transports(
        email: &str,
        transports: SimulatedTransportFactory,
        opener: Arc<dyn TransportFactory>,
    ) -> Self {
        Self::build(email, SampleMediaSource::new(), transports, opener)
    }

    fn build(
        email: &str,
        media: impl MediaSource + 'static,
        transports: SimulatedTransportFactory,
        opener: Arc<dyn TransportFactory>,
    ) -> Self {
        let (signal, outbound) = SignalSender::channel();
        let sink = Arc::new(RecordingSink::default());

        let (engine, events) = NegotiationEngine::new(
            EngineConfig::default(),
            Arc::new(signal),
            Arc::new(media),
            opener,
        );

        Self {
            id: ConnectionId::new(),
            email: email.into(),
            engine: engine.with_sink(sink.clone()),
            outbound,
            events,
            transports,
            sink,
            errors: Vec::new(),
        }
    }

    pub fn transport_to(&self, peer: &ConnectionId) -> Arc<SimulatedTransport> {
        self.transports
            .latest_for(peer)
            .expect("no transport opened towards peer")
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn drain_outbound(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.outbound.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Two engines connected through the same rewrite the relay server applies.
pub struct Harness {
    pub a: Peer,
    pub b: Peer,
    /// (sender, kind) of every relayed event, in order.
    pub log: Vec<(ConnectionId, &'static str)>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_peers(Peer::new("a@x.com"), Peer::new("b@x.com"))
    }

    pub fn with_peers(a: Peer, b: Peer) -> Self {
        Self {
            a,
            b,
            log: Vec::new(),
        }
    }

    /// What the registry does when B joins after A: only A hears about it.
    pub async fn introduce(&mut self) {
        self.a
            .engine
            .handle_signal(ServerEvent::UserJoined {
                email: self.b.email.clone(),
                id: self.b.id,
            })
            .await
            .expect("user:joined is always accepted");
    }

    /// Introduce, call, and pump until both sides settle.
    pub async fn establish(&mut self) {
        self.introduce().await;
        self.a.engine.call_user().await.expect("call should start");
        self.pump().await;
    }

    /// Move events back and forth until nothing is left in flight.
    pub async fn pump(&mut self) {
        for _ in 0..MAX_PUMP_ROUNDS {
            let mut progress = 0;
            progress += self.a.engine.drain_transport_events().await;
            progress += deliver(&mut self.a, &mut self.b, &mut self.log).await;
            progress += self.b.engine.drain_transport_events().await;
            progress += deliver(&mut self.b, &mut self.a, &mut self.log).await;
            if progress == 0 {
                return;
            }
        }
        panic!("signaling did not settle");
    }

    pub fn count(&self, from: ConnectionId, kind: &str) -> usize {
        self.log
            .iter()
            .filter(|(sender, k)| *sender == from && *k == kind)
            .count()
    }
}

async fn deliver(
    from: &mut Peer,
    to: &mut Peer,
    log: &mut Vec<(ConnectionId, &'static str)>,
) -> usize {
    let mut delivered = 0;
    for event in from.drain_outbound() {
        let kind = event.kind();
        let Ok(relayed) = event.into_relayed(from.id) else {
            // room:join / room:leave belong to the registry.
            continue;
        };
        log.push((from.id, kind));
        delivered += 1;

        if relayed.to == to.id {
            if let Err(e) = to.engine.handle_signal(relayed.event).await {
                to.errors.push(e);
            }
        } else {
            let failed = ServerEvent::CallFailed {
                peer: relayed.to,
                reason: "peer left".into(),
            };
            if let Err(e) = from.engine.handle_signal(failed).await {
                from.errors.push(e);
            }
        }
    }
    delivered
}

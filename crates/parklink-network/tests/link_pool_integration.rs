//! Integration tests for DeviceLink and LinkPool
//!
//! Links talk over real TCP to an agent served on mock hardware, or to
//! hand-rolled peers that misbehave on purpose.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parklink_agent::{AgentConfig, AgentServer, DeviceAgent};
use parklink_core::DeviceEndpoint;
use parklink_hardware::mock::MockBoard;
use parklink_network::{
    BarrierReaction, CommandOutcome, ConnectionState, DeviceLink, InputEvent, LinkConfig,
    LinkFault, LinkPool, OutcomeStatus, PoolConfig, StatusPoller,
};
use parklink_protocol::{AgentCodec, Command, HttpResponse, Reply, StatusSnapshot};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

async fn start_agent_on(bind_addr: SocketAddr) -> (SocketAddr, MockBoard) {
    let config = AgentConfig {
        bind_addr,
        sample_period: Duration::from_millis(5),
        ..AgentConfig::default()
    };
    let (board, mock) = MockBoard::build(config.debounce).unwrap();
    let agent = DeviceAgent::new(board).unwrap();
    let server = AgentServer::bind(config, agent).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    (addr, mock)
}

async fn start_agent() -> (SocketAddr, MockBoard) {
    start_agent_on("127.0.0.1:0".parse().unwrap()).await
}

/// Address nothing listens on.
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn endpoint(addr: SocketAddr, timeout: Duration) -> DeviceEndpoint {
    DeviceEndpoint::new(addr.ip().to_string(), addr.port(), timeout).unwrap()
}

fn link(addr: SocketAddr) -> DeviceLink {
    DeviceLink::with_config(
        endpoint(addr, Duration::from_secs(2)),
        LinkConfig {
            check_timeout: Duration::from_secs(1),
        },
    )
}

#[tokio::test]
async fn test_pool_with_one_reachable_device() {
    let (up, _mock) = start_agent().await;
    let down = closed_addr().await;

    let mut pool = LinkPool::from_endpoints(
        [
            endpoint(up, Duration::from_secs(2)),
            endpoint(down, Duration::from_secs(2)),
        ],
        LinkConfig::default(),
        PoolConfig {
            activation_pause: Duration::from_millis(10),
        },
        None,
    );

    assert_eq!(
        pool.activate_all().await,
        BTreeMap::from([(0, true), (1, false)])
    );

    let statuses = pool.fetch_all_statuses().await;
    assert_eq!(statuses.len(), 2);
    let snapshot = statuses[&0].as_ref().unwrap();
    assert_eq!(snapshot.leds, vec![0, 1]);
    assert!(statuses[&1].is_none());

    assert_eq!(pool.check_all().await, BTreeMap::from([(0, true), (1, false)]));
    assert!(pool.get(0).unwrap().is_connected());
    assert_eq!(pool.get(1).unwrap().state(), ConnectionState::Disconnected);
    assert!(pool.get(2).is_none());
    assert!(pool.get(-1).is_none());

    pool.deactivate_all();
    assert_eq!(pool.check_all().await, BTreeMap::from([(0, false), (1, false)]));
}

#[tokio::test]
async fn test_check_recovers_after_endpoint_comes_up() {
    let addr = closed_addr().await;
    let mut link = link(addr);

    assert!(!link.activate().await);
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert!(link.connection_state_text().starts_with("Error: "));

    start_agent_on(addr).await;
    assert!(link.check_connection().await);
    assert_eq!(link.state(), ConnectionState::Connected);
    assert_eq!(link.connection_state_text(), "Connected");
    assert!(link.last_error().is_none());
}

#[tokio::test]
async fn test_commands_reach_the_board() {
    let (addr, mock) = start_agent().await;
    let mut link = link(addr);
    assert!(link.activate().await);

    assert!(link.occupy_space(1).await);
    assert!(mock.indicators[0].level());
    assert!(!mock.indicators[1].level());

    assert!(link.update_display(7).await);
    assert!(link.move_actuator(90).await);
    assert!(link.set_indicator(1, true).await);

    let status = link.fetch_status().await.unwrap();
    assert_eq!(status.display, 7);
    assert_eq!(status.servo, 90);
    assert_eq!(status.leds, vec![1, 1]);
    assert_eq!(link.last_status(), Some(&status));
    assert!(link.last_contact().is_some());
}

#[tokio::test]
async fn test_toggle_barrier_outcome_carries_angle() {
    let (addr, _mock) = start_agent().await;
    let mut link = link(addr);
    link.activate().await;

    let outcome = link.send_command(&Command::toggle_barrier()).await;
    assert_eq!(outcome.status, OutcomeStatus::Ok);
    assert_eq!(outcome.extra_i64("servo"), Some(90));
    assert!(link.toggle_barrier().await);
    assert_eq!(link.fetch_status().await.unwrap().servo, 0);
}

#[tokio::test]
async fn test_unknown_action_is_protocol_error() {
    let (addr, _mock) = start_agent().await;
    let mut link = link(addr);
    link.activate().await;

    let outcome = link.send_command(&Command::named("foo")).await;
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.fault, Some(LinkFault::Protocol));
    assert_eq!(outcome.http_status, Some(400));
    assert_eq!(outcome.message.as_deref(), Some("accion desconocida"));

    assert_eq!(link.last_error(), Some("HTTP 400"));
    assert_eq!(link.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_error_reply_with_success_status_sets_last_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, AgentCodec::new());
        framed.next().await.unwrap().unwrap();
        framed
            .send(HttpResponse::json(200, &StatusSnapshot::default()).unwrap())
            .await
            .unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, AgentCodec::new());
        framed.next().await.unwrap().unwrap();
        framed
            .send(HttpResponse::json(200, &Reply::error("servo bloqueado")).unwrap())
            .await
            .unwrap();
    });

    let mut link = link(addr);
    assert!(link.activate().await);
    assert!(link.last_error().is_none());

    let outcome = link.send_command(&Command::move_actuator(90)).await;
    assert_eq!(outcome.status, OutcomeStatus::Error);
    assert_eq!(outcome.fault, Some(LinkFault::Protocol));
    assert_eq!(outcome.http_status, Some(200));
    assert_eq!(link.last_error(), Some("servo bloqueado"));
    assert_eq!(link.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_endpoint_going_away_demotes_link() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let peer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, AgentCodec::new());
        framed.next().await.unwrap().unwrap();
        framed
            .send(HttpResponse::json(200, &StatusSnapshot::default()).unwrap())
            .await
            .unwrap();
    });

    let mut link = link(addr);
    assert!(link.activate().await);
    peer.await.unwrap();

    let outcome = link.send_command(&Command::occupy(0)).await;
    assert_eq!(outcome.status, OutcomeStatus::Unreachable);
    assert_eq!(outcome.fault, Some(LinkFault::Unreachable));
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert!(link.connection_state_text().contains(link.last_error().unwrap()));
}

#[tokio::test]
async fn test_timeout_leaves_state_unchanged() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Answer the activation probe.
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, AgentCodec::new());
        framed.next().await.unwrap().unwrap();
        framed
            .send(HttpResponse::json(200, &StatusSnapshot::default()).unwrap())
            .await
            .unwrap();

        // Then read requests and never answer.
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, AgentCodec::new());
        let _ = framed.next().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let mut link = DeviceLink::new(endpoint(addr, Duration::from_millis(200)));
    assert!(link.activate().await);

    let outcome = link.send_command(&Command::update_display(1)).await;
    assert_eq!(outcome.status, OutcomeStatus::Timeout);
    assert_eq!(outcome.fault, Some(LinkFault::Timeout));
    assert_eq!(link.last_error(), Some("Timeout"));
    assert_eq!(link.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_success_with_unparseable_body() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for body in ["{}", "OK"] {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, AgentCodec::new());
            framed.next().await.unwrap().unwrap();
            framed
                .send(HttpResponse::new(200, body.as_bytes().to_vec()))
                .await
                .unwrap();
        }
    });

    let mut link = link(addr);
    assert!(link.activate().await);

    let outcome: CommandOutcome = link.send_command(&Command::toggle_barrier()).await;
    assert_eq!(outcome.status, OutcomeStatus::Ok);
    assert_eq!(outcome.fault, Some(LinkFault::MalformedResponse));
    assert_eq!(outcome.raw_body.as_deref(), Some("OK"));
}

#[tokio::test]
async fn test_poller_reacts_to_entry_press() {
    let (addr, mock) = start_agent().await;
    let mut pool = LinkPool::new(vec![link(addr)], PoolConfig::default());
    pool.activate_all().await;

    mock.clock.set(1_000);
    mock.entry.press();

    let poller = StatusPoller::new(Duration::from_millis(50));
    let reports = poller
        .poll_and_dispatch(&mut pool, &mut BarrierReaction)
        .await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].events, vec![InputEvent::EntryPressed]);

    let link = pool.get_mut(0).unwrap();
    let status = link.fetch_status().await.unwrap();
    assert_eq!(status.leds, vec![1, 0]);
    assert_eq!(status.servo, 90);

    // Exit press, outside the debounce window of anything before it.
    mock.entry.release();
    mock.exit.press();
    mock.clock.advance(Duration::from_millis(500));
    let reports = poller
        .poll_and_dispatch(&mut pool, &mut BarrierReaction)
        .await;
    assert_eq!(reports[0].events, vec![InputEvent::ExitPressed]);

    let status = pool.get_mut(0).unwrap().fetch_status().await.unwrap();
    assert_eq!(status.leds, vec![0, 1]);
    assert_eq!(status.servo, 0);
}

#[tokio::test]
async fn test_poller_run_stops_on_shutdown() {
    let (addr, _mock) = start_agent().await;
    let mut pool = LinkPool::new(vec![link(addr)], PoolConfig::default());
    pool.activate_all().await;

    let poller = StatusPoller::new(Duration::from_millis(10));
    poller
        .run(
            &mut pool,
            &mut BarrierReaction,
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;

    assert!(pool.get(0).unwrap().last_status().is_some());
}

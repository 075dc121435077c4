//! E2E Test: Send Across the Negotiation Matrix
//!
//! Runs one send exchange for every combination of client and server
//! capability:
//! - Client and server each either speak only their basic identifier or
//!   additionally prefer the delimited identifier.
//! - Either side's basic identifier may itself be the delimited one
//!   (a node that dropped raw framing entirely).
//!
//! For each viable combination the test verifies both dispatcher
//! outcomes: a handler error stays local while the send still succeeds,
//! and a clean request succeeds on both sides. The two impossible
//! combinations must fail with the stable "protocols not supported"
//! rendering.

use {
    quorate_e2e_tests::helpers::*,
    quorate_p2p::{register_handler, send, HandlerReply, PeerId, ProtocolId, SendRecvConfig},
    std::time::Duration,
    tokio::{sync::mpsc, time::timeout},
};

// ─────────────────────────────────────────────────────────────────────────────
// Matrix
// ─────────────────────────────────────────────────────────────────────────────

struct MatrixCase {
    name: &'static str,
    delimited_client: bool,
    delimited_server: bool,
    client_basic: &'static str,
    server_basic: &'static str,
}

fn matrix() -> Vec<MatrixCase> {
    vec![
        MatrixCase {
            name: "non-delimited client and server",
            delimited_client: false,
            delimited_server: false,
            client_basic: DUTY_PROTOCOL,
            server_basic: DUTY_PROTOCOL,
        },
        MatrixCase {
            name: "delimited client and server",
            delimited_client: true,
            delimited_server: true,
            client_basic: DUTY_PROTOCOL,
            server_basic: DUTY_PROTOCOL,
        },
        MatrixCase {
            name: "delimited client and non-delimited server",
            delimited_client: true,
            delimited_server: false,
            client_basic: DUTY_PROTOCOL,
            server_basic: DUTY_PROTOCOL,
        },
        MatrixCase {
            name: "non-delimited client and delimited server",
            delimited_client: false,
            delimited_server: true,
            client_basic: DUTY_PROTOCOL,
            server_basic: DUTY_PROTOCOL,
        },
        MatrixCase {
            name: "delimited only client and delimited server",
            delimited_client: true,
            delimited_server: true,
            client_basic: DUTY_PROTOCOL_DELIMITED,
            server_basic: DUTY_PROTOCOL,
        },
        MatrixCase {
            name: "delimited client and delimited only server",
            delimited_client: true,
            delimited_server: true,
            client_basic: DUTY_PROTOCOL,
            server_basic: DUTY_PROTOCOL_DELIMITED,
        },
        MatrixCase {
            name: "delimited only client and delimited only server",
            delimited_client: true,
            delimited_server: true,
            client_basic: DUTY_PROTOCOL_DELIMITED,
            server_basic: DUTY_PROTOCOL_DELIMITED,
        },
        MatrixCase {
            name: "delimited only client and non-delimited server, protocols not supported",
            delimited_client: true,
            delimited_server: false,
            client_basic: DUTY_PROTOCOL_DELIMITED,
            server_basic: DUTY_PROTOCOL,
        },
        MatrixCase {
            name: "non-delimited client and delimited only server, protocols not supported",
            delimited_client: false,
            delimited_server: true,
            client_basic: DUTY_PROTOCOL,
            server_basic: DUTY_PROTOCOL_DELIMITED,
        },
    ]
}

// ─────────────────────────────────────────────────────────────────────────────
// Test: every matrix combination behaves as negotiated
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_matrix() {
    init_logging();

    for case in matrix() {
        log::info!("matrix case: {}", case.name);
        run_case(&case).await;
    }
}

async fn run_case(case: &MatrixCase) {
    let name = case.name;
    let delimited_id = ProtocolId::new(DUTY_PROTOCOL_DELIMITED);
    let (server, client) = host_pair().await;

    let server_config = if case.delimited_server {
        SendRecvConfig::with_delimited_protocol(delimited_id.clone())
    } else {
        SendRecvConfig::default()
    };
    let client_config = if case.delimited_client {
        SendRecvConfig::with_delimited_protocol(delimited_id)
    } else {
        SendRecvConfig::default()
    };

    // Handler completions report (peer, verdict) back here so assertions
    // run in the test task rather than inside the handler.
    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<(PeerId, Option<String>)>();

    register_handler(
        "duty",
        &server,
        ProtocolId::new(case.server_basic),
        move |peer, req: SlotRequest| {
            let report_tx = report_tx.clone();
            async move {
                log::info!("server handling duty request for slot {}", req.slot);
                let mut reply = HandlerReply::<()>::ack();
                let mut verdict = None;
                if req.slot < 0 {
                    let err = anyhow::anyhow!("negative slot {}", req.slot);
                    verdict = Some(err.to_string());
                    reply = reply.with_local_error(err);
                }
                report_tx.send((peer, verdict)).expect("report outcome");
                reply
            }
        },
        &server_config,
    )
    .expect("register duty handler");

    let unsupported = (case.client_basic == DUTY_PROTOCOL_DELIMITED && !case.delimited_server)
        || (case.server_basic == DUTY_PROTOCOL_DELIMITED && !case.delimited_client);

    if unsupported {
        let result = send(
            &client,
            ProtocolId::new(case.client_basic),
            server.identity(),
            &SlotRequest { slot: 100 },
            &client_config,
        )
        .await;
        let Err(err) = result else {
            panic!("{name}: send succeeded without a common protocol");
        };
        assert!(
            err.to_string().contains("protocols not supported"),
            "{name}: unexpected error: {err}"
        );
        assert!(
            report_rx.try_recv().is_err(),
            "{name}: handler must not run without a common protocol"
        );
        assert_eq!(client.metrics().snapshot().negotiation_rejects, 1);
        return;
    }

    // A handler error stays local: the send still succeeds on the wire.
    send(
        &client,
        ProtocolId::new(case.client_basic),
        server.identity(),
        &SlotRequest { slot: -1 },
        &client_config,
    )
    .await
    .unwrap_or_else(|e| panic!("{name}: send failed: {e}"));

    let (peer, verdict) = next_report(&mut report_rx, name).await;
    assert_eq!(peer, client.identity(), "{name}: handler saw wrong peer");
    let err_text = verdict.unwrap_or_else(|| panic!("{name}: expected a local handler error"));
    assert!(
        err_text.contains("negative slot"),
        "{name}: unexpected verdict: {err_text}"
    );

    // A valid slot succeeds on both sides.
    send(
        &client,
        ProtocolId::new(case.client_basic),
        server.identity(),
        &SlotRequest { slot: 100 },
        &client_config,
    )
    .await
    .unwrap_or_else(|e| panic!("{name}: send failed: {e}"));

    let (peer, verdict) = next_report(&mut report_rx, name).await;
    assert_eq!(peer, client.identity(), "{name}: handler saw wrong peer");
    assert!(
        verdict.is_none(),
        "{name}: unexpected handler error: {verdict:?}"
    );
    assert_eq!(server.metrics().snapshot().handler_errors, 1);
}

async fn next_report(
    report_rx: &mut mpsc::UnboundedReceiver<(PeerId, Option<String>)>,
    name: &str,
) -> (PeerId, Option<String>) {
    timeout(Duration::from_secs(2), report_rx.recv())
        .await
        .unwrap_or_else(|_| panic!("{name}: timed out waiting for handler report"))
        .unwrap_or_else(|| panic!("{name}: handler report channel closed"))
}

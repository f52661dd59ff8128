//! Sessions against a loopback fake instrument.

use std::{
    io::{BufRead, BufReader, Write},
    net::TcpListener,
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use scpi_client::{
    connect, wait_for_complete, Client, Context, Error, Handler, Protocol, Tcp,
};

type Log = Arc<Mutex<Vec<String>>>;

/// Accepts one connection, records each received line and answers queries.
///
/// `*WAI;*OPC?` is answered after `opc_latency`; a command containing `BAD`
/// leaves `-113,"Undefined header"` in the error queue.
fn instrument(opc_latency: Duration) -> (String, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let log: Log = Arc::default();
    let seen = Arc::clone(&log);
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut pending_error = false;
        for line in BufReader::new(stream).lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            seen.lock().unwrap().push(line.clone());
            let reply = match line.as_str() {
                "SYST:ERR?" if pending_error => {
                    pending_error = false;
                    Some("-113,\"Undefined header\"\n".to_string())
                }
                "SYST:ERR?" => Some("+0,\"No error\"\n".to_string()),
                "*WAI;*OPC?" => {
                    thread::sleep(opc_latency);
                    Some("1\n".to_string())
                }
                "*IDN?" => Some("ACME,FAKE-1,0,1.0\n".to_string()),
                cmd => {
                    pending_error |= cmd.contains("BAD");
                    None
                }
            };
            if let Some(reply) = reply {
                if writer.write_all(reply.as_bytes()).is_err() {
                    break;
                }
            }
        }
    });
    (addr, log)
}

fn lines(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn exec_is_two_transmissions() {
    let (addr, log) = instrument(Duration::ZERO);
    let mut session = connect("tcp", &addr, Duration::from_secs(1)).unwrap();
    session.exec("*RST").unwrap();
    assert_eq!(lines(&log), ["*RST", "SYST:ERR?"]);
}

#[test]
fn device_fault_names_the_batch() {
    let (addr, log) = instrument(Duration::ZERO);
    let mut session = connect("tcp", &addr, Duration::from_secs(1)).unwrap();
    let err = session.bulk_exec(&["VOLT 1", "BAD:HEADER"]).unwrap_err();
    let fault = err.command_error().expect("device fault");
    assert_eq!(fault.command(), "VOLT 1;BAD:HEADER");
    assert_eq!(fault.code(), -113);
    assert_eq!(fault.message(), "undefined header");
    assert_eq!(lines(&log), ["VOLT 1;BAD:HEADER", "SYST:ERR?"]);

    // The queue was drained by the check, so the next command is clean.
    session.exec("VOLT 2").unwrap();
}

#[test]
fn query_reads_reply() {
    let (addr, log) = instrument(Duration::ZERO);
    let mut session = Tcp::default()
        .open(&addr, Duration::from_secs(1))
        .unwrap();
    assert_eq!(session.query("*IDN?").unwrap(), "ACME,FAKE-1,0,1.0\n");
    assert_eq!(lines(&log), ["*IDN?"]);
}

#[test]
fn wait_for_complete_in_time() {
    let (addr, _) = instrument(Duration::from_millis(20));
    let session = connect("tcp", &addr, Duration::from_secs(1)).unwrap();
    wait_for_complete(&session, Duration::from_secs(5)).unwrap();
}

#[test]
fn wait_for_complete_outlasts_socket_timeout() {
    let (addr, log) = instrument(Duration::from_millis(600));
    let tcp = Tcp {
        nodelay: true,
        io_timeout: Some(Duration::from_millis(200)),
    };
    let mut session = tcp.open(&addr, Duration::from_secs(1)).unwrap();
    wait_for_complete(&session, Duration::from_secs(3)).unwrap();

    // Later cycles are bounded by the socket timeout again.
    session.exec("*CLS").unwrap();
    assert_eq!(lines(&log), ["*WAI;*OPC?", "*CLS", "SYST:ERR?"]);
}

#[test]
fn wait_for_complete_times_out_and_drains() {
    let (addr, log) = instrument(Duration::from_millis(400));
    let mut session = connect("tcp", &addr, Duration::from_secs(1)).unwrap();

    let started = Instant::now();
    let err = wait_for_complete(&session, Duration::from_millis(50)).unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(started.elapsed() < Duration::from_millis(350));

    // The abandoned `1` is consumed before this cycle starts.
    session.exec("*CLS").unwrap();
    assert_eq!(lines(&log), ["*WAI;*OPC?", "*CLS", "SYST:ERR?"]);
}

#[test]
fn deadline_bounds_a_silent_instrument() {
    // Nothing ever answers `MEAS?`.
    let (addr, _) = instrument(Duration::ZERO);
    let mut session = connect("tcp", &addr, Duration::from_secs(1)).unwrap();
    let started = Instant::now();
    let ctx = Context::with_timeout(Duration::from_millis(100));
    let err = session.query_with(&ctx, "MEAS?").unwrap_err();
    assert!(err.is_timeout(), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn handler_over_tcp() {
    let (addr, log) = instrument(Duration::ZERO);
    let session = connect("tcp", &addr, Duration::from_secs(1)).unwrap();
    let mut handler = Handler::new(session);
    handler.reset().unwrap();
    assert_eq!(handler.identity().unwrap().model, "FAKE-1");
    handler.client().close().unwrap();
    assert!(matches!(handler.trigger(), Err(Error::Closed)));
    assert_eq!(lines(&log), ["*RST;*CLS", "SYST:ERR?", "*IDN?"]);
}

#[test]
fn refused_dial() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    let err = connect("tcp", &addr, Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

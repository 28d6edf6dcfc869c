use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dashmap::DashMap;

use a2l_bob::bob::{self, run_promise_end, run_promise_init, run_promise_sign, run_puzzle_share};
use a2l_bob::config::{init_tracing, BobArgs};
use a2l_bob::keys::KeyBundle;
use a2l_bob::session::BobSession;
use a2l_bob::transport::{self, HttpClientTransport};

fn main() {
    let args = BobArgs::parse();
    init_tracing(args.verbose);

    let keys = KeyBundle::load_from_file(&args.keyfile).expect("failed to load key bundle");
    let tx = hex::decode(&args.tx).expect("--tx must be hex-encoded");
    let mut rng = rand::thread_rng();

    let mut session = BobSession::new(keys, tx);

    let client_id = "bob";
    let tumbler = HttpClientTransport::new(format!("http://{}", args.tumbler_addr), client_id);
    run_promise_init(&mut session, &tumbler).expect("promise_init failed");
    run_promise_sign(&mut rng, &mut session, &tumbler).expect("promise_sign failed");
    run_promise_end(&mut session, &tumbler).expect("promise_end failed");
    tracing::info!("promise phase complete");

    let alice = HttpClientTransport::new(format!("http://{}", args.alice_addr), client_id);
    run_puzzle_share(&mut rng, &mut session, &alice).expect("puzzle_share failed");
    tracing::info!("puzzle handed to alice, waiting for solution");

    let sessions: Arc<DashMap<String, BobSession>> = Arc::new(DashMap::new());
    sessions.insert(client_id.to_string(), session);
    let router = Arc::new(bob::router());

    let stop = transport::serve(&args.listen_addr, router, sessions, |_client_id| {
        Err(a2l_bob::error::ProtocolError::StateError(
            "bob only expects one Alice session per run".into(),
        ))
    });

    loop {
        if stop.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_secs(3600));
    }
}
